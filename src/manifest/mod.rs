//! In-memory form of a project's declared name, version, dependencies,
//! profile, and build flags.
//!
//! Manifests are read-only once parsed: [`Manifest::parse`] is the only way
//! to construct one, and [`Manifest::merge_profile`] returns a new,
//! profile-specialized snapshot rather than mutating in place.

mod dependency;

pub use dependency::{Dependency, DependencySource, GitSelector};

use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::BTreeMap;

/// The package identity and edition/standard declaration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Package {
    /// The package name. Must be a non-empty ASCII identifier.
    pub name: String,
    /// The package's own version.
    pub version: semver::Version,
    /// The C++ standard edition, e.g. `"17"` or `"20"`.
    #[serde(default)]
    pub edition: Option<String>,
}

/// Flags merged from `[profile.debug]`/`[profile.release]` tables.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Profile {
    /// Extra include directories.
    #[serde(default)]
    pub include_dirs: Vec<String>,
    /// Extra preprocessor macro definitions (`NAME` or `NAME=VALUE`).
    #[serde(default)]
    pub defines: Vec<String>,
    /// Optimisation level hint passed through to the compiler.
    #[serde(default)]
    pub opt_level: Option<String>,
}

/// A `target.<triple>` override table.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TargetOverride {
    /// Dependencies only active when building for this triple.
    #[serde(default)]
    pub dependencies: IndexMap<String, Dependency>,
}

/// A fully parsed project manifest.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// The package identity table. Required.
    pub package: Package,
    /// Declared runtime/link dependencies.
    #[serde(default, rename = "dependencies")]
    pub dependencies: IndexMap<String, Dependency>,
    /// Dependencies available only to test-build requests (spec open
    /// question: excluded from the default link graph).
    #[serde(default, rename = "dev-dependencies")]
    pub dev_dependencies: IndexMap<String, Dependency>,
    /// `[profile.debug]`.
    #[serde(default)]
    profile: ProfileTable,
    /// `target.<triple>` overrides, keyed by triple string.
    #[serde(default)]
    pub target: BTreeMap<String, TargetOverride>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct ProfileTable {
    #[serde(default)]
    debug: Profile,
    #[serde(default)]
    release: Profile,
}

/// The build profile selection threaded through the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileKind {
    /// Unoptimised build with debug information.
    Debug,
    /// Optimised build.
    Release,
}

impl ProfileKind {
    /// The profile's directory name under the output root (spec section 6).
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }
}

impl Manifest {
    /// Parse `text` as a TOML manifest.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ManifestParseError`] when required keys are absent,
    /// an unknown top-level key is present, or the TOML is malformed.
    pub fn parse(text: &str, path: &Utf8Path) -> Result<Self> {
        toml::from_str(text).map_err(|source| Error::ManifestParseError {
            path: path.to_owned(),
            message: source.to_string(),
        })
    }

    /// Read and parse the manifest at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, or
    /// [`Error::ManifestParseError`] if its contents are malformed.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.as_std_path().to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Return the profile flags selected by `profile`.
    #[must_use]
    pub fn profile_flags(&self, profile: ProfileKind) -> &Profile {
        match profile {
            ProfileKind::Debug => &self.profile.debug,
            ProfileKind::Release => &self.profile.release,
        }
    }

    /// Return the package's source root, `<project dir>/src`, given the
    /// manifest's own path.
    #[must_use]
    pub fn source_root(manifest_path: &Utf8Path) -> Utf8PathBuf {
        manifest_path
            .parent()
            .map_or_else(|| Utf8PathBuf::from("src"), |dir| dir.join("src"))
    }

    /// Build a manifest directly from its package identity and dependency
    /// tables, bypassing TOML parsing. Used by other modules' test fixtures,
    /// which have no need to round-trip through text.
    #[cfg(test)]
    pub(crate) fn for_test(
        package: Package,
        dependencies: IndexMap<String, Dependency>,
        dev_dependencies: IndexMap<String, Dependency>,
    ) -> Self {
        Self {
            package,
            dependencies,
            dev_dependencies,
            profile: ProfileTable::default(),
            target: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_manifest() {
        let text = "[package]\nname = \"hello\"\nversion = \"0.1.0\"\n";
        let manifest = Manifest::parse(text, Utf8Path::new("poac.toml")).expect("parse");
        assert_eq!(manifest.package.name, "hello");
        assert_eq!(manifest.package.version, semver::Version::new(0, 1, 0));
        assert!(manifest.dependencies.is_empty());
    }

    #[test]
    fn rejects_unknown_top_level_key() {
        let text = "[package]\nname = \"hello\"\nversion = \"0.1.0\"\n\n[bogus]\nx = 1\n";
        let err = Manifest::parse(text, Utf8Path::new("poac.toml")).unwrap_err();
        assert!(matches!(err, Error::ManifestParseError { .. }));
    }

    #[test]
    fn rejects_missing_required_keys() {
        let text = "[package]\nname = \"hello\"\n";
        let err = Manifest::parse(text, Utf8Path::new("poac.toml")).unwrap_err();
        assert!(matches!(err, Error::ManifestParseError { .. }));
    }

    #[test]
    fn parses_dependency_table_and_profile() {
        let text = concat!(
            "[package]\n",
            "name = \"hello\"\n",
            "version = \"0.1.0\"\n",
            "\n",
            "[dependencies]\n",
            "fmt = \"^9.0\"\n",
            "\n",
            "[profile.release]\n",
            "opt_level = \"3\"\n",
        );
        let manifest = Manifest::parse(text, Utf8Path::new("poac.toml")).expect("parse");
        assert_eq!(manifest.dependencies.len(), 1);
        assert_eq!(
            manifest.profile_flags(ProfileKind::Release).opt_level.as_deref(),
            Some("3")
        );
        assert!(manifest.profile_flags(ProfileKind::Debug).opt_level.is_none());
    }
}
