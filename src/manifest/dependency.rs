//! Dependency requirement parsing.
//!
//! A dependency is either a bare semver range string (`fmt = "^9.0"`) or a
//! table pinning a local path or git reference. The table form's fields are
//! mutually exclusive, mirroring the teacher's `Recipe` deserializer, which
//! enforces the same kind of "exactly one of several shapes" constraint.

use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};
use std::fmt;

/// The non-registry source pinning a dependency, when one is declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencySource {
    /// A local filesystem path, relative to the manifest.
    Path(String),
    /// A git repository reference.
    Git {
        /// The repository URL.
        url: String,
        /// The revision selector: a commit, tag, or branch name.
        selector: GitSelector,
    },
}

/// Which git ref kind pins a [`DependencySource::Git`] dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitSelector {
    /// An exact commit hash.
    Rev(String),
    /// A tag name.
    Tag(String),
    /// A branch name.
    Branch(String),
}

/// A single entry under `[dependencies]`/`[dev-dependencies]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// The semver range, for registry dependencies. Absent for path/git
    /// dependencies, which are pinned and participate in constraint
    /// intersection only as the version they declare.
    pub range: Option<String>,
    /// The non-registry source, when this is a path or git dependency.
    pub source: Option<DependencySource>,
}

impl Dependency {
    /// Whether this dependency is resolved against the registry (as opposed
    /// to being pinned by a local path or git reference).
    #[must_use]
    pub const fn is_registry(&self) -> bool {
        self.source.is_none()
    }
}

impl<'de> Deserialize<'de> for Dependency {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(DependencyVisitor)
    }
}

struct DependencyVisitor;

impl<'de> Visitor<'de> for DependencyVisitor {
    type Value = Dependency;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a semver range string or a dependency table")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Dependency {
            range: Some(v.to_owned()),
            source: None,
        })
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut version: Option<String> = None;
        let mut path: Option<String> = None;
        let mut git: Option<String> = None;
        let mut rev: Option<String> = None;
        let mut tag: Option<String> = None;
        let mut branch: Option<String> = None;

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "version" => version = Some(map.next_value()?),
                "path" => path = Some(map.next_value()?),
                "git" => git = Some(map.next_value()?),
                "rev" => rev = Some(map.next_value()?),
                "tag" => tag = Some(map.next_value()?),
                "branch" => branch = Some(map.next_value()?),
                other => {
                    return Err(de::Error::unknown_field(
                        other,
                        &["version", "path", "git", "rev", "tag", "branch"],
                    ));
                }
            }
        }

        let source_count = [path.is_some(), git.is_some()]
            .into_iter()
            .filter(|set| *set)
            .count();
        if source_count > 1 {
            return Err(de::Error::custom(
                "dependency table may declare at most one of `path` or `git`",
            ));
        }

        if let Some(path) = path {
            if version.is_some() {
                return Err(de::Error::custom(
                    "a `path` dependency may not also declare `version`",
                ));
            }
            return Ok(Dependency {
                range: None,
                source: Some(DependencySource::Path(path)),
            });
        }

        if let Some(url) = git {
            let selectors = [rev.is_some(), tag.is_some(), branch.is_some()]
                .into_iter()
                .filter(|set| *set)
                .count();
            let selector = match (rev, tag, branch) {
                (Some(rev), None, None) => GitSelector::Rev(rev),
                (None, Some(tag), None) => GitSelector::Tag(tag),
                (None, None, Some(branch)) => GitSelector::Branch(branch),
                _ if selectors == 0 => {
                    return Err(de::Error::custom(
                        "a `git` dependency requires exactly one of `rev`, `tag`, or `branch`",
                    ));
                }
                _ => {
                    return Err(de::Error::custom(
                        "a `git` dependency accepts only one of `rev`, `tag`, or `branch`",
                    ));
                }
            };
            return Ok(Dependency {
                range: None,
                source: Some(DependencySource::Git { url, selector }),
            });
        }

        let Some(version) = version else {
            return Err(de::Error::custom(
                "dependency table requires `version`, `path`, or `git`",
            ));
        };
        Ok(Dependency {
            range: Some(version),
            source: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_fragment: &str) -> Dependency {
        #[derive(serde::Deserialize)]
        struct Wrapper {
            dep: Dependency,
        }
        let wrapper: Wrapper = toml::from_str(toml_fragment).expect("parse");
        wrapper.dep
    }

    #[test]
    fn parses_bare_range_string() {
        let dep = parse("dep = \"^1.2\"\n");
        assert_eq!(dep.range.as_deref(), Some("^1.2"));
        assert!(dep.source.is_none());
    }

    #[test]
    fn parses_path_table() {
        let dep = parse("dep = { path = \"../local\" }\n");
        assert_eq!(
            dep.source,
            Some(DependencySource::Path("../local".to_owned()))
        );
    }

    #[test]
    fn parses_git_table_with_tag() {
        let dep = parse("dep = { git = \"https://example.com/repo.git\", tag = \"v1.0\" }\n");
        match dep.source {
            Some(DependencySource::Git { url, selector }) => {
                assert_eq!(url, "https://example.com/repo.git");
                assert_eq!(selector, GitSelector::Tag("v1.0".to_owned()));
            }
            other => panic!("expected git source, got {other:?}"),
        }
    }

    #[test]
    fn rejects_path_and_git_together() {
        #[derive(serde::Deserialize)]
        struct Wrapper {
            #[allow(dead_code)]
            dep: Dependency,
        }
        let text = "dep = { path = \"../local\", git = \"https://example.com/r.git\" }\n";
        let result: Result<Wrapper, _> = toml::from_str(text);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_git_without_selector() {
        #[derive(serde::Deserialize)]
        struct Wrapper {
            #[allow(dead_code)]
            dep: Dependency,
        }
        let text = "dep = { git = \"https://example.com/r.git\" }\n";
        let result: Result<Wrapper, _> = toml::from_str(text);
        assert!(result.is_err());
    }
}
