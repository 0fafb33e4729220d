//! Translates a resolved dependency graph into Ninja build edges (spec
//! 4.F): one `compile_cxx` build per source file, one `archive` build per
//! non-root package, and a single `link_exe` build for the root package.
//!
//! Incrementality is left entirely to Ninja: every compile edge declares a
//! GCC-style depfile and `restat`, so header-only changes only rebuild the
//! translation units that actually include the changed header.

use crate::error::{Error, Result};
use crate::manifest::ProfileKind;
use crate::ninja::{BuildSet, RuleSet, Writer};
use crate::resolver::{PackageOrigin, ResolutionSet};
use crate::toolchain::Toolchain;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashMap;

const SOURCE_EXTENSIONS: [&str; 4] = ["c", "cc", "cpp", "cxx"];
const SKIPPED_DIR_NAMES: [&str; 2] = ["build", "cmake-build-debug"];
const MAX_WALK_DEPTH: usize = 64;

/// Enumerate compilable source files under `source_root`, skipping
/// dot-directories, `build`/`cmake-build-debug`, and the build output
/// directory itself.
fn enumerate_sources(source_root: &Utf8Path, out_dir: &Utf8Path) -> Vec<Utf8PathBuf> {
    if !source_root.is_dir() {
        return Vec::new();
    }
    walkdir::WalkDir::new(source_root.as_std_path())
        .max_depth(MAX_WALK_DEPTH)
        .into_iter()
        .filter_entry(|entry| {
            if entry.file_type().is_file() {
                return true;
            }
            let Some(name) = entry.file_name().to_str() else {
                return false;
            };
            if name.starts_with('.') || SKIPPED_DIR_NAMES.contains(&name) {
                return false;
            }
            Utf8Path::from_path(entry.path()) != Some(out_dir)
        })
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| Utf8PathBuf::from_path_buf(entry.into_path()).ok())
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
        })
        .collect()
}

fn object_path(out_dir: &Utf8Path, profile: ProfileKind, package: &str, source: &Utf8Path) -> Utf8PathBuf {
    let stem = source.file_stem().unwrap_or("out");
    let discriminant = seahash_like(source.as_str());
    out_dir
        .join(profile.dir_name())
        .join("obj")
        .join(package)
        .join(format!("{stem}-{discriminant:x}.o"))
}

/// Cheap, dependency-free disambiguator for object file names so two source
/// files with the same stem in different directories don't collide.
fn seahash_like(path: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in path.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

fn compile_rule() -> RuleSet {
    RuleSet {
        description: Some("CXX $out".to_owned()),
        depfile: Some("$out.d".to_owned()),
        deps: Some("gcc".to_owned()),
        restat: true,
        ..RuleSet::default()
    }
}

fn archive_rule() -> RuleSet {
    RuleSet {
        description: Some("AR $out".to_owned()),
        restat: true,
        ..RuleSet::default()
    }
}

fn link_rule() -> RuleSet {
    RuleSet {
        description: Some("LINK $out".to_owned()),
        ..RuleSet::default()
    }
}

/// Resolve the directory a package's own compilable sources live in.
///
/// # Errors
///
/// Returns [`Error::SourceUnpackError`] for a git-origin package: cloning a
/// git dependency is out of scope for this core (no VCS tooling is
/// invoked), so such a package cannot contribute sources to a build.
fn source_root_for(
    package: &crate::resolver::ResolvedPackage,
    source_dirs: &HashMap<String, Utf8PathBuf>,
) -> Result<Utf8PathBuf> {
    match &package.origin {
        PackageOrigin::Git { .. } => Err(Error::SourceUnpackError {
            name: package.name.clone(),
            version: package.version.to_string(),
            message: "git dependency sources are not materialized by this core".to_owned(),
        }),
        PackageOrigin::Registry | PackageOrigin::Path(_) => {
            let dir = source_dirs
                .get(&package.name)
                .cloned()
                .unwrap_or_else(|| Utf8PathBuf::from(&package.name));
            Ok(dir.join("src"))
        }
    }
}

/// Emit a complete `build.ninja` document for `resolution`.
///
/// `source_dirs` maps every non-root package name to the directory its
/// manifest lives in (for the root, the project directory itself); `None`
/// falls back to a bare `<name>` relative path, which only makes sense in
/// tests that stub out the filesystem.
///
/// # Errors
///
/// Returns [`Error::ToolchainNotFound`]-adjacent errors are not produced
/// here (the toolchain is assumed already discovered); returns
/// [`Error::SourceUnpackError`] if a package has no usable source
/// directory.
pub fn plan(
    resolution: &ResolutionSet,
    source_dirs: &HashMap<String, Utf8PathBuf>,
    toolchain: &Toolchain,
    profile: ProfileKind,
    out_dir: &Utf8Path,
) -> Result<String> {
    let mut writer = Writer::new();

    writer.variable("cxx", &toolchain.cxx.to_string_lossy(), 0);
    writer.variable("ar", &toolchain.ar.to_string_lossy(), 0);
    writer.variable_list("cxxflags", &toolchain.cxxflags, 0);
    writer.variable_list("ldflags", &toolchain.ldflags, 0);
    writer.newline();

    writer.rule(
        "compile_cxx",
        "$cxx -MMD -MF $out.d $cxxflags -c $in -o $out",
        &compile_rule(),
    );
    writer.newline();
    writer.rule("archive", "$ar rcs $out $in", &archive_rule());
    writer.newline();
    writer.rule("link_exe", "$cxx $in $ldflags -o $out", &link_rule());
    writer.newline();

    let order = resolution.topological_order();
    let mut archives: HashMap<String, Utf8PathBuf> = HashMap::new();
    let root_index = 0usize;

    for &idx in &order {
        let Some(package) = resolution.packages.get(idx) else {
            continue;
        };
        let source_root = source_root_for(package, source_dirs)?;
        let sources = enumerate_sources(&source_root, out_dir);
        let mut objects = Vec::with_capacity(sources.len());
        for source in &sources {
            let object = object_path(out_dir, profile, &package.name, source);
            writer.build(
                &[object.to_string()],
                "compile_cxx",
                &BuildSet {
                    inputs: vec![source.to_string()],
                    ..BuildSet::default()
                },
            );
            objects.push(object.to_string());
        }

        if idx == root_index {
            continue;
        }
        if objects.is_empty() {
            continue;
        }
        let archive_path = out_dir
            .join(profile.dir_name())
            .join("lib")
            .join(format!("lib{}.a", package.name));
        writer.build(
            &[archive_path.to_string()],
            "archive",
            &BuildSet {
                inputs: objects,
                ..BuildSet::default()
            },
        );
        archives.insert(package.name.clone(), archive_path);
    }

    let Some(root) = resolution.packages.get(root_index) else {
        return Err(Error::SourceUnpackError {
            name: "<root>".to_owned(),
            version: "unknown".to_owned(),
            message: "resolution set is missing its root package".to_owned(),
        });
    };
    let root_source_root = source_root_for(root, source_dirs)?;
    let root_sources = enumerate_sources(&root_source_root, out_dir);
    let mut root_objects = Vec::with_capacity(root_sources.len());
    for source in &root_sources {
        let object = object_path(out_dir, profile, &root.name, source);
        root_objects.push(object.to_string());
    }

    let mut link_inputs = root_objects;
    for dep_name in &root.dependencies {
        if let Some(archive) = archives.get(dep_name) {
            link_inputs.push(archive.to_string());
        }
    }

    let executable = out_dir.join(profile.dir_name()).join(&root.name);
    writer.newline();
    writer.build(
        &[executable.to_string()],
        "link_exe",
        &BuildSet {
            inputs: link_inputs,
            ..BuildSet::default()
        },
    );
    writer.default(&[executable.to_string()]);

    Ok(writer.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolvedPackage;
    use semver::Version;
    use std::io::Write;
    use tempfile::tempdir;

    fn toolchain() -> Toolchain {
        Toolchain {
            cxx: "/usr/bin/c++".into(),
            ar: "/usr/bin/ar".into(),
            cxxflags: vec!["-O2".to_owned()],
            ldflags: Vec::new(),
        }
    }

    #[test]
    fn plans_a_single_package_executable() {
        let project = tempdir().expect("tempdir");
        let src = Utf8PathBuf::from_path_buf(project.path().to_path_buf())
            .expect("utf8")
            .join("src");
        std::fs::create_dir_all(&src).expect("mkdir");
        let mut file = std::fs::File::create(src.join("main.cpp")).expect("create");
        writeln!(file, "int main() {{ return 0; }}").expect("write");

        let resolution = ResolutionSet {
            packages: vec![ResolvedPackage {
                name: "hello".to_owned(),
                version: Version::new(0, 1, 0),
                origin: PackageOrigin::Registry,
                dependencies: Vec::new(),
            }],
            edges: Vec::new(),
        };
        let mut source_dirs = HashMap::new();
        source_dirs.insert(
            "hello".to_owned(),
            Utf8PathBuf::from_path_buf(project.path().to_path_buf()).expect("utf8"),
        );

        let out_dir = Utf8Path::new("target");
        let ninja_text = plan(
            &resolution,
            &source_dirs,
            &toolchain(),
            ProfileKind::Debug,
            out_dir,
        )
        .expect("plan succeeds");

        assert!(ninja_text.contains("rule compile_cxx"));
        assert!(ninja_text.contains("rule link_exe"));
        assert!(ninja_text.contains("default target/debug/hello"));
    }
}
