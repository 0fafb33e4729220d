//! Discovery of the C++ compiler, archiver, and their flags.
//!
//! Mirrors the environment-override-then-default pattern used to resolve
//! the Ninja executable: an explicit environment variable wins outright,
//! otherwise a default program name is searched for on `PATH`.

use crate::error::{Error, Result};
use ninja_env::{AR_ENV, CXXFLAGS_ENV, CXX_ENV, LDFLAGS_ENV};
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

const DEFAULT_CXX: &str = "c++";
const DEFAULT_AR: &str = "ar";

/// The resolved toolchain: compiler, archiver, and ambient flags.
#[derive(Debug, Clone)]
pub struct Toolchain {
    /// The C++ compiler driver executable.
    pub cxx: PathBuf,
    /// The archiver executable.
    pub ar: PathBuf,
    /// Extra flags appended to every compile command, from `CXXFLAGS`.
    pub cxxflags: Vec<String>,
    /// Extra flags appended to every link command, from `LDFLAGS`.
    pub ldflags: Vec<String>,
}

impl Toolchain {
    /// Discover the toolchain from the environment and `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolchainNotFound`] when neither the override
    /// variable nor the default program name resolve to an executable file.
    pub fn discover() -> Result<Self> {
        discover_with(|key| env::var_os(key), |name| which(name))
    }
}

fn discover_with(
    mut read_env: impl FnMut(&str) -> Option<OsString>,
    mut search_path: impl FnMut(&str) -> Option<PathBuf>,
) -> Result<Toolchain> {
    let cxx = resolve_tool(CXX_ENV, DEFAULT_CXX, &mut read_env, &mut search_path)?;
    let ar = resolve_tool(AR_ENV, DEFAULT_AR, &mut read_env, &mut search_path)?;
    let cxxflags = split_flags(read_env(CXXFLAGS_ENV));
    let ldflags = split_flags(read_env(LDFLAGS_ENV));
    Ok(Toolchain {
        cxx,
        ar,
        cxxflags,
        ldflags,
    })
}

fn resolve_tool(
    env_var: &str,
    default_name: &str,
    read_env: &mut impl FnMut(&str) -> Option<OsString>,
    search_path: &mut impl FnMut(&str) -> Option<PathBuf>,
) -> Result<PathBuf> {
    if let Some(value) = read_env(env_var) {
        return Ok(PathBuf::from(value));
    }
    search_path(default_name).ok_or_else(|| Error::ToolchainNotFound {
        tool: default_name.to_owned(),
    })
}

fn split_flags(value: Option<OsString>) -> Vec<String> {
    value
        .and_then(|v| v.into_string().ok())
        .map(|s| s.split_whitespace().map(ToOwned::to_owned).collect())
        .unwrap_or_default()
}

/// Search `PATH` for an executable file named `name`, Unix-style (no
/// `PATHEXT` handling: this core targets POSIX toolchains).
fn which(name: &str) -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var).find_map(|dir| {
        let candidate = dir.join(name);
        is_executable_file(&candidate).then_some(candidate)
    })
}

#[cfg(unix)]
fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable_file(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_env_override_over_path_search() {
        let toolchain = discover_with(
            |key| match key {
                k if k == CXX_ENV => Some(OsString::from("/opt/custom-cxx")),
                k if k == AR_ENV => Some(OsString::from("/opt/custom-ar")),
                _ => None,
            },
            |_| panic!("PATH search should not run when an override is set"),
        )
        .expect("discover succeeds");
        assert_eq!(toolchain.cxx, PathBuf::from("/opt/custom-cxx"));
        assert_eq!(toolchain.ar, PathBuf::from("/opt/custom-ar"));
    }

    #[test]
    fn falls_back_to_path_search_when_no_override() {
        let toolchain = discover_with(
            |_| None,
            |name| (name == DEFAULT_CXX || name == DEFAULT_AR).then(|| PathBuf::from(format!("/usr/bin/{name}"))),
        )
        .expect("discover succeeds");
        assert_eq!(toolchain.cxx, PathBuf::from("/usr/bin/c++"));
        assert_eq!(toolchain.ar, PathBuf::from("/usr/bin/ar"));
    }

    #[test]
    fn reports_missing_tool() {
        let err = discover_with(|_| None, |_| None).unwrap_err();
        match err {
            Error::ToolchainNotFound { tool } => assert_eq!(tool, DEFAULT_CXX),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn splits_cxxflags_and_ldflags_on_whitespace() {
        let toolchain = discover_with(
            |key| match key {
                k if k == CXX_ENV => Some(OsString::from("/usr/bin/c++")),
                k if k == AR_ENV => Some(OsString::from("/usr/bin/ar")),
                k if k == CXXFLAGS_ENV => Some(OsString::from("-O2 -Wall")),
                k if k == LDFLAGS_ENV => Some(OsString::from("-lm")),
                _ => None,
            },
            |_| None,
        )
        .expect("discover succeeds");
        assert_eq!(toolchain.cxxflags, vec!["-O2".to_owned(), "-Wall".to_owned()]);
        assert_eq!(toolchain.ldflags, vec!["-lm".to_owned()]);
    }
}
