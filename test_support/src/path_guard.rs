//! Restore `PATH` and prepend directories for fake-toolchain tests.

use crate::env_guard::EnvGuard;
use std::path::Path;

/// Guard that restores `PATH` to its original value when dropped.
#[derive(Debug)]
pub struct PathGuard {
    inner: EnvGuard,
}

/// Prepend `dir` to the real `PATH`, returning a guard that restores it.
#[must_use]
pub fn prepend_dir_to_path(dir: &Path) -> PathGuard {
    let original = std::env::var_os("PATH");
    let mut paths: Vec<_> = original
        .as_ref()
        .map(std::env::split_paths)
        .into_iter()
        .flatten()
        .collect();
    paths.insert(0, dir.to_path_buf());
    let Ok(new_path) = std::env::join_paths(&paths) else {
        return PathGuard {
            inner: EnvGuard::new("PATH"),
        };
    };
    PathGuard {
        inner: EnvGuard::set("PATH", new_path),
    }
}

impl PathGuard {
    /// Access the captured original `PATH` value.
    #[must_use]
    pub fn original(&self) -> Option<&std::ffi::OsStr> {
        self.inner.original()
    }
}
