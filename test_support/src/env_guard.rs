//! RAII guard for restoring environment variables.

use crate::env_lock::EnvLock;
use std::{
    borrow::Cow,
    ffi::{OsStr, OsString},
};

/// RAII guard that restores an environment variable to its prior state on
/// drop, so tests leave global process state untouched even if they panic.
#[derive(Debug)]
pub struct EnvGuard {
    key: Cow<'static, str>,
    original: Option<OsString>,
}

impl EnvGuard {
    /// Capture `key`'s current value and return a guard that restores it.
    #[must_use]
    pub fn new(key: impl Into<Cow<'static, str>>) -> Self {
        let key = key.into();
        let original = std::env::var_os(&*key);
        Self { key, original }
    }

    /// Set `key` to `value` under the global [`EnvLock`], returning a guard
    /// that restores the prior value on drop.
    #[must_use]
    pub fn set(key: impl Into<Cow<'static, str>>, value: impl AsRef<OsStr>) -> Self {
        let key = key.into();
        let _lock = EnvLock::acquire();
        let original = std::env::var_os(&*key);
        // SAFETY: `EnvLock` serialises mutations of the process environment.
        unsafe { std::env::set_var(&*key, value.as_ref()) };
        Self { key, original }
    }

    /// Access the captured original value.
    #[must_use]
    pub fn original(&self) -> Option<&OsStr> {
        self.original.as_deref()
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        let _lock = EnvLock::acquire();
        match self.original.take() {
            // SAFETY: `EnvLock` serialises mutations of the process environment.
            Some(value) => unsafe { std::env::set_var(&*self.key, value) },
            None => unsafe { std::env::remove_var(&*self.key) },
        }
    }
}
