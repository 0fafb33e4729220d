//! Crate-wide error type.
//!
//! Each variant names one of the semantic error kinds the core is required
//! to surface; the driver is the sole place that maps a variant to an exit
//! code or a rendered diagnostic.

use camino::Utf8PathBuf;
use std::path::PathBuf;
use thiserror::Error;

/// The crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// A structured conflict chain entry used by [`Error::NoVersionSatisfies`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictLink {
    /// The package requesting the dependency.
    pub from: String,
    /// The package being requested.
    pub to: String,
    /// The requirement range expressed on the edge.
    pub range: String,
}

impl std::fmt::Display for ConflictLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}->{} {}", self.from, self.to, self.range)
    }
}

/// All fallible outcomes of the core package manager and build driver.
#[derive(Debug, Error)]
pub enum Error {
    /// `package.name`/`package.version` missing, or an unknown top-level key
    /// was present in a manifest.
    #[error("failed to parse manifest {path}: {message}")]
    ManifestParseError {
        /// The manifest file path.
        path: Utf8PathBuf,
        /// A human-readable description of the malformed key chain.
        message: String,
    },

    /// A registry operation failed at the network, HTTP-status, or decode
    /// level.
    #[error("registry {operation} against {endpoint} failed: {source}")]
    RegistryError {
        /// The logical operation (`search`, `versions`, `fetch`).
        operation: &'static str,
        /// The endpoint contacted.
        endpoint: String,
        /// The underlying transport or decode error.
        #[source]
        source: anyhow::Error,
    },

    /// The registry does not know the requested package name.
    #[error("package '{name}' was not found in the registry")]
    PackageNotFound {
        /// The unresolved package name.
        name: String,
    },

    /// Constraint intersection for `name` became empty.
    #[error("no version of '{name}' satisfies the requirement chain: {chain}")]
    NoVersionSatisfies {
        /// The package whose constraints could not be satisfied.
        name: String,
        /// The constraint chain that produced the conflict.
        chain: String,
    },

    /// A back-edge was found while resolving dependencies.
    #[error("dependency cycle detected: {cycle}")]
    DependencyCycle {
        /// The cycle, rendered as `a -> b -> c -> a`.
        cycle: String,
    },

    /// A fetched archive was corrupt, or unpacking it failed.
    #[error("failed to unpack source for {name}-{version}: {message}")]
    SourceUnpackError {
        /// The package name.
        name: String,
        /// The package version.
        version: String,
        /// A description of the failure.
        message: String,
    },

    /// A required external tool (compiler, archiver, linker) could not be
    /// located.
    #[error("toolchain tool '{tool}' could not be located")]
    ToolchainNotFound {
        /// The name of the missing tool.
        tool: String,
    },

    /// An external subprocess exited with a non-zero status.
    #[error("subprocess '{name}' exited with code {code}")]
    SubprocessFailed {
        /// The subprocess name (e.g. `ninja`).
        name: String,
        /// The observed exit code, or `-1` when terminated by a signal.
        code: i32,
    },

    /// Wraps an I/O failure not covered by a more specific variant above.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path associated with the failure, when known.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Map this error to the process exit code the driver should return.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::ManifestParseError { .. } => 2,
            Self::RegistryError { .. } => 3,
            Self::PackageNotFound { .. } => 4,
            Self::NoVersionSatisfies { .. } => 5,
            Self::DependencyCycle { .. } => 6,
            Self::SourceUnpackError { .. } => 7,
            Self::ToolchainNotFound { .. } => 8,
            Self::SubprocessFailed { code, .. } => {
                if *code == 0 { 9 } else { *code }
            }
            Self::Io { .. } => 10,
        }
    }
}
