//! Logical operations against the package index: `search`, `versions`,
//! `fetch`. The wire format is unspecified; [`Registry`] exposes only the
//! logical contract so the resolver and tests can depend on a trait object
//! rather than a concrete transport.

mod http;
mod retry;

pub use http::HttpRegistry;
pub use retry::{RetryPolicy, with_backoff};

use crate::error::{Error, Result};
use crate::manifest::Dependency;
use semver::Version;

/// One entry of a [`Registry::search`] result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// The package name.
    pub name: String,
    /// The package version.
    pub version: Version,
    /// A short human-readable description.
    pub description: String,
}

/// Logical registry operations. Implemented by [`HttpRegistry`] for
/// production use and by hand-rolled in-memory stubs in resolver tests.
pub trait Registry {
    /// Search the index for packages matching `query`, returning at most
    /// `limit` results.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RegistryError`] on transport or decode failure.
    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>>;

    /// Return every published version of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PackageNotFound`] when the name is unknown, or
    /// [`Error::RegistryError`] on transport or decode failure.
    fn versions(&self, name: &str) -> Result<Vec<Version>>;

    /// Fetch the source archive bytes for `name`@`version`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PackageNotFound`] when the name or version is
    /// unknown, or [`Error::RegistryError`] on transport or decode failure.
    fn fetch(&self, name: &str, version: &Version) -> Result<Vec<u8>>;

    /// Return the declared dependencies of `name`@`version`, as published by
    /// the index. This underlies the resolver's recursive descent (spec
    /// 4.D); it is not one of the three named logical operations, but the
    /// backtracking algorithm has no other way to discover a candidate's
    /// transitive requirements before fetching its full source archive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PackageNotFound`] when the name or version is
    /// unknown, or [`Error::RegistryError`] on transport or decode failure.
    fn dependencies(&self, name: &str, version: &Version) -> Result<Vec<(String, Dependency)>>;
}

/// Surface a 4xx response as a non-retryable [`Error::RegistryError`]
/// carrying the server's diagnostic, per spec 4.C.
pub(crate) fn client_error(operation: &'static str, endpoint: &str, status: u16, body: &str) -> Error {
    Error::RegistryError {
        operation,
        endpoint: endpoint.to_owned(),
        source: anyhow::anyhow!("HTTP {status}: {body}"),
    }
}
