//! An HTTP-backed [`Registry`], grounded on the `ureq::AgentBuilder`
//! timeout pattern used elsewhere in this codebase's lineage for outbound
//! fetches.

use super::{Registry, RetryPolicy, SearchResult, client_error, with_backoff};
use crate::error::{Error, Result};
use crate::manifest::Dependency;
use semver::Version;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::time::Duration;
use ureq::{Agent, AgentBuilder};

/// A registry client backed by the index's HTTP API.
pub struct HttpRegistry {
    agent: Agent,
    base_url: String,
    retry: RetryPolicy,
}

/// Open question (spec 8): the response schema assumes a single
/// `data.results` collection of objects carrying `name`, `version`, and
/// `description`. Confirm against the live index before freezing these
/// field names.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: SearchResponseData,
}

#[derive(Debug, Deserialize)]
struct SearchResponseData {
    results: Vec<SearchResultPayload>,
}

#[derive(Debug, Deserialize)]
struct SearchResultPayload {
    name: String,
    version: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct VersionsResponse {
    data: VersionsResponseData,
}

#[derive(Debug, Deserialize)]
struct VersionsResponseData {
    versions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DependenciesResponse {
    data: DependenciesResponseData,
}

#[derive(Debug, Deserialize)]
struct DependenciesResponseData {
    #[serde(default)]
    dependencies: HashMap<String, String>,
}

impl HttpRegistry {
    /// Build a client against `base_url` using spec 4.C's timeout budget:
    /// a per-request connect/read/write timeout and an overall deadline.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let agent = AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .timeout_read(Duration::from_secs(30))
            .timeout_write(Duration::from_secs(30))
            .timeout(Duration::from_secs(60))
            .build();
        Self {
            agent,
            base_url: base_url.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Override the default retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn get(&self, operation: &'static str, path: &str) -> Result<Vec<u8>> {
        let url = format!("{}{}", self.base_url, path);
        with_backoff(&self.retry, || {
            let response = self
                .agent
                .get(&url)
                .call()
                .map_err(|err| classify_transport_error(operation, &url, err))?;
            let mut bytes = Vec::new();
            response
                .into_reader()
                .read_to_end(&mut bytes)
                .map_err(|source| Error::RegistryError {
                    operation,
                    endpoint: url.clone(),
                    source: source.into(),
                })?;
            Ok(bytes)
        })
    }
}

fn classify_transport_error(operation: &'static str, url: &str, err: ureq::Error) -> Error {
    match err {
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            if (400..500).contains(&status) {
                client_error(operation, url, status, &body)
            } else {
                Error::RegistryError {
                    operation,
                    endpoint: url.to_owned(),
                    source: anyhow::anyhow!("HTTP {status}: {body}"),
                }
            }
        }
        ureq::Error::Transport(transport) => Error::RegistryError {
            operation,
            endpoint: url.to_owned(),
            source: anyhow::anyhow!(transport.to_string()),
        },
    }
}

impl Registry for HttpRegistry {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let path = format!("/search?q={query}&limit={limit}");
        let bytes = self.get("search", &path)?;
        let parsed: SearchResponse =
            serde_json::from_slice(&bytes).map_err(|source| Error::RegistryError {
                operation: "search",
                endpoint: format!("{}{}", self.base_url, path),
                source: source.into(),
            })?;
        parsed
            .data
            .results
            .into_iter()
            .map(|item| {
                Ok(SearchResult {
                    name: item.name,
                    version: Version::parse(&item.version).map_err(|source| {
                        Error::RegistryError {
                            operation: "search",
                            endpoint: self.base_url.clone(),
                            source: source.into(),
                        }
                    })?,
                    description: item.description,
                })
            })
            .collect()
    }

    fn versions(&self, name: &str) -> Result<Vec<Version>> {
        let path = format!("/packages/{name}/versions");
        let bytes = self.get("versions", &path)?;
        let parsed: VersionsResponse =
            serde_json::from_slice(&bytes).map_err(|source| Error::RegistryError {
                operation: "versions",
                endpoint: format!("{}{}", self.base_url, path),
                source: source.into(),
            })?;
        if parsed.data.versions.is_empty() {
            return Err(Error::PackageNotFound {
                name: name.to_owned(),
            });
        }
        parsed
            .data
            .versions
            .into_iter()
            .map(|raw| {
                Version::parse(&raw).map_err(|source| Error::RegistryError {
                    operation: "versions",
                    endpoint: self.base_url.clone(),
                    source: source.into(),
                })
            })
            .collect()
    }

    fn fetch(&self, name: &str, version: &Version) -> Result<Vec<u8>> {
        let path = format!("/packages/{name}/{version}/download");
        self.get("fetch", &path)
    }

    fn dependencies(&self, name: &str, version: &Version) -> Result<Vec<(String, Dependency)>> {
        let path = format!("/packages/{name}/{version}/dependencies");
        let bytes = self.get("dependencies", &path)?;
        let parsed: DependenciesResponse =
            serde_json::from_slice(&bytes).map_err(|source| Error::RegistryError {
                operation: "dependencies",
                endpoint: format!("{}{}", self.base_url, path),
                source: source.into(),
            })?;
        Ok(parsed
            .data
            .dependencies
            .into_iter()
            .map(|(dep_name, range)| {
                (
                    dep_name,
                    Dependency {
                        range: Some(range),
                        source: None,
                    },
                )
            })
            .collect())
    }
}
