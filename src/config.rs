//! Threads CLI flags and environment overrides into the values the driver
//! needs, so no other module reads `std::env` or [`Cli`] directly (spec 9's
//! "Singletons" note: configuration is built once, then passed down).

use crate::cli::Cli;
use crate::manifest::ProfileKind;
use camino::{Utf8Path, Utf8PathBuf};
use std::env;

const REGISTRY_URL_ENV: &str = "POAC_REGISTRY_URL";
const DEFAULT_REGISTRY_URL: &str = "https://registry.poac.dev";
const STORE_DIR_ENV: &str = "POAC_STORE_DIR";
const OUT_DIR_NAME: &str = "target";

/// Resolved run configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the manifest file.
    pub manifest_path: Utf8PathBuf,
    /// The directory the manifest lives in.
    pub project_dir: Utf8PathBuf,
    /// Where compiled artefacts are written.
    pub out_dir: Utf8PathBuf,
    /// Where unpacked package sources are cached.
    pub store_dir: Utf8PathBuf,
    /// Base URL of the package registry.
    pub registry_url: String,
    /// Parallel job count passed through to `ninja -j`.
    pub jobs: Option<usize>,
    /// The selected build profile.
    pub profile: ProfileKind,
    /// Whether verbose logging was requested.
    pub verbose: bool,
}

impl Config {
    /// Build a [`Config`] from parsed CLI flags and the process environment.
    #[must_use]
    pub fn from_cli(cli: &Cli, release: bool) -> Self {
        Self::from_parts(cli, release, |key| env::var(key).ok())
    }

    fn from_parts(cli: &Cli, release: bool, mut read_env: impl FnMut(&str) -> Option<String>) -> Self {
        let manifest_path =
            Utf8PathBuf::from_path_buf(cli.file.clone()).unwrap_or_else(|_| Utf8PathBuf::from("poac.toml"));
        let project_dir = manifest_path
            .parent()
            .map_or_else(|| Utf8PathBuf::from("."), Utf8Path::to_path_buf);
        let directory_override = cli
            .directory
            .as_ref()
            .and_then(|d| Utf8PathBuf::from_path_buf(d.clone()).ok());
        let project_dir = directory_override.unwrap_or(project_dir);
        let out_dir = project_dir.join(OUT_DIR_NAME);
        let store_dir = read_env(STORE_DIR_ENV)
            .map(Utf8PathBuf::from)
            .unwrap_or_else(|| out_dir.join("sources"));
        let registry_url = read_env(REGISTRY_URL_ENV).unwrap_or_else(|| DEFAULT_REGISTRY_URL.to_owned());

        Self {
            manifest_path,
            project_dir,
            out_dir,
            store_dir,
            registry_url,
            jobs: cli.jobs,
            profile: if release { ProfileKind::Release } else { ProfileKind::Debug },
            verbose: cli.verbose,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli() -> Cli {
        Cli {
            file: "poac.toml".into(),
            directory: None,
            jobs: Some(4),
            verbose: false,
            command: None,
        }
    }

    #[test]
    fn defaults_registry_url_and_store_dir_from_out_dir() {
        let config = Config::from_parts(&cli(), false, |_| None);
        assert_eq!(config.registry_url, DEFAULT_REGISTRY_URL);
        assert_eq!(config.store_dir, config.out_dir.join("sources"));
        assert_eq!(config.profile, ProfileKind::Debug);
    }

    #[test]
    fn environment_overrides_win() {
        let config = Config::from_parts(&cli(), true, |key| {
            (key == REGISTRY_URL_ENV).then(|| "https://example.test".to_owned())
        });
        assert_eq!(config.registry_url, "https://example.test");
        assert_eq!(config.profile, ProfileKind::Release);
    }
}
