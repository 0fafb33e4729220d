//! Content-addressed local cache of unpacked package sources (spec 4.E).
//!
//! Packages live at `<root>/<name>-<version>/`. A fetch writes into a
//! sibling temporary directory first and renames it into place, so a
//! process killed mid-fetch never leaves a partial directory at the final
//! path. Concurrent callers for the same key serialize on a per-key lock
//! rather than a single store-wide one, so unrelated packages still fetch
//! in parallel (spec 5).

use crate::error::{Error, Result};
use crate::registry::Registry;
use camino::{Utf8Path, Utf8PathBuf};
use semver::Version;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A content-addressed cache of unpacked package sources rooted at a single
/// directory.
pub struct SourceStore {
    root: Utf8PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SourceStore {
    /// Open (without creating) a store rooted at `root`.
    #[must_use]
    pub fn new(root: Utf8PathBuf) -> Self {
        Self {
            root,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The directory a resolved `name`@`version` would live in.
    #[must_use]
    pub fn path_for(&self, name: &str, version: &Version) -> Utf8PathBuf {
        self.root.join(format!("{name}-{version}"))
    }

    /// Whether `name`@`version` is already present and unpacked.
    #[must_use]
    pub fn present(&self, name: &str, version: &Version) -> bool {
        self.path_for(name, version).is_dir()
    }

    /// Ensure `name`@`version` is present locally, fetching and unpacking it
    /// through `registry` if it is not, and return its directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RegistryError`] if the fetch fails, or
    /// [`Error::SourceUnpackError`] if the downloaded archive is corrupt.
    pub fn ensure(
        &self,
        name: &str,
        version: &Version,
        registry: &dyn Registry,
    ) -> Result<Utf8PathBuf> {
        let dest = self.path_for(name, version);
        if dest.is_dir() {
            return Ok(dest);
        }

        let key = format!("{name}-{version}");
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            locks.entry(key).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
        };
        let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        // Another thread may have finished the fetch while we waited.
        if dest.is_dir() {
            return Ok(dest);
        }

        std::fs::create_dir_all(&self.root).map_err(|source| Error::Io {
            path: self.root.clone().into_std_path_buf(),
            source,
        })?;

        let archive = registry.fetch(name, version)?;
        let tmp = tempfile::Builder::new()
            .prefix(&format!("{name}-{version}-"))
            .tempdir_in(&self.root)
            .map_err(|source| Error::Io {
                path: self.root.clone().into_std_path_buf(),
                source,
            })?;
        unpack_tar_gz(&archive, tmp.path()).map_err(|message| Error::SourceUnpackError {
            name: name.to_owned(),
            version: version.to_string(),
            message,
        })?;

        let tmp_path = Utf8PathBuf::try_from(tmp.into_path()).map_err(|err| Error::SourceUnpackError {
            name: name.to_owned(),
            version: version.to_string(),
            message: format!("unpack directory path is not valid UTF-8: {err}"),
        })?;
        std::fs::rename(&tmp_path, &dest).map_err(|source| Error::Io {
            path: dest.clone().into_std_path_buf(),
            source,
        })?;

        Ok(dest)
    }
}

fn unpack_tar_gz(bytes: &[u8], dest: &std::path::Path) -> std::result::Result<(), String> {
    let decoder = flate2::read::GzDecoder::new(bytes);
    let mut archive = tar::Archive::new(decoder);
    archive
        .unpack(dest)
        .map_err(|err| format!("failed to unpack archive: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Dependency;
    use crate::registry::SearchResult;
    use std::io::Write;
    use tempfile::tempdir;

    struct StubRegistry {
        archive: Vec<u8>,
    }

    impl Registry for StubRegistry {
        fn search(&self, _query: &str, _limit: usize) -> Result<Vec<SearchResult>> {
            Ok(Vec::new())
        }

        fn versions(&self, _name: &str) -> Result<Vec<Version>> {
            Ok(Vec::new())
        }

        fn fetch(&self, _name: &str, _version: &Version) -> Result<Vec<u8>> {
            Ok(self.archive.clone())
        }

        fn dependencies(&self, _name: &str, _version: &Version) -> Result<Vec<(String, Dependency)>> {
            Ok(Vec::new())
        }
    }

    fn build_archive(file_name: &str, contents: &[u8]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_cksum();
        builder
            .append_data(&mut header, file_name, contents)
            .expect("append");
        let tar_bytes = builder.into_inner().expect("finish tar");

        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&tar_bytes).expect("gzip write");
        encoder.finish().expect("gzip finish")
    }

    #[test]
    fn ensure_unpacks_and_is_idempotent() {
        let root = tempdir().expect("tempdir");
        let store = SourceStore::new(Utf8PathBuf::try_from(root.path().to_path_buf()).expect("utf8"));
        let archive = build_archive("hello.txt", b"hi");
        let registry = StubRegistry { archive };
        let version = Version::new(1, 0, 0);

        assert!(!store.present("demo", &version));
        let path = store.ensure("demo", &version, &registry).expect("ensure");
        assert!(path.join("hello.txt").is_file());
        assert!(store.present("demo", &version));

        let again = store.ensure("demo", &version, &registry).expect("ensure again");
        assert_eq!(path, again);
    }
}
