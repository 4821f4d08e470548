//! Byte-fetch seam between the generator and wherever images actually live.
//!
//! The storage backend is a collaborator, not part of the engine: all the
//! engine needs is "give me the bytes for this URL, or an error". Backend
//! failures all collapse into the same error shape, since the caller cannot
//! act differently on the distinction.

use std::fs;
use std::path::{Component, Path, PathBuf};

pub trait ImageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, String>;
}

/// Resolves catalog URLs beneath a local asset directory.
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, url: &str) -> Result<PathBuf, String> {
        let relative = Path::new(url.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
        {
            return Err(format!("image not found: {url}"));
        }
        Ok(self.root.join(relative))
    }
}

impl ImageFetcher for FsFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, String> {
        let path = self.resolve(url)?;
        fs::read(&path).map_err(|err| format!("failed to read {}: {err}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_urls_under_root() {
        let fetcher = FsFetcher::new("/assets");
        let path = fetcher.resolve("backgrounds/sunset_ocean.png").unwrap();
        assert_eq!(path, PathBuf::from("/assets/backgrounds/sunset_ocean.png"));
    }

    #[test]
    fn leading_slash_is_stripped() {
        let fetcher = FsFetcher::new("/assets");
        let path = fetcher.resolve("/poses/standard.png").unwrap();
        assert_eq!(path, PathBuf::from("/assets/poses/standard.png"));
    }

    #[test]
    fn parent_traversal_is_rejected() {
        let fetcher = FsFetcher::new("/assets");
        assert!(fetcher.resolve("../etc/passwd").is_err());
        assert!(fetcher.resolve("backgrounds/../../etc/passwd").is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let fetcher = FsFetcher::new("/nonexistent-asset-root");
        assert!(fetcher.fetch("backgrounds/none.png").is_err());
    }
}
