//! On-disk bundle layout.
//!
//! ```text
//! bundle/
//!   a.json .. l.json      one JSON array of quote records per category
//!   index.jsonl           one index entry per line
//!   package-info.json     package metadata
//! ```
//!
//! All writes are whole-file overwrites. Nothing here keeps the index in
//! sync with the category files; see [`crate::index::rebuild_index`].

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::error::BundleError;
use crate::models::{Category, PackageInfo};

pub const INDEX_FILE: &str = "index.jsonl";
pub const PACKAGE_INFO_FILE: &str = "package-info.json";

/// Handle to a bundle directory. Cheap to clone; holds only the path.
#[derive(Debug, Clone)]
pub struct Bundle {
    root: PathBuf,
}

impl Bundle {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn category_path(&self, category: Category) -> PathBuf {
        self.root.join(category.file_name())
    }

    /// Resolve a file name recorded in the index or metadata.
    ///
    /// Only the final path component is used, so entries written as
    /// `bundle/a.json` resolve the same as `a.json` and nothing outside
    /// the bundle root is reachable.
    pub fn file_path(&self, name: &str) -> Option<PathBuf> {
        Path::new(name)
            .file_name()
            .map(|file_name| self.root.join(file_name))
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    pub fn package_info_path(&self) -> PathBuf {
        self.root.join(PACKAGE_INFO_FILE)
    }

    /// A bundle exists once its package metadata has been written.
    pub fn exists(&self) -> bool {
        self.package_info_path().is_file()
    }

    pub fn ensure_dir(&self) -> Result<(), BundleError> {
        if !self.root.is_dir() {
            tracing::info!("creating bundle directory {}", self.root.display());
            std::fs::create_dir_all(&self.root).map_err(|source| BundleError::CreateDir {
                path: self.root.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Load `package-info.json`. `Ok(None)` when it does not exist.
    pub fn load_package_info(&self) -> Result<Option<PackageInfo>, BundleError> {
        let path = self.package_info_path();
        if !path.is_file() {
            tracing::debug!("package info not found at {}", path.display());
            return Ok(None);
        }
        let content = read_string(&path)?;
        let info = serde_json::from_str(&content)
            .map_err(|source| BundleError::Parse { path, source })?;
        Ok(Some(info))
    }

    pub fn save_package_info(&self, info: &PackageInfo) -> Result<PathBuf, BundleError> {
        self.ensure_dir()?;
        let path = self.package_info_path();
        write_json_pretty(&path, info)?;
        tracing::debug!(
            "saved package info: {} files, {} quotes",
            info.files_amount,
            info.amount
        );
        Ok(path)
    }

    /// Read and parse any JSON file in the bundle. `Ok(None)` when absent.
    pub fn read_json(&self, path: &Path) -> Result<Option<Value>, BundleError> {
        if !path.is_file() {
            return Ok(None);
        }
        let content = read_string(path)?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| BundleError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Hex SHA-256 of a file's bytes.
    pub fn file_digest(&self, path: &Path) -> Result<String, BundleError> {
        let bytes = std::fs::read(path).map_err(|source| BundleError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Remove the whole bundle directory. Returns `false` if it did not exist.
    pub fn delete(&self) -> Result<bool, BundleError> {
        if !self.root.exists() {
            return Ok(false);
        }
        std::fs::remove_dir_all(&self.root).map_err(|source| BundleError::Remove {
            path: self.root.clone(),
            source,
        })?;
        tracing::info!("deleted bundle directory {}", self.root.display());
        Ok(true)
    }
}

/// Pretty-print `value` (2-space indent, non-ASCII kept literal) to `path`.
pub fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), BundleError> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).map_err(|source| BundleError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn read_string(path: &Path) -> Result<String, BundleError> {
    std::fs::read_to_string(path).map_err(|source| BundleError::Read {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn sample_info() -> PackageInfo {
        PackageInfo {
            source: "gh".to_string(),
            source_url: "https://example.invalid".to_string(),
            files_amount: 0,
            files: Vec::new(),
            amount: 0,
            last_update: Utc::now(),
            last_check: Utc::now(),
            source_usage: BTreeMap::new(),
            failed_types: Vec::new(),
        }
    }

    #[test]
    fn package_info_roundtrip_marks_bundle_present() {
        let tmp = TempDir::new().unwrap();
        let bundle = Bundle::new(tmp.path().join("bundle"));
        assert!(!bundle.exists());
        assert!(bundle.load_package_info().unwrap().is_none());

        let info = sample_info();
        bundle.save_package_info(&info).unwrap();
        assert!(bundle.exists());
        assert_eq!(bundle.load_package_info().unwrap(), Some(info));
    }

    #[test]
    fn file_path_strips_directories() {
        let bundle = Bundle::new("/tmp/b");
        assert_eq!(
            bundle.file_path("bundle/a.json").unwrap(),
            PathBuf::from("/tmp/b/a.json")
        );
        assert_eq!(
            bundle.file_path("../../etc/passwd").unwrap(),
            PathBuf::from("/tmp/b/passwd")
        );
        assert!(bundle.file_path("..").is_none());
    }

    #[test]
    fn pretty_json_keeps_non_ascii() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("x.json");
        write_json_pretty(&path, &serde_json::json!([{"hitokoto": "你好"}])).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("你好"));
        assert!(text.contains("\n  {"));
    }

    #[test]
    fn delete_missing_bundle_is_not_an_error() {
        let tmp = TempDir::new().unwrap();
        let bundle = Bundle::new(tmp.path().join("nope"));
        assert!(!bundle.delete().unwrap());
    }

    #[test]
    fn corrupt_package_info_is_a_parse_error() {
        let tmp = TempDir::new().unwrap();
        let bundle = Bundle::new(tmp.path());
        std::fs::write(bundle.package_info_path(), "{not json").unwrap();
        assert!(matches!(
            bundle.load_package_info(),
            Err(BundleError::Parse { .. })
        ));
    }
}
