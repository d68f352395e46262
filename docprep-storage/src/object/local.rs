//! Filesystem stand-in for the object store, used in tests and local runs.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use docprep_core::IngestError;

use super::{BucketPolicy, ObjectStore};

/// Stores objects under `base_dir/<bucket>/<object_name>`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_dir: PathBuf,
    policy: BucketPolicy,
}

impl LocalStorage {
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>, policy: BucketPolicy) -> Self {
        Self {
            base_dir: base_dir.into(),
            policy,
        }
    }

    fn path_for(&self, bucket: &str, object_name: &str) -> PathBuf {
        self.base_dir.join(bucket).join(object_name)
    }
}

#[async_trait]
impl ObjectStore for LocalStorage {
    async fn upload(
        &self,
        local_path: &Path,
        object_name: &str,
        bucket: Option<&str>,
    ) -> Result<String, IngestError> {
        let bucket = self.policy.upload_bucket(bucket);
        let dest = self.path_for(bucket, object_name);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| IngestError::StorageUnavailable(e.to_string()))?;
        }
        tokio::fs::copy(local_path, &dest)
            .await
            .map_err(|e| IngestError::StorageUnavailable(e.to_string()))?;
        Ok(object_name.to_string())
    }

    async fn download(
        &self,
        object_name: &str,
        local_path: &Path,
        bucket: Option<&str>,
    ) -> Result<PathBuf, IngestError> {
        let bucket = self.policy.download_bucket(object_name, bucket);
        let src = self.path_for(bucket, object_name);
        if !src.exists() {
            return Err(IngestError::NotFound(format!(
                "{bucket}/{object_name}"
            )));
        }
        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| IngestError::StorageUnavailable(e.to_string()))?;
        }
        tokio::fs::copy(&src, local_path)
            .await
            .map_err(|e| IngestError::StorageUnavailable(e.to_string()))?;
        Ok(local_path.to_path_buf())
    }

    async fn exists(&self, object_name: &str, bucket: Option<&str>) -> Result<bool, IngestError> {
        let bucket = self.policy.exists_bucket(bucket);
        Ok(self.path_for(bucket, object_name).exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn storage(dir: &Path) -> LocalStorage {
        LocalStorage::new(dir, BucketPolicy::new("mybucket", "prep"))
    }

    #[tokio::test]
    async fn upload_then_exists_then_download_round_trips() {
        let dir = tempdir().unwrap();
        let store = storage(dir.path());

        let src = dir.path().join("source.txt");
        tokio::fs::write(&src, b"hello world").await.unwrap();

        store.upload(&src, "a/text.txt", None).await.unwrap();
        assert!(store.exists("a/text.txt", None).await.unwrap());

        let dest = dir.path().join("downloaded.txt");
        store.download("a/text.txt", &dest, None).await.unwrap();
        let content = tokio::fs::read_to_string(&dest).await.unwrap();
        assert_eq!(content, "hello world");
    }

    #[tokio::test]
    async fn exists_is_false_not_an_error_when_absent() {
        let dir = tempdir().unwrap();
        let store = storage(dir.path());
        assert!(!store.exists("nope/text.txt", None).await.unwrap());
    }

    #[tokio::test]
    async fn download_of_missing_object_is_not_found() {
        let dir = tempdir().unwrap();
        let store = storage(dir.path());
        let dest = dir.path().join("out.txt");
        let err = store.download("missing.pdf", &dest, None).await.unwrap_err();
        assert!(matches!(err, IngestError::NotFound(_)));
    }

    #[tokio::test]
    async fn upload_defaults_to_preprocessed_bucket() {
        let dir = tempdir().unwrap();
        let store = storage(dir.path());
        let src = dir.path().join("source.txt");
        tokio::fs::write(&src, b"x").await.unwrap();
        store.upload(&src, "a/text.txt", None).await.unwrap();
        assert!(dir.path().join("prep/a/text.txt").exists());
    }
}
