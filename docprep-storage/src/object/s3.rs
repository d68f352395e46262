//! S3-compatible object store backend (works against MinIO or AWS S3).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use docprep_core::IngestError;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore as RawObjectStore, PutPayload};
use tokio::sync::RwLock;

use super::{BucketPolicy, ObjectStore};

/// Credentials and endpoint needed to reach the S3-compatible service.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub allow_http: bool,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:9000".to_string(),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            region: "us-east-1".to_string(),
            allow_http: true,
        }
    }
}

/// `ObjectStore` implementation backed by the `object_store` crate's S3
/// client, with one lazily-built client per bucket (buckets are distinct
/// endpoints in the `object_store` builder model, not path prefixes).
pub struct S3Storage {
    config: S3Config,
    policy: BucketPolicy,
    clients: RwLock<std::collections::HashMap<String, Arc<dyn RawObjectStore>>>,
}

impl S3Storage {
    #[must_use]
    pub fn new(config: S3Config, policy: BucketPolicy) -> Self {
        Self {
            config,
            policy,
            clients: RwLock::new(std::collections::HashMap::new()),
        }
    }

    async fn client_for(&self, bucket: &str) -> Result<Arc<dyn RawObjectStore>, IngestError> {
        if let Some(client) = self.clients.read().await.get(bucket) {
            return Ok(client.clone());
        }
        let mut guard = self.clients.write().await;
        if let Some(client) = guard.get(bucket) {
            return Ok(client.clone());
        }
        let built = AmazonS3Builder::new()
            .with_endpoint(&self.config.endpoint)
            .with_bucket_name(bucket)
            .with_access_key_id(&self.config.access_key)
            .with_secret_access_key(&self.config.secret_key)
            .with_region(&self.config.region)
            .with_allow_http(self.config.allow_http)
            .build()
            .map_err(|e| IngestError::StorageUnavailable(e.to_string()))?;
        let client: Arc<dyn RawObjectStore> = Arc::new(built);
        guard.insert(bucket.to_string(), client.clone());
        Ok(client)
    }
}

#[async_trait]
impl ObjectStore for S3Storage {
    async fn upload(
        &self,
        local_path: &Path,
        object_name: &str,
        bucket: Option<&str>,
    ) -> Result<String, IngestError> {
        let bucket = self.policy.upload_bucket(bucket).to_string();
        let client = self.client_for(&bucket).await?;
        let bytes = tokio::fs::read(local_path)
            .await
            .map_err(|e| IngestError::StorageUnavailable(e.to_string()))?;
        client
            .put(&ObjectPath::from(object_name), PutPayload::from(bytes))
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
        let bucket = self.policy.download_bucket(object_name, bucket).to_string();
        let client = self.client_for(&bucket).await?;
        let result = client.get(&ObjectPath::from(object_name)).await.map_err(|e| {
            if matches!(e, object_store::Error::NotFound { .. }) {
                IngestError::NotFound(format!("{bucket}/{object_name}"))
            } else {
                IngestError::StorageUnavailable(e.to_string())
            }
        })?;
        let bytes = result
            .bytes()
            .await
            .map_err(|e| IngestError::StorageUnavailable(e.to_string()))?;
        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| IngestError::StorageUnavailable(e.to_string()))?;
        }
        tokio::fs::write(local_path, &bytes)
            .await
            .map_err(|e| IngestError::StorageUnavailable(e.to_string()))?;
        Ok(local_path.to_path_buf())
    }

    async fn exists(&self, object_name: &str, bucket: Option<&str>) -> Result<bool, IngestError> {
        let bucket = self.policy.exists_bucket(bucket).to_string();
        let client = self.client_for(&bucket).await?;
        match client.head(&ObjectPath::from(object_name)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(IngestError::StorageUnavailable(e.to_string())),
        }
    }
}
