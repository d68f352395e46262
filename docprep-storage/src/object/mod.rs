//! The object-store capability set: `upload`, `download`, `exists`.

pub mod local;
pub mod policy;
pub mod s3;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use docprep_core::IngestError;

pub use policy::BucketPolicy;

/// Object-store capability the pipeline depends on. Implementations include
/// an S3-compatible backend ([`s3::S3Storage`]) and a filesystem stand-in
/// ([`local::LocalStorage`]); both apply the same [`BucketPolicy`] defaulting.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Uploads `local_path` as `object_name`. Defaults to the preprocessed
    /// bucket when `bucket` is `None`.
    async fn upload(
        &self,
        local_path: &Path,
        object_name: &str,
        bucket: Option<&str>,
    ) -> Result<String, IngestError>;

    /// Downloads `object_name` to `local_path`, returning the local path.
    /// Defaults per [`BucketPolicy::download_bucket`] when `bucket` is
    /// `None`.
    async fn download(
        &self,
        object_name: &str,
        local_path: &Path,
        bucket: Option<&str>,
    ) -> Result<PathBuf, IngestError>;

    /// Reports whether `object_name` exists. A missing object is `Ok(false)`,
    /// never an error. Defaults to the preprocessed bucket when `bucket` is
    /// `None`.
    async fn exists(&self, object_name: &str, bucket: Option<&str>) -> Result<bool, IngestError>;
}
