//! Object storage upload
//!
//! Uploads never touch the local file: on failure it stays where the
//! persistence step left it.

use crate::config::StorageConfig;
use crate::{EtlError, Result};
use chrono::NaiveDate;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Destination for finished weather files
pub trait ObjectStorage {
    /// Transfer the whole file at `local_path` to `key` inside `bucket`
    async fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> Result<()>;
}

/// `<prefix>/<YYYY-MM-DD>/<file_name>`; an empty prefix drops the first segment
#[must_use]
pub fn remote_key(prefix: &str, execution_date: NaiveDate, file_name: &str) -> String {
    let date = execution_date.format("%Y-%m-%d");
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{date}/{file_name}")
    } else {
        format!("{prefix}/{date}/{file_name}")
    }
}

/// S3 (or S3-compatible) storage configured from [`StorageConfig`].
///
/// The client is built per upload so that a missing bucket or bad endpoint
/// surfaces as an upload failure of that run rather than at start-up.
pub struct S3Storage {
    config: StorageConfig,
}

impl S3Storage {
    #[must_use]
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    fn build_store(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .with_region(&self.config.region);

        if let Some(endpoint) = &self.config.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }
        if let (Some(key_id), Some(secret)) = (
            &self.config.access_key_id,
            &self.config.secret_access_key,
        ) {
            builder = builder
                .with_access_key_id(key_id)
                .with_secret_access_key(secret);
        }

        let store = builder
            .build()
            .map_err(|e| EtlError::upload(format!("Cannot configure S3 client: {e}")))?;
        Ok(Arc::new(store))
    }
}

impl ObjectStorage for S3Storage {
    #[instrument(skip(self, local_path), fields(file = %local_path.display()))]
    async fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> Result<()> {
        let store = self.build_store(bucket)?;
        put_file(store.as_ref(), local_path, key).await?;
        info!("Uploaded {} to s3://{}/{}", local_path.display(), bucket, key);
        Ok(())
    }
}

/// Storage bound to a single bucket over any [`ObjectStore`] implementation
pub struct BucketStore {
    bucket: String,
    store: Arc<dyn ObjectStore>,
}

impl BucketStore {
    pub fn new(bucket: impl Into<String>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            bucket: bucket.into(),
            store,
        }
    }

    /// Bucket kept in memory, mainly for tests and dry runs
    pub fn in_memory(bucket: impl Into<String>) -> Self {
        Self::new(bucket, Arc::new(object_store::memory::InMemory::new()))
    }

    #[must_use]
    pub fn store(&self) -> Arc<dyn ObjectStore> {
        Arc::clone(&self.store)
    }
}

impl ObjectStorage for BucketStore {
    async fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> Result<()> {
        if bucket != self.bucket {
            return Err(EtlError::upload(format!(
                "Bucket '{bucket}' does not exist (store serves '{}')",
                self.bucket
            )));
        }
        put_file(self.store.as_ref(), local_path, key).await
    }
}

async fn put_file(store: &dyn ObjectStore, local_path: &Path, key: &str) -> Result<()> {
    let location = ObjectPath::parse(key)
        .map_err(|e| EtlError::upload(format!("Invalid object key '{key}': {e}")))?;

    let bytes = tokio::fs::read(local_path).await.map_err(|e| {
        EtlError::upload(format!("Cannot read {}: {e}", local_path.display()))
    })?;
    debug!("Uploading {} bytes to {}", bytes.len(), location);

    store
        .put(&location, PutPayload::from(bytes))
        .await
        .map_err(|e| EtlError::upload(format!("Transfer of {key} failed: {e}")))?;
    Ok(())
}
