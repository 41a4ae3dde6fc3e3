use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::{ByteStream, DateTimeFormat};
use aws_sdk_s3::types::StorageClass;
use aws_sdk_s3::Client as S3Client;
use std::sync::Arc;
use crate::error::StoreError;

/// An object read from the backing store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub etag: Option<String>,
    /// HTTP date, ex) Wed, 21 Oct 2015 07:28:00 GMT
    pub last_modified: Option<String>,
}

/// A derived object to write back to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedObject {
    pub body: Vec<u8>,
    pub content_type: String,
    pub cache_control: String,
}

/// Get/put by key against a content store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject, StoreError>;

    /// Always writes with the STANDARD storage class
    async fn put(&self, bucket: &str, key: &str, object: DerivedObject) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: ObjectStore + ?Sized> ObjectStore for Arc<T> {
    async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject, StoreError> {
        (**self).get(bucket, key).await
    }

    async fn put(&self, bucket: &str, key: &str, object: DerivedObject) -> Result<(), StoreError> {
        (**self).put(bucket, key, object).await
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject, StoreError> {
        let result = self
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let no_such_key = e.as_service_error().map(|se| se.is_no_such_key()).unwrap_or(false);
                let status_404 = e.raw_response().map(|r| r.status().as_u16() == 404).unwrap_or(false);
                if no_such_key || status_404 {
                    StoreError::NotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    }
                } else {
                    StoreError::Transient(format!("GetObject failed: {}", DisplayErrorContext(&e)))
                }
            })?;

        let etag = result.e_tag().map(|s| s.to_string());
        let last_modified = result
            .last_modified()
            .and_then(|t| t.fmt(DateTimeFormat::HttpDate).ok());

        // Get the body bytes
        let body = result
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Transient(format!("Failed to read S3 body: {}", e)))?
            .into_bytes()
            .to_vec();

        Ok(StoredObject {
            body,
            etag,
            last_modified,
        })
    }

    async fn put(&self, bucket: &str, key: &str, object: DerivedObject) -> Result<(), StoreError> {
        self.put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(object.body))
            .content_type(&object.content_type)
            .cache_control(&object.cache_control)
            .storage_class(StorageClass::Standard)
            .send()
            .await
            .map_err(|e| StoreError::Transient(format!("PutObject failed: {}", DisplayErrorContext(&e))))?;

        Ok(())
    }
}
