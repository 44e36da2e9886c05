use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3 as s3;
use aws_sdk_s3::primitives::ByteStream;
use aws_smithy_types::error::display::DisplayErrorContext;
use log::info;

use crate::error::{CollectorError, Result};
use crate::storage::ObjectStore;

/// S3-backed object store for raw collection blobs.
pub struct S3ObjectStore {
    client: s3::Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(sdk_config: &SdkConfig, bucket: impl Into<String>) -> Result<Self> {
        let bucket = bucket.into();
        if bucket.is_empty() {
            return Err(CollectorError::Config("S3 bucket not configured".to_string()).into());
        }
        Ok(Self {
            client: s3::Client::new(sdk_config),
            bucket,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|err| {
                CollectorError::Storage(format!("{}", DisplayErrorContext(err)))
            })?;

        info!("Stored object at s3://{}/{}", self.bucket, key);
        Ok(())
    }
}
