//! S3 object storage backend.
//!
//! Keys map to object keys in a single bucket. Credentials and region come
//! from the standard AWS environment/provider chain.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use tracing::debug;

use super::{BackendError, BackendResult, PutOutcome, StorageBackend};

/// Objects in one S3 bucket.
#[derive(Clone)]
pub struct S3Backend {
    client: Client,
    bucket: String,
}

impl S3Backend {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a client from the ambient AWS configuration.
    pub async fn from_env(bucket: impl Into<String>) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&config), bucket)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// Whether an SDK failure is worth retrying elsewhere: timeouts, connection
/// failures, unreadable responses, and 5xx service errors. Auth failures,
/// missing buckets and other 4xx responses are not.
pub fn is_transient<E>(err: &SdkError<E, HttpResponse>) -> bool {
    match err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            true
        }
        SdkError::ServiceError(context) => context.raw().status().is_server_error(),
        _ => false,
    }
}

fn transport_error<E>(key: &str, err: SdkError<E, HttpResponse>) -> BackendError
where
    E: std::error::Error + Send + Sync + 'static,
{
    BackendError::Transport {
        key: key.to_string(),
        transient: is_transient(&err),
        message: DisplayErrorContext(&err).to_string(),
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    fn describe(&self) -> &'static str {
        "s3"
    }

    async fn get(&self, key: &str) -> BackendResult<Vec<u8>> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                if err.as_service_error().is_some_and(|e| e.is_no_such_key()) {
                    BackendError::NotFound {
                        key: key.to_string(),
                    }
                } else {
                    transport_error(key, err)
                }
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|err| BackendError::Transport {
                key: key.to_string(),
                message: err.to_string(),
                transient: true,
            })?;

        Ok(data.into_bytes().to_vec())
    }

    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> BackendResult<PutOutcome> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes.to_vec()))
            .content_type(content_type)
            .send()
            .await
            .map_err(|err| transport_error(key, err))?;

        debug!("Put s3://{}/{} ({} bytes)", self.bucket, key, bytes.len());
        Ok(PutOutcome::Written)
    }

    async fn list(&self, prefix: &str) -> BackendResult<Vec<String>> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        let mut keys = Vec::new();
        while let Some(page) = pages.next().await {
            let page = match page {
                Ok(page) => page,
                // A bucket that does not exist yet simply has no sessions
                Err(err) if err.as_service_error().is_some_and(|e| e.is_no_such_bucket()) => {
                    return Ok(Vec::new());
                }
                Err(err) => return Err(transport_error(prefix, err)),
            };

            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key())
                    .map(str::to_string),
            );
        }

        Ok(keys)
    }
}
