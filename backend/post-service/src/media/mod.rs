/// Image storage for post and comment attachments
///
/// Clients send raw image bytes inline in gRPC requests; they are stored in S3
/// and referenced from rows by public URL.
use async_trait::async_trait;
use aws_sdk_s3::Client;
use futures::future::try_join_all;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::MediaConfig;
use crate::error::{AppError, Result};

pub const IMAGE_CONTENT_TYPE: &str = "image/jpeg";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store an image and return its public URL.
    async fn upload_image(&self, body: Vec<u8>, content_type: String) -> Result<String>;

    /// Remove a previously uploaded image by its public URL. URLs this store
    /// did not issue are ignored.
    async fn delete_by_url(&self, url: String) -> Result<()>;
}

/// Upload every buffer concurrently, returning URLs in input order.
pub async fn upload_all(store: &dyn MediaStore, buffers: Vec<Vec<u8>>) -> Result<Vec<String>> {
    try_join_all(
        buffers
            .into_iter()
            .map(|body| store.upload_image(body, IMAGE_CONTENT_TYPE.to_string())),
    )
    .await
}

pub async fn delete_all(store: &dyn MediaStore, urls: &[String]) -> Result<()> {
    try_join_all(urls.iter().map(|url| store.delete_by_url(url.clone()))).await?;
    Ok(())
}

#[derive(Clone)]
pub struct S3MediaStore {
    client: Client,
    bucket: String,
    public_base_url: String,
    key_prefix: String,
}

impl S3MediaStore {
    pub fn new(client: Client, config: &MediaConfig) -> Self {
        Self {
            client,
            bucket: config.bucket.clone(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            key_prefix: config.key_prefix.trim_matches('/').to_string(),
        }
    }

    /// Build the S3 client from configuration and the default credential chain.
    pub async fn from_config(config: &MediaConfig) -> Self {
        use aws_sdk_s3::config::Region;

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let aws_config = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
            .force_path_style(config.endpoint.is_some())
            .build();

        Self::new(Client::from_conf(s3_config), config)
    }

    fn new_key(&self) -> String {
        object_key(&self.key_prefix, Uuid::new_v4())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }

    fn key_from_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        key_from_url(&self.public_base_url, url)
    }
}

fn object_key(prefix: &str, id: Uuid) -> String {
    if prefix.is_empty() {
        format!("{}.jpg", id)
    } else {
        format!("{}/{}.jpg", prefix, id)
    }
}

/// Object key of a URL issued under `base_url`, if it is one.
fn key_from_url<'a>(base_url: &str, url: &'a str) -> Option<&'a str> {
    let key = url.strip_prefix(base_url)?.strip_prefix('/')?;
    let key = key.split(['?', '#']).next().unwrap_or(key);
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

#[async_trait]
impl MediaStore for S3MediaStore {
    async fn upload_image(&self, body: Vec<u8>, content_type: String) -> Result<String> {
        use aws_sdk_s3::primitives::ByteStream;

        if body.is_empty() {
            return Err(AppError::Validation("media buffer is empty".into()));
        }

        let key = self.new_key();
        let size = body.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .cache_control("max-age=31536000")
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| AppError::Media(format!("upload of {} failed: {}", key, e)))?;

        debug!(key = %key, size, "Uploaded image");
        Ok(self.public_url(&key))
    }

    async fn delete_by_url(&self, url: String) -> Result<()> {
        let Some(key) = self.key_from_url(&url) else {
            warn!(url = %url, "Skipping delete of media not stored in this bucket");
            return Ok(());
        };

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Media(format!("delete of {} failed: {}", key, e)))?;

        debug!(key = %key, "Deleted image");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    #[test]
    fn test_object_key() {
        let id = Uuid::nil();
        assert_eq!(
            object_key("posts", id),
            "posts/00000000-0000-0000-0000-000000000000.jpg"
        );
        assert_eq!(object_key("", id), "00000000-0000-0000-0000-000000000000.jpg");
    }

    #[test]
    fn test_key_from_url() {
        let base = "https://cdn.nova.dev";
        assert_eq!(
            key_from_url(base, "https://cdn.nova.dev/posts/a.jpg"),
            Some("posts/a.jpg")
        );
        assert_eq!(
            key_from_url(base, "https://cdn.nova.dev/posts/a.jpg?v=2"),
            Some("posts/a.jpg")
        );
        assert_eq!(key_from_url(base, "https://elsewhere.com/posts/a.jpg"), None);
        assert_eq!(key_from_url(base, "https://cdn.nova.dev/"), None);
    }

    #[tokio::test]
    async fn test_upload_all_keeps_order() {
        let mut store = MockMediaStore::new();
        store
            .expect_upload_image()
            .returning(|body, _| Ok(format!("https://cdn/{}", body.len())));

        let urls = upload_all(&store, vec![vec![1], vec![1, 2], vec![1, 2, 3]])
            .await
            .unwrap();
        assert_eq!(urls, vec!["https://cdn/1", "https://cdn/2", "https://cdn/3"]);
    }

    #[tokio::test]
    async fn test_delete_all() {
        let mut store = MockMediaStore::new();
        store
            .expect_delete_by_url()
            .with(eq("https://cdn/a.jpg".to_string()))
            .times(1)
            .returning(|_| Ok(()));
        store
            .expect_delete_by_url()
            .with(eq("https://cdn/b.jpg".to_string()))
            .times(1)
            .returning(|_| Ok(()));

        delete_all(&store, &["https://cdn/a.jpg".into(), "https://cdn/b.jpg".into()])
            .await
            .unwrap();
    }
}
