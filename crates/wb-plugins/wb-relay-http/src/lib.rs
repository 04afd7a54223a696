//! # wb-relay-http
//!
//! Server-side implementation of `FetchRelay`: downloads a third-party image
//! with `reqwest` and re-hosts it in the configured `BlobStore` under
//! `wordImages/{uid}/{millis}_{random}.{ext}`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use tracing::{info, warn};
use wb_core::paths::relay_image_dir;
use wb_core::{BlobStore, FetchRelay, RelayError, RequestContext, UserId};

const FALLBACK_CONTENT_TYPE: &str = "image/jpeg";

pub struct HttpFetchRelay {
    client: Client,
    blobs: Arc<dyn BlobStore>,
    /// Upper bound for a fetched image body.
    max_bytes: usize,
}

impl HttpFetchRelay {
    pub fn new(blobs: Arc<dyn BlobStore>, timeout: Duration, max_bytes: usize) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("wordbook-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build relay HTTP client")?;
        Ok(Self {
            client,
            blobs,
            max_bytes,
        })
    }

    async fn fetch(&self, url: Url) -> Result<(Vec<u8>, String), RelayError> {
        let shown = url.to_string();
        let mut response = self.client.get(url).send().await.map_err(|e| {
            warn!(url = %shown, error = %e, "relay fetch failed");
            RelayError::Upstream(shown.clone())
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %shown, %status, "relay fetch rejected upstream");
            return Err(RelayError::Upstream(shown));
        }
        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes as u64)
        {
            return Err(RelayError::InvalidArgument(format!(
                "image at {shown} exceeds {} bytes",
                self.max_bytes
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<mime::Mime>().ok())
            .map(|m| m.essence_str().to_owned())
            .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_owned());
        if !content_type.starts_with("image/") {
            warn!(url = %shown, %content_type, "relay target is not an image");
            return Err(RelayError::Upstream(shown));
        }

        let mut body = Vec::new();
        loop {
            let chunk = response.chunk().await.map_err(|e| {
                warn!(url = %shown, error = %e, "relay body read failed");
                RelayError::Upstream(shown.clone())
            })?;
            let Some(chunk) = chunk else { break };
            if body.len() + chunk.len() > self.max_bytes {
                warn!(url = %shown, max_bytes = self.max_bytes, "relay body too large; aborted");
                return Err(RelayError::InvalidArgument(format!(
                    "image at {shown} exceeds {} bytes",
                    self.max_bytes
                )));
            }
            body.extend_from_slice(&chunk);
        }
        Ok((body, content_type))
    }
}

#[async_trait]
impl FetchRelay for HttpFetchRelay {
    async fn upload_from_url(
        &self,
        ctx: &RequestContext,
        image_url: &str,
    ) -> Result<String, RelayError> {
        let user = ctx.user().ok_or(RelayError::Unauthenticated)?;
        let url = parse_image_url(image_url)?;

        let (data, content_type) = self.fetch(url).await?;
        let key = relay_key(user, &content_type, Utc::now());
        let size = data.len();

        self.blobs
            .put(&key, data.into(), &content_type)
            .await
            .map_err(|e| RelayError::Internal(e.to_string()))?;
        let download_url = self
            .blobs
            .download_url(&key)
            .await
            .map_err(|e| RelayError::Internal(e.to_string()))?;

        info!(user = %user, %key, size, "remote image re-hosted");
        Ok(download_url)
    }
}

fn parse_image_url(image_url: &str) -> Result<Url, RelayError> {
    let image_url = image_url.trim();
    if image_url.is_empty() {
        return Err(RelayError::InvalidArgument(
            "an 'imageUrl' argument is required".into(),
        ));
    }
    let url = Url::parse(image_url)
        .map_err(|e| RelayError::InvalidArgument(format!("invalid imageUrl {image_url}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(RelayError::InvalidArgument(format!(
            "unsupported imageUrl scheme {other}"
        ))),
    }
}

/// `wordImages/{uid}/{millis}_{random}.{ext}`; the random part keeps two
/// fetches in the same millisecond apart.
fn relay_key(user: &UserId, content_type: &str, now: DateTime<Utc>) -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}/{}_{}.{}",
        relay_image_dir(user),
        now.timestamp_millis(),
        &random[..8],
        extension_for(content_type)
    )
}

fn extension_for(content_type: &str) -> &'static str {
    let extensions = mime_guess::get_mime_extensions_str(content_type).unwrap_or(&[]);
    if extensions.contains(&"jpg") {
        return "jpg";
    }
    extensions.first().copied().unwrap_or("jpg")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use wb_store_memory::MemoryBlobStore;

    const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

    fn relay() -> HttpFetchRelay {
        capped_relay(1024 * 1024)
    }

    fn capped_relay(max_bytes: usize) -> HttpFetchRelay {
        HttpFetchRelay::new(
            Arc::new(MemoryBlobStore::new()),
            Duration::from_secs(2),
            max_bytes,
        )
        .unwrap()
    }

    /// Answers a single request with the raw `response` and returns its URL.
    async fn upstream(response: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;
                let _ = socket.write_all(&response).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{addr}/cat")
    }

    fn reply(status: &str, content_type: &str, body: &[u8]) -> Vec<u8> {
        let mut raw = format!(
            "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        )
        .into_bytes();
        raw.extend_from_slice(body);
        raw
    }

    fn ctx() -> RequestContext {
        RequestContext::authenticated(UserId::from("u1"))
    }

    #[test]
    fn keys_live_under_the_user_image_dir() {
        let now = DateTime::parse_from_rfc3339("2024-05-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let key = relay_key(&UserId::from("u1"), "image/jpeg", now);

        assert!(key.starts_with("wordImages/u1/1714521600000_"), "{key}");
        assert!(key.ends_with(".jpg"));
        assert_ne!(key, relay_key(&UserId::from("u1"), "image/jpeg", now));
        assert!(relay_key(&UserId::from("u1"), "image/png", now).ends_with(".png"));
    }

    #[tokio::test]
    async fn rejects_anonymous_and_bad_arguments() {
        let relay = relay();
        assert_eq!(
            relay
                .upload_from_url(&RequestContext::anonymous(), "https://example.com/a.jpg")
                .await,
            Err(RelayError::Unauthenticated)
        );
        for bad in ["", "   ", "not a url", "ftp://example.com/a.jpg"] {
            assert!(matches!(
                relay.upload_from_url(&ctx(), bad).await,
                Err(RelayError::InvalidArgument(_))
            ));
        }
    }

    #[tokio::test]
    async fn unreachable_hosts_are_upstream_failures() {
        let err = relay()
            .upload_from_url(&ctx(), "http://127.0.0.1:9/cat.jpg")
            .await
            .unwrap_err();
        assert_eq!(err, RelayError::Upstream("http://127.0.0.1:9/cat.jpg".into()));
    }

    #[tokio::test]
    async fn images_are_rehosted_with_their_content_type() {
        let url = upstream(reply("200 OK", "image/png", PNG_SIGNATURE)).await;
        let download_url = relay().upload_from_url(&ctx(), &url).await.unwrap();

        assert!(download_url.starts_with("memory://blobs/wordImages/u1/"), "{download_url}");
        assert!(download_url.ends_with(".png"));
    }

    #[tokio::test]
    async fn error_statuses_are_upstream_failures() {
        let url = upstream(reply("404 Not Found", "text/plain", b"")).await;
        let err = relay().upload_from_url(&ctx(), &url).await.unwrap_err();
        assert_eq!(err, RelayError::Upstream(url));
    }

    #[tokio::test]
    async fn non_image_bodies_are_upstream_failures() {
        let url = upstream(reply("200 OK", "text/html; charset=utf-8", b"<html></html>")).await;
        let err = relay().upload_from_url(&ctx(), &url).await.unwrap_err();
        assert_eq!(err, RelayError::Upstream(url));
    }

    #[tokio::test]
    async fn chunked_bodies_stop_at_the_size_cap() {
        let mut raw = b"HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n".to_vec();
        for _ in 0..8 {
            raw.extend_from_slice(b"200\r\n");
            raw.extend_from_slice(&[0u8; 0x200]);
            raw.extend_from_slice(b"\r\n");
        }
        raw.extend_from_slice(b"0\r\n\r\n");

        let url = upstream(raw).await;
        let err = capped_relay(1024).upload_from_url(&ctx(), &url).await.unwrap_err();
        assert!(matches!(err, RelayError::InvalidArgument(msg) if msg.contains("1024")));
    }
}
