//! HTTP transport abstraction for split transfers.
//!
//! The fetcher only needs "open a byte stream for this URL". Keeping that
//! behind a trait lets tests substitute scripted failures (resets, short
//! bodies, error statuses) without a network.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server answered {status} for {url}")]
    Status { status: u16, url: String },

    #[error("connection error: {0}")]
    Connection(String),
}

/// An opened download: declared length plus the body stream.
pub struct TransferResponse {
    pub content_length: Option<u64>,
    pub body: BoxStream<'static, Result<Bytes, TransportError>>,
}

impl std::fmt::Debug for TransferResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferResponse")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a GET for `url`. Non-2xx statuses are errors.
    async fn get(&self, url: &str) -> Result<TransferResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn get(&self, url: &str) -> Result<TransferResponse, TransportError> {
        (**self).get(url).await
    }
}

/// Real transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<TransferResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content_length = response.content_length();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(TransportError::from))
            .boxed();

        Ok(TransferResponse {
            content_length,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reqwest_transport_streams_body() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/base.apk")
            .with_status(200)
            .with_body(vec![7u8; 2048])
            .create_async()
            .await;

        let transport = ReqwestTransport::new(reqwest::Client::new());
        let resp = transport
            .get(&format!("{}/base.apk", server.url()))
            .await
            .unwrap();
        assert_eq!(resp.content_length, Some(2048));

        let chunks: Vec<Bytes> = resp
            .body
            .map(|c| c.unwrap())
            .collect::<Vec<_>>()
            .await;
        let total: usize = chunks.iter().map(Bytes::len).sum();
        assert_eq!(total, 2048);
    }

    #[tokio::test]
    async fn test_reqwest_transport_rejects_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/gone.apk")
            .with_status(404)
            .create_async()
            .await;

        let transport = ReqwestTransport::new(reqwest::Client::new());
        let err = transport
            .get(&format!("{}/gone.apk", server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Status { status: 404, .. }));
    }
}
