//! HTTP transport seam.
//!
//! The executor only needs "GET this URL, give me status and body". Keeping
//! that behind [`HttpTransport`] lets tests script responses without a server.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use vitrine_core::constants::ROA_MEDIA_TYPE;
use vitrine_core::{ClientError, ClientResult, PlayerConfig, RequestFailure};

/// Status and raw body of one answered request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issues a single GET. Any answer from the server is `Ok`, whatever its
    /// status; `Err` means the request never completed.
    async fn get(&self, url: &str) -> Result<TransportResponse, RequestFailure>;
}

/// Transport backed by a pooled reqwest client with Basic Authentication.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: Client,
    username: String,
    password: String,
}

impl ReqwestTransport {
    pub fn new(config: &PlayerConfig) -> ClientResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ROA_MEDIA_TYPE));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(ROA_MEDIA_TYPE));

        let client = Client::builder()
            .default_headers(headers)
            .pool_max_idle_per_host(config.connection_pool_limit)
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse, RequestFailure> {
        let response = self
            .client
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(classify)?;
        Ok(TransportResponse { status, body })
    }
}

fn classify(error: reqwest::Error) -> RequestFailure {
    if error.is_timeout() {
        RequestFailure::Timeout
    } else if error.is_connect() {
        RequestFailure::Connect(error.to_string())
    } else {
        RequestFailure::Transport(error.to_string())
    }
}
