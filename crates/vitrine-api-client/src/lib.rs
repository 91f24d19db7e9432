//! Asynchronous client for the Madek hypermedia API.
//!
//! Resolves collections and media entries into a typed entity graph, fanning
//! out over relation links with bounded concurrency. Resolved entities are
//! published to a [`Registry`] shared by every clone of the client.
//!
//! ```no_run
//! # async fn run() -> vitrine_core::ClientResult<()> {
//! use vitrine_api_client::{ApiClient, ResolveOptions};
//!
//! let client = ApiClient::new("https://medienarchiv.zhdk.ch", "user", "secret");
//! client.start_session()?;
//! let entries = client
//!     .get_media_entries("/api/media-entries/?order=desc", Some(10), &ResolveOptions::default())
//!     .await?;
//! let requests = client.complete_session();
//! # Ok(()) }
//! ```

pub mod api;
pub mod executor;
pub mod preload;
pub mod program;
pub mod query;
pub mod resource;
pub mod transport;

use serde_json::Value as JsonValue;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use vitrine_core::{ClientError, ClientResult, LogLevel, PlayerConfig, Registry};

pub use api::ResolveOptions;
pub use executor::RequestExecutor;
pub use program::Program;
pub use query::MediaEntryQuery;
pub use resource::{ResourceKind, ResourceRef};
pub use transport::{HttpTransport, ReqwestTransport, TransportResponse};

/// Open connection state: the executor owns the pool, the semaphore and the
/// request counter.
struct Session {
    executor: RequestExecutor,
}

/// Client for the hypermedia API. Clones share configuration, registry and
/// session.
#[derive(Clone)]
pub struct ApiClient {
    config: Arc<PlayerConfig>,
    registry: Arc<Registry>,
    session: Arc<RwLock<Option<Arc<Session>>>>,
}

impl ApiClient {
    pub fn new(
        server_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::from_config(PlayerConfig::new(server_url, username, password))
    }

    pub fn from_config(config: PlayerConfig) -> Self {
        Self::with_registry(config, Arc::new(Registry::new()))
    }

    /// Client publishing into an existing registry.
    pub fn with_registry(config: PlayerConfig, registry: Arc<Registry>) -> Self {
        Self {
            config: Arc::new(config),
            registry,
            session: Arc::new(RwLock::new(None)),
        }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Opens a session over a pooled reqwest transport.
    pub fn start_session(&self) -> ClientResult<()> {
        let transport = ReqwestTransport::new(&self.config)?;
        self.start_session_with(Arc::new(transport));
        Ok(())
    }

    /// Opens a session over `transport`, replacing any open one. The request
    /// counter starts at zero.
    pub fn start_session_with(&self, transport: Arc<dyn HttpTransport>) {
        let executor = RequestExecutor::new(transport, self.config.max_concurrent_requests);
        *self.write_session() = Some(Arc::new(Session { executor }));
        tracing::info!(
            server_url = %self.config.server_url,
            max_concurrent_requests = self.config.max_concurrent_requests,
            "API session started"
        );
    }

    /// Closes the session and returns the number of requests it issued.
    ///
    /// Tasks still running keep their handle to the closed session and finish
    /// normally.
    pub fn complete_session(&self) -> u64 {
        let Some(session) = self.write_session().take() else {
            tracing::debug!("No API session to complete");
            return 0;
        };
        let requests = session.executor.request_count();
        tracing::info!(requests, "API session completed");
        requests
    }

    pub fn session_active(&self) -> bool {
        self.read_session().is_some()
    }

    /// Requests issued by the open session so far.
    pub fn request_count(&self) -> Option<u64> {
        self.read_session()
            .as_ref()
            .map(|s| s.executor.request_count())
    }

    fn session(&self) -> ClientResult<Arc<Session>> {
        self.read_session()
            .clone()
            .ok_or_else(|| ClientError::Session("no active API session".to_string()))
    }

    fn read_session(&self) -> RwLockReadGuard<'_, Option<Arc<Session>>> {
        self.session.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_session(&self) -> RwLockWriteGuard<'_, Option<Arc<Session>>> {
        self.session.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Absolute URL for an API path; full URLs pass through.
    pub fn url(&self, path: &str) -> String {
        if path.contains("://") {
            path.to_string()
        } else {
            format!("{}{}", self.config.server_url, path)
        }
    }

    /// GETs a JSON document with the configured retry policy.
    pub(crate) async fn fetch(&self, path: &str) -> ClientResult<JsonValue> {
        let session = self.session()?;
        session
            .executor
            .execute(&self.url(path), &self.config.retry)
            .await
    }

    /// Like [`fetch`](Self::fetch), with unavailable documents as `None`.
    pub(crate) async fn fetch_optional(&self, path: &str) -> ClientResult<Option<JsonValue>> {
        absent(self.fetch(path).await)
    }

    pub(crate) async fn fetch_bytes(&self, path: &str) -> ClientResult<bytes::Bytes> {
        let session = self.session()?;
        session
            .executor
            .execute_bytes(&self.url(path), &self.config.retry)
            .await
    }
}

/// Turns errors that only mean "not available" into `None`, logging them.
/// Session and configuration errors pass through.
pub(crate) fn absent<T>(result: ClientResult<T>) -> ClientResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_absence() => {
            log_absence(&e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn log_absence(error: &ClientError) {
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_code = error.error_code(), "Resource unavailable")
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_code = error.error_code(), "Resource unavailable")
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_code = error.error_code(), "Resource unavailable")
        }
    }
}
