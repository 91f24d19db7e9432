//! Request execution with retry, backoff, timeout and a global in-flight bound.

use bytes::Bytes;
use serde_json::Value as JsonValue;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use vitrine_core::{ClientError, ClientResult, RequestFailure, RetryPolicy};

use crate::transport::{HttpTransport, TransportResponse};

/// Longest error detail kept from a rejected response body.
const MAX_DETAIL_LEN: usize = 200;

pub struct RequestExecutor {
    transport: Arc<dyn HttpTransport>,
    semaphore: Semaphore,
    requests: AtomicU64,
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn HttpTransport>, max_concurrent_requests: usize) -> Self {
        Self {
            transport,
            semaphore: Semaphore::new(max_concurrent_requests),
            requests: AtomicU64::new(0),
        }
    }

    /// Attempts issued since the executor was created.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// GETs `url` and decodes the body as JSON.
    ///
    /// A 200 with an undecodable body is retried like a transient fault. A
    /// status outside the retryable set fails at once with
    /// [`ClientError::Domain`].
    pub async fn execute(&self, url: &str, policy: &RetryPolicy) -> ClientResult<JsonValue> {
        self.run(url, policy, |body| {
            serde_json::from_slice(body).map_err(|e| RequestFailure::Processing(e.to_string()))
        })
        .await
    }

    /// GETs `url` and returns the raw body, e.g. a data stream.
    pub async fn execute_bytes(&self, url: &str, policy: &RetryPolicy) -> ClientResult<Bytes> {
        self.run(url, policy, |body| Ok(body.clone())).await
    }

    async fn run<T, F>(&self, url: &str, policy: &RetryPolicy, decode: F) -> ClientResult<T>
    where
        F: Fn(&Bytes) -> Result<T, RequestFailure>,
    {
        let mut interval = policy.interval;
        let mut attempts: u64 = 0;

        loop {
            if attempts > 0 {
                tokio::time::sleep(interval).await;
                interval = policy.next_interval(interval);
            }
            attempts += 1;

            let failure = match self.attempt(url, policy.timeout).await {
                Ok(response) if response.status == 200 => match decode(&response.body) {
                    Ok(value) => return Ok(value),
                    Err(failure) => failure,
                },
                Ok(response) if policy.is_retryable_status(response.status) => {
                    RequestFailure::Status(response.status)
                }
                Ok(response) => return Err(domain_error(url, &response)),
                Err(failure) => failure,
            };

            if policy.retries.exhausted(attempts) {
                tracing::error!(
                    url = %url,
                    attempts,
                    error = %failure,
                    "Request failed, giving up"
                );
                return Err(ClientError::request(url, failure));
            }

            tracing::warn!(
                url = %url,
                attempt = attempts,
                remaining = ?policy.retries.max_attempts().map(|max| max - attempts),
                backoff_ms = interval.as_millis() as u64,
                error = %failure,
                "Request failed, retrying"
            );
        }
    }

    async fn attempt(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<TransportResponse, RequestFailure> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| RequestFailure::Transport("request semaphore closed".to_string()))?;
        self.requests.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(url = %url, "GET");

        match tokio::time::timeout(timeout, self.transport.get(url)).await {
            Ok(result) => result,
            Err(_) => Err(RequestFailure::Timeout),
        }
    }
}

/// Builds the terminal error for a non-retryable status, keeping the first
/// error detail the server sent.
fn domain_error(url: &str, response: &TransportResponse) -> ClientError {
    let detail = serde_json::from_slice::<JsonValue>(&response.body)
        .ok()
        .and_then(|body| {
            body.pointer("/errors/0/detail")
                .or_else(|| body.get("message"))
                .and_then(JsonValue::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| String::from_utf8_lossy(&response.body).into_owned());

    tracing::debug!(url = %url, status = response.status, detail = %detail, "Request rejected");
    ClientError::Domain {
        status: response.status,
        detail: detail.chars().take(MAX_DETAIL_LEN).collect(),
        url: url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tokio::time::Instant;
    use vitrine_core::Retries;

    enum Step {
        Respond(u16, &'static str),
        Fail(RequestFailure),
        Hang,
    }

    struct ScriptedTransport {
        steps: Mutex<VecDeque<Step>>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(steps: Vec<Step>) -> Arc<Self> {
            Arc::new(Self {
                steps: Mutex::new(steps.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn get(&self, _url: &str) -> Result<TransportResponse, RequestFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let step = self.steps.lock().unwrap().pop_front();
            match step {
                Some(Step::Respond(status, body)) => Ok(TransportResponse::new(status, body)),
                Some(Step::Fail(failure)) => Err(failure),
                Some(Step::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(RequestFailure::Transport("hung".into()))
                }
                None => Ok(TransportResponse::new(503, "")),
            }
        }
    }

    fn executor(transport: Arc<ScriptedTransport>) -> RequestExecutor {
        RequestExecutor::new(transport, 1000)
    }

    #[tokio::test(start_paused = true)]
    async fn retries_unavailable_then_succeeds_with_backoff() {
        let transport = ScriptedTransport::new(vec![
            Step::Respond(503, ""),
            Step::Respond(503, ""),
            Step::Respond(200, r#"{"id":"e1"}"#),
        ]);
        let executor = executor(transport.clone());

        let started = Instant::now();
        let json = executor
            .execute("http://madek.test/api/media-entries/e1", &RetryPolicy::default())
            .await
            .unwrap();

        assert_eq!(json["id"], "e1");
        assert_eq!(transport.calls(), 3);
        assert_eq!(executor.request_count(), 3);
        // 0.9s before the second attempt, 1.35s before the third
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(2250), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(2300), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_retry_budget() {
        let transport = ScriptedTransport::new(vec![]);
        let executor = executor(transport.clone());
        let policy = RetryPolicy::default().with_retries(Retries::Times(2));

        let err = executor.execute("http://madek.test/api/", &policy).await.unwrap_err();

        assert_eq!(transport.calls(), 3);
        match err {
            ClientError::Request { code, cause, .. } => {
                assert_eq!(code, Some(503));
                assert_eq!(cause, RequestFailure::Status(503));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_backoff_keeps_retrying() {
        let transport = ScriptedTransport::new(vec![]);
        let executor = executor(transport.clone());
        let policy = RetryPolicy {
            backoff: f64::INFINITY,
            ..RetryPolicy::default().with_retries(Retries::Times(3))
        };

        let err = executor.execute("http://madek.test/api/", &policy).await.unwrap_err();

        assert_eq!(transport.calls(), 4);
        assert!(matches!(err, ClientError::Request { code: Some(503), .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn long_indefinite_retry_run_does_not_overflow() {
        let mut steps: Vec<Step> = (0..150).map(|_| Step::Respond(503, "")).collect();
        steps.push(Step::Respond(200, "{}"));
        let transport = ScriptedTransport::new(steps);
        let executor = executor(transport.clone());
        let policy = RetryPolicy::default().with_retries(Retries::Indefinitely);

        executor.execute("http://madek.test/api/", &policy).await.unwrap();

        assert_eq!(transport.calls(), 151);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retries_means_single_attempt() {
        let transport =
            ScriptedTransport::new(vec![Step::Fail(RequestFailure::Connect("refused".into()))]);
        let executor = executor(transport.clone());
        let policy = RetryPolicy::default().with_retries(Retries::Times(0));

        let started = Instant::now();
        let err = executor.execute("http://madek.test/api/", &policy).await.unwrap_err();

        assert_eq!(transport.calls(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert!(matches!(
            err,
            ClientError::Request {
                code: None,
                cause: RequestFailure::Connect(_),
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn indefinite_retries_outlast_any_budget() {
        let mut steps: Vec<Step> = (0..11)
            .map(|_| Step::Fail(RequestFailure::Transport("reset".into())))
            .collect();
        steps.push(Step::Respond(200, "[]"));
        let transport = ScriptedTransport::new(steps);
        let executor = executor(transport.clone());
        let policy = RetryPolicy::default().with_retries(Retries::Indefinitely);

        let json = executor.execute("http://madek.test/api/", &policy).await.unwrap();

        assert_eq!(json, serde_json::json!([]));
        assert_eq!(transport.calls(), 12);
    }

    #[tokio::test(start_paused = true)]
    async fn undecodable_body_is_retried() {
        let transport = ScriptedTransport::new(vec![
            Step::Respond(200, "<html>maintenance</html>"),
            Step::Respond(200, r#"{"ok":true}"#),
        ]);
        let executor = executor(transport.clone());

        let json = executor
            .execute("http://madek.test/api/", &RetryPolicy::default())
            .await
            .unwrap();

        assert_eq!(json["ok"], true);
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn undecodable_body_reports_processing_error() {
        let transport = ScriptedTransport::new(vec![Step::Respond(200, "not json")]);
        let executor = executor(transport);
        let policy = RetryPolicy::default().with_retries(Retries::Times(0));

        let err = executor.execute("http://madek.test/api/", &policy).await.unwrap_err();

        assert!(matches!(
            err,
            ClientError::Request {
                code: Some(200),
                cause: RequestFailure::Processing(_),
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn domain_error_is_not_retried() {
        let transport = ScriptedTransport::new(vec![Step::Respond(
            404,
            r#"{"errors":[{"detail":"No such media entry"}]}"#,
        )]);
        let executor = executor(transport.clone());

        let err = executor
            .execute("http://madek.test/api/media-entries/x", &RetryPolicy::default())
            .await
            .unwrap_err();

        assert_eq!(transport.calls(), 1);
        match err {
            ClientError::Domain { status, detail, url } => {
                assert_eq!(status, 404);
                assert_eq!(detail, "No such media entry");
                assert_eq!(url, "http://madek.test/api/media-entries/x");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn plain_text_rejection_keeps_body_as_detail() {
        let transport = ScriptedTransport::new(vec![Step::Respond(401, "Unauthorized")]);
        let executor = executor(transport);

        let err = executor
            .execute("http://madek.test/api/", &RetryPolicy::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::Domain { status: 401, ref detail, .. } if detail == "Unauthorized"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_attempt_times_out_and_is_retried() {
        let transport =
            ScriptedTransport::new(vec![Step::Hang, Step::Respond(200, r#"{"id":"p1"}"#)]);
        let executor = executor(transport.clone());
        let policy = RetryPolicy {
            timeout: Duration::from_secs(2),
            ..RetryPolicy::default()
        };

        let started = Instant::now();
        let json = executor.execute("http://madek.test/api/", &policy).await.unwrap();

        assert_eq!(json["id"], "p1");
        assert_eq!(transport.calls(), 2);
        assert!(started.elapsed() >= Duration::from_millis(2900));
    }

    #[tokio::test(start_paused = true)]
    async fn bytes_are_returned_untouched() {
        let transport = ScriptedTransport::new(vec![Step::Respond(200, "\u{1}binary")]);
        let executor = executor(transport);

        let body = executor
            .execute_bytes("http://madek.test/api/previews/p1/data-stream", &RetryPolicy::default())
            .await
            .unwrap();
        assert_eq!(&body[..], "\u{1}binary".as_bytes());
    }

    struct SlowTransport {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl HttpTransport for SlowTransport {
        async fn get(&self, _url: &str) -> Result<TransportResponse, RequestFailure> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(TransportResponse::new(200, "{}"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn semaphore_bounds_in_flight_requests() {
        let transport = Arc::new(SlowTransport {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let executor = RequestExecutor::new(transport.clone(), 2);
        let policy = RetryPolicy::default();

        let requests = (0..6).map(|i| {
            let url = format!("http://madek.test/api/keywords/k{i}");
            let executor = &executor;
            let policy = &policy;
            async move { executor.execute(&url, policy).await }
        });
        let results = futures::future::join_all(requests).await;

        assert!(results.iter().all(Result::is_ok));
        assert_eq!(transport.peak.load(Ordering::SeqCst), 2);
        assert_eq!(executor.request_count(), 6);
    }
}
