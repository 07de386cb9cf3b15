//! Retrying client for the backend proxy endpoint.
//!
//! Every logical call serializes its payload once, then runs attempts until
//! one succeeds or [`backoff::next_action`] decides to give up.

pub mod backoff;
pub mod error;

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::http::{Exchange, HttpClient};
use crate::trace::{AttemptOutcome, TraceEvent};
use backoff::{AttemptState, Jitter, NextAction, RandomJitter, RetryPolicy, next_action};
pub use error::{AttemptError, OrchestratorError};

#[derive(Clone)]
pub struct Orchestrator {
    http: HttpClient,
    endpoint: String,
    policy: RetryPolicy,
    jitter: Arc<dyn Jitter>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("endpoint", &self.endpoint)
            .field("policy", &self.policy)
            .finish()
    }
}

impl Orchestrator {
    pub fn new(
        http: HttpClient,
        endpoint: impl Into<String>,
        policy: RetryPolicy,
    ) -> Result<Self, OrchestratorError> {
        let endpoint = endpoint.into().trim().to_string();
        if endpoint.is_empty() {
            return Err(OrchestratorError::EmptyEndpoint);
        }
        if policy.max_attempts == 0 {
            return Err(OrchestratorError::ZeroAttempts);
        }

        Ok(Self {
            http,
            endpoint,
            policy,
            jitter: Arc::new(RandomJitter),
        })
    }

    pub fn with_jitter(mut self, jitter: impl Jitter + 'static) -> Self {
        self.jitter = Arc::new(jitter);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Posts `payload` to the endpoint and returns the response body as opaque
    /// JSON. Makes at most `policy.max_attempts` network calls.
    pub async fn send<T: Serialize + ?Sized>(&self, payload: &T) -> Result<Value, OrchestratorError> {
        let body = serde_json::to_string(payload)
            .map_err(|err| OrchestratorError::InvalidPayload(err.to_string()))?;

        let mut attempt_index = 0;
        loop {
            let err = match self.attempt(attempt_index, &body).await {
                Ok(value) => {
                    if attempt_index > 0 {
                        debug!(attempts = attempt_index + 1, "backend request recovered");
                    }
                    self.record_attempt(attempt_index, AttemptOutcome::Succeeded);
                    return Ok(value);
                }
                Err(err) => err,
            };

            warn!(
                endpoint = %self.endpoint,
                attempt = attempt_index + 1,
                max_attempts = self.policy.max_attempts,
                error = %err,
                "backend request attempt failed"
            );

            let cause = err.to_string();
            let jitter = self.jitter.sample(self.policy.max_jitter);
            match next_action(&self.policy, AttemptState::failed(attempt_index, err), jitter) {
                NextAction::Retry { delay } => {
                    let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                    debug!(delay_ms, "backing off before retry");
                    self.record_attempt(
                        attempt_index,
                        AttemptOutcome::Retrying {
                            cause: &cause,
                            delay,
                        },
                    );
                    tokio::time::sleep(delay).await;
                    attempt_index += 1;
                }
                NextAction::Fail { error } => {
                    self.record_attempt(attempt_index, AttemptOutcome::GaveUp { cause: &cause });
                    return Err(error);
                }
            }
        }
    }

    async fn attempt(&self, attempt_index: u32, body: &str) -> Result<Value, AttemptError> {
        let exchange = Exchange::Backend {
            attempt: attempt_index + 1,
            max_attempts: self.policy.max_attempts,
        };
        let response = self
            .http
            .post_json(exchange, &self.endpoint, &[], body)
            .await
            .map_err(|err| AttemptError::Transport(transport_message(&err)))?;

        if !response.is_success() {
            return Err(AttemptError::bad_status(response.status, &response.body));
        }

        serde_json::from_str(&response.body).map_err(|err| AttemptError::Parse(err.to_string()))
    }

    fn record_attempt(&self, attempt_index: u32, outcome: AttemptOutcome<'_>) {
        if let Some(trace) = self.http.trace() {
            trace.record(TraceEvent::Attempt {
                attempt: attempt_index + 1,
                max_attempts: self.policy.max_attempts,
                outcome,
            });
        }
    }
}

/// Orchestrator with millisecond backoff and no jitter, for tests that
/// exercise retries against a mock server.
#[cfg(test)]
pub(crate) fn fast_orchestrator(endpoint: String, max_attempts: u32) -> Orchestrator {
    use crate::http::HttpDebugConfig;

    Orchestrator::new(
        HttpClient::new(reqwest::Client::new(), HttpDebugConfig::disabled()),
        endpoint,
        RetryPolicy {
            max_attempts,
            base_delay: std::time::Duration::from_millis(1),
            max_jitter: std::time::Duration::ZERO,
        },
    )
    .map(|orchestrator| orchestrator.with_jitter(backoff::NoJitter))
    .expect("test orchestrator")
}

fn transport_message(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    }
}
