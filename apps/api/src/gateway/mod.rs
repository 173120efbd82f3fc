//! Model gateway: the single point of entry for all model calls.
//!
//! ARCHITECTURAL RULE: no other module may talk to a model API directly.
//! Callers hand the gateway a prompt pair and a priority-ordered model list;
//! the gateway owns retry, fallback and error classification.
//!
//! The retry plan is an explicit state machine (`Step`) rather than nested
//! loops, so its termination is checkable: each transition either increments
//! the attempt counter (bounded by `MAX_ATTEMPTS_PER_MODEL`) or advances to
//! the next model (bounded by the list length).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

pub mod backends;
pub mod prompts;

/// Attempts per model: one call plus one retry after an overload.
const MAX_ATTEMPTS_PER_MODEL: u32 = 2;
/// Fixed pause before retrying the same model after an overload.
const OVERLOAD_RETRY_DELAY: Duration = Duration::from_secs(2);
/// Output-size bound for every call.
const MAX_TOKENS: u32 = 8192;

/// One model call, provider-agnostic.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub system: &'a str,
    pub user: &'a str,
    pub max_tokens: u32,
}

/// A wire adapter for one model provider. Implementations classify provider
/// responses into `BackendFailure` variants; they never retry internally.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, BackendFailure>;
}

/// Classified failure of a single backend call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendFailure {
    #[error("rate limited")]
    RateLimited,

    #[error("service overloaded")]
    Overloaded,

    #[error("authentication rejected")]
    AuthInvalid,

    #[error("usage quota exhausted")]
    QuotaExhausted,

    #[error("request rejected: {0}")]
    InvalidRequest(String),

    #[error("server error (status {status}): {message}")]
    Server { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("model returned empty content")]
    EmptyContent,
}

impl From<reqwest::Error> for BackendFailure {
    fn from(e: reqwest::Error) -> Self {
        // Timeouts and connection failures are indistinguishable from any
        // other transient fault at this layer: fall back, do not retry.
        BackendFailure::Transport(e.to_string())
    }
}

impl BackendFailure {
    /// Terminal failures abort the whole invoke; no fallback can help.
    fn is_terminal(&self) -> bool {
        matches!(
            self,
            BackendFailure::AuthInvalid
                | BackendFailure::QuotaExhausted
                | BackendFailure::InvalidRequest(_)
        )
    }
}

/// What the gateway's caller sees when no model produced text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    #[error("all models unavailable (attempted: {})", attempted.join(", "))]
    AllModelsOverloaded { attempted: Vec<String> },

    #[error("model authentication rejected; check the configured API key")]
    AuthInvalid,

    #[error("model usage quota exhausted")]
    QuotaExhausted,

    #[error("model rejected the request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    /// True when retrying sibling entities in a batch would only waste
    /// quota. Batch runners halt on these.
    pub fn is_run_stopping(&self) -> bool {
        matches!(self, GatewayError::AuthInvalid | GatewayError::QuotaExhausted)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Retry plan
// ────────────────────────────────────────────────────────────────────────────

/// Position in the retry/fallback plan. `model` indexes the caller's list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Attempt { model: usize, attempt: u32 },
    Exhausted,
}

impl Step {
    fn first() -> Step {
        Step::Attempt { model: 0, attempt: 1 }
    }

    /// Where the plan goes after a non-terminal failure at this step. Only
    /// an overload earns a same-model retry; anything else falls through to
    /// the next model.
    fn next(self, overloaded: bool, model_count: usize) -> Step {
        let Step::Attempt { model, attempt } = self else {
            return Step::Exhausted;
        };
        if overloaded && attempt < MAX_ATTEMPTS_PER_MODEL {
            return Step::Attempt {
                model,
                attempt: attempt + 1,
            };
        }
        if model + 1 < model_count {
            Step::Attempt {
                model: model + 1,
                attempt: 1,
            }
        } else {
            Step::Exhausted
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Gateway
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct ModelGateway {
    backend: Arc<dyn ModelBackend>,
}

impl ModelGateway {
    pub fn new(backend: Arc<dyn ModelBackend>) -> Self {
        Self { backend }
    }

    /// Calls `models` in priority order until one returns text.
    ///
    /// Per model: up to two calls, the second only after an overload and a
    /// fixed 2s pause. Auth, quota and malformed-request failures are
    /// terminal for the whole invoke. Every other failure falls through to
    /// the next model. When the list is exhausted the error carries every
    /// model identifier that was attempted.
    pub async fn invoke(
        &self,
        system: &str,
        user: &str,
        models: &[String],
    ) -> Result<String, GatewayError> {
        let mut attempted: Vec<String> = Vec::new();
        let mut step = Step::first();

        loop {
            let Step::Attempt { model, attempt } = step else {
                return Err(GatewayError::AllModelsOverloaded { attempted });
            };
            let Some(model_id) = models.get(model) else {
                // Empty candidate list.
                return Err(GatewayError::AllModelsOverloaded { attempted });
            };
            if attempt == 1 {
                attempted.push(model_id.clone());
            }

            let request = CompletionRequest {
                model: model_id,
                system,
                user,
                max_tokens: MAX_TOKENS,
            };

            match self.backend.complete(request).await {
                Ok(text) => {
                    debug!(
                        "Model '{}' replied with {} chars (attempt {})",
                        model_id,
                        text.len(),
                        attempt
                    );
                    return Ok(text);
                }
                Err(failure) if failure.is_terminal() => {
                    warn!("Model '{}' failed terminally: {}", model_id, failure);
                    return Err(match failure {
                        BackendFailure::AuthInvalid => GatewayError::AuthInvalid,
                        BackendFailure::QuotaExhausted => GatewayError::QuotaExhausted,
                        BackendFailure::InvalidRequest(msg) => GatewayError::InvalidRequest(msg),
                        _ => unreachable!("is_terminal covers exactly these variants"),
                    });
                }
                Err(failure) => {
                    let overloaded = failure == BackendFailure::Overloaded;
                    warn!(
                        "Model '{}' attempt {}/{} failed: {}",
                        model_id, attempt, MAX_ATTEMPTS_PER_MODEL, failure
                    );
                    let next = step.next(overloaded, models.len());
                    let retrying_same_model =
                        matches!(next, Step::Attempt { model: m, .. } if m == model);
                    if retrying_same_model {
                        tokio::time::sleep(OVERLOAD_RETRY_DELAY).await;
                    }
                    step = next;
                }
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Test support
// ────────────────────────────────────────────────────────────────────────────


#[cfg(test)]
mod tests {
    use super::testing::FakeBackend;
    use super::*;

    fn models(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    // ── step transitions ──

    #[test]
    fn test_overload_earns_one_same_model_retry() {
        let step = Step::first().next(true, 2);
        assert_eq!(step, Step::Attempt { model: 0, attempt: 2 });
    }

    #[test]
    fn test_second_overload_falls_back_to_next_model() {
        let step = Step::Attempt { model: 0, attempt: 2 }.next(true, 2);
        assert_eq!(step, Step::Attempt { model: 1, attempt: 1 });
    }

    #[test]
    fn test_non_overload_failure_skips_the_retry() {
        let step = Step::first().next(false, 2);
        assert_eq!(step, Step::Attempt { model: 1, attempt: 1 });
    }

    #[test]
    fn test_last_model_exhausts_the_plan() {
        assert_eq!(Step::Attempt { model: 1, attempt: 2 }.next(true, 2), Step::Exhausted);
        assert_eq!(Step::Attempt { model: 1, attempt: 1 }.next(false, 2), Step::Exhausted);
    }

    // ── invoke ──

    #[tokio::test]
    async fn test_first_model_success_makes_one_call() {
        let backend = FakeBackend::new([FakeBackend::ok("hello")]);
        let gateway = ModelGateway::new(backend.clone());

        let text = gateway.invoke("sys", "user", &models(&["a"])).await.unwrap();

        assert_eq!(text, "hello");
        assert_eq!(backend.calls(), vec!["a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_overload_falls_back_and_succeeds() {
        // Model "a" overloads twice, "b" answers first try.
        let backend = FakeBackend::new([
            Err(BackendFailure::Overloaded),
            Err(BackendFailure::Overloaded),
            FakeBackend::ok("from b"),
        ]);
        let gateway = ModelGateway::new(backend.clone());

        let text = gateway
            .invoke("sys", "user", &models(&["a", "b"]))
            .await
            .unwrap();

        assert_eq!(text, "from b");
        assert_eq!(backend.calls(), vec!["a", "a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_overload_retries_same_model() {
        let backend = FakeBackend::new([Err(BackendFailure::Overloaded), FakeBackend::ok("ok")]);
        let gateway = ModelGateway::new(backend.clone());

        gateway.invoke("sys", "user", &models(&["a", "b"])).await.unwrap();

        assert_eq!(backend.calls(), vec!["a", "a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_reports_every_attempted_model() {
        let backend = FakeBackend::new([
            Err(BackendFailure::Overloaded),
            Err(BackendFailure::Overloaded),
            Err(BackendFailure::Overloaded),
            Err(BackendFailure::Overloaded),
        ]);
        let gateway = ModelGateway::new(backend.clone());

        let err = gateway
            .invoke("sys", "user", &models(&["a", "b"]))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            GatewayError::AllModelsOverloaded {
                attempted: vec!["a".to_string(), "b".to_string()]
            }
        );
        assert_eq!(backend.call_count(), 4);
    }

    #[tokio::test]
    async fn test_rate_limit_falls_back_without_same_model_retry() {
        let backend = FakeBackend::new([Err(BackendFailure::RateLimited), FakeBackend::ok("ok")]);
        let gateway = ModelGateway::new(backend.clone());

        gateway.invoke("sys", "user", &models(&["a", "b"])).await.unwrap();

        assert_eq!(backend.calls(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_server_error_falls_back_to_next_model() {
        let backend = FakeBackend::new([
            Err(BackendFailure::Server {
                status: 500,
                message: "internal".to_string(),
            }),
            FakeBackend::ok("ok"),
        ]);
        let gateway = ModelGateway::new(backend.clone());

        gateway.invoke("sys", "user", &models(&["a", "b"])).await.unwrap();

        assert_eq!(backend.calls(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_auth_failure_is_terminal() {
        let backend = FakeBackend::new([Err(BackendFailure::AuthInvalid)]);
        let gateway = ModelGateway::new(backend.clone());

        let err = gateway
            .invoke("sys", "user", &models(&["a", "b"]))
            .await
            .unwrap_err();

        assert_eq!(err, GatewayError::AuthInvalid);
        // No fallback to "b".
        assert_eq!(backend.calls(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_quota_exhaustion_is_terminal_and_distinct() {
        let backend = FakeBackend::new([Err(BackendFailure::QuotaExhausted)]);
        let gateway = ModelGateway::new(backend.clone());

        let err = gateway
            .invoke("sys", "user", &models(&["a", "b"]))
            .await
            .unwrap_err();

        assert_eq!(err, GatewayError::QuotaExhausted);
        assert!(err.is_run_stopping());
        assert!(!GatewayError::AllModelsOverloaded { attempted: vec![] }.is_run_stopping());
    }

    #[tokio::test]
    async fn test_invalid_request_is_terminal_with_message() {
        let backend = FakeBackend::new([Err(BackendFailure::InvalidRequest(
            "max_tokens too large".to_string(),
        ))]);
        let gateway = ModelGateway::new(backend.clone());

        let err = gateway.invoke("sys", "user", &models(&["a"])).await.unwrap_err();

        assert_eq!(err, GatewayError::InvalidRequest("max_tokens too large".to_string()));
    }

    #[tokio::test]
    async fn test_empty_model_list_exhausts_immediately() {
        let backend = FakeBackend::new([]);
        let gateway = ModelGateway::new(backend.clone());

        let err = gateway.invoke("sys", "user", &[]).await.unwrap_err();

        assert_eq!(err, GatewayError::AllModelsOverloaded { attempted: vec![] });
        assert_eq!(backend.call_count(), 0);
    }
}
