//! Submits generation requests and drives their operations to completion.
//!
//! A request is submitted, its operation refreshed every poll interval until
//! the provider marks it done, and the outcome classified. Throttled
//! operations are abandoned and the same request is resubmitted after an
//! exponential backoff with jitter. Every other failure ends the call.

use crate::error::{Result, VeoChainError};
use crate::video::clock::{Sleeper, TokioSleeper};
use crate::video::operation::{Classified, Operation, OperationStatus};
use crate::video::provider::OperationBackend;
use crate::video::retry::{random_jitter_fraction, RetryPolicy};
use crate::video::types::{ArtifactReference, GenerationRequest};

/// Drives generation requests through a backend with throttling retries.
pub struct Poller<B, S = TokioSleeper> {
    backend: B,
    sleeper: S,
    policy: RetryPolicy,
    jitter: fn() -> f64,
}

impl<B: OperationBackend> Poller<B> {
    /// Creates a poller with the default policy and tokio timers.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            sleeper: TokioSleeper,
            policy: RetryPolicy::default(),
            jitter: random_jitter_fraction,
        }
    }
}

impl<B: OperationBackend, S: Sleeper> Poller<B, S> {
    /// Replaces the sleeper used for poll and backoff waits.
    pub fn with_sleeper<T: Sleeper>(self, sleeper: T) -> Poller<B, T> {
        Poller {
            backend: self.backend,
            sleeper,
            policy: self.policy,
            jitter: self.jitter,
        }
    }

    /// Replaces the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the jitter source. It must return values in `[0, 1)`.
    pub fn with_jitter(mut self, jitter: fn() -> f64) -> Self {
        self.jitter = jitter;
        self
    }

    /// The active retry policy.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The backend requests are sent to.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Advances `operation` by one refresh. Completed operations are returned as-is.
    pub async fn poll(&self, operation: &Operation) -> Result<Operation> {
        if operation.is_done() {
            return Ok(operation.clone());
        }
        self.backend.refresh(operation).await
    }

    /// Submits `request` and waits for the first produced video.
    ///
    /// Throttled operations (code 8) are resubmitted up to the policy's
    /// attempt limit. Submission and refresh errors, other operation errors
    /// and empty completions end the call immediately.
    pub async fn submit_and_await(&self, request: &GenerationRequest) -> Result<ArtifactReference> {
        let kind = if request.is_extension() {
            "extension"
        } else {
            "generation"
        };
        tracing::info!(model = %request.model, prompt = %request.prompt, "starting video {kind}");

        let mut retry = self.policy.start();
        while retry.has_remaining() {
            tracing::info!(
                attempt = retry.attempt() + 1,
                max_attempts = retry.max_attempts(),
                "submitting video {kind} request"
            );

            let operation = self.backend.submit(request).await.inspect_err(|e| {
                tracing::error!(error = %e, "video {kind} submission failed");
            })?;
            tracing::info!(operation = %operation.name(), "operation started");

            let operation = self.await_completion(operation).await?;

            match operation.status() {
                OperationStatus::Succeeded(artifacts) => {
                    let produced = artifacts.len();
                    let Some(first) = artifacts.into_iter().next() else {
                        return Err(VeoChainError::UnexpectedResponse(
                            "operation succeeded without artifacts".into(),
                        ));
                    };
                    if produced > 1 {
                        tracing::debug!(
                            discarded = produced - 1,
                            "using first of {produced} produced videos"
                        );
                    }
                    tracing::info!(uri = %first.uri, "video {kind} successful");
                    return Ok(first);
                }
                OperationStatus::Failed(err) => match err.classify() {
                    Classified::Throttled { retry_after } => {
                        tracing::warn!(
                            operation = %operation.name(),
                            code = err.code,
                            "video {kind} throttled: {}",
                            err.message
                        );
                        if retry.is_last() {
                            break;
                        }
                        let delay = retry.backoff((self.jitter)());
                        if let Some(hint) = retry_after {
                            tracing::debug!(
                                hint_secs = hint.as_secs_f64(),
                                "provider suggested a retry delay; keeping exponential backoff"
                            );
                        }
                        tracing::warn!(
                            attempt = retry.attempt() + 1,
                            delay_secs = delay.as_secs_f64(),
                            "throttling error detected, waiting before retrying"
                        );
                        self.sleeper.sleep(delay).await;
                        retry.advance();
                    }
                    Classified::Fatal => {
                        tracing::error!(
                            operation = %operation.name(),
                            code = err.code,
                            "video {kind} failed: {}",
                            err.message
                        );
                        return Err(err.into_error());
                    }
                },
                OperationStatus::Empty { filtered } if filtered > 0 => {
                    tracing::error!(filtered, "video {kind} removed by safety filters");
                    return Err(VeoChainError::ContentBlocked(format!(
                        "{filtered} video(s) filtered by Veo safety filters"
                    )));
                }
                OperationStatus::Empty { .. } => {
                    tracing::error!(
                        operation = %operation.name(),
                        "video {kind} failed: operation completed but no result returned"
                    );
                    return Err(VeoChainError::EmptyCompletion);
                }
                OperationStatus::Pending { .. } => {
                    return Err(VeoChainError::UnexpectedResponse(format!(
                        "operation {} reported pending after completion",
                        operation.name()
                    )));
                }
            }
        }

        tracing::error!(attempts = retry.max_attempts(), "max retries exceeded for video {kind}");
        Err(VeoChainError::RetriesExhausted {
            attempts: retry.max_attempts(),
        })
    }

    /// Waits one poll interval between refreshes until `operation` is done.
    async fn await_completion(&self, mut operation: Operation) -> Result<Operation> {
        while !operation.is_done() {
            self.sleeper.sleep(self.policy.poll_interval).await;
            operation = self.poll(&operation).await.inspect_err(|e| {
                tracing::error!(operation = %operation.name(), error = %e, "refreshing operation failed");
            })?;
            tracing::info!(
                operation = %operation.name(),
                state = operation.progress_state().unwrap_or("UNKNOWN"),
                "processing..."
            );
        }
        Ok(operation)
    }
}
