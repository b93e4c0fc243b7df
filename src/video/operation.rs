//! Long-running operation handle and outcome classification.

use crate::error::VeoChainError;
use crate::video::types::ArtifactReference;
use std::collections::BTreeMap;
use std::time::Duration;

/// Provider status code for RESOURCE_EXHAUSTED (`google.rpc.Code`).
pub const RESOURCE_EXHAUSTED: i32 = 8;

/// Error reported by a completed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationError {
    /// Provider status code.
    pub code: i32,
    /// Human-readable message.
    pub message: String,
    /// Delay the provider asked for before retrying, if any.
    pub retry_after: Option<Duration>,
}

/// How the poller should react to an operation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    /// The provider is throttling us. Back off and resubmit.
    Throttled { retry_after: Option<Duration> },
    /// Anything else. Give up.
    Fatal,
}

impl OperationError {
    /// Creates an error with the given code and message.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retry_after: None,
        }
    }

    /// Attaches a retry-after hint.
    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }

    /// Classifies the error by its status code.
    pub fn classify(&self) -> Classified {
        if self.code == RESOURCE_EXHAUSTED {
            Classified::Throttled {
                retry_after: self.retry_after,
            }
        } else {
            Classified::Fatal
        }
    }

    /// Converts into the crate error matching its classification.
    pub fn into_error(self) -> VeoChainError {
        match self.classify() {
            Classified::Throttled { retry_after } => VeoChainError::Throttled {
                code: self.code,
                message: self.message,
                retry_after,
            },
            Classified::Fatal => VeoChainError::OperationFailed {
                code: self.code,
                message: self.message,
            },
        }
    }
}

impl std::fmt::Display for OperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "code {}: {}", self.code, self.message)
    }
}

/// Observable state of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    /// Still running. `state` is the provider's progress label, if any.
    Pending { state: Option<String> },
    /// Completed with at least one produced video.
    Succeeded(Vec<ArtifactReference>),
    /// Completed with an error.
    Failed(OperationError),
    /// Completed with neither result nor error. `filtered` counts outputs
    /// removed by safety filters.
    Empty { filtered: u32 },
}

/// Handle to an in-flight or completed remote job.
///
/// Results and errors are only reachable through [`Operation::status`],
/// which reports `Pending` until the provider marks the job done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    name: String,
    done: bool,
    artifacts: Vec<ArtifactReference>,
    error: Option<OperationError>,
    metadata: BTreeMap<String, String>,
    filtered_count: u32,
}

impl Operation {
    /// Creates a handle for a job that has not finished.
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: false,
            artifacts: Vec::new(),
            error: None,
            metadata: BTreeMap::new(),
            filtered_count: 0,
        }
    }

    /// Creates a completed handle carrying produced videos.
    pub fn succeeded(name: impl Into<String>, artifacts: Vec<ArtifactReference>) -> Self {
        Self {
            done: true,
            artifacts,
            ..Self::pending(name)
        }
    }

    /// Creates a completed handle carrying an error.
    pub fn failed(name: impl Into<String>, error: OperationError) -> Self {
        Self {
            done: true,
            error: Some(error),
            ..Self::pending(name)
        }
    }

    /// Creates a completed handle with neither result nor error.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            done: true,
            ..Self::pending(name)
        }
    }

    /// Adds a progress metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Records how many outputs were removed by safety filters.
    pub fn with_filtered_count(mut self, count: u32) -> Self {
        self.filtered_count = count;
        self
    }

    /// Provider-assigned operation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the provider has marked the job complete.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Free-form progress metadata.
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Progress label from the `state` metadata key.
    pub fn progress_state(&self) -> Option<&str> {
        self.metadata.get("state").map(String::as_str)
    }

    /// Reports the operation's state. Never exposes results before completion.
    pub fn status(&self) -> OperationStatus {
        if !self.done {
            return OperationStatus::Pending {
                state: self.progress_state().map(str::to_string),
            };
        }
        if !self.artifacts.is_empty() {
            return OperationStatus::Succeeded(self.artifacts.clone());
        }
        match &self.error {
            Some(err) => OperationStatus::Failed(err.clone()),
            None => OperationStatus::Empty {
                filtered: self.filtered_count,
            },
        }
    }
}
