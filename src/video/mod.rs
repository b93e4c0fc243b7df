//! Video generation module.

mod clock;
mod operation;
mod poller;
mod provider;
pub mod providers;
mod retry;
#[cfg(test)]
pub(crate) mod testing;
mod types;

pub use clock::{RecordingSleeper, Sleeper, TokioSleeper};
pub use operation::{Classified, Operation, OperationError, OperationStatus, RESOURCE_EXHAUSTED};
pub use poller::Poller;
pub use provider::OperationBackend;
pub use retry::{RetryPolicy, RetryState};
pub use types::{ArtifactReference, GenerationRequest, SourceVideo, MP4_MIME_TYPE};
