#![warn(missing_docs)]
//! veo-chain - Generate and extend Veo videos on Vertex AI.
//!
//! Video generation on Veo runs as a long-running operation. This crate
//! submits a request, polls the operation until the provider marks it done,
//! and resubmits with exponential backoff plus jitter when the operation ends
//! in a throttling error (RESOURCE_EXHAUSTED, code 8). Any other failure is
//! returned as a typed [`VeoChainError`].
//!
//! # Quick Start
//!
//! ```no_run
//! use veo_chain::{GenerationRequest, Poller, VertexVeoProvider};
//!
//! #[tokio::main]
//! async fn main() -> veo_chain::Result<()> {
//!     let provider = VertexVeoProvider::builder().project("my-project").build()?;
//!     let poller = Poller::new(provider);
//!
//!     let request = GenerationRequest::new("A neon city at night")
//!         .with_output_uri("gs://my-bucket");
//!     let video = poller.submit_and_await(&request).await?;
//!
//!     let extension = GenerationRequest::extension_of("The camera flies forward", &video)
//!         .with_output_uri("gs://my-bucket");
//!     let extended = poller.submit_and_await(&extension).await?;
//!     println!("{extended}");
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `vertex`: Veo on Vertex AI backend
//! - `cli`: Command-line interface (enables `vertex`)

pub mod config;
mod error;
pub mod pipeline;
pub mod video;

// Re-export error types at crate root
pub use error::{Result, VeoChainError};

pub use config::Config;
pub use pipeline::{Pipeline, PipelineReport};
pub use video::{
    ArtifactReference, GenerationRequest, Operation, OperationBackend, OperationError,
    OperationStatus, Poller, RetryPolicy, Sleeper, SourceVideo,
};

#[cfg(feature = "vertex")]
pub use video::providers::{VertexVeoProvider, VertexVeoProviderBuilder};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{Result, VeoChainError};
    pub use crate::video::{
        ArtifactReference, GenerationRequest, OperationBackend, Poller, RetryPolicy,
    };

    #[cfg(feature = "vertex")]
    pub use crate::video::providers::VertexVeoProvider;
}
