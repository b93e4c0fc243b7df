//! Generate-then-extend orchestration.

use crate::config::Config;
use crate::video::{ArtifactReference, OperationBackend, Poller, Sleeper};

/// Prompt used for the first clip when none is given.
pub const DEFAULT_PROMPT: &str =
    "A cinematic drone shot of a futuristic cyberpunk city at night with neon lights, 4k high resolution.";

/// Prompt used for the extension when none is given.
pub const DEFAULT_EXTENSION_PROMPT: &str =
    "The camera flies forward through the street, revealing more flying cars and skyscrapers.";

/// Outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct PipelineReport {
    /// The first clip, if generation succeeded.
    pub generated: Option<ArtifactReference>,
    /// The extended clip, if extension ran and succeeded.
    pub extended: Option<ArtifactReference>,
}

/// Generates a clip and extends it with a follow-up prompt.
pub struct Pipeline<B, S> {
    poller: Poller<B, S>,
    config: Config,
}

impl<B: OperationBackend, S: Sleeper> Pipeline<B, S> {
    /// Creates a pipeline sending every request through `poller`.
    pub fn new(poller: Poller<B, S>, config: Config) -> Self {
        Self { poller, config }
    }

    /// The run configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Generates a clip from `prompt`, then extends it with `extension_prompt`.
    ///
    /// Failures are logged and reported as missing artifacts. The extension
    /// is skipped when generation produced nothing.
    pub async fn run(&self, prompt: &str, extension_prompt: &str) -> PipelineReport {
        let request = self.config.request(prompt);
        let generated = match self.poller.submit_and_await(&request).await {
            Ok(artifact) => artifact,
            Err(e) => {
                tracing::warn!(error = %e, "video generation produced no artifact, skipping extension");
                return PipelineReport::default();
            }
        };

        tracing::info!(input = %generated.uri, "extending video");
        let request = self
            .config
            .request(extension_prompt)
            .with_source_video(generated.as_source());
        let extended = self
            .poller
            .submit_and_await(&request)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "video extension produced no artifact"))
            .ok();

        PipelineReport {
            generated: Some(generated),
            extended,
        }
    }
}
