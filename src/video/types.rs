//! Core types for video generation requests and their outputs.

use serde::{Deserialize, Serialize};

/// Media type used for Veo video inputs and outputs.
pub const MP4_MIME_TYPE: &str = "video/mp4";

/// A stored video usable as the starting point of an extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceVideo {
    /// Storage URI of the video (e.g. `gs://bucket/sample_0.mp4`).
    pub uri: String,
    /// MIME type of the video.
    pub mime_type: String,
}

impl SourceVideo {
    /// Creates an MP4 source video reference.
    pub fn mp4(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            mime_type: MP4_MIME_TYPE.to_string(),
        }
    }
}

/// A reference to a video produced by a completed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactReference {
    /// Storage URI of the produced video.
    pub uri: String,
    /// MIME type reported by the provider, if any.
    pub mime_type: Option<String>,
}

impl ArtifactReference {
    /// Creates a reference from a storage URI.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            mime_type: None,
        }
    }

    /// Sets the reported MIME type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Converts the reference into an input for a follow-up request.
    pub fn as_source(&self) -> SourceVideo {
        SourceVideo {
            uri: self.uri.clone(),
            mime_type: self
                .mime_type
                .clone()
                .unwrap_or_else(|| MP4_MIME_TYPE.to_string()),
        }
    }
}

impl std::fmt::Display for ArtifactReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.uri)
    }
}

/// A request to generate (or extend) a video.
///
/// The poller only ever borrows a request, so a throttled attempt is
/// resubmitted with exactly the same parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The text prompt describing the video (or what happens next, for extensions).
    pub prompt: String,
    /// Video to continue from, for extension requests.
    pub source_video: Option<SourceVideo>,
    /// Storage prefix the provider writes results to (e.g. `gs://bucket`).
    pub output_uri: String,
    /// Model identifier (e.g. "veo-3.1-generate-preview").
    pub model: String,
    /// Aspect ratio (e.g. "16:9", "9:16").
    pub aspect_ratio: String,
    /// Resolution (e.g. "720p", "1080p", "4k").
    pub resolution: String,
    /// Desired clip length in seconds.
    pub duration_secs: Option<u32>,
    /// What the video should not contain.
    pub negative_prompt: Option<String>,
    /// Number of videos to produce. Only the first is used.
    pub sample_count: Option<u32>,
    /// Whether to generate an audio track.
    pub generate_audio: Option<bool>,
}

impl GenerationRequest {
    /// Creates a text-to-video request with Veo defaults.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            source_video: None,
            output_uri: String::new(),
            model: crate::config::DEFAULT_MODEL.to_string(),
            aspect_ratio: crate::config::DEFAULT_ASPECT_RATIO.to_string(),
            resolution: crate::config::DEFAULT_RESOLUTION.to_string(),
            duration_secs: None,
            negative_prompt: None,
            sample_count: None,
            generate_audio: None,
        }
    }

    /// Creates a request that extends a previously generated video.
    pub fn extension_of(prompt: impl Into<String>, artifact: &ArtifactReference) -> Self {
        Self::new(prompt).with_source_video(artifact.as_source())
    }

    /// Sets the video to extend.
    pub fn with_source_video(mut self, video: SourceVideo) -> Self {
        self.source_video = Some(video);
        self
    }

    /// Sets the output storage location.
    pub fn with_output_uri(mut self, uri: impl Into<String>) -> Self {
        self.output_uri = uri.into();
        self
    }

    /// Sets the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the aspect ratio.
    pub fn with_aspect_ratio(mut self, ratio: impl Into<String>) -> Self {
        self.aspect_ratio = ratio.into();
        self
    }

    /// Sets the resolution.
    pub fn with_resolution(mut self, resolution: impl Into<String>) -> Self {
        self.resolution = resolution.into();
        self
    }

    /// Sets the desired clip length in seconds.
    pub fn with_duration(mut self, secs: u32) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    /// Sets a negative prompt.
    pub fn with_negative_prompt(mut self, text: impl Into<String>) -> Self {
        self.negative_prompt = Some(text.into());
        self
    }

    /// Sets how many videos the provider should produce.
    pub fn with_sample_count(mut self, count: u32) -> Self {
        self.sample_count = Some(count);
        self
    }

    /// Enables or disables audio generation.
    pub fn with_audio(mut self, enabled: bool) -> Self {
        self.generate_audio = Some(enabled);
        self
    }

    /// Returns true if this request continues an existing video.
    pub fn is_extension(&self) -> bool {
        self.source_video.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let req = GenerationRequest::new("A neon city");
        assert_eq!(req.prompt, "A neon city");
        assert_eq!(req.model, "veo-3.1-generate-preview");
        assert_eq!(req.aspect_ratio, "16:9");
        assert_eq!(req.resolution, "4k");
        assert!(req.source_video.is_none());
        assert!(!req.is_extension());
    }

    #[test]
    fn test_extension_of_carries_artifact_uri() {
        let artifact = ArtifactReference::new("gs://bucket/123/sample_0.mp4");
        let req = GenerationRequest::extension_of("Fly forward", &artifact)
            .with_output_uri("gs://bucket");

        assert!(req.is_extension());
        let source = req.source_video.unwrap();
        assert_eq!(source.uri, "gs://bucket/123/sample_0.mp4");
        assert_eq!(source.mime_type, "video/mp4");
        assert_eq!(req.output_uri, "gs://bucket");
    }

    #[test]
    fn test_as_source_keeps_reported_mime_type() {
        let artifact = ArtifactReference::new("gs://b/v.mov").with_mime_type("video/quicktime");
        assert_eq!(artifact.as_source().mime_type, "video/quicktime");
        assert_eq!(artifact.to_string(), "gs://b/v.mov");
    }

    #[test]
    fn test_builder_setters() {
        let req = GenerationRequest::new("waves")
            .with_model("veo-3.0-generate-001")
            .with_aspect_ratio("9:16")
            .with_resolution("1080p")
            .with_duration(8)
            .with_negative_prompt("text overlays")
            .with_sample_count(2)
            .with_audio(false);

        assert_eq!(req.model, "veo-3.0-generate-001");
        assert_eq!(req.aspect_ratio, "9:16");
        assert_eq!(req.resolution, "1080p");
        assert_eq!(req.duration_secs, Some(8));
        assert_eq!(req.negative_prompt.as_deref(), Some("text overlays"));
        assert_eq!(req.sample_count, Some(2));
        assert_eq!(req.generate_audio, Some(false));
    }
}
