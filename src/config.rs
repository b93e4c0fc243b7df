//! Run configuration, resolved once at start-up and passed down.

use crate::error::{Result, VeoChainError};
use crate::video::GenerationRequest;

/// Default Veo model identifier.
pub const DEFAULT_MODEL: &str = "veo-3.1-generate-preview";
/// Default Vertex AI location.
pub const DEFAULT_LOCATION: &str = "us-central1";
/// Default aspect ratio.
pub const DEFAULT_ASPECT_RATIO: &str = "16:9";
/// Default resolution.
pub const DEFAULT_RESOLUTION: &str = "4k";
/// Output location shipped as a stand-in; must be replaced before running.
pub const PLACEHOLDER_OUTPUT_URI: &str = "gs://your-bucket-name";

/// Settings shared by every request of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// GCP project ID.
    pub project: Option<String>,
    /// GCP location.
    pub location: String,
    /// Storage prefix results are written to.
    pub output_uri: String,
    /// Veo model identifier.
    pub model: String,
    /// Aspect ratio for every request.
    pub aspect_ratio: String,
    /// Resolution for every request.
    pub resolution: String,
    /// OAuth access token. When absent the gcloud CLI is asked for one.
    pub access_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: None,
            location: DEFAULT_LOCATION.to_string(),
            output_uri: PLACEHOLDER_OUTPUT_URI.to_string(),
            model: DEFAULT_MODEL.to_string(),
            aspect_ratio: DEFAULT_ASPECT_RATIO.to_string(),
            resolution: DEFAULT_RESOLUTION.to_string(),
            access_token: None,
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `GOOGLE_CLOUD_PROJECT` | `project` |
    /// | `GOOGLE_CLOUD_LOCATION` | `location` |
    /// | `VEO_OUTPUT_GCS_URI` | `output_uri` |
    /// | `VEO_MODEL` | `model` |
    /// | `VERTEX_AI_ACCESS_TOKEN` | `access_token` |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            project: get("GOOGLE_CLOUD_PROJECT"),
            location: get("GOOGLE_CLOUD_LOCATION").unwrap_or(defaults.location),
            output_uri: get("VEO_OUTPUT_GCS_URI").unwrap_or(defaults.output_uri),
            model: get("VEO_MODEL").unwrap_or(defaults.model),
            aspect_ratio: defaults.aspect_ratio,
            resolution: defaults.resolution,
            access_token: get("VERTEX_AI_ACCESS_TOKEN"),
        }
    }

    /// Returns true while the output location is still the shipped stand-in.
    pub fn has_placeholder_output(&self) -> bool {
        self.output_uri.contains("your-bucket-name")
    }

    /// Checks that the configuration can be used for a run.
    pub fn validate(&self) -> Result<()> {
        if self.has_placeholder_output() {
            return Err(VeoChainError::Config(format!(
                "output location is still the placeholder {}; set VEO_OUTPUT_GCS_URI or --output-uri to your bucket",
                self.output_uri
            )));
        }
        if !self.output_uri.starts_with("gs://") {
            return Err(VeoChainError::Config(format!(
                "output location must be a gs:// URI, got {}",
                self.output_uri
            )));
        }
        Ok(())
    }

    /// Creates a request carrying this run's shared settings.
    pub fn request(&self, prompt: impl Into<String>) -> GenerationRequest {
        GenerationRequest::new(prompt)
            .with_output_uri(&self.output_uri)
            .with_model(&self.model)
            .with_aspect_ratio(&self.aspect_ratio)
            .with_resolution(&self.resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_hold_placeholder() {
        let config = Config::from_lookup(lookup(&[]));
        assert_eq!(config, Config::default());
        assert!(config.has_placeholder_output());
        assert!(matches!(config.validate(), Err(VeoChainError::Config(_))));
    }

    #[test]
    fn test_environment_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("GOOGLE_CLOUD_PROJECT", "my-project"),
            ("GOOGLE_CLOUD_LOCATION", "europe-west4"),
            ("VEO_OUTPUT_GCS_URI", "gs://videos"),
            ("VEO_MODEL", "veo-3.0-generate-001"),
            ("VERTEX_AI_ACCESS_TOKEN", "ya29.token"),
        ]));
        assert_eq!(config.project.as_deref(), Some("my-project"));
        assert_eq!(config.location, "europe-west4");
        assert_eq!(config.output_uri, "gs://videos");
        assert_eq!(config.model, "veo-3.0-generate-001");
        assert_eq!(config.access_token.as_deref(), Some("ya29.token"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_blank_variables_are_ignored() {
        let config = Config::from_lookup(lookup(&[
            ("GOOGLE_CLOUD_PROJECT", ""),
            ("GOOGLE_CLOUD_LOCATION", "  "),
        ]));
        assert_eq!(config.project, None);
        assert_eq!(config.location, DEFAULT_LOCATION);
    }

    #[test]
    fn test_validate_requires_gcs_uri() {
        let config = Config {
            output_uri: "https://example.com/out".into(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(VeoChainError::Config(_))));
    }

    #[test]
    fn test_request_carries_shared_settings() {
        let config = Config {
            output_uri: "gs://videos".into(),
            resolution: "1080p".into(),
            ..Config::default()
        };
        let req = config.request("A neon city");
        assert_eq!(req.output_uri, "gs://videos");
        assert_eq!(req.model, DEFAULT_MODEL);
        assert_eq!(req.aspect_ratio, "16:9");
        assert_eq!(req.resolution, "1080p");
        assert!(req.source_video.is_none());
    }
}
