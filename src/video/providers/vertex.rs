//! Veo on Vertex AI, driven as long-running operations.

use crate::config::{Config, DEFAULT_LOCATION};
use crate::error::{parse_retry_after, sanitize_error_message, Result, VeoChainError};
use crate::video::operation::{Operation, OperationError};
use crate::video::provider::OperationBackend;
use crate::video::types::{ArtifactReference, GenerationRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// gcloud tokens live for an hour; refresh well before that.
const TOKEN_LIFETIME: Duration = Duration::from_secs(45 * 60);
const RETRY_INFO_TYPE: &str = "type.googleapis.com/google.rpc.RetryInfo";

/// Builder for [`VertexVeoProvider`].
///
/// The builder never reads the environment; use [`Config::from_env`] and
/// [`VertexVeoProvider::from_config`] for that.
#[derive(Debug, Clone, Default)]
pub struct VertexVeoProviderBuilder {
    project: Option<String>,
    location: Option<String>,
    access_token: Option<String>,
    endpoint: Option<String>,
}

impl VertexVeoProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the GCP project ID. Required.
    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Sets the GCP location. Defaults to "us-central1".
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Uses a fixed OAuth access token instead of asking the gcloud CLI.
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Overrides the API root (defaults to the regional aiplatform endpoint).
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Builds the provider.
    pub fn build(self) -> Result<VertexVeoProvider> {
        let project = self
            .project
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| {
                VeoChainError::Config(
                    "no GCP project provided (set GOOGLE_CLOUD_PROJECT or --project)".into(),
                )
            })?;
        let location = self
            .location
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOCATION.to_string());
        let endpoint = self
            .endpoint
            .unwrap_or_else(|| format!("https://{location}-aiplatform.googleapis.com"));

        Ok(VertexVeoProvider {
            client: reqwest::Client::new(),
            project,
            location,
            access_token: self.access_token,
            cached_token: Mutex::new(None),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }
}

/// Veo video generation through the Vertex AI REST API.
pub struct VertexVeoProvider {
    client: reqwest::Client,
    project: String,
    location: String,
    access_token: Option<String>,
    cached_token: Mutex<Option<CachedToken>>,
    endpoint: String,
}

/// A gcloud token and the moment it was fetched.
#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    fetched_at: Instant,
}

impl CachedToken {
    fn new(value: String) -> Self {
        Self {
            value,
            fetched_at: Instant::now(),
        }
    }

    fn fresh_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.fetched_at) < TOKEN_LIFETIME
    }
}

/// Get a bearer token by running `gcloud auth print-access-token`.
async fn gcloud_access_token() -> Result<String> {
    let output = tokio::process::Command::new("gcloud")
        .args(["auth", "print-access-token"])
        .output()
        .await
        .map_err(|e| {
            VeoChainError::Auth(format!(
                "Failed to run gcloud CLI: {}. Install it from https://cloud.google.com/sdk/docs/install",
                e
            ))
        })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(VeoChainError::Auth(format!("gcloud auth failed: {}", stderr)));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

impl VertexVeoProvider {
    /// Creates a new `VertexVeoProviderBuilder`.
    pub fn builder() -> VertexVeoProviderBuilder {
        VertexVeoProviderBuilder::new()
    }

    /// Creates a provider from an already resolved run configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut builder = Self::builder().location(&config.location);
        if let Some(project) = &config.project {
            builder = builder.project(project);
        }
        if let Some(token) = &config.access_token {
            builder = builder.access_token(token);
        }
        builder.build()
    }

    /// GCP project the provider bills to.
    pub fn project(&self) -> &str {
        &self.project
    }

    /// GCP location requests are sent to.
    pub fn location(&self) -> &str {
        &self.location
    }

    async fn token(&self) -> Result<String> {
        if let Some(token) = &self.access_token {
            return Ok(token.clone());
        }
        if let Some(cached) = self.cached() {
            return Ok(cached);
        }

        let token = gcloud_access_token().await?;
        tracing::debug!("fetched access token from gcloud");
        if let Ok(mut slot) = self.cached_token.lock() {
            *slot = Some(CachedToken::new(token.clone()));
        }
        Ok(token)
    }

    fn cached(&self) -> Option<String> {
        let slot = self.cached_token.lock().ok()?;
        slot.as_ref()
            .filter(|t| t.fresh_at(Instant::now()))
            .map(|t| t.value.clone())
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:{}",
            self.endpoint, self.project, self.location, model, method
        )
    }

    async fn post<T: Serialize>(&self, url: &str, body: &T) -> Result<VertexOperationResponse> {
        let token = self.token().await?;

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &text, &headers));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl OperationBackend for VertexVeoProvider {
    async fn submit(&self, request: &GenerationRequest) -> Result<Operation> {
        if request.output_uri.is_empty() {
            return Err(VeoChainError::InvalidRequest(
                "an output storage URI is required".into(),
            ));
        }
        let url = self.model_url(&request.model, "predictLongRunning");
        let body = VertexRequest::from_request(request);

        let operation = self.post(&url, &body).await?;
        tracing::debug!(operation = %operation.name, model = %request.model, "submitted Veo request");
        Ok(operation.into_operation())
    }

    async fn refresh(&self, operation: &Operation) -> Result<Operation> {
        let model = model_from_operation_name(operation.name()).ok_or_else(|| {
            VeoChainError::UnexpectedResponse(format!(
                "cannot determine model from operation name {}",
                operation.name()
            ))
        })?;
        let url = self.model_url(model, "fetchPredictOperation");
        let body = VertexFetchOperationRequest {
            operation_name: operation.name().to_string(),
        };

        let refreshed = self.post(&url, &body).await?;
        tracing::debug!(
            operation = %refreshed.name,
            done = refreshed.done.unwrap_or(false),
            "fetched Veo operation"
        );
        Ok(refreshed.into_operation())
    }

    fn name(&self) -> &str {
        "Veo (Vertex AI)"
    }
}

/// Extracts the model ID from `projects/.../models/{model}/operations/{id}`.
fn model_from_operation_name(name: &str) -> Option<&str> {
    let mut segments = name.split('/');
    while let Some(segment) = segments.next() {
        if segment == "models" {
            return segments.next().filter(|m| !m.is_empty());
        }
    }
    None
}

/// Parses a protobuf JSON duration such as `"12s"` or `"1.5s"`.
fn parse_proto_duration(value: &str) -> Option<Duration> {
    let secs: f64 = value.trim().strip_suffix('s')?.parse().ok()?;
    if secs.is_finite() && secs >= 0.0 {
        Some(Duration::from_secs_f64(secs))
    } else {
        None
    }
}

fn parse_error(status: u16, text: &str, headers: &reqwest::header::HeaderMap) -> VeoChainError {
    let text = sanitize_error_message(text);
    if status == 404 {
        return VeoChainError::InvalidRequest(format!(
            "Veo model or project not found on Vertex AI: {}",
            text
        ));
    }
    if status == 429 {
        let retry_after = parse_retry_after(headers).map(Duration::from_secs);
        return VeoChainError::RateLimited { retry_after };
    }
    if status == 401 || status == 403 {
        return VeoChainError::Auth(text);
    }
    let lower = text.to_lowercase();
    if lower.contains("safety")
        || lower.contains("blocked")
        || lower.contains("content_policy")
        || lower.contains("prohibited")
    {
        return VeoChainError::ContentBlocked(text);
    }
    VeoChainError::Api {
        status,
        message: text,
    }
}

// ── Vertex AI wire format ───────────────────────────────────────────────────

/// Video input referenced by storage URI.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct VertexVideoInput {
    gcs_uri: String,
    mime_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VertexInstance {
    prompt: String,
    /// Video to extend.
    #[serde(skip_serializing_if = "Option::is_none")]
    video: Option<VertexVideoInput>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VertexParameters {
    storage_uri: String,
    aspect_ratio: String,
    resolution: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    negative_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sample_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generate_audio: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VertexRequest {
    instances: Vec<VertexInstance>,
    parameters: VertexParameters,
}

impl VertexRequest {
    fn from_request(req: &GenerationRequest) -> Self {
        Self {
            instances: vec![VertexInstance {
                prompt: req.prompt.clone(),
                video: req.source_video.as_ref().map(|v| VertexVideoInput {
                    gcs_uri: v.uri.clone(),
                    mime_type: v.mime_type.clone(),
                }),
            }],
            parameters: VertexParameters {
                storage_uri: req.output_uri.clone(),
                aspect_ratio: req.aspect_ratio.clone(),
                resolution: req.resolution.clone(),
                duration_seconds: req.duration_secs,
                negative_prompt: req.negative_prompt.clone(),
                sample_count: req.sample_count,
                generate_audio: req.generate_audio,
            },
        }
    }
}

/// Vertex AI poll request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VertexFetchOperationRequest {
    operation_name: String,
}

// ── Response types ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct VertexOperationResponse {
    name: String,
    #[serde(default)]
    done: Option<bool>,
    #[serde(default)]
    metadata: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    response: Option<VertexVideoResponse>,
    #[serde(default)]
    error: Option<VertexStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VertexVideoResponse {
    #[serde(default)]
    videos: Option<Vec<VertexVideo>>,
    #[serde(default)]
    rai_media_filtered_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VertexVideo {
    /// GCS URI (gs://...) — returned when `storageUri` is set.
    #[serde(default)]
    gcs_uri: Option<String>,
    /// HTTPS download URL — sometimes returned instead of GCS URI.
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
}

/// `google.rpc.Status`.
#[derive(Debug, Deserialize)]
struct VertexStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Vec<serde_json::Value>,
}

impl VertexStatus {
    fn retry_delay(&self) -> Option<Duration> {
        self.details
            .iter()
            .filter(|d| d.get("@type").and_then(|t| t.as_str()) == Some(RETRY_INFO_TYPE))
            .find_map(|d| d.get("retryDelay")?.as_str().and_then(parse_proto_duration))
    }

    fn into_error(self) -> OperationError {
        let retry_after = self.retry_delay();
        let mut error = OperationError::new(
            self.code,
            self.message.unwrap_or_else(|| "Unknown error".into()),
        );
        error.retry_after = retry_after;
        error
    }
}

impl VertexOperationResponse {
    fn into_operation(self) -> Operation {
        let done = self.done.unwrap_or(false);

        let mut operation = if !done {
            Operation::pending(self.name)
        } else if let Some(error) = self.error {
            Operation::failed(self.name, error.into_error())
        } else {
            let (videos, filtered) = match self.response {
                Some(resp) => (
                    resp.videos.unwrap_or_default(),
                    resp.rai_media_filtered_count.unwrap_or(0),
                ),
                None => (Vec::new(), 0),
            };
            let artifacts: Vec<ArtifactReference> = videos
                .into_iter()
                .filter_map(|v| {
                    let uri = v.gcs_uri.or(v.uri)?;
                    let artifact = ArtifactReference::new(uri);
                    Some(match v.mime_type {
                        Some(mime) => artifact.with_mime_type(mime),
                        None => artifact,
                    })
                })
                .collect();
            if artifacts.is_empty() {
                Operation::empty(self.name).with_filtered_count(filtered)
            } else {
                Operation::succeeded(self.name, artifacts)
            }
        };

        for (key, value) in self.metadata.unwrap_or_default() {
            let value = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            operation = operation.with_metadata(key, value);
        }
        operation
    }
}
