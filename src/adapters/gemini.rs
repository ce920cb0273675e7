//! Gemini API client.
//!
//! Video jobs use the long-running `predictLongRunning` endpoint and are
//! polled through the operations resource. Descriptions and posters use
//! `generateContent`. Finished videos are downloaded from the returned URI
//! with the API key appended as a `key` query parameter.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::{
    ArtifactDescriptor, Credential, JobHandle, JobRequest, ProviderError, ProviderErrorKind,
    StudioProvider, VideoProvider,
};

/// Model and output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeminiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_video_model")]
    pub video_model: String,

    #[serde(default = "default_text_model")]
    pub text_model: String,

    #[serde(default = "default_image_model")]
    pub image_model: String,

    #[serde(default = "default_resolution")]
    pub resolution: String,

    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,

    #[serde(default = "default_number_of_videos")]
    pub number_of_videos: u32,
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}
fn default_video_model() -> String {
    "veo-3.1-fast-generate-preview".to_string()
}
fn default_text_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_image_model() -> String {
    "gemini-2.5-flash-image".to_string()
}
fn default_resolution() -> String {
    "720p".to_string()
}
fn default_aspect_ratio() -> String {
    "16:9".to_string()
}
fn default_number_of_videos() -> u32 {
    1
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            video_model: default_video_model(),
            text_model: default_text_model(),
            image_model: default_image_model(),
            resolution: default_resolution(),
            aspect_ratio: default_aspect_ratio(),
            number_of_videos: default_number_of_videos(),
        }
    }
}

/// Error envelope returned by the API
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Long-running operation resource
#[derive(Debug, Deserialize)]
struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    response: Option<OperationResponse>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResponse {
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    video: Option<VideoRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoRef {
    uri: Option<String>,
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentPart {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
}

impl From<Operation> for JobHandle {
    fn from(op: Operation) -> Self {
        let results = op
            .response
            .and_then(|r| r.generate_video_response)
            .map(|r| r.generated_samples)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|s| s.video)
            .filter_map(|v| {
                v.uri.map(|uri| ArtifactDescriptor {
                    uri,
                    mime_type: v.mime_type,
                })
            })
            .collect();

        JobHandle {
            name: op.name,
            done: op.done,
            results,
            failure: op.error.map(|e| classify(e.code, &e.status, e.message)),
        }
    }
}

/// HTTP client for the Gemini API
pub struct GeminiClient {
    settings: GeminiSettings,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings) -> Self {
        Self {
            settings,
            client: reqwest::Client::new(),
        }
    }

    /// Build API URL
    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/v1beta/{}",
            self.settings.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn predict_body(&self, request: &JobRequest) -> serde_json::Value {
        let mut instance = json!({ "prompt": request.prompt });
        if let Some(image) = &request.reference_image {
            instance["image"] = json!({
                "bytesBase64Encoded": BASE64.encode(&image.bytes),
                "mimeType": image.mime_type,
            });
        }

        json!({
            "instances": [instance],
            "parameters": {
                "aspectRatio": self.settings.aspect_ratio,
                "resolution": self.settings.resolution,
                "sampleCount": self.settings.number_of_videos,
            }
        })
    }

    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: &serde_json::Value,
        credential: &Credential,
    ) -> Result<T, ProviderError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", credential.expose())
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        decode(response).await
    }

    async fn generate_content(
        &self,
        model: &str,
        prompt: &str,
        credential: &Credential,
    ) -> Result<ContentResponse, ProviderError> {
        let url = self.api_url(&format!("models/{}:generateContent", model));
        let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });
        self.post_json(&url, &body, credential).await
    }
}

#[async_trait]
impl VideoProvider for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn create_job(
        &self,
        request: &JobRequest,
        credential: &Credential,
    ) -> Result<JobHandle, ProviderError> {
        let url = self.api_url(&format!(
            "models/{}:predictLongRunning",
            self.settings.video_model
        ));
        debug!(model = %self.settings.video_model, with_image = request.reference_image.is_some(), "Submitting video job");

        let op: Operation = self
            .post_json(&url, &self.predict_body(request), credential)
            .await?;
        Ok(op.into())
    }

    async fn poll_job(
        &self,
        handle: &JobHandle,
        credential: &Credential,
    ) -> Result<JobHandle, ProviderError> {
        let response = self
            .client
            .get(self.api_url(&handle.name))
            .header("x-goog-api-key", credential.expose())
            .send()
            .await
            .map_err(transport_error)?;

        let op: Operation = decode(response).await?;
        Ok(op.into())
    }

    async fn fetch_artifact(
        &self,
        descriptor: &ArtifactDescriptor,
        credential: &Credential,
    ) -> Result<Bytes, ProviderError> {
        let url = download_url(&descriptor.uri, credential)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }

        response.bytes().await.map_err(transport_error)
    }
}

#[async_trait]
impl StudioProvider for GeminiClient {
    async fn write_text(
        &self,
        prompt: &str,
        credential: &Credential,
    ) -> Result<String, ProviderError> {
        let reply = self
            .generate_content(&self.settings.text_model, prompt, credential)
            .await?;

        let text: String = reply
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect();

        Ok(text.trim().to_string())
    }

    async fn render_image(
        &self,
        prompt: &str,
        credential: &Credential,
    ) -> Result<Option<Vec<u8>>, ProviderError> {
        let reply = self
            .generate_content(&self.settings.image_model, prompt, credential)
            .await?;

        let encoded = reply
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.inline_data);

        match encoded {
            Some(inline) => BASE64
                .decode(inline.data.as_bytes())
                .map(Some)
                .map_err(|e| {
                    ProviderError::new(ProviderErrorKind::Decode, format!("Invalid image data: {}", e))
                }),
            None => Ok(None),
        }
    }
}

/// Append the API key to an artifact URI
fn download_url(uri: &str, credential: &Credential) -> Result<Url, ProviderError> {
    let mut url = Url::parse(uri).map_err(|e| {
        ProviderError::new(
            ProviderErrorKind::Decode,
            format!("Invalid artifact URI '{}': {}", uri, e),
        )
    })?;
    url.query_pairs_mut().append_pair("key", credential.expose());
    Ok(url)
}

async fn decode<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;

    if !status.is_success() {
        return Err(api_error(status, &body));
    }

    serde_json::from_str(&body).map_err(|e| {
        ProviderError::new(
            ProviderErrorKind::Decode,
            format!("Failed to parse provider response: {}", e),
        )
    })
}

/// Map a non-success response to a typed error
fn api_error(status: StatusCode, body: &str) -> ProviderError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let code = if envelope.error.code == 0 {
                status.as_u16()
            } else {
                envelope.error.code
            };
            let message = if envelope.error.message.is_empty() {
                format!("Provider returned HTTP {}", status.as_u16())
            } else {
                envelope.error.message
            };
            classify(code, &envelope.error.status, message)
        }
        Err(_) => classify(
            status.as_u16(),
            "",
            format!("Provider returned HTTP {}", status.as_u16()),
        ),
    }
}

/// Turn an API status code and status name into a typed error
fn classify(code: u16, status: &str, message: String) -> ProviderError {
    let kind = match (code, status) {
        (404, _) | (_, "NOT_FOUND") => ProviderErrorKind::EntityNotFound,
        (401, _) | (403, _) | (_, "UNAUTHENTICATED") | (_, "PERMISSION_DENIED") => {
            ProviderErrorKind::Unauthorized
        }
        (status, _) => ProviderErrorKind::Api { status },
    };

    ProviderError::new(kind, message)
}

/// Download URLs carry the key, so the URL is dropped from the message
fn transport_error(e: reqwest::Error) -> ProviderError {
    ProviderError::new(ProviderErrorKind::Transport, e.without_url().to_string())
}
