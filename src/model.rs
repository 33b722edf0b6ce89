//! Client for the hosted multimodal model. One method call is exactly one
//! HTTP request: nothing is cached and nothing is retried.

use crate::config::{ApiKey, Settings};
use crate::data_uri::ImageInput;
use crate::error::{Error, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, error, info};
use url::Url;

/// Where the image goes inside a prompt template
pub const MEDIA_PLACEHOLDER: &str = "{{media}}";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// A named instruction template. The image is inlined at `{{media}}`, or
/// appended when the template has no placeholder.
#[derive(Debug, Clone, Copy)]
pub struct Prompt<'a> {
    pub name: &'a str,
    pub template: &'a str,
}

/// What to embed
#[derive(Debug, Clone, Copy)]
pub enum EmbedContent<'a> {
    Image(&'a ImageInput),
    Text(&'a str),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Blob<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
enum Part<'a> {
    Text(&'a str),
    InlineData(Blob<'a>),
}

impl<'a> Part<'a> {
    fn image(input: &'a ImageInput) -> Self {
        Part::InlineData(Blob {
            mime_type: input.mime_type(),
            data: input.payload(),
        })
    }
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'static str,
    response_schema: &'a Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct EmbedContentRequest<'a> {
    model: String,
    content: Content<'a>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Split a template around the media placeholder
fn render<'a>(template: &'a str, input: &'a ImageInput) -> Vec<Part<'a>> {
    let (before, after) = template
        .split_once(MEDIA_PLACEHOLDER)
        .unwrap_or((template, ""));

    [Part::Text(before), Part::image(input), Part::Text(after)]
        .into_iter()
        .filter(|part| !matches!(part, Part::Text(text) if text.trim().is_empty()))
        .collect()
}

fn model_path(model: &str) -> &str {
    model.strip_prefix("models/").unwrap_or(model)
}

/// Client for the `generateContent` and `embedContent` endpoints
#[derive(Debug, Clone)]
pub struct ModelClient {
    http: Client,
    api_key: ApiKey,
    base_url: Url,
    model: String,
    embedding_model: String,
}

impl ModelClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_http(http, settings))
    }

    /// Build a client around an existing connection pool
    pub fn with_http(http: Client, settings: &Settings) -> Self {
        ModelClient {
            http,
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.clone(),
            model: settings.model.clone(),
            embedding_model: settings.embedding_model.clone(),
        }
    }

    /// The underlying HTTP client, shared with the image fetcher
    pub fn http(&self) -> &Client {
        &self.http
    }

    fn endpoint(&self, model: &str, method: &str) -> Result<Url> {
        let suffix = format!("models/{}:{method}", model_path(model));
        self.base_url
            .join(&suffix)
            .map_err(|e| Error::Configuration(format!("invalid model endpoint {suffix:?}: {e}")))
    }

    async fn check_response(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let description = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.error.message)
            .unwrap_or(body);
        Err(Error::Remote(format!(
            "request failed with status {status}: {description}"
        )))
    }

    async fn post_json<Req: Serialize, Res: DeserializeOwned>(
        &self,
        url: Url,
        body: &Req,
    ) -> Result<Res> {
        let response = self
            .http
            .post(url)
            .header(API_KEY_HEADER, self.api_key.expose())
            .json(body)
            .send()
            .await?;
        let response = Self::check_response(response).await?;
        Ok(response.json().await?)
    }

    /// Send `prompt` with the image inlined and parse the model's answer as
    /// `T`. The schema is passed to the model as its response schema; `T`
    /// enforces it again when the answer is deserialized.
    pub async fn invoke<T: DeserializeOwned>(
        &self,
        prompt: &Prompt<'_>,
        input: &ImageInput,
        output_schema: &Value,
    ) -> Result<T> {
        let url = self.endpoint(&self.model, "generateContent")?;
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: render(prompt.template, input),
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: output_schema,
            },
        };

        debug!("invoking prompt {} with {input:?}", prompt.name);
        let start = Instant::now();
        let response: GenerateContentResponse = self.post_json(url, &request).await?;

        if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(Error::Remote(format!("prompt was blocked: {reason}")));
        }
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| Error::Remote("model returned no candidates".into()))?;
        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(Error::Remote(format!(
                "model returned no output (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        let output = serde_json::from_str(&text).map_err(|e| {
            error!("prompt {} returned output that does not match its schema: {text}", prompt.name);
            Error::Remote(format!("invalid model output: {e}"))
        })?;

        info!(
            "prompt {} finished in {}ms",
            prompt.name,
            start.elapsed().as_millis()
        );
        Ok(output)
    }

    /// Compute an embedding vector for an image or a text
    pub async fn embed(&self, content: EmbedContent<'_>) -> Result<Vec<f32>> {
        let url = self.endpoint(&self.embedding_model, "embedContent")?;
        let part = match content {
            EmbedContent::Image(input) => Part::image(input),
            EmbedContent::Text(text) => Part::Text(text),
        };
        let request = EmbedContentRequest {
            model: format!("models/{}", model_path(&self.embedding_model)),
            content: Content {
                role: None,
                parts: vec![part],
            },
        };

        debug!("requesting embedding for {content:?}");
        let start = Instant::now();
        let response: EmbedContentResponse = self.post_json(url, &request).await?;

        info!(
            "embedding with {} dimensions computed in {}ms",
            response.embedding.values.len(),
            start.elapsed().as_millis()
        );
        Ok(response.embedding.values)
    }
}
