use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::BatchConfig;
use crate::error::ServiceError;
use crate::keys::KeyPool;
use crate::types::{ItemMetadata, SourceRef};
use crate::CompletionService;

const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1";
const DEFAULT_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

const SYSTEM_PROMPT: &str = r#"You are a professional microstock metadata assistant. Analyze the provided asset and respond with a single JSON object of the form {"title": string, "description": string, "keywords": array of strings}. Keywords must be ordered from most to least relevant. Return ONLY the JSON object, with no markdown fences or commentary."#;

/// Configuration for the HTTP completion client.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// OpenAI-compatible API base (e.g. "https://api.groq.com/openai/v1").
    pub endpoint: String,
    /// Model name.
    pub model: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Sampling temperature.
    pub temperature: f64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            temperature: 0.7,
        }
    }
}

impl CompletionConfig {
    /// Create a config with the given model name.
    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set the API base endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the sampling temperature.
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Completion service backed by an OpenAI-compatible chat endpoint.
///
/// Image assets are inlined as base64 data URLs for vision analysis;
/// bare file names are analyzed text-only. Each call resolves one
/// credential from the pool via its selection strategy.
pub struct HttpCompletionService {
    client: Client,
    config: CompletionConfig,
    keys: KeyPool,
}

impl HttpCompletionService {
    pub fn new(config: CompletionConfig, keys: KeyPool) -> Self {
        Self {
            client: Client::new(),
            config,
            keys,
        }
    }
}

impl CompletionService for HttpCompletionService {
    async fn generate(
        &self,
        source: &SourceRef,
        config: &BatchConfig,
    ) -> Result<ItemMetadata, ServiceError> {
        let body = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": user_content(source, config)},
            ],
            "temperature": self.config.temperature,
            "response_format": {"type": "json_object"},
        });

        let url = format!(
            "{}/chat/completions",
            self.config.endpoint.trim_end_matches('/')
        );
        let resp = self
            .client
            .post(&url)
            .bearer_auth(self.keys.pick())
            .timeout(self.config.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::Network(format!("{}: {}", url, e)))?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(map_status_error(status, text));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| ServiceError::EmptyResponse(e.to_string()))?;
        let content = json
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .unwrap_or("");

        parse_metadata(content)
    }
}

/// Build the user message content: multimodal parts for in-memory
/// assets, plain text for bare file names.
fn user_content(source: &SourceRef, config: &BatchConfig) -> Value {
    let prompt = build_prompt(source.name(), config);
    match source {
        SourceRef::Asset { mime, bytes, .. } => {
            let b64 = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes);
            json!([
                {"type": "text", "text": prompt},
                {"type": "image_url", "image_url": {"url": format!("data:{};base64,{}", mime, b64)}},
            ])
        }
        SourceRef::Filename { .. } => json!(prompt),
    }
}

/// Render the generation prompt from the batch configuration.
pub(crate) fn build_prompt(name: &str, config: &BatchConfig) -> String {
    let mut prompt = format!(
        "Generate commercial microstock metadata for the asset \"{}\". \
         The title must be at most {} characters and the description at most {} characters. \
         Return exactly {} keywords ordered by search relevance.",
        name, config.title_budget, config.description_budget, config.keyword_target
    );

    if let Some(label) = config.image_type.label() {
        prompt.push_str(&format!(" The asset is a {}.", label));
    }
    prompt.push_str(&format!(
        " Optimize the metadata for {}.",
        config.platform.label()
    ));

    if let Some(words) = config.negative_title_words.as_deref() {
        if !words.trim().is_empty() {
            prompt.push_str(&format!(" Do not use any of these words in the title: {}.", words));
        }
    }
    if let Some(words) = config.negative_keywords.as_deref() {
        if !words.trim().is_empty() {
            prompt.push_str(&format!(" Do not include any of these keywords: {}.", words));
        }
    }

    prompt
}

/// Map a non-success HTTP status to a service error category.
///
/// Rate-limit detection also matches "limit"/"quota" substrings in the
/// body, since some providers return quota exhaustion under generic
/// statuses.
fn map_status_error(status: u16, body: String) -> ServiceError {
    let lowered = body.to_lowercase();
    let looks_rate_limited = lowered.contains("limit") || lowered.contains("quota");
    match status {
        401 | 403 => ServiceError::Auth(body),
        429 => ServiceError::RateLimited(body),
        400 => {
            if looks_rate_limited {
                ServiceError::RateLimited(body)
            } else {
                ServiceError::MalformedRequest(body)
            }
        }
        _ => {
            if looks_rate_limited {
                ServiceError::RateLimited(body)
            } else {
                ServiceError::Network(format!("HTTP {}: {}", status, body))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawMetadata {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    keywords: Vec<String>,
}

impl From<RawMetadata> for ItemMetadata {
    fn from(raw: RawMetadata) -> Self {
        ItemMetadata {
            title: raw.title,
            description: raw.description,
            keywords: raw.keywords,
        }
    }
}

/// Parse model output into metadata, with defensive JSON extraction.
///
/// Tries a direct parse first, then markdown code blocks, then the
/// first brace-delimited object embedded in surrounding prose.
pub(crate) fn parse_metadata(text: &str) -> Result<ItemMetadata, ServiceError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::EmptyResponse(
            "Model returned no content".to_string(),
        ));
    }

    if let Ok(raw) = serde_json::from_str::<RawMetadata>(trimmed) {
        return Ok(raw.into());
    }

    if let Some(block) = extract_json_block(trimmed) {
        if let Ok(raw) = serde_json::from_str::<RawMetadata>(&block) {
            return Ok(raw.into());
        }
    }

    if let Some(idx) = trimmed.find('{') {
        let candidate = &trimmed[idx..];
        if let Ok(raw) = serde_json::from_str::<RawMetadata>(candidate) {
            return Ok(raw.into());
        }
        if let Some(end) = candidate.rfind('}') {
            if let Ok(raw) = serde_json::from_str::<RawMetadata>(&candidate[..=end]) {
                return Ok(raw.into());
            }
        }
    }

    let preview: String = trimmed.chars().take(200).collect();
    Err(ServiceError::EmptyResponse(format!(
        "Unparseable model output: {}",
        preview
    )))
}

/// Extract JSON from ```json ... ``` code blocks.
fn extract_json_block(text: &str) -> Option<String> {
    let markers = ["```json", "```JSON", "```"];
    for marker in markers {
        if let Some(start) = text.find(marker) {
            let content_start = start + marker.len();
            if let Some(end) = text[content_start..].find("```") {
                return Some(text[content_start..content_start + end].trim().to_string());
            }
        }
    }
    None
}
