use crate::infrastructure::error::{InfraError, google_api_error_message};
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/";
const JSON_MIME_TYPE: &str = "application/json";

/// A model that answers a prompt with JSON text constrained by a response schema.
#[async_trait]
pub trait GenerativeModelClient: Send + Sync {
    async fn generate_json(
        &self,
        prompt: &str,
        response_schema: &serde_json::Value,
    ) -> Result<String, InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestGeminiClient {
    client: Client,
    api_key: String,
    model: String,
}

impl ReqwestGeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    fn generate_endpoint(&self) -> Result<Url, InfraError> {
        let base = Url::parse(GEMINI_API_BASE)
            .map_err(|error| InfraError::ModelApi(format!("invalid model api base url: {error}")))?;
        base.join(&format!("models/{}:generateContent", self.model.trim()))
            .map_err(|error| InfraError::ModelApi(format!("invalid model endpoint: {error}")))
    }
}

#[derive(Debug, serde::Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, serde::Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, serde::Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, serde::Serialize)]
struct GenerationConfig<'a> {
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'a str,
    #[serde(rename = "responseSchema")]
    response_schema: &'a serde_json::Value,
}

#[derive(Debug, serde::Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, serde::Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct CandidateContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, serde::Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

/// Concatenated text parts of the first candidate.
fn extract_response_text(body: &str) -> Result<String, InfraError> {
    let parsed: GenerateContentResponse = serde_json::from_str(body).map_err(|error| {
        InfraError::ModelApi(format!("invalid generateContent payload: {error}; body={body}"))
    })?;

    if let Some(reason) = parsed
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        return Err(InfraError::ModelApi(format!("prompt blocked: {reason}")));
    }

    let candidate = parsed
        .candidates
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or_else(|| InfraError::ModelApi("response did not include candidates".to_string()))?;

    let text = candidate
        .content
        .and_then(|content| content.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|part| part.text)
        .collect::<String>();

    if text.is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
        return Err(InfraError::ModelApi(format!(
            "candidate has no text (finishReason={reason})"
        )));
    }
    Ok(text)
}

#[async_trait]
impl GenerativeModelClient for ReqwestGeminiClient {
    async fn generate_json(
        &self,
        prompt: &str,
        response_schema: &serde_json::Value,
    ) -> Result<String, InfraError> {
        if self.api_key.trim().is_empty() {
            return Err(InfraError::ModelApi("api key must not be empty".to_string()));
        }

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: JSON_MIME_TYPE,
                response_schema,
            },
        };

        let response = self
            .client
            .post(self.generate_endpoint()?)
            .header("x-goog-api-key", self.api_key.trim())
            .json(&request)
            .send()
            .await
            .map_err(|error| InfraError::ModelApi(format!("network error while generating content: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::ModelApi(format!("failed reading generateContent response: {error}")))?;

        if !status.is_success() {
            return Err(InfraError::ModelApi(format!(
                "http {}: {}",
                status.as_u16(),
                google_api_error_message(status.as_u16(), &body)
            )));
        }

        extract_response_text(&body)
    }
}
