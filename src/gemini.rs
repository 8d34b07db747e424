//! Minimal Gemini client for our use-cases.
//!
//! We only call generateContent and request either plain text or a strict
//! JSON object. Calls are instrumented and log model name, latencies, and
//! response sizes (not contents).
//!
//! NOTE: We never log the API key and we keep payload truncations short.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::config::GenerationParams;
use crate::error::PipelineError;

/// Which response MIME type we force on the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseKind {
  Json,
  Text,
}

impl ResponseKind {
  fn mime(self) -> &'static str {
    match self {
      ResponseKind::Json => "application/json",
      ResponseKind::Text => "text/plain",
    }
  }
}

/// One piece of a multimodal request: prompt text or an inline image.
#[derive(Clone, Debug)]
pub enum RequestPart {
  Text(String),
  InlineImage { mime_type: String, data_base64: String },
}

/// A full generation request: fixed system instruction, ordered parts,
/// forced response MIME type, and the generation parameters.
#[derive(Clone, Debug)]
pub struct GenerateRequest {
  pub system: String,
  pub parts: Vec<RequestPart>,
  pub response_kind: ResponseKind,
  pub params: GenerationParams,
}

impl GenerateRequest {
  /// Text-only request, the common case for both generators.
  pub fn text(system: &str, prompt: &str, kind: ResponseKind, params: &GenerationParams) -> Self {
    Self {
      system: system.to_string(),
      parts: vec![RequestPart::Text(prompt.to_string())],
      response_kind: kind,
      params: params.clone(),
    }
  }
}

/// Seam for the generative call. The real client talks HTTP; tests script it.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
  async fn generate(&self, req: GenerateRequest) -> Result<String, PipelineError>;
}

#[derive(Clone)]
pub struct GeminiClient {
  client: reqwest::Client,
  api_key: String,
  pub base_url: String,
  pub model: String,
}

impl GeminiClient {
  /// Construct the client if we find GEMINI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("GEMINI_API_KEY").ok()?;
    let base_url = std::env::var("GEMINI_BASE_URL")
      .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".into());
    let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".into());

    // The generative call gets the longest leash of the three externals.
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(60))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, model })
  }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
  #[instrument(level = "info", skip(self, req), fields(model = %self.model, parts = req.parts.len()))]
  async fn generate(&self, req: GenerateRequest) -> Result<String, PipelineError> {
    let url = format!("{}/models/{}:generateContent?key={}", self.base_url, self.model, self.api_key);

    let parts: Vec<WirePart> = req
      .parts
      .iter()
      .map(|p| match p {
        RequestPart::Text(t) => WirePart { text: Some(t.clone()), inline_data: None },
        RequestPart::InlineImage { mime_type, data_base64 } => WirePart {
          text: None,
          inline_data: Some(WireInlineData {
            mime_type: mime_type.clone(),
            data: data_base64.clone(),
          }),
        },
      })
      .collect();

    let body = WireRequest {
      contents: vec![WireContent { role: "user".into(), parts }],
      system_instruction: WireSystemInstruction {
        parts: vec![WirePart { text: Some(req.system.clone()), inline_data: None }],
      },
      generation_config: WireGenerationConfig {
        temperature: req.params.temperature,
        top_p: req.params.top_p,
        top_k: req.params.top_k,
        max_output_tokens: req.params.max_output_tokens,
        response_mime_type: req.response_kind.mime().to_string(),
      },
    };

    let start = std::time::Instant::now();
    let res = self
      .client
      .post(&url)
      .header(USER_AGENT, "ecoquest-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .json(&body)
      .send()
      .await
      .map_err(|e| PipelineError::external("gemini", e))?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_google_error(&body).unwrap_or(body);
      return Err(PipelineError::External {
        what: "gemini",
        reason: format!("HTTP {}: {}", status, msg),
      });
    }

    let body: WireResponse = res.json().await.map_err(|e| PipelineError::external("gemini", e))?;
    if let Some(usage) = &body.usage_metadata {
      info!(
        target: "pipeline",
        prompt_tokens = ?usage.prompt_token_count,
        candidate_tokens = ?usage.candidates_token_count,
        total_tokens = ?usage.total_token_count,
        "Gemini usage"
      );
    }

    let text = body
      .candidates
      .into_iter()
      .next()
      .map(|c| {
        c.content
          .parts
          .into_iter()
          .filter_map(|p| p.text)
          .collect::<Vec<_>>()
          .join("")
      })
      .unwrap_or_default();

    info!(target: "pipeline", elapsed = ?start.elapsed(), response_len = text.len(), "Gemini response received");
    Ok(text)
  }
}

// --- Wire DTOs ---

#[derive(Serialize)]
struct WireRequest {
  contents: Vec<WireContent>,
  #[serde(rename = "systemInstruction")]
  system_instruction: WireSystemInstruction,
  #[serde(rename = "generationConfig")]
  generation_config: WireGenerationConfig,
}

#[derive(Serialize)]
struct WireContent {
  role: String,
  parts: Vec<WirePart>,
}

#[derive(Serialize)]
struct WireSystemInstruction {
  parts: Vec<WirePart>,
}

#[derive(Serialize)]
struct WirePart {
  #[serde(skip_serializing_if = "Option::is_none")]
  text: Option<String>,
  #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
  inline_data: Option<WireInlineData>,
}

#[derive(Serialize)]
struct WireInlineData {
  #[serde(rename = "mimeType")]
  mime_type: String,
  data: String,
}

#[derive(Serialize)]
struct WireGenerationConfig {
  temperature: f32,
  #[serde(rename = "topP")]
  top_p: f32,
  #[serde(rename = "topK")]
  top_k: u32,
  #[serde(rename = "maxOutputTokens")]
  max_output_tokens: u32,
  #[serde(rename = "responseMimeType")]
  response_mime_type: String,
}

#[derive(Deserialize)]
struct WireResponse {
  #[serde(default)]
  candidates: Vec<WireCandidate>,
  #[serde(rename = "usageMetadata", default)]
  usage_metadata: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireCandidate {
  content: WireResponseContent,
}

#[derive(Deserialize)]
struct WireResponseContent {
  #[serde(default)]
  parts: Vec<WireResponsePart>,
}

#[derive(Deserialize)]
struct WireResponsePart {
  #[serde(default)]
  text: Option<String>,
}

#[derive(Deserialize)]
struct WireUsage {
  #[serde(rename = "promptTokenCount", default)]
  prompt_token_count: Option<u32>,
  #[serde(rename = "candidatesTokenCount", default)]
  candidates_token_count: Option<u32>,
  #[serde(rename = "totalTokenCount", default)]
  total_token_count: Option<u32>,
}

/// Try to extract a clean error message from a Google API error body.
fn extract_google_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap {
    error: EObj,
  }
  #[derive(Deserialize)]
  struct EObj {
    message: String,
  }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
