//! Translation client and per-language fan-out.
//!
//! English is canonical: fan-out keeps the caller's original under "en" and
//! fills one entry per target code. A single failing language aborts the
//! whole fan-out (no silent gaps in the stored maps).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, instrument};

use crate::domain::LocalizedText;
use crate::error::PipelineError;

/// Seam for the translation call. The real client talks HTTP; tests script it.
#[async_trait]
pub trait Translator: Send + Sync {
  async fn translate(&self, text: &str, target_lang: &str) -> Result<String, PipelineError>;
}

#[derive(Clone)]
pub struct TranslateClient {
  client: reqwest::Client,
  api_key: String,
  pub base_url: String,
}

impl TranslateClient {
  /// Construct the client if we find TRANSLATE_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("TRANSLATE_API_KEY").ok()?;
    let base_url = std::env::var("TRANSLATE_BASE_URL")
      .unwrap_or_else(|_| "https://translation.googleapis.com".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(10))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url })
  }
}

#[async_trait]
impl Translator for TranslateClient {
  #[instrument(level = "info", skip(self, text), fields(%target_lang, text_len = text.len()))]
  async fn translate(&self, text: &str, target_lang: &str) -> Result<String, PipelineError> {
    let url = format!("{}/language/translate/v2?key={}", self.base_url, self.api_key);
    let body = WireTranslateRequest {
      q: text.to_string(),
      source: "en".into(),
      target: target_lang.to_string(),
      format: "text".into(),
    };

    let res = self
      .client
      .post(&url)
      .json(&body)
      .send()
      .await
      .map_err(|e| PipelineError::Translate { lang: target_lang.to_string(), reason: e.to_string() })?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      return Err(PipelineError::Translate {
        lang: target_lang.to_string(),
        reason: format!("HTTP {}: {}", status, crate::util::trunc_for_log(&body, 200)),
      });
    }

    let body: WireTranslateResponse = res
      .json()
      .await
      .map_err(|e| PipelineError::Translate { lang: target_lang.to_string(), reason: e.to_string() })?;

    body
      .data
      .translations
      .into_iter()
      .next()
      .map(|t| t.translated_text)
      .ok_or_else(|| PipelineError::Translate {
        lang: target_lang.to_string(),
        reason: "empty translations array".into(),
      })
  }
}

/// Fan a canonical English string out into a per-language map.
///
/// The returned map always holds "en" mapped to the untouched input plus one entry
/// per target code. The first failing language aborts the whole call; the
/// caller persists nothing in that case.
#[instrument(level = "info", skip(translator, source), fields(source_len = source.len(), targets = target_langs.len()))]
pub async fn fan_out(
  translator: &dyn Translator,
  source: &str,
  target_langs: &[String],
) -> Result<LocalizedText, PipelineError> {
  let mut map = LocalizedText::new();
  map.insert("en".to_string(), source.to_string());

  for lang in target_langs {
    if lang == "en" {
      continue;
    }
    match translator.translate(source, lang).await {
      Ok(t) => {
        map.insert(lang.clone(), t);
      }
      Err(e) => {
        error!(target: "pipeline", %lang, error = %e, "Translation failed; abandoning fan-out");
        return Err(e);
      }
    }
  }
  Ok(map)
}

// --- Wire DTOs (Translation API v2) ---

#[derive(Serialize)]
struct WireTranslateRequest {
  q: String,
  source: String,
  target: String,
  format: String,
}

#[derive(Deserialize)]
struct WireTranslateResponse {
  data: WireTranslateData,
}

#[derive(Deserialize)]
struct WireTranslateData {
  translations: Vec<WireTranslation>,
}

#[derive(Deserialize)]
struct WireTranslation {
  #[serde(rename = "translatedText")]
  translated_text: String,
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Mutex;

  /// Suffixes the language code; errors on languages listed in `fail_on`.
  struct FakeTranslator {
    fail_on: Vec<&'static str>,
    calls: Mutex<Vec<String>>,
  }

  impl FakeTranslator {
    fn new(fail_on: Vec<&'static str>) -> Self {
      Self { fail_on, calls: Mutex::new(Vec::new()) }
    }
  }

  #[async_trait]
  impl Translator for FakeTranslator {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, PipelineError> {
      self.calls.lock().unwrap().push(target_lang.to_string());
      if self.fail_on.contains(&target_lang) {
        return Err(PipelineError::Translate { lang: target_lang.to_string(), reason: "boom".into() });
      }
      Ok(format!("{} [{}]", text, target_lang))
    }
  }

  #[tokio::test]
  async fn fan_out_keeps_english_untouched_and_covers_targets() {
    let tr = FakeTranslator::new(vec![]);
    let targets = vec!["fr".to_string(), "hi".to_string()];
    let map = fan_out(&tr, "Plant a tree", &targets).await.unwrap();

    assert_eq!(map["en"], "Plant a tree");
    assert_eq!(map["fr"], "Plant a tree [fr]");
    assert_eq!(map["hi"], "Plant a tree [hi]");
    assert_eq!(map.len(), 3);
  }

  #[tokio::test]
  async fn fan_out_skips_english_in_targets() {
    let tr = FakeTranslator::new(vec![]);
    let targets = vec!["en".to_string(), "fr".to_string()];
    let map = fan_out(&tr, "original", &targets).await.unwrap();
    assert_eq!(map["en"], "original");
    assert!(!tr.calls.lock().unwrap().contains(&"en".to_string()));
  }

  #[tokio::test]
  async fn fan_out_hard_fails_on_a_single_language() {
    let tr = FakeTranslator::new(vec!["hi"]);
    let targets = vec!["fr".to_string(), "hi".to_string(), "ru".to_string()];
    let err = fan_out(&tr, "text", &targets).await.unwrap_err();
    assert!(matches!(err, PipelineError::Translate { ref lang, .. } if lang == "hi"));
    // The failing language stops the fan-out; later targets are not called.
    assert!(!tr.calls.lock().unwrap().contains(&"ru".to_string()));
  }
}
