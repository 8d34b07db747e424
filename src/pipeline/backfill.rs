//! Translation backfill over the `app_details` collection.
//!
//! Walks every document, reads the canonical English `title`/`body`, and
//! fills in the target languages that are still missing. Documents without
//! an English title and body are skipped with a log line. Any translation
//! failure aborts the run; a partial run is safe to re-trigger because only
//! missing languages are filled.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::store::DocStore;
use crate::translate::Translator;

#[derive(Debug, Default, Serialize)]
pub struct BackfillReport {
  pub documents: usize,
  pub translated_languages: usize,
  pub skipped: Vec<String>,
}

#[instrument(level = "info", skip_all)]
pub async fn translate_backfill(
  store: &DocStore,
  translator: &dyn Translator,
  cfg: &PipelineConfig,
) -> Result<BackfillReport, PipelineError> {
  let mut report = BackfillReport::default();

  for (id, doc) in store.list("app_details").await {
    report.documents += 1;

    let title_en = field_en(&doc, "title");
    let body_en = field_en(&doc, "body");
    let (Some(title_en), Some(body_en)) = (title_en, body_en) else {
      warn!(target: "pipeline", %id, "Skipping document without English title/body");
      report.skipped.push(id);
      continue;
    };

    for lang in &cfg.target_languages {
      let has_title = doc["title"].get(lang).is_some();
      let has_body = doc["body"].get(lang).is_some();
      if has_title && has_body {
        continue;
      }

      // Fill each field independently so a half-translated document
      // keeps the half it already has.
      let mut patch = serde_json::Map::new();
      if !has_title {
        let translated = translator.translate(&title_en, lang).await?;
        patch.insert("title".into(), json!({ lang: translated }));
      }
      if !has_body {
        let translated = translator.translate(&body_en, lang).await?;
        patch.insert("body".into(), json!({ lang: translated }));
      }
      store.update("app_details", &id, Value::Object(patch)).await?;
      report.translated_languages += 1;
    }
  }

  info!(
    target: "pipeline",
    documents = report.documents,
    translated_languages = report.translated_languages,
    skipped = report.skipped.len(),
    "Translation backfill finished"
  );
  Ok(report)
}

fn field_en(doc: &Value, field: &str) -> Option<String> {
  doc.get(field)?.get("en")?.as_str().map(str::to_string)
}
