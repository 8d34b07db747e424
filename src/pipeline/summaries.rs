//! Daily motivational summary generator.
//!
//! Exactly one record per calendar date, continuing from the latest stored
//! date (or starting today on an empty store). No topic is passed to the
//! model; it picks one of the 17 goals itself, which keeps the content
//! varied without a topic scheduler.
//!
//! The write is a merge-upsert keyed by the date, so two runs racing on the
//! same "latest date" snapshot collide on one key instead of producing two
//! records. Idempotency per date key is the invariant that makes that safe.

use chrono::{Duration, NaiveDate};
use tracing::{info, instrument, warn};

use crate::config::PipelineConfig;
use crate::domain::SummaryRecord;
use crate::error::PipelineError;
use crate::gemini::{GenerateRequest, GenerativeModel, ResponseKind};
use crate::store::DocStore;
use crate::translate::{fan_out, Translator};

/// The next record's date: one day after the latest stored date, or today
/// when no record exists yet.
pub fn next_summary_date(last: Option<NaiveDate>, today: NaiveDate) -> NaiveDate {
  match last {
    Some(d) => d + Duration::days(1),
    None => today,
  }
}

/// Generate and persist one summary record. Returns the record's date key.
#[instrument(level = "info", skip_all, fields(%today))]
pub async fn generate_summary(
  store: &DocStore,
  model: &dyn GenerativeModel,
  translator: &dyn Translator,
  cfg: &PipelineConfig,
  today: NaiveDate,
) -> Result<String, PipelineError> {
  let last = store
    .query("summaries", None, "date", true, 1)
    .await
    .into_iter()
    .next()
    .and_then(|(_, doc)| {
      let raw = doc.get("date").and_then(|v| v.as_str())?.to_string();
      match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
        Ok(d) => Some(d),
        Err(e) => {
          warn!(target: "pipeline", date = %raw, error = %e, "Unparseable latest summary date; starting from today");
          None
        }
      }
    });

  let date = next_summary_date(last, today).format("%Y-%m-%d").to_string();

  let req = GenerateRequest::text(
    &cfg.prompts.summary_system,
    &cfg.prompts.summary_instruction,
    ResponseKind::Text,
    &cfg.generation,
  );
  let summary = model.generate(req).await?;
  if summary.trim().is_empty() {
    return Err(PipelineError::EmptyGeneration);
  }

  let title = summary.lines().next().unwrap_or("").trim().to_string();

  let title_map = fan_out(translator, &title, &cfg.target_languages).await?;
  let summary_map = fan_out(translator, &summary, &cfg.target_languages).await?;

  let record = SummaryRecord { date: date.clone(), title: title_map, summary: summary_map };
  let doc = serde_json::to_value(&record).map_err(|e| PipelineError::parse("summary record", e))?;
  store.upsert_merge("summaries", &date, doc).await;

  info!(target: "pipeline", %date, title_len = title.len(), summary_len = summary.len(), "Summary stored");
  Ok(date)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::pipeline::testutil::{EchoTranslator, ScriptedModel};
  use serde_json::json;

  fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
  }

  #[test]
  fn date_sequencing_continues_from_latest() {
    assert_eq!(
      next_summary_date(Some(day("2024-05-31")), day("2024-06-10")),
      day("2024-06-01")
    );
    assert_eq!(next_summary_date(None, day("2024-06-01")), day("2024-06-01"));
    // Month boundary.
    assert_eq!(
      next_summary_date(Some(day("2024-02-29")), day("2024-06-10")),
      day("2024-03-01")
    );
  }

  #[tokio::test]
  async fn empty_store_keys_record_by_today_with_first_line_title() {
    let store = DocStore::new();
    let model = ScriptedModel::new(vec![Ok(
      "  A Brighter Tomorrow  \nEvery small action counts.\nKeep going.".to_string(),
    )]);
    let cfg = PipelineConfig::default();

    let date = generate_summary(&store, &model, &EchoTranslator, &cfg, day("2024-06-01"))
      .await
      .unwrap();
    assert_eq!(date, "2024-06-01");

    let doc = store.get("summaries", "2024-06-01").await.unwrap();
    assert_eq!(doc["title"]["en"], "A Brighter Tomorrow");
    assert_eq!(doc["title"]["zh"], "A Brighter Tomorrow [zh]");
    assert!(doc["summary"]["en"].as_str().unwrap().contains("Every small action counts."));
  }

  #[tokio::test]
  async fn next_run_advances_exactly_one_day() {
    let store = DocStore::new();
    store
      .upsert_merge("summaries", "2024-06-03", json!({"date": "2024-06-03", "title": {"en": "x"}}))
      .await;

    let model = ScriptedModel::new(vec![Ok("Title\nBody".to_string())]);
    let cfg = PipelineConfig::default();
    let date = generate_summary(&store, &model, &EchoTranslator, &cfg, day("2024-06-10"))
      .await
      .unwrap();
    assert_eq!(date, "2024-06-04");
  }

  #[tokio::test]
  async fn blank_generation_writes_nothing() {
    let store = DocStore::new();
    let model = ScriptedModel::new(vec![Ok("   \n  ".to_string())]);
    let cfg = PipelineConfig::default();

    let err = generate_summary(&store, &model, &EchoTranslator, &cfg, day("2024-06-01"))
      .await
      .unwrap_err();
    assert!(matches!(err, PipelineError::EmptyGeneration));
    assert!(store.get("summaries", "2024-06-01").await.is_none());
  }

  #[tokio::test]
  async fn sequential_runs_never_duplicate_a_date_key() {
    let store = DocStore::new();
    let cfg = PipelineConfig::default();

    for text in ["First take\nBody one", "Second take\nBody two"] {
      let model = ScriptedModel::new(vec![Ok(text.to_string())]);
      generate_summary(&store, &model, &EchoTranslator, &cfg, day("2024-06-01"))
        .await
        .unwrap();
    }

    // Two runs, two consecutive date keys, one document each.
    let all = store.list("summaries").await;
    assert_eq!(all.len(), 2);
    assert_eq!(store.get("summaries", "2024-06-01").await.unwrap()["title"]["en"], "First take");
    assert_eq!(store.get("summaries", "2024-06-02").await.unwrap()["title"]["en"], "Second take");
  }
}
