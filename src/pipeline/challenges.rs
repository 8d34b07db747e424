//! Weekly challenge generator.
//!
//! For each SDG topic: pull the last 5 stored challenges for that topic and
//! embed them in the prompt as negative examples (a soft "don't repeat"
//! constraint), call the model with the fixed JSON contract, fan the English
//! text out into the target languages, and persist the challenge as active
//! for today..today+7.
//!
//! A failure on one topic (call, parse, translation) is logged and skips
//! that topic only; sibling topics keep running.

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, instrument};

use crate::config::PipelineConfig;
use crate::domain::{Challenge, EvaluationCriterion, GeneratedChallenge};
use crate::error::PipelineError;
use crate::gemini::{GenerateRequest, GenerativeModel, ResponseKind};
use crate::seeds::load_sdg_topics;
use crate::store::DocStore;
use crate::translate::{fan_out, Translator};
use crate::util::fill_template;

/// Outcome of one run, returned to the HTTP caller.
#[derive(Debug, Default, Serialize)]
pub struct ChallengeRunReport {
  pub generated: Vec<String>,
  pub skipped: Vec<SkippedTopic>,
}

#[derive(Debug, Serialize)]
pub struct SkippedTopic {
  pub sdg: String,
  pub reason: String,
}

/// Date-only, UTC-based challenge window: today through today + 7 days.
pub fn challenge_dates(today: NaiveDate) -> (String, String) {
  let end = today + Duration::days(7);
  (today.format("%Y-%m-%d").to_string(), end.format("%Y-%m-%d").to_string())
}

/// Embed the topic and the serialized prior challenges into the template.
pub fn build_challenge_prompt(cfg: &PipelineConfig, sdg: &str, previous_json: &str) -> String {
  fill_template(&cfg.prompts.challenge_user_template, &[("sdg", sdg), ("previous", previous_json)])
}

/// Run generation across every topic in the `sdg` collection.
#[instrument(level = "info", skip_all, fields(%today))]
pub async fn generate_challenges(
  store: &DocStore,
  model: &dyn GenerativeModel,
  translator: &dyn Translator,
  cfg: &PipelineConfig,
  today: NaiveDate,
) -> ChallengeRunReport {
  let topics = load_sdg_topics(store).await;
  let mut report = ChallengeRunReport::default();

  for sdg in topics {
    match generate_for_topic(store, model, translator, cfg, &sdg, today).await {
      Ok(id) => {
        info!(target: "pipeline", %sdg, challenge_id = %id, "Challenge generated");
        report.generated.push(sdg);
      }
      Err(e) => {
        error!(target: "pipeline", %sdg, error = %e, "Topic failed; continuing with remaining topics");
        report.skipped.push(SkippedTopic { sdg, reason: e.to_string() });
      }
    }
  }

  info!(
    target: "pipeline",
    generated = report.generated.len(),
    skipped = report.skipped.len(),
    "Challenge generation run finished"
  );
  report
}

async fn generate_for_topic(
  store: &DocStore,
  model: &dyn GenerativeModel,
  translator: &dyn Translator,
  cfg: &PipelineConfig,
  sdg: &str,
  today: NaiveDate,
) -> Result<String, PipelineError> {
  let filter = json!(sdg);
  let previous: Vec<serde_json::Value> = store
    .query("challenges", Some(("sdg", &filter)), "startDate", true, 5)
    .await
    .into_iter()
    .map(|(_, doc)| doc)
    .collect();
  let previous_json =
    serde_json::to_string(&previous).map_err(|e| PipelineError::parse("previous challenges", e))?;

  let prompt = build_challenge_prompt(cfg, sdg, &previous_json);
  let req = GenerateRequest::text(&cfg.prompts.challenge_system, &prompt, ResponseKind::Json, &cfg.generation);
  let response = model.generate(req).await?;
  let generated: GeneratedChallenge =
    serde_json::from_str(&response).map_err(|e| PipelineError::parse("generated challenge", e))?;

  let (start_date, end_date) = challenge_dates(today);

  let title = fan_out(translator, &generated.title, &cfg.target_languages).await?;
  let description = fan_out(translator, &generated.description, &cfg.target_languages).await?;
  let mut evaluation_criteria = Vec::with_capacity(generated.evaluation_criteria.len());
  for criterion in &generated.evaluation_criteria {
    evaluation_criteria.push(EvaluationCriterion {
      criteria: fan_out(translator, &criterion.criteria, &cfg.target_languages).await?,
      max_points: criterion.max_points,
    });
  }

  let challenge = Challenge {
    sdg: sdg.to_string(),
    title,
    description,
    evaluation_criteria,
    start_date,
    end_date,
    active: true,
  };
  let doc = serde_json::to_value(&challenge).map_err(|e| PipelineError::parse("challenge document", e))?;
  Ok(store.create("challenges", doc).await)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::pipeline::testutil::{EchoTranslator, ScriptedModel};
  use crate::seeds::seed_sdg_topics;

  const GOOD_CHALLENGE: &str = r#"{
    "title": "Home Garden Week",
    "description": "Grow herbs on your windowsill.",
    "evaluationCriteria": [
      {"criteria": "Effort shown", "maxPoints": "5"},
      {"criteria": "Photo quality", "maxPoints": 10}
    ]
  }"#;

  fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
  }

  #[test]
  fn window_is_today_plus_seven() {
    let (start, end) = challenge_dates(day("2024-06-01"));
    assert_eq!(start, "2024-06-01");
    assert_eq!(end, "2024-06-08");
  }

  #[tokio::test]
  async fn prior_challenges_are_serialized_into_the_prompt() {
    let store = DocStore::new();
    store
      .create("sdg", json!({"index": 3, "goal": "Good Health and Well-being"}))
      .await;
    for (title, date) in [("Walk 10k steps", "2024-05-01"), ("Cook a healthy meal", "2024-05-08")] {
      store
        .create(
          "challenges",
          json!({"sdg": "SDG 3: Good Health and Well-being", "title": {"en": title}, "startDate": date}),
        )
        .await;
    }

    let model = ScriptedModel::new(vec![Ok(GOOD_CHALLENGE.to_string())]);
    let cfg = PipelineConfig::default();
    let report = generate_challenges(&store, &model, &EchoTranslator, &cfg, day("2024-06-01")).await;
    assert_eq!(report.generated.len(), 1);

    let requests = model.requests.lock().unwrap();
    let prompt = ScriptedModel::prompt_of(&requests[0]);
    assert!(prompt.contains(r#"SDG "SDG 3: Good Health and Well-being""#));
    assert!(prompt.contains("Walk 10k steps"));
    assert!(prompt.contains("Cook a healthy meal"));
    assert_eq!(requests[0].response_kind, ResponseKind::Json);
  }

  #[tokio::test]
  async fn malformed_topic_is_skipped_and_siblings_continue() {
    let store = DocStore::new();
    store.create("sdg", json!({"index": 1, "goal": "No Poverty"})).await;
    store.create("sdg", json!({"index": 2, "goal": "Zero Hunger"})).await;

    let model = ScriptedModel::new(vec![
      Ok("definitely not json".to_string()),
      Ok(GOOD_CHALLENGE.to_string()),
    ]);
    let cfg = PipelineConfig::default();
    let report = generate_challenges(&store, &model, &EchoTranslator, &cfg, day("2024-06-01")).await;

    assert_eq!(report.generated, vec!["SDG 2: Zero Hunger".to_string()]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].sdg, "SDG 1: No Poverty");
  }

  #[tokio::test]
  async fn persisted_challenge_is_active_translated_and_dated() {
    let store = DocStore::new();
    store.create("sdg", json!({"index": 2, "goal": "Zero Hunger"})).await;

    let model = ScriptedModel::new(vec![Ok(GOOD_CHALLENGE.to_string())]);
    let cfg = PipelineConfig::default();
    generate_challenges(&store, &model, &EchoTranslator, &cfg, day("2024-06-01")).await;

    let filter = json!("SDG 2: Zero Hunger");
    let hits = store.query("challenges", Some(("sdg", &filter)), "startDate", true, 5).await;
    assert_eq!(hits.len(), 1);
    let doc = &hits[0].1;
    assert_eq!(doc["active"], true);
    assert_eq!(doc["startDate"], "2024-06-01");
    assert_eq!(doc["endDate"], "2024-06-08");
    assert_eq!(doc["title"]["en"], "Home Garden Week");
    assert_eq!(doc["title"]["fr"], "Home Garden Week [fr]");
    // maxPoints accepted both as string and int.
    assert_eq!(doc["evaluationCriteria"][0]["maxPoints"], 5);
    assert_eq!(doc["evaluationCriteria"][1]["maxPoints"], 10);
    assert_eq!(doc["evaluationCriteria"][0]["criteria"]["hi"], "Effort shown [hi]");
  }

  #[tokio::test]
  async fn full_seed_list_yields_one_call_per_topic() {
    let store = DocStore::new();
    seed_sdg_topics(&store).await;

    let replies = (0..17).map(|_| Ok(GOOD_CHALLENGE.to_string())).collect();
    let model = ScriptedModel::new(replies);
    let cfg = PipelineConfig::default();
    let report = generate_challenges(&store, &model, &EchoTranslator, &cfg, day("2024-06-01")).await;

    assert_eq!(report.generated.len(), 17);
    assert_eq!(model.requests.lock().unwrap().len(), 17);
  }
}
