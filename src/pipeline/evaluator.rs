//! Submission evaluator.
//!
//! Flow:
//! 1) Fetch the originating challenge (abandon on NotFound).
//! 2) Build the evaluation prompt from the challenge's English content.
//! 3) Download and inline each photo, then make one generative call (JSON MIME).
//! 4) Strict parse, then one store update setting all four evaluation fields.
//!
//! At-most-once: any failure leaves the entry unevaluated and is only
//! logged; the creation trigger never fires twice for the same entry.

use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument};

use crate::config::PipelineConfig;
use crate::domain::{localized, Challenge, Evaluation, SubmissionEntry};
use crate::error::PipelineError;
use crate::gemini::{GenerateRequest, GenerativeModel, RequestPart, ResponseKind};
use crate::images::{inline_image_part, ImageFetcher};
use crate::store::DocStore;
use crate::util::fill_template;

/// Build the evaluation prompt: challenge title/description, the entry's
/// free text, and the criteria enumerated in stored order with their point
/// ceilings. The template carries the JSON contract and the instruction not
/// to reword criteria.
pub fn build_evaluation_prompt(
  cfg: &PipelineConfig,
  challenge: &Challenge,
  entry: &SubmissionEntry,
) -> String {
  let mut criteria_list = String::new();
  for (i, criterion) in challenge.evaluation_criteria.iter().enumerate() {
    criteria_list.push_str(&format!(
      "({}) {}: max {} points\n",
      i + 1,
      localized(&criterion.criteria, "en"),
      criterion.max_points
    ));
  }

  fill_template(
    &cfg.prompts.evaluation_user_template,
    &[
      ("title", localized(&challenge.title, "en")),
      ("description", localized(&challenge.description, "en")),
      ("entry_description", &entry.entry_description),
      ("criteria_list", criteria_list.trim_end()),
      ("local_language", &entry.local_language),
    ],
  )
}

/// Parse the model's response against the evaluation contract.
pub fn parse_evaluation(text: &str) -> Result<Evaluation, PipelineError> {
  serde_json::from_str::<Evaluation>(text).map_err(|e| PipelineError::parse("evaluation response", e))
}

/// Evaluate one submission entry end to end.
///
/// Either all four evaluation fields are written in a single update, or the
/// entry is left untouched; there is no partial state.
#[instrument(level = "info", skip_all, fields(%entry_id, challenge_id = %entry.challenge_id, photos = entry.photo_urls.len()))]
pub async fn evaluate_submission(
  store: &DocStore,
  model: &dyn GenerativeModel,
  images: &dyn ImageFetcher,
  cfg: &PipelineConfig,
  entry_id: &str,
  entry: &SubmissionEntry,
) -> Result<(), PipelineError> {
  let challenge_doc = store.get("challenges", &entry.challenge_id).await.ok_or_else(|| {
    PipelineError::NotFound { collection: "challenges", id: entry.challenge_id.clone() }
  })?;
  let challenge: Challenge = serde_json::from_value(challenge_doc)
    .map_err(|e| PipelineError::parse("challenge document", e))?;

  let prompt = build_evaluation_prompt(cfg, &challenge, entry);

  // Photos download one at a time; array order is the prompt order.
  let mut parts = vec![RequestPart::Text(prompt)];
  for url in &entry.photo_urls {
    let path = images.fetch(url).await?;
    parts.push(inline_image_part(&path).await?);
  }

  let req = GenerateRequest {
    system: cfg.prompts.evaluation_system.clone(),
    parts,
    response_kind: ResponseKind::Json,
    params: cfg.generation.clone(),
  };
  let response = model.generate(req).await?;
  let evaluation = parse_evaluation(&response)?;
  let criteria_count = evaluation.scores.len();

  store
    .update(
      "challenge_entries",
      entry_id,
      json!({
        "scores": evaluation.scores,
        "totalScore": evaluation.total_score,
        "summary": evaluation.summary,
        "evaluatedAt": Utc::now().to_rfc3339(),
      }),
    )
    .await?;

  info!(
    target: "pipeline",
    %entry_id,
    total_score = evaluation.total_score,
    criteria = criteria_count,
    "Submission evaluated"
  );
  Ok(())
}
