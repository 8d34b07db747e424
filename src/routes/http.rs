//! HTTP endpoint handlers. These are thin wrappers that forward to pipeline
//! logic. Each handler is instrumented; functions answer 200 on success and
//! 500 with an error message on failure (404 for a missing entry read).

use std::sync::Arc;

use axum::{
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
  Json,
};
use chrono::Utc;
use tracing::{error, info, instrument};

use crate::pipeline::{backfill, challenges, summaries};
use crate::protocol::*;
use crate::state::AppState;

fn internal(e: impl std::fmt::Display) -> (StatusCode, Json<ErrorOut>) {
  (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorOut { error: e.to_string() }))
}

fn not_configured(what: &str) -> (StatusCode, Json<ErrorOut>) {
  error!(target: "ecoquest_backend", %what, "Endpoint hit without a configured client");
  internal(format!("{} client is not configured", what))
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse {
  Json(HealthOut { ok: true })
}

#[instrument(level = "info", skip(state))]
pub async fn http_generate_challenges(
  State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorOut>)> {
  let Some(model) = state.gemini.as_ref() else { return Err(not_configured("gemini")) };
  let Some(translator) = state.translator.as_ref() else { return Err(not_configured("translate")) };

  let today = Utc::now().date_naive();
  let report =
    challenges::generate_challenges(&state.store, model, translator, &state.config, today).await;
  Ok(Json(report))
}

#[instrument(level = "info", skip(state))]
pub async fn http_generate_summary(
  State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorOut>)> {
  let Some(model) = state.gemini.as_ref() else { return Err(not_configured("gemini")) };
  let Some(translator) = state.translator.as_ref() else { return Err(not_configured("translate")) };

  let today = Utc::now().date_naive();
  let date = summaries::generate_summary(&state.store, model, translator, &state.config, today)
    .await
    .map_err(internal)?;
  Ok(Json(SummaryGeneratedOut { date }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_translate_backfill(
  State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorOut>)> {
  let Some(translator) = state.translator.as_ref() else { return Err(not_configured("translate")) };

  let report = backfill::translate_backfill(&state.store, translator, &state.config)
    .await
    .map_err(internal)?;
  Ok(Json(report))
}

/// Create a submission entry. The creation event is what fires evaluation;
/// this endpoint returns immediately and the client polls the entry.
#[instrument(level = "info", skip(state, body), fields(challenge_id = %body.challenge_id, photos = body.photo_urls.len()))]
pub async fn http_create_entry(
  State(state): State<Arc<AppState>>,
  Json(body): Json<EntryIn>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorOut>)> {
  let doc = serde_json::json!({
    "challenge_id": body.challenge_id,
    "entry_description": body.entry_description,
    "photo_urls": body.photo_urls,
    "localLanguage": body.local_language,
    "localLanguageCode": body.local_language_code,
  });
  let id = state.store.create("challenge_entries", doc).await;
  info!(target: "pipeline", entry_id = %id, "Submission entry created");
  Ok((StatusCode::CREATED, Json(EntryCreatedOut { id })))
}

/// Poll surface: an entry without `scores` is still pending (or failed;
/// the two are indistinguishable by design, see the evaluator notes).
#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_entry(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorOut>)> {
  match state.store.get("challenge_entries", &id).await {
    Some(doc) => Ok(Json(doc)),
    None => Err((StatusCode::NOT_FOUND, Json(ErrorOut { error: format!("entry {} not found", id) }))),
  }
}
