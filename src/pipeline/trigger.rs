//! Trigger dispatcher: reacts to submission creations.
//!
//! Subscribes to creation events on `challenge_entries` and invokes the
//! evaluator once per event. Failures are logged and the entry stays
//! unevaluated; the trigger fires once per creation, so this is at-most-once
//! by construction. Clients observe a missing `scores` field as "pending".

use std::sync::Arc;

use tracing::{error, info};

use crate::domain::SubmissionEntry;
use crate::pipeline::evaluator::evaluate_submission;
use crate::state::AppState;

/// Spawn the dispatcher task. It runs for the life of the process.
pub async fn spawn_entry_dispatcher(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
  let mut rx = state.store.watch_creates("challenge_entries").await;
  info!(target: "pipeline", "Entry dispatcher listening for submission creations");

  tokio::spawn(async move {
    while let Some(event) = rx.recv().await {
      let entry: SubmissionEntry = match serde_json::from_value(event.doc) {
        Ok(entry) => entry,
        Err(e) => {
          error!(target: "pipeline", entry_id = %event.id, error = %e, "Malformed submission entry; skipping");
          continue;
        }
      };

      let Some(model) = state.gemini.as_ref() else {
        error!(target: "pipeline", entry_id = %event.id, "GEMINI_API_KEY not set; entry left unevaluated");
        continue;
      };

      if let Err(e) =
        evaluate_submission(&state.store, model, &state.images, &state.config, &event.id, &entry).await
      {
        // No retry: the entry stays unevaluated unless re-created externally.
        error!(target: "pipeline", entry_id = %event.id, error = %e, "Evaluation failed");
      }
    }
  })
}
