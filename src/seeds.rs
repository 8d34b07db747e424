//! Seed data: the 17 SDG topics the generators iterate over.
//!
//! Topics live in the `sdg` collection so an operator can re-order or trim
//! them without a redeploy; this module only guarantees the collection is
//! never empty on a fresh store.

use serde_json::json;
use tracing::info;

use crate::store::DocStore;

/// The 17 goals, in canonical index order.
pub const SDG_GOALS: [&str; 17] = [
  "No Poverty",
  "Zero Hunger",
  "Good Health and Well-being",
  "Quality Education",
  "Gender Equality",
  "Clean Water and Sanitation",
  "Affordable and Clean Energy",
  "Decent Work and Economic Growth",
  "Industry, Innovation and Infrastructure",
  "Reduced Inequalities",
  "Sustainable Cities and Communities",
  "Responsible Consumption and Production",
  "Climate Action",
  "Life Below Water",
  "Life on Land",
  "Peace, Justice and Strong Institutions",
  "Partnerships for the Goals",
];

/// Insert the built-in topics when the `sdg` collection is empty.
pub async fn seed_sdg_topics(store: &DocStore) {
  if !store.list("sdg").await.is_empty() {
    return;
  }
  for (i, goal) in SDG_GOALS.iter().enumerate() {
    store
      .create("sdg", json!({ "index": (i + 1) as u32, "goal": goal }))
      .await;
  }
  info!(target: "ecoquest_backend", count = SDG_GOALS.len(), "Seeded SDG topics");
}

/// Topic strings as the generator prompt embeds them, ordered by index.
pub async fn load_sdg_topics(store: &DocStore) -> Vec<String> {
  store
    .query("sdg", None, "index", false, usize::MAX)
    .await
    .into_iter()
    .filter_map(|(_, doc)| {
      let index = doc.get("index").and_then(|v| v.as_u64())?;
      let goal = doc.get("goal").and_then(|v| v.as_str())?;
      Some(format!("SDG {}: {}", index, goal))
    })
    .collect()
}
