//! Public request/response structs for the HTTP endpoints (serde ready).
//! Keep this small and stable so operator tooling and the mobile client can
//! evolve independently of the backend internals.

use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

/// Submission creation payload, exactly what the mobile client writes when
/// a user submits evidence against a challenge.
#[derive(Debug, Deserialize)]
pub struct EntryIn {
    pub challenge_id: String,
    pub entry_description: String,
    pub photo_urls: Vec<String>,
    #[serde(rename = "localLanguage")]
    pub local_language: String,
    #[serde(rename = "localLanguageCode")]
    pub local_language_code: String,
}

#[derive(Serialize)]
pub struct EntryCreatedOut {
    pub id: String,
}

#[derive(Serialize)]
pub struct SummaryGeneratedOut {
    pub date: String,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
}
