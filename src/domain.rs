//! Domain models persisted in the document store: challenges, submission
//! entries, daily summaries, and the per-language text maps they carry.
//!
//! Serialized field names match the wire format the mobile client already
//! reads (a mix of snake_case and camelCase, kept as-is for compatibility).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Mapping from language code to translated string.
/// "en" is always present and canonical.
pub type LocalizedText = BTreeMap<String, String>;

/// Build a map holding only the canonical English entry.
pub fn english_only(text: &str) -> LocalizedText {
  let mut map = LocalizedText::new();
  map.insert("en".to_string(), text.to_string());
  map
}

/// Look up a language code, falling back to "en" when absent.
pub fn localized<'a>(map: &'a LocalizedText, lang: &str) -> &'a str {
  map
    .get(lang)
    .or_else(|| map.get("en"))
    .map(String::as_str)
    .unwrap_or("")
}

/// A time-boxed activity definition with scoring criteria.
/// Created by the challenge generator; read-only to the evaluator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Challenge {
  pub sdg: String,
  pub title: LocalizedText,
  pub description: LocalizedText,
  /// Order is stable: the evaluator enumerates criteria in this order and
  /// the English criteria text is the matching key when displaying scores.
  #[serde(rename = "evaluationCriteria")]
  pub evaluation_criteria: Vec<EvaluationCriterion>,
  #[serde(rename = "startDate")]
  pub start_date: String,
  #[serde(rename = "endDate")]
  pub end_date: String,
  pub active: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvaluationCriterion {
  pub criteria: LocalizedText,
  #[serde(rename = "maxPoints", deserialize_with = "de_points")]
  pub max_points: u32,
}

/// A user's evidence (text + photos) submitted against a challenge.
/// Created by the external client; the four evaluation fields are written
/// exactly once by the evaluator, all together or not at all.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmissionEntry {
  pub challenge_id: String,
  pub entry_description: String,
  pub photo_urls: Vec<String>,
  #[serde(rename = "localLanguage")]
  pub local_language: String,
  #[serde(rename = "localLanguageCode")]
  pub local_language_code: String,

  #[serde(default)]
  pub scores: Option<Vec<Score>>,
  #[serde(rename = "totalScore", default)]
  pub total_score: Option<i64>,
  #[serde(default)]
  pub summary: Option<String>,
  #[serde(rename = "evaluatedAt", default)]
  pub evaluated_at: Option<String>,
}

/// One scored criterion. `criteria` must equal the challenge's English
/// criteria text, unmodified (the prompt instructs the model not to reword).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Score {
  pub criteria: String,
  pub score: i64,
}

/// The evaluation JSON contract the model must return.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Evaluation {
  pub scores: Vec<Score>,
  #[serde(rename = "totalScore")]
  pub total_score: i64,
  pub summary: String,
}

/// One long-form motivational piece per calendar day, keyed by ISO date.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SummaryRecord {
  pub date: String,
  pub title: LocalizedText,
  pub summary: LocalizedText,
}

/// The challenge-generation JSON contract. `maxPoints` arrives as either a
/// JSON int or a quoted string depending on the model's mood; accept both.
#[derive(Clone, Debug, Deserialize)]
pub struct GeneratedChallenge {
  pub title: String,
  pub description: String,
  #[serde(rename = "evaluationCriteria")]
  pub evaluation_criteria: Vec<GeneratedCriterion>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GeneratedCriterion {
  pub criteria: String,
  #[serde(rename = "maxPoints", deserialize_with = "de_points")]
  pub max_points: u32,
}

fn de_points<'de, D>(de: D) -> Result<u32, D::Error>
where
  D: serde::Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum IntOrString {
    Int(u32),
    Str(String),
  }
  match IntOrString::deserialize(de)? {
    IntOrString::Int(n) => Ok(n),
    IntOrString::Str(s) => s.trim().parse::<u32>().map_err(serde::de::Error::custom),
  }
}
