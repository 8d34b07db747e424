//! Loading pipeline configuration (prompts, target languages, generation
//! parameters) from TOML.
//!
//! See `PipelineConfig` and `Prompts` for the expected schema. Every field
//! has a working default; the TOML file only overrides what it names.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  pub prompts: Prompts,
  /// One unified target set for challenge and summary fan-out. "en" is the
  /// canonical source and never appears here.
  pub target_languages: Vec<String>,
  pub generation: GenerationParams,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      prompts: Prompts::default(),
      target_languages: default_target_languages(),
      generation: GenerationParams::default(),
    }
  }
}

fn default_target_languages() -> Vec<String> {
  ["ar", "es", "fr", "hi", "ru", "zh"].iter().map(|s| s.to_string()).collect()
}

/// Generation parameters sent on every model call.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
  pub temperature: f32,
  pub top_p: f32,
  pub top_k: u32,
  pub max_output_tokens: u32,
}

impl Default for GenerationParams {
  fn default() -> Self {
    Self { temperature: 1.0, top_p: 0.95, top_k: 64, max_output_tokens: 8192 }
  }
}

/// Prompts used by the pipeline. Defaults mirror the production wording;
/// override them in TOML if you need to tune tone/structure.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  // Challenge generation
  pub challenge_system: String,
  pub challenge_user_template: String,
  // Daily summary generation
  pub summary_system: String,
  pub summary_instruction: String,
  // Submission evaluation
  pub evaluation_system: String,
  pub evaluation_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      challenge_system: "Easy to understand. Be positive, no hatred.".into(),
      challenge_user_template: r#"Generate a weekly challenge related to SDG "{sdg}" that users can complete at home.
Here are the previous challenges: {previous}. Try not to repeat the previous challenges.
The challenge should include title, description, evaluation criteria and points system.
The JSON response must be formatted as below:
{
  "title": "...",
  "description": "...",
  "evaluationCriteria": [
    {
      "criteria": "...",
      "maxPoints": "5"
    },
    {
      "criteria": "...",
      "maxPoints": "5"
    },
    {
      "criteria": "...",
      "maxPoints": "5"
    }
  ]
}"#.into(),
      summary_system: "Easy to understand. Be positive, no hatred. Empathize and motivate.".into(),
      summary_instruction: "Please generate a motivational and positive content piece about one of the 17 SDGs. Avoid any negative or hateful language. The tone should be warm, encouraging, and empowering. Aim for a length of about 1,000 to 1,500 words.".into(),
      evaluation_system: "Easy to understand.".into(),
      evaluation_user_template: r#"Evaluate the following user submission based on the challenge details:
Challenge Title: {title}
Description: {description}
User Submission Description: {entry_description}
User Submission Images: (Attached images)

Instructions:
1. Verify Relevance: Carefully check if the attached images are relevant to the challenge description and user entry. The images should clearly relate to challenge description and user entry.
2. Evaluate Each Criterion:
{criteria_list}
3. Provide Scores: Assign scores for each above-mentioned criterion based on the relevance and quality of the submission. Be strict in assigning scores.
4. Total Score and Summary: Calculate the total score by summing up the individual scores for above-mentioned criteria. Write a short evaluation summary highlighting the strengths and weaknesses of the submission, especially in relation to the images provided. Be polite and encouraging in the summary.
The JSON output must be as follows:
{
  "scores": [
    {
      "criteria": "...",
      "score": int
    },
    ...
  ],
  "totalScore": int,
  "summary": "..."
}
Do not change the wording of criteria at all.
Give summary in {local_language} only."#.into(),
    }
  }
}

/// Attempt to load `PipelineConfig` from PIPELINE_CONFIG_PATH.
/// On any parsing/IO error, returns None and the caller uses defaults.
pub fn load_config_from_env() -> Option<PipelineConfig> {
  let path = std::env::var("PIPELINE_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<PipelineConfig>(&s) {
      Ok(cfg) => {
        info!(target: "ecoquest_backend", %path, "Loaded pipeline config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "ecoquest_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "ecoquest_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_carry_unified_language_set() {
    let cfg = PipelineConfig::default();
    assert!(cfg.target_languages.contains(&"hi".to_string()));
    assert!(!cfg.target_languages.contains(&"en".to_string()));
  }

  #[test]
  fn toml_overrides_only_named_fields() {
    let cfg: PipelineConfig = toml::from_str(
      r#"
      target_languages = ["fr"]
      [generation]
      temperature = 0.5
      top_p = 0.9
      top_k = 32
      max_output_tokens = 1024
      "#,
    )
    .unwrap();
    assert_eq!(cfg.target_languages, vec!["fr".to_string()]);
    assert_eq!(cfg.generation.top_k, 32);
    assert_eq!(cfg.prompts.evaluation_system, "Easy to understand.");
  }
}
