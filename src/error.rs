//! Pipeline error taxonomy.
//!
//! Every failure abandons exactly one unit of work (one submission, one
//! topic, one run). Nothing here retries: re-running a unit is an external
//! decision, because the generative call is neither free nor deterministic.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
  /// A referenced document is missing (e.g. the Challenge behind an entry).
  #[error("{collection}/{id} not found")]
  NotFound { collection: &'static str, id: String },

  /// The model returned blank or whitespace-only content.
  #[error("model returned empty content")]
  EmptyGeneration,

  /// Model output was not valid JSON for the expected contract.
  #[error("failed to parse {what}: {source}")]
  Parse {
    what: &'static str,
    #[source]
    source: serde_json::Error,
  },

  /// Network error, rate limit, non-2xx status or timeout on an external call.
  #[error("{what} call failed: {reason}")]
  External { what: &'static str, reason: String },

  #[error("image download failed for {url}: {reason}")]
  ImageDownload { url: String, reason: String },

  /// A single target language failed; the whole fan-out is abandoned.
  #[error("translation to '{lang}' failed: {reason}")]
  Translate { lang: String, reason: String },

  #[error(transparent)]
  Io(#[from] std::io::Error),
}

impl PipelineError {
  pub fn parse(what: &'static str, source: serde_json::Error) -> Self {
    PipelineError::Parse { what, source }
  }

  pub fn external(what: &'static str, e: impl std::fmt::Display) -> Self {
    PipelineError::External { what, reason: e.to_string() }
  }
}
