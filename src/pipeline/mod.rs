//! The submission-evaluation and content-generation pipeline.
//!
//! Each unit of work (one evaluation, one topic's generation, one summary
//! run) is an independent, stateless sequence of document reads, external
//! calls, and a single write. All coordination happens through the store;
//! nothing here retries on failure.

pub mod backfill;
pub mod challenges;
pub mod evaluator;
pub mod summaries;
pub mod trigger;

#[cfg(test)]
pub(crate) mod testutil {
  use std::collections::VecDeque;
  use std::path::PathBuf;
  use std::sync::Mutex;

  use async_trait::async_trait;

  use crate::error::PipelineError;
  use crate::gemini::{GenerateRequest, GenerativeModel, RequestPart};
  use crate::images::ImageFetcher;
  use crate::translate::Translator;

  /// Replays scripted responses in order and records every request.
  pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, PipelineError>>>,
    pub requests: Mutex<Vec<GenerateRequest>>,
  }

  impl ScriptedModel {
    pub fn new(replies: Vec<Result<String, PipelineError>>) -> Self {
      Self { replies: Mutex::new(replies.into()), requests: Mutex::new(Vec::new()) }
    }

    pub fn prompt_of(req: &GenerateRequest) -> String {
      req
        .parts
        .iter()
        .filter_map(|p| match p {
          RequestPart::Text(t) => Some(t.clone()),
          _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
    }
  }

  #[async_trait]
  impl GenerativeModel for ScriptedModel {
    async fn generate(&self, req: GenerateRequest) -> Result<String, PipelineError> {
      self.requests.lock().unwrap().push(req);
      self
        .replies
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or(Err(PipelineError::EmptyGeneration))
    }
  }

  /// Tags the source with the target language so tests can assert fan-out.
  pub struct EchoTranslator;

  #[async_trait]
  impl Translator for EchoTranslator {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, PipelineError> {
      Ok(format!("{} [{}]", text, target_lang))
    }
  }

  /// Writes a stub file per URL so the inline-encoding path runs for real.
  pub struct StubFetcher {
    dir: PathBuf,
  }

  impl StubFetcher {
    pub fn new(label: &str) -> Self {
      Self { dir: std::env::temp_dir().join(format!("ecoquest_stub_{}", label)) }
    }
  }

  #[async_trait]
  impl ImageFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<PathBuf, PipelineError> {
      tokio::fs::create_dir_all(&self.dir).await?;
      let path = self.dir.join(crate::util::filename_from_url(url));
      tokio::fs::write(&path, b"stub-jpeg").await?;
      Ok(path)
    }
  }

  /// Always rejects, standing in for a download that dies mid-stream.
  pub struct FailingFetcher;

  #[async_trait]
  impl ImageFetcher for FailingFetcher {
    async fn fetch(&self, url: &str) -> Result<PathBuf, PipelineError> {
      Err(PipelineError::ImageDownload { url: url.to_string(), reason: "stream error".into() })
    }
  }
}
