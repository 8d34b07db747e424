//! Image retrieval: download a remote photo to transient local storage so it
//! can be inlined (base64, image/jpeg) into a generative request.
//!
//! The local filename is the URL's last path segment with the query string
//! stripped. The download is streamed chunk-by-chunk; the operation resolves
//! only when the stream completes and rejects on any stream error, so a
//! half-written file is never handed to the evaluator.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};

use crate::error::PipelineError;
use crate::gemini::RequestPart;
use crate::util::filename_from_url;

/// Seam for image downloads. The real fetcher talks HTTP; tests script it.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
  async fn fetch(&self, url: &str) -> Result<PathBuf, PipelineError>;
}

pub struct HttpImageFetcher {
  client: reqwest::Client,
  dir: PathBuf,
}

impl HttpImageFetcher {
  pub fn from_env() -> Self {
    let dir = std::env::var("IMAGE_TMP_DIR")
      .map(PathBuf::from)
      .unwrap_or_else(|_| std::env::temp_dir().join("ecoquest_images"));

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .unwrap_or_default();

    Self { client, dir }
  }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
  #[instrument(level = "info", skip(self), fields(url = %crate::util::trunc_for_log(url, 120)))]
  async fn fetch(&self, url: &str) -> Result<PathBuf, PipelineError> {
    let dest = self.dir.join(filename_from_url(url));
    tokio::fs::create_dir_all(&self.dir).await?;

    let err = |reason: String| PipelineError::ImageDownload { url: url.to_string(), reason };

    let res = self.client.get(url).send().await.map_err(|e| err(e.to_string()))?;
    if !res.status().is_success() {
      return Err(err(format!("HTTP {}", res.status())));
    }

    let mut file = tokio::fs::File::create(&dest).await?;
    let mut stream = res.bytes_stream();
    while let Some(chunk) = stream.next().await {
      let chunk = chunk.map_err(|e| err(e.to_string()))?;
      file.write_all(&chunk).await?;
    }
    file.flush().await?;

    info!(target: "pipeline", dest = %dest.display(), "Image downloaded");
    Ok(dest)
  }
}

/// Read a downloaded image and wrap it as an inline request part.
/// Everything the client uploads is normalized to JPEG upstream.
pub async fn inline_image_part(path: &Path) -> Result<RequestPart, PipelineError> {
  let bytes = tokio::fs::read(path).await?;
  Ok(RequestPart::InlineImage {
    mime_type: "image/jpeg".to_string(),
    data_base64: base64::engine::general_purpose::STANDARD.encode(bytes),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn inline_part_encodes_file_contents() {
    let dir = std::env::temp_dir().join("ecoquest_images_test");
    tokio::fs::create_dir_all(&dir).await.unwrap();
    let path = dir.join("tiny.jpg");
    tokio::fs::write(&path, b"jpegbytes").await.unwrap();

    let part = inline_image_part(&path).await.unwrap();
    match part {
      RequestPart::InlineImage { mime_type, data_base64 } => {
        assert_eq!(mime_type, "image/jpeg");
        assert_eq!(
          base64::engine::general_purpose::STANDARD.decode(data_base64).unwrap(),
          b"jpegbytes"
        );
      }
      other => panic!("unexpected part: {:?}", other),
    }
  }

  #[tokio::test]
  async fn inline_part_rejects_missing_file() {
    let missing = std::env::temp_dir().join("ecoquest_images_test").join("nope.jpg");
    assert!(inline_image_part(&missing).await.is_err());
  }
}
