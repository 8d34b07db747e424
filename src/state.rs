//! Application state: the document store, pipeline config, and the external
//! API clients.
//!
//! Both clients are optional at startup (no API key means no client); the
//! HTTP handlers and the trigger dispatcher report a clear error instead of
//! crashing when an operation needs a client that is not configured.

use tracing::{info, instrument};

use crate::config::{load_config_from_env, PipelineConfig};
use crate::gemini::GeminiClient;
use crate::images::HttpImageFetcher;
use crate::seeds::seed_sdg_topics;
use crate::store::DocStore;
use crate::translate::TranslateClient;

pub struct AppState {
    pub store: DocStore,
    pub config: PipelineConfig,
    pub gemini: Option<GeminiClient>,
    pub translator: Option<TranslateClient>,
    pub images: HttpImageFetcher,
}

impl AppState {
    /// Build state from env: load config, seed topics, init API clients.
    #[instrument(level = "info", skip_all)]
    pub async fn new() -> Self {
        let config = load_config_from_env().unwrap_or_default();

        let store = DocStore::new();
        seed_sdg_topics(&store).await;

        let gemini = GeminiClient::from_env();
        match &gemini {
            Some(g) => {
                info!(target: "ecoquest_backend", base_url = %g.base_url, model = %g.model, "Gemini enabled.")
            }
            None => {
                info!(target: "ecoquest_backend", "Gemini disabled (no GEMINI_API_KEY). Evaluation and generation endpoints will fail.")
            }
        }

        let translator = TranslateClient::from_env();
        match &translator {
            Some(t) => info!(target: "ecoquest_backend", base_url = %t.base_url, "Translation enabled."),
            None => {
                info!(target: "ecoquest_backend", "Translation disabled (no TRANSLATE_API_KEY). Fan-out endpoints will fail.")
            }
        }

        Self {
            store,
            config,
            gemini,
            translator,
            images: HttpImageFetcher::from_env(),
        }
    }
}
