//! EcoQuest · SDG challenge pipeline backend
//!
//! - Axum HTTP API (generator endpoints + submission surface)
//! - Document-creation trigger driving submission evaluation
//! - Gemini + Translation API integration (via environment variables)
//!
//! Important env variables:
//!   PORT                 : u16 (default 3000)
//!   GEMINI_API_KEY       : enables the generative model if present
//!   GEMINI_BASE_URL      : default "https://generativelanguage.googleapis.com/v1beta"
//!   GEMINI_MODEL         : default "gemini-1.5-flash"
//!   TRANSLATE_API_KEY    : enables the translation API if present
//!   TRANSLATE_BASE_URL   : default "https://translation.googleapis.com"
//!   PIPELINE_CONFIG_PATH : path to TOML config (prompts, languages, params)
//!   IMAGE_TMP_DIR        : where downloaded photos land (default: tmp dir)
//!   LOG_LEVEL            : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT           : "pretty" (default) or "json"

mod config;
mod domain;
mod error;
mod gemini;
mod images;
mod pipeline;
mod protocol;
mod routes;
mod seeds;
mod state;
mod store;
mod telemetry;
mod translate;
mod util;

use std::{net::SocketAddr, sync::Arc};

use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::pipeline::trigger::spawn_entry_dispatcher;
use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Build shared application state (document store, clients, prompts).
  let state = Arc::new(AppState::new().await);

  // The dispatcher must be listening before any entry can be created.
  let _dispatcher = spawn_entry_dispatcher(state.clone()).await;

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state);

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "ecoquest_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
