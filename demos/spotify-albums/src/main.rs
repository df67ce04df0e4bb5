//! Spotify albums demo binary
//!
//! Fetches one album through the API middleware and prints its tracks.
//!
//! ```text
//! SPOTIFY_TOKEN=... cargo run -p spotify-albums -- 4aawyAB9vmqN3uQ7FjRGTy
//! ```
//!
//! `SPOTIFY_API_BASE_URL` overrides the API base URL.

use anyhow::Context;
use call_api_core::Middleware;
use call_api_runtime::{ApiConfig, ApiMiddleware, HttpTransport, Store};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use spotify_albums::{AppState, Schemas, app_reducer, fetch_album};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_ALBUM_ID: &str = "4aawyAB9vmqN3uQ7FjRGTy";

fn transport() -> anyhow::Result<HttpTransport> {
    let Ok(token) = std::env::var("SPOTIFY_TOKEN") else {
        tracing::warn!("SPOTIFY_TOKEN is not set; Spotify will reject the request");
        return Ok(HttpTransport::new());
    };

    let mut headers = HeaderMap::new();
    let value = HeaderValue::from_str(&format!("Bearer {token}"))
        .context("SPOTIFY_TOKEN is not a valid header value")?;
    headers.insert(AUTHORIZATION, value);

    let client = reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .context("Failed to build HTTP client")?;
    Ok(HttpTransport::with_client(client))
}

fn config() -> anyhow::Result<ApiConfig> {
    let config = match std::env::var("SPOTIFY_API_BASE_URL") {
        Ok(base_url) => ApiConfig::default().with_base_url(base_url),
        Err(_) => ApiConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spotify_albums=info,call_api_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
    call_api_runtime::metrics::describe_metrics();

    let album_id = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_ALBUM_ID.to_string());

    let schemas = Schemas::new()?;
    let api: Arc<dyn Middleware> = Arc::new(ApiMiddleware::new(config()?, Arc::new(transport()?)));
    let store = Store::with_middleware(AppState::default(), app_reducer(), vec![api]);

    println!("=== Fetching album {album_id} ===\n");

    let pending = store.dispatch(fetch_album(&schemas, &album_id))?;
    println!("Fetching: {}", store.state(|s| s.is_fetching(&album_id)));

    let outcome = pending
        .settled()
        .await?
        .context("Album fetch did not start a call")?;
    println!("Settled with: {}", outcome.action().kind);

    if let Some(message) = store.state(|s| s.error_message.clone()) {
        println!("\nError: {message}");
        return Ok(());
    }

    let (name, tracks) = store.state(|s| {
        let name = s
            .album(&album_id)
            .and_then(|album| album.get("name"))
            .and_then(|name| name.as_str())
            .unwrap_or("<untitled>")
            .to_string();
        (name, s.track_names(&album_id))
    });

    println!("\n{name}");
    for (number, track) in tracks.iter().enumerate() {
        println!("  {:>2}. {track}", number + 1);
    }
    println!(
        "\nEntities cached: {}",
        store.state(|s| s.entities.values().map(|t| t.len()).sum::<usize>())
    );

    Ok(())
}
