#![forbid(unsafe_code)]

//! Axum backend for the portfolio site.
//!
//! Exposes the channel-listing endpoint used by the videos page and serves the
//! prebuilt site from `WWW_ROOT` for every other path. Scrapes run on the
//! blocking pool since the HTTP client is synchronous.

use std::{
    net::SocketAddr,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    body::Body,
    extract::{Query, State, rejection::QueryRejection},
    http::{HeaderValue, Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use folio_tools::config::{SettingsOverrides, resolve_server_settings};
use folio_tools::logging::init_tracing;
use folio_tools::scrape::{ChannelVideos, HttpFetcher, PageFetcher, ScrapeError, scrape_channel};
use mime_guess::MimeGuess;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::{fs::File, signal};
use tokio_util::io::ReaderStream;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

const CHANNEL_URL_REQUIRED: &str = "channelUrl required";
const CHANNEL_URL_SCHEME: &str = "channelUrl must be an http(s) URL";
const INVALID_QUERY: &str = "Invalid query string";
const EXTRACT_FAILED: &str = "Could not extract ytInitialData";
const SCRAPE_FAILED: &str = "Scrape failed";

#[derive(Debug, Parser)]
#[command(name = "backend", about = "Serve the portfolio site and its channel-listing API")]
struct BackendArgs {
    /// Address to listen on (overrides FOLIO_HOST).
    #[arg(long)]
    host: Option<String>,
    /// Port to listen on (overrides FOLIO_PORT).
    #[arg(long)]
    port: Option<u16>,
    /// Directory holding the prebuilt site (overrides WWW_ROOT).
    #[arg(long)]
    www_root: Option<PathBuf>,
    /// Alternate `.env` file.
    #[arg(long)]
    env_file: Option<PathBuf>,
}

impl BackendArgs {
    fn into_overrides(self) -> SettingsOverrides {
        SettingsOverrides {
            host: self.host,
            port: self.port,
            www_root: self.www_root,
            env_path: self.env_file,
        }
    }
}

#[derive(Clone)]
struct AppState {
    fetcher: Arc<dyn PageFetcher>,
    www_root: Option<Arc<PathBuf>>,
}

impl AppState {
    fn new(fetcher: Arc<dyn PageFetcher>, www_root: Option<PathBuf>) -> Self {
        Self {
            fetcher,
            www_root: www_root.map(Arc::new),
        }
    }
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
    detail: Option<String>,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            detail: None,
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn bad_query(rejection: QueryRejection) -> Self {
        Self {
            detail: Some(rejection.body_text()),
            ..Self::bad_request(INVALID_QUERY)
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// 500 with the underlying cause attached for diagnostics.
    fn scrape_failed(detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
            ..Self::internal(SCRAPE_FAILED)
        }
    }
}

impl From<ScrapeError> for ApiError {
    fn from(err: ScrapeError) -> Self {
        match err {
            ScrapeError::MissingInitialData { .. } => Self::internal(EXTRACT_FAILED),
            other => Self::scrape_failed(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({ "error": self.message });
        if let Some(detail) = self.detail {
            body["detail"] = Value::String(detail);
        }
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let settings = resolve_server_settings(BackendArgs::parse().into_overrides())?;

    match &settings.www_root {
        Some(root) if !root.is_dir() => {
            warn!(root = %root.display(), "WWW_ROOT is not a directory; static files will 404")
        }
        Some(root) => info!(root = %root.display(), "serving static site"),
        None => info!("WWW_ROOT not set; serving API only"),
    }

    let state = AppState::new(Arc::new(HttpFetcher::new()), settings.www_root.clone());
    let app = build_router(state);

    let addr = SocketAddr::new(settings.host, settings.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {}", addr))?;
    info!(%addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running API server")?;

    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/youtube-videos", get(channel_videos))
        .fallback(static_fallback)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    // Only graceful shutdown is lost here; Ctrl+C still ends the process.
    if let Err(err) = signal::ctrl_c().await {
        error!(%err, "failed to install Ctrl+C handler");
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelVideosQuery {
    channel_url: Option<String>,
}

async fn channel_videos(
    State(state): State<AppState>,
    query: Result<Query<ChannelVideosQuery>, QueryRejection>,
) -> ApiResult<Json<ChannelVideos>> {
    let Query(query) = query.map_err(|rejection| {
        warn!(%rejection, "rejected channel videos query");
        ApiError::bad_query(rejection)
    })?;
    let channel_url = require_channel_url(query.channel_url.as_deref())?;
    let fetcher = Arc::clone(&state.fetcher);

    let listing = tokio::task::spawn_blocking(move || scrape_channel(&*fetcher, &channel_url))
        .await
        .map_err(|err| {
            error!(%err, "scrape task panicked or was cancelled");
            ApiError::scrape_failed(err.to_string())
        })?
        .map_err(|err| {
            error!(%err, "channel scrape failed");
            ApiError::from(err)
        })?;

    Ok(Json(listing))
}

fn require_channel_url(raw: Option<&str>) -> ApiResult<String> {
    let value = raw
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::bad_request(CHANNEL_URL_REQUIRED))?;
    let lowered = value.to_ascii_lowercase();
    if !(lowered.starts_with("http://") || lowered.starts_with("https://")) {
        return Err(ApiError::bad_request(CHANNEL_URL_SCHEME));
    }
    Ok(value.to_string())
}

async fn static_fallback(State(state): State<AppState>, req: Request<Body>) -> Response {
    let path = req.uri().path();
    if path == "/api" || path.starts_with("/api/") {
        return ApiError::not_found("endpoint not found").into_response();
    }
    let Some(root) = state.www_root.as_deref() else {
        return ApiError::not_found("file not found").into_response();
    };

    match serve_www_path(root, path).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn serve_www_path(root: &Path, request_path: &str) -> ApiResult<Response> {
    let target = resolve_www_path(root, request_path)?;
    match tokio::fs::metadata(&target).await {
        Ok(meta) if meta.is_dir() => stream_file(&target.join("index.html")).await,
        Ok(_) => stream_file(&target).await,
        Err(_) if is_client_route(request_path) => stream_file(&root.join("index.html")).await,
        Err(_) => Err(ApiError::not_found("file not found")),
    }
}

/// Maps a request path onto the site root, refusing anything that is not a
/// plain relative path.
fn resolve_www_path(root: &Path, request_path: &str) -> ApiResult<PathBuf> {
    let trimmed = request_path.trim_start_matches('/');
    if trimmed.is_empty() {
        return Ok(root.to_path_buf());
    }
    let candidate = Path::new(trimmed);
    if candidate
        .components()
        .any(|component| !matches!(component, Component::Normal(_)))
    {
        return Err(ApiError::not_found("file not found"));
    }
    Ok(root.join(candidate))
}

/// Extension-less paths belong to the client-side router and get `index.html`.
fn is_client_route(request_path: &str) -> bool {
    Path::new(request_path.trim_start_matches('/'))
        .extension()
        .is_none()
}

async fn stream_file(path: &Path) -> ApiResult<Response> {
    let file = File::open(path)
        .await
        .map_err(|_| ApiError::not_found("file not found"))?;
    let mut response = Body::from_stream(ReaderStream::new(file)).into_response();
    if let Some(mime) = MimeGuess::from_path(path).first()
        && let Ok(value) = HeaderValue::from_str(mime.as_ref())
    {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    Ok(response)
}
