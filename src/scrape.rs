#![forbid(unsafe_code)]

//! Fetches a channel's videos page and shapes the extracted listing.
//!
//! The HTTP call sits behind [`PageFetcher`] so the API layer and the CLI can
//! share the same pipeline while tests substitute canned pages.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::initial_data::{INITIAL_DATA_MARKER, locate_initial_data};
use crate::videos::{VideoRecord, extract_videos};

/// Outbound requests give up after this long; there is no retry.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Desktop Chrome identity; the channel page serves a different (script-less)
/// document to unknown clients.
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

pub const HTML_ACCEPT: &str = "text/html,application/xhtml+xml";

const VIDEOS_SUFFIX: &str = "/videos";

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("request to {url} failed: {message}")]
    Fetch { url: String, message: String },
    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("could not extract ytInitialData from {url}")]
    MissingInitialData { url: String },
}

/// Successful scrape payload, serialized as-is by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelVideos {
    pub source: String,
    pub count: usize,
    pub videos: Vec<VideoRecord>,
}

impl ChannelVideos {
    pub fn new(source: String, videos: Vec<VideoRecord>) -> Self {
        Self {
            source,
            count: videos.len(),
            videos,
        }
    }
}

/// Retrieves the HTML body for a URL.
pub trait PageFetcher: Send + Sync {
    fn fetch_html(&self, url: &str) -> Result<String, ScrapeError>;
}

/// Blocking fetcher backed by a shared `ureq` agent.
#[derive(Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::with_timeout(FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch_html(&self, url: &str) -> Result<String, ScrapeError> {
        debug!(url, "fetching channel page");
        let response = self
            .agent
            .get(url)
            .set("User-Agent", DESKTOP_USER_AGENT)
            .set("Accept", HTML_ACCEPT)
            .call()
            .map_err(|err| match err {
                ureq::Error::Status(status, _) => ScrapeError::Status {
                    url: url.to_string(),
                    status,
                },
                ureq::Error::Transport(transport) => ScrapeError::Fetch {
                    url: url.to_string(),
                    message: transport.to_string(),
                },
            })?;
        response.into_string().map_err(|err| ScrapeError::Fetch {
            url: url.to_string(),
            message: format!("reading body: {err}"),
        })
    }
}

/// Builds `<channel>/videos`, ignoring trailing slashes on the channel URL.
pub fn videos_page_url(channel_url: &str) -> String {
    let base = channel_url.trim().trim_end_matches('/');
    format!("{base}{VIDEOS_SUFFIX}")
}

/// Locates and walks the initial data of an already fetched page.
///
/// Returns `None` when the page carries no parseable initial data; an empty
/// list means the data was found but held no videos.
pub fn extract_from_html(page: &str) -> Option<Vec<VideoRecord>> {
    let initial_data = locate_initial_data(page, INITIAL_DATA_MARKER)?;
    Some(extract_videos(&initial_data))
}

/// Fetches the channel's videos page and extracts its listing.
pub fn scrape_channel(
    fetcher: &dyn PageFetcher,
    channel_url: &str,
) -> Result<ChannelVideos, ScrapeError> {
    let source = videos_page_url(channel_url);
    let page = fetcher.fetch_html(&source).inspect_err(|err| {
        warn!(url = %source, %err, "channel page fetch failed");
    })?;

    let Some(videos) = extract_from_html(&page) else {
        warn!(url = %source, bytes = page.len(), "page has no initial data");
        return Err(ScrapeError::MissingInitialData { url: source });
    };

    info!(url = %source, count = videos.len(), "scraped channel videos");
    Ok(ChannelVideos::new(source, videos))
}
