#![forbid(unsafe_code)]

//! Command-line front end for the channel scraper.
//!
//! Prints the same JSON body the backend returns, which makes it handy for
//! checking a channel by hand or for debugging a saved page after the site
//! layout changes.

use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result, bail};
use clap::Parser;
use folio_tools::logging::init_tracing;
use folio_tools::scrape::{
    ChannelVideos, HttpFetcher, extract_from_html, scrape_channel, videos_page_url,
};
use tracing::error;

#[derive(Debug, Parser)]
#[command(name = "scrape_channel", about = "List the videos published on a channel")]
struct ScrapeArgs {
    /// Channel URL, e.g. https://www.youtube.com/@handle
    channel_url: String,
    /// Parse a saved copy of the videos page instead of fetching it.
    #[arg(long, value_name = "FILE")]
    html: Option<PathBuf>,
    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,
}

fn main() -> ExitCode {
    init_tracing();
    let args = ScrapeArgs::parse();
    match run(&args) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &ScrapeArgs) -> Result<String> {
    let listing = match &args.html {
        Some(path) => listing_from_file(&args.channel_url, path)?,
        None => scrape_channel(&HttpFetcher::new(), &args.channel_url)
            .with_context(|| format!("scraping {}", args.channel_url))?,
    };
    render(&listing, args.pretty)
}

fn listing_from_file(channel_url: &str, path: &Path) -> Result<ChannelVideos> {
    let page = fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    let Some(videos) = extract_from_html(&page) else {
        bail!("could not extract ytInitialData from {}", path.display());
    };
    Ok(ChannelVideos::new(videos_page_url(channel_url), videos))
}

fn render(listing: &ChannelVideos, pretty: bool) -> Result<String> {
    let rendered = if pretty {
        serde_json::to_string_pretty(listing)
    } else {
        serde_json::to_string(listing)
    };
    rendered.context("serializing listing")
}
