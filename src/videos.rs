#![forbid(unsafe_code)]

//! Turns a channel page's initial-data tree into a flat list of videos.
//!
//! The tree has no published schema and its renderer names shift between page
//! templates. Each place where more than one shape is known is expressed as an
//! ordered table of candidate extractors; the first one that yields something
//! wins.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::json_path::{runs_text, simple_or_runs, walk, walk_array, walk_str};

const TABS_PATH: &str = "contents.twoColumnBrowseResultsRenderer.tabs";
const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

/// Tab titles are localized; the channels we scrape are French or English.
static VIDEOS_TAB_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)vid[ée]os").expect("static regex is valid"));

/// Content keys that mark a tab as holding a video grid.
const GRID_KEYS: &[&str] = &["richGridRenderer", "sectionListRenderer"];

/// One video listed on a channel page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub id: String,
    pub title: String,
    pub url: String,
    pub thumbnail: Option<String>,
    pub published_text: Option<String>,
    pub description: String,
}

/// Canonical watch page for a video id.
pub fn watch_url(video_id: &str) -> String {
    format!("{WATCH_URL_PREFIX}{video_id}")
}

type GridShape = fn(&Value) -> Vec<&Value>;
type ItemShape = fn(&Value) -> Option<&Value>;

/// Grid containers in the order they are tried.
const GRID_SHAPES: &[(&str, GridShape)] = &[
    ("richGrid", rich_grid_items),
    ("sectionList", section_list_items),
];

/// Per-item wrappers in the order they are tried.
const ITEM_SHAPES: &[(&str, ItemShape)] = &[
    ("richItem", rich_item_video),
    ("gridVideo", grid_video),
    ("video", bare_video),
];

/// Extracts every video found in the channel's videos tab, in page order.
///
/// A tree without a recognizable tab or grid yields an empty list; items
/// missing a video id are dropped.
pub fn extract_videos(initial_data: &Value) -> Vec<VideoRecord> {
    let Some(tab) = select_videos_tab(initial_data) else {
        debug!("no videos tab found in initial data");
        return Vec::new();
    };

    let items = grid_items(tab);
    let records: Vec<VideoRecord> = items
        .iter()
        .filter_map(|item| video_renderer(item))
        .filter(|renderer| has_video_id(renderer))
        .map(video_record)
        .collect();

    debug!(
        items = items.len(),
        videos = records.len(),
        "extracted videos from grid"
    );
    records
}

/// Picks the tab renderer titled "Videos"/"Vidéos", falling back to the first
/// tab whose content holds a known grid.
fn select_videos_tab(initial_data: &Value) -> Option<&Value> {
    let tabs: Vec<&Value> = walk_array(initial_data, TABS_PATH)?
        .iter()
        .filter_map(|tab| walk(tab, "tabRenderer"))
        .collect();

    let by_title = tabs.iter().copied().find(|tab| {
        walk_str(tab, "title").is_some_and(|title| VIDEOS_TAB_TITLE.is_match(title))
    });
    by_title.or_else(|| {
        tabs.iter().copied().find(|tab| {
            GRID_KEYS
                .iter()
                .any(|key| walk(tab, &format!("content.{key}")).is_some())
        })
    })
}

fn grid_items(tab: &Value) -> Vec<&Value> {
    GRID_SHAPES
        .iter()
        .find_map(|(name, shape)| {
            let items = shape(tab);
            if items.is_empty() {
                None
            } else {
                debug!(shape = name, count = items.len(), "matched grid shape");
                Some(items)
            }
        })
        .unwrap_or_default()
}

fn rich_grid_items(tab: &Value) -> Vec<&Value> {
    walk_array(tab, "content.richGridRenderer.contents")
        .map(|items| items.iter().collect())
        .unwrap_or_default()
}

/// Older template: sections hold item sections, which hold grid renderers.
fn section_list_items(tab: &Value) -> Vec<&Value> {
    let Some(sections) = walk_array(tab, "content.sectionListRenderer.contents") else {
        return Vec::new();
    };
    sections
        .iter()
        .filter_map(|section| walk_array(section, "itemSectionRenderer.contents"))
        .flatten()
        .filter_map(|entry| walk_array(entry, "gridRenderer.items"))
        .flatten()
        .collect()
}

fn rich_item_video(item: &Value) -> Option<&Value> {
    walk(item, "richItemRenderer.content.videoRenderer")
}

fn grid_video(item: &Value) -> Option<&Value> {
    walk(item, "gridVideoRenderer")
}

fn bare_video(item: &Value) -> Option<&Value> {
    walk(item, "videoRenderer")
}

fn video_renderer(item: &Value) -> Option<&Value> {
    ITEM_SHAPES.iter().find_map(|(_, shape)| shape(item))
}

/// Records are only emitted for renderers that carry a usable id.
fn has_video_id(renderer: &Value) -> bool {
    walk_str(renderer, "videoId").is_some_and(|id| !id.trim().is_empty())
}

fn video_record(renderer: &Value) -> VideoRecord {
    let id = walk_str(renderer, "videoId")
        .unwrap_or_default()
        .trim()
        .to_string();
    let title = walk(renderer, "title")
        .and_then(simple_or_runs)
        .unwrap_or_default();
    let published_text = walk(renderer, "publishedTimeText")
        .and_then(simple_or_runs)
        .filter(|text| !text.is_empty());
    let thumbnail = walk_array(renderer, "thumbnail.thumbnails")
        .and_then(|thumbnails| thumbnails.last())
        .and_then(|last| walk_str(last, "url"))
        .map(str::to_string);
    let description = walk(renderer, "descriptionSnippet")
        .and_then(runs_text)
        .unwrap_or_default();

    VideoRecord {
        url: watch_url(&id),
        id,
        title,
        thumbnail,
        published_text,
        description,
    }
}
