#![forbid(unsafe_code)]

//! Locates the bootstrap JSON blob a channel page embeds in an inline script.
//!
//! Two strategies run in order. A pair of non-greedy regexes handles the
//! common `marker = {...};` assignment cheaply; when they miss (or capture a
//! truncated body) a bounded brace scan walks the object from its opening `{`.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

/// Global variable the channel page assigns its initial data to.
pub const INITIAL_DATA_MARKER: &str = "ytInitialData";

/// Upper bound on how far the brace scan may walk past the opening brace.
/// Real pages stay well under this; malformed ones must not scan forever.
pub const MAX_SCAN_BYTES: usize = 8 * 1024 * 1024;

/// Returns the parsed blob assigned to `marker`, or `None` when the page does
/// not contain a parseable object for it.
pub fn locate_initial_data(page: &str, marker: &str) -> Option<Value> {
    if let Some(value) = locate_with_regex(page, marker) {
        return Some(value);
    }
    debug!(marker, "assignment regex missed, falling back to brace scan");
    locate_with_scan(page, marker)
}

static DEFAULT_PATTERNS: LazyLock<Vec<Regex>> =
    LazyLock::new(|| assignment_patterns(INITIAL_DATA_MARKER));

fn assignment_patterns(marker: &str) -> Vec<Regex> {
    let marker = regex::escape(marker);
    [
        format!(r"(?s){marker}\s*=\s*(\{{.*?\}});"),
        format!(r#"(?s)window\[\s*["']{marker}["']\s*\]\s*=\s*(\{{.*?\}});"#),
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
}

fn locate_with_regex(page: &str, marker: &str) -> Option<Value> {
    let custom;
    let patterns: &[Regex] = if marker == INITIAL_DATA_MARKER {
        DEFAULT_PATTERNS.as_slice()
    } else {
        custom = assignment_patterns(marker);
        custom.as_slice()
    };
    patterns.iter().find_map(|pattern| {
        let body = pattern.captures(page)?.get(1)?.as_str();
        serde_json::from_str(body).ok()
    })
}

fn locate_with_scan(page: &str, marker: &str) -> Option<Value> {
    let candidate = balanced_object_after(page, marker)?;
    match serde_json::from_str(candidate) {
        Ok(value) => Some(value),
        Err(err) => {
            debug!(marker, %err, "brace scan produced unparseable JSON");
            None
        }
    }
}

/// Slices out the first balanced `{...}` following the first occurrence of
/// `marker`. Braces inside string literals are ignored. Running off the end of
/// the page or past [`MAX_SCAN_BYTES`] counts as not found.
fn balanced_object_after<'a>(page: &'a str, marker: &str) -> Option<&'a str> {
    let after_marker = page.find(marker)? + marker.len();
    let open = after_marker + page[after_marker..].find('{')?;
    let limit = page.len().min(open.saturating_add(MAX_SCAN_BYTES));

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, byte) in page.as_bytes()[open..limit].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if *byte == b'\\' {
                escaped = true;
            } else if *byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match *byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&page[open..open + offset + 1]);
                }
            }
            _ => {}
        }
    }

    debug!(
        marker,
        scanned = limit - open,
        "brace scan ended without closing the object"
    );
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page_with(script: &str) -> String {
        format!("<html><head></head><body><script>{script}</script><div>tail</div></body></html>")
    }

    #[test]
    fn finds_bare_assignment() {
        let page = page_with(r#"var ytInitialData = {"a":1,"b":"two"};"#);
        let value = locate_initial_data(&page, INITIAL_DATA_MARKER).unwrap();
        assert_eq!(value, json!({"a": 1, "b": "two"}));
    }

    #[test]
    fn finds_bracket_indexed_assignment() {
        let page = page_with(r#"window["ytInitialData"] = {"tabs":[]};"#);
        let value = locate_initial_data(&page, INITIAL_DATA_MARKER).unwrap();
        assert_eq!(value, json!({"tabs": []}));

        let single = page_with(r#"window['ytInitialData']={"x":true};"#);
        assert_eq!(
            locate_initial_data(&single, INITIAL_DATA_MARKER),
            Some(json!({"x": true}))
        );
    }

    #[test]
    fn regex_and_scan_agree_on_simple_bodies() {
        let page = page_with(r#"ytInitialData = {"a":{"b":[1,2,3]},"c":"d"};"#);
        let from_regex = locate_with_regex(&page, INITIAL_DATA_MARKER).unwrap();
        let from_scan = locate_with_scan(&page, INITIAL_DATA_MARKER).unwrap();
        assert_eq!(from_regex, from_scan);
    }

    #[test]
    fn scan_recovers_when_regex_truncates_body() {
        // The first `};` sits inside a string, so the non-greedy capture stops
        // early and fails to parse.
        let page = page_with(r#"ytInitialData = {"title":"a};b","nested":{"k":"v"}};"#);
        let value = locate_initial_data(&page, INITIAL_DATA_MARKER).unwrap();
        assert_eq!(value, json!({"title": "a};b", "nested": {"k": "v"}}));
    }

    #[test]
    fn scan_handles_missing_terminator() {
        let page = page_with(r#"ytInitialData = {"a":{"b":1}}</script>"#);
        assert!(locate_with_regex(&page, INITIAL_DATA_MARKER).is_none());
        assert_eq!(
            locate_initial_data(&page, INITIAL_DATA_MARKER),
            Some(json!({"a": {"b": 1}}))
        );
    }

    #[test]
    fn scan_ignores_braces_inside_strings() {
        let page = r#"ytInitialData = {"t":"}{ \"}\" {{","n":1}</script>"#;
        assert_eq!(
            balanced_object_after(page, INITIAL_DATA_MARKER),
            Some(r#"{"t":"}{ \"}\" {{","n":1}"#)
        );
    }

    #[test]
    fn missing_marker_is_not_found() {
        let page = page_with(r#"var somethingElse = {"a":1};"#);
        assert!(locate_initial_data(&page, INITIAL_DATA_MARKER).is_none());
    }

    #[test]
    fn marker_without_brace_is_not_found() {
        let page = "<script>var ytInitialData = null;</script>";
        assert!(locate_initial_data(page, INITIAL_DATA_MARKER).is_none());
    }

    #[test]
    fn unterminated_object_is_not_found() {
        let page = r#"<script>ytInitialData = {"a":{"b":[1,2"#;
        assert!(balanced_object_after(page, INITIAL_DATA_MARKER).is_none());
        assert!(locate_initial_data(page, INITIAL_DATA_MARKER).is_none());
    }

    #[test]
    fn invalid_json_is_not_found() {
        let page = "<script>ytInitialData = {not json at all};</script>";
        assert!(locate_initial_data(page, INITIAL_DATA_MARKER).is_none());
    }

    #[test]
    fn scan_stops_at_the_byte_limit() {
        let mut page = String::from(r#"ytInitialData = {"pad":""#);
        page.push_str(&"x".repeat(MAX_SCAN_BYTES));
        page.push_str(r#""}"#);
        assert!(balanced_object_after(&page, INITIAL_DATA_MARKER).is_none());
    }

    #[test]
    fn default_marker_patterns_are_compiled_once() {
        assert_eq!(DEFAULT_PATTERNS.len(), 2);
        let page = page_with(r#"var ytInitialData = {"a":1};"#);
        assert!(DEFAULT_PATTERNS[0].is_match(&page));
        assert_eq!(
            locate_with_regex(&page, INITIAL_DATA_MARKER),
            Some(json!({"a": 1}))
        );
        assert!(locate_with_regex(&page, "ytcfg").is_none());
    }

    #[test]
    fn custom_markers_are_escaped() {
        let page = r#"<script>window.cfg.data = {"ok":1};</script>"#;
        assert_eq!(
            locate_initial_data(page, "window.cfg.data"),
            Some(json!({"ok": 1}))
        );
        assert!(locate_initial_data(page, "windowXcfg.data").is_none());
    }
}
