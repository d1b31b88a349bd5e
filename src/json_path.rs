#![forbid(unsafe_code)]

//! Tolerant lookups into loosely structured JSON trees.
//!
//! Page-embedded data changes shape between site revisions, so every access
//! here treats a missing branch as an ordinary outcome instead of an error.

use serde_json::Value;

/// Resolves a dot-separated key path (`"a.b.c"`) starting at `root`.
///
/// Each segment must land on an object that contains the key. Anything else
/// (a missing key, an array, a scalar, or a trailing `null`) yields `None`.
pub fn walk<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(root, |current, segment| current.as_object()?.get(segment))
        .filter(|value| !value.is_null())
}

/// Like [`walk`], but only succeeds when the target is an array.
pub fn walk_array<'a>(root: &'a Value, path: &str) -> Option<&'a Vec<Value>> {
    walk(root, path)?.as_array()
}

/// Like [`walk`], but only succeeds when the target is a string.
pub fn walk_str<'a>(root: &'a Value, path: &str) -> Option<&'a str> {
    walk(root, path)?.as_str()
}

/// Concatenates the `text` of every entry in a `runs` array.
///
/// Returns `None` when there is no `runs` array at all; an empty array
/// produces an empty string.
pub fn runs_text(value: &Value) -> Option<String> {
    let runs = walk_array(value, "runs")?;
    Some(
        runs.iter()
            .filter_map(|run| walk_str(run, "text"))
            .collect(),
    )
}

/// Reads a text node that is either `{ "simpleText": ... }` or
/// `{ "runs": [{ "text": ... }] }`, preferring a non-empty flat form.
pub fn simple_or_runs(value: &Value) -> Option<String> {
    walk_str(value, "simpleText")
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .or_else(|| runs_text(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn walk_resolves_nested_keys() {
        let root = json!({"a": {"b": {"c": 42}}});
        assert_eq!(walk(&root, "a.b.c"), Some(&json!(42)));
        assert_eq!(walk(&root, "a.b"), Some(&json!({"c": 42})));
    }

    #[test]
    fn walk_missing_segment_is_none() {
        let root = json!({"a": {"b": 1}});
        assert!(walk(&root, "a.x.c").is_none());
        assert!(walk(&root, "missing").is_none());
        assert!(walk(&root, "a.b.c").is_none());
    }

    #[test]
    fn walk_does_not_index_arrays_or_scalars() {
        let root = json!({"list": [{"a": 1}], "text": "hi"});
        assert!(walk(&root, "list.0").is_none());
        assert!(walk(&root, "list.a").is_none());
        assert!(walk(&root, "text.len").is_none());
        assert!(walk(&json!(null), "a").is_none());
        assert!(walk(&json!([1, 2]), "a").is_none());
    }

    #[test]
    fn walk_treats_trailing_null_as_absent() {
        let root = json!({"a": {"b": null}});
        assert!(walk(&root, "a.b").is_none());
        assert!(walk(&root, "a.b.c").is_none());
    }

    #[test]
    fn typed_walkers_check_the_target_kind() {
        let root = json!({"a": {"list": [1], "name": "x"}});
        assert_eq!(walk_array(&root, "a.list").map(Vec::len), Some(1));
        assert!(walk_array(&root, "a.name").is_none());
        assert_eq!(walk_str(&root, "a.name"), Some("x"));
        assert!(walk_str(&root, "a.list").is_none());
    }

    #[test]
    fn simple_or_runs_prefers_simple_text() {
        let node = json!({"simpleText": "flat", "runs": [{"text": "ignored"}]});
        assert_eq!(simple_or_runs(&node).as_deref(), Some("flat"));
    }

    #[test]
    fn empty_simple_text_falls_through_to_runs() {
        let node = json!({"simpleText": "", "runs": [{"text": "Real title"}]});
        assert_eq!(simple_or_runs(&node).as_deref(), Some("Real title"));
        assert!(simple_or_runs(&json!({"simpleText": ""})).is_none());
    }

    #[test]
    fn simple_or_runs_concatenates_runs() {
        let node = json!({"runs": [{"text": "Hello, "}, {"bold": true}, {"text": "world"}]});
        assert_eq!(simple_or_runs(&node).as_deref(), Some("Hello, world"));
        assert!(simple_or_runs(&json!({})).is_none());
    }

    #[test]
    fn runs_text_handles_empty_runs() {
        assert_eq!(runs_text(&json!({"runs": []})).as_deref(), Some(""));
        assert!(runs_text(&json!({"runs": "nope"})).is_none());
    }
}
