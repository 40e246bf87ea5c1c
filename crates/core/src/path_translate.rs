//! Worker-to-local path translation for harvested results.
//!
//! Output values produced on remote workers may embed absolute paths
//! from the worker's session filesystem. After the output artifacts
//! are downloaded, those paths must be rewritten so they point at the
//! caller-local download location instead.
//!
//! The translation target is identified by a relative suffix of the
//! form `output/<sanitized_workflow_name>`: the one downloaded root
//! whose output listing contains that suffix becomes the new prefix
//! for every matching string.

use std::collections::HashMap;

use serde_json::Value;

/// Sanitize a workflow name for use in filesystem paths.
///
/// Keeps alphanumerics, `-`, `_`, and `.`; every other character is
/// replaced with `_`.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Relative suffix under which a workflow's outputs are written.
pub fn output_suffix(workflow_name: &str) -> String {
    format!("output/{}", sanitize_name(workflow_name))
}

/// Rewrite worker paths embedded in `value` to caller-local paths.
///
/// `downloaded` maps each local download root to the relative output
/// paths placed under it. The root whose listing contains `suffix`
/// becomes the replacement prefix. When no root matches, the value is
/// returned unchanged.
///
/// Strings are rewritten in place by locating the suffix substring and
/// replacing everything before it with the matching local root; maps
/// and arrays are walked structurally; all other values pass through
/// untouched.
pub fn translate_worker_paths(
    value: Value,
    suffix: &str,
    downloaded: &HashMap<String, Vec<String>>,
) -> Value {
    let Some(local_root) = find_matching_root(suffix, downloaded) else {
        return value;
    };
    rewrite(value, suffix, local_root)
}

/// Find the one local root whose output listing contains `suffix`.
/// The listed paths may nest the output directory under intermediate
/// directories, so the suffix can appear anywhere in the path.
fn find_matching_root<'a>(
    suffix: &str,
    downloaded: &'a HashMap<String, Vec<String>>,
) -> Option<&'a str> {
    downloaded
        .iter()
        .find(|(_, paths)| paths.iter().any(|p| p.contains(suffix)))
        .map(|(root, _)| root.as_str())
}

fn rewrite(value: Value, suffix: &str, local_root: &str) -> Value {
    match value {
        Value::String(s) => Value::String(rewrite_string(s, suffix, local_root)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| rewrite(item, suffix, local_root))
                .collect(),
        ),
        Value::Object(entries) => Value::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k, rewrite(v, suffix, local_root)))
                .collect(),
        ),
        other => other,
    }
}

/// Replace everything before the suffix with the local root. Strings
/// that do not contain the suffix pass through unchanged.
fn rewrite_string(s: String, suffix: &str, local_root: &str) -> String {
    match s.find(suffix) {
        Some(pos) => format!("{}/{}", local_root.trim_end_matches('/'), &s[pos..]),
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn downloads(root: &str, paths: &[&str]) -> HashMap<String, Vec<String>> {
        let mut map = HashMap::new();
        map.insert(root.to_string(), paths.iter().map(|p| p.to_string()).collect());
        map
    }

    // -- sanitize_name -----------------------------------------------------

    #[test]
    fn sanitize_keeps_safe_characters() {
        assert_eq!(sanitize_name("render_v2.1-final"), "render_v2.1-final");
    }

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_name("my wf/№7"), "my_wf__7");
    }

    #[test]
    fn output_suffix_uses_sanitized_name() {
        assert_eq!(output_suffix("my wf"), "output/my_wf");
    }

    // -- translate_worker_paths ---------------------------------------------

    #[test]
    fn matching_string_is_rewritten_to_local_root() {
        let map = downloads("/r", &["output/wf/x.png"]);
        let out = translate_worker_paths(
            json!("/sessions/session-abc/assetroot/output/wf/x.png"),
            "output/wf",
            &map,
        );
        assert_eq!(out, json!("/r/output/wf/x.png"));
    }

    #[test]
    fn root_matches_when_outputs_nest_under_intermediate_directories() {
        let map = downloads("/r", &["assetroot/output/wf/x.png"]);
        let out = translate_worker_paths(
            json!("/sessions/session-abc/assetroot/output/wf/x.png"),
            "output/wf",
            &map,
        );
        assert_eq!(out, json!("/r/output/wf/x.png"));
    }

    #[test]
    fn string_without_suffix_passes_through() {
        let map = downloads("/r", &["output/wf/x.png"]);
        let out = translate_worker_paths(json!("/tmp/unrelated.txt"), "output/wf", &map);
        assert_eq!(out, json!("/tmp/unrelated.txt"));
    }

    #[test]
    fn no_matching_root_leaves_value_unchanged() {
        let map = downloads("/r", &["output/other/x.png"]);
        let out = translate_worker_paths(
            json!("/sessions/abc/output/wf/x.png"),
            "output/wf",
            &map,
        );
        assert_eq!(out, json!("/sessions/abc/output/wf/x.png"));
    }

    #[test]
    fn nested_structures_preserve_shape() {
        let map = downloads("/dl", &["output/wf/a.exr", "output/wf/b.exr"]);
        let out = translate_worker_paths(
            json!({
                "frames": ["/w/output/wf/a.exr", "/w/output/wf/b.exr"],
                "count": 2,
                "meta": { "primary": "/w/output/wf/a.exr", "ok": true }
            }),
            "output/wf",
            &map,
        );
        assert_eq!(
            out,
            json!({
                "frames": ["/dl/output/wf/a.exr", "/dl/output/wf/b.exr"],
                "count": 2,
                "meta": { "primary": "/dl/output/wf/a.exr", "ok": true }
            })
        );
    }

    #[test]
    fn non_string_scalars_pass_through() {
        let map = downloads("/r", &["output/wf/x.png"]);
        assert_eq!(translate_worker_paths(json!(42), "output/wf", &map), json!(42));
        assert_eq!(
            translate_worker_paths(Value::Null, "output/wf", &map),
            Value::Null
        );
    }

    #[test]
    fn trailing_slash_on_root_does_not_double() {
        let map = downloads("/r/", &["output/wf/x.png"]);
        let out = translate_worker_paths(json!("/w/output/wf/x.png"), "output/wf", &map);
        assert_eq!(out, json!("/r/output/wf/x.png"));
    }
}
