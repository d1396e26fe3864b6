//! Computes a drink's ordered image list from request inputs.
//!
//! Pure functions: no I/O, no failure. Malformed JSON degrades to the
//! documented fallbacks instead of erroring.

use serde_json::Value;

/// Parse the `urlImages` form value.
///
/// A JSON array contributes its non-blank string entries. Anything else that
/// is non-blank is taken verbatim (trimmed) as a single URL.
pub fn parse_url_images(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else { return Vec::new() };
    if let Some(list) = parse_string_array(raw) {
        return list;
    }
    let single = raw.trim();
    if single.is_empty() { Vec::new() } else { vec![single.to_string()] }
}

/// Parse the `keptExistingImages` form value.
///
/// `None` means the caller sent nothing usable; `Some(vec![])` is an explicit
/// "keep none of the current images".
pub fn parse_kept_images(raw: Option<&str>) -> Option<Vec<String>> {
    raw.and_then(parse_string_array)
}

fn parse_string_array(raw: &str) -> Option<Vec<String>> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => {
                        let s = s.trim();
                        (!s.is_empty()).then(|| s.to_string())
                    }
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}

/// Images for a new drink: uploads first, then URL images.
pub fn resolve_create(uploaded: Vec<String>, url_images: Option<&str>) -> Vec<String> {
    let mut images = uploaded;
    images.extend(parse_url_images(url_images));
    images
}

/// Images for an edited drink.
///
/// Kept images, then uploads, then URL images. Kept entries the record does
/// not currently hold are dropped. When the result is empty and the caller
/// did not send a kept list at all, the previous images stay.
pub fn resolve_update(
    uploaded: Vec<String>,
    url_images: Option<&str>,
    kept_existing: Option<&str>,
    previous: &[String],
) -> Vec<String> {
    let kept = parse_kept_images(kept_existing)
        .map(|kept| kept.into_iter().filter(|r| previous.contains(r)).collect::<Vec<_>>());
    let explicit = kept.is_some();

    let mut images = kept.unwrap_or_default();
    images.extend(uploaded);
    images.extend(parse_url_images(url_images));

    if images.is_empty() && !explicit {
        return previous.to_vec();
    }
    images
}
