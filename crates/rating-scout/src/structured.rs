//! Read `aggregateRating.ratingValue` out of JSON-LD blocks.
//!
//! Blocks are tried in document order. A block that parses is searched
//! depth-first; a block that does not parse (truncated payloads and
//! template placeholders are common) is scanned with a regex for the
//! `ratingValue` field instead.

use crate::rating::Rating;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Key of the nested rating object on a schema.org node.
pub const AGGREGATE_RATING_KEY: &str = "aggregateRating";
/// Key of the numeric value inside the rating object.
pub const RATING_VALUE_KEY: &str = "ratingValue";

fn rating_value_field_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)"ratingValue"\s*:\s*"?(?P<val>\d+(?:[.,]\d+)?)"?"#)
            .expect("ratingValue regex is valid")
    })
}

/// Find the first `"ratingValue": <numeral>` field in raw text.
///
/// Used for unparseable JSON-LD and as the whole-page markup fallback.
/// Only the first occurrence is considered; if it is out of range the
/// result is `None`.
pub fn scan_rating_value_field(raw: &str) -> Option<Rating> {
    rating_value_field_re()
        .captures(raw)
        .and_then(|caps| caps.name("val"))
        .and_then(|m| Rating::from_numeral(m.as_str()))
}

/// Return the first in-range rating across `blocks`, in order.
pub fn rating_from_blocks<'a, I>(blocks: I) -> Option<Rating>
where
    I: IntoIterator<Item = &'a str>,
{
    blocks.into_iter().find_map(rating_from_block)
}

/// Read a rating from a single JSON-LD block.
pub fn rating_from_block(raw: &str) -> Option<Rating> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(payload) => rating_from_payload(&payload),
        Err(e) => {
            tracing::debug!(error = %e, "JSON-LD block did not parse, scanning raw text");
            scan_rating_value_field(raw)
        }
    }
}

/// Depth-first search of a parsed payload for an aggregate rating.
pub fn rating_from_payload(payload: &Value) -> Option<Rating> {
    visit_objects(payload, &mut aggregate_rating_of)
}

/// Walk `value` depth-first, calling `f` on every object node until it
/// returns `Some`.
///
/// An object is offered to `f` before its members are visited; members are
/// visited in document order, then array elements in order.
pub fn visit_objects<T, F>(value: &Value, f: &mut F) -> Option<T>
where
    F: FnMut(&Map<String, Value>) -> Option<T>,
{
    match value {
        Value::Object(map) => {
            if let Some(found) = f(map) {
                return Some(found);
            }
            map.values().find_map(|child| visit_objects(child, f))
        }
        Value::Array(items) => items.iter().find_map(|item| visit_objects(item, f)),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => None,
    }
}

fn aggregate_rating_of(node: &Map<String, Value>) -> Option<Rating> {
    let rating = node.get(AGGREGATE_RATING_KEY)?.as_object()?;
    coerce_rating(rating.get(RATING_VALUE_KEY)?)
}

/// Coerce a `ratingValue` member: numbers as-is, strings with a decimal comma.
fn coerce_rating(value: &Value) -> Option<Rating> {
    match value {
        Value::Number(n) => n.as_f64().and_then(Rating::new),
        Value::String(s) if !s.trim().is_empty() => Rating::from_numeral(s),
        _ => None,
    }
}
