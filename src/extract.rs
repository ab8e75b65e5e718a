//! Field extraction over the semi-structured text the node firmware prints.
//!
//! The CoAP client output is not guaranteed to be clean JSON: it can carry
//! log prefixes, trailing noise, or several lines. Every rule here falls
//! back to zero (or `None`) instead of failing.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+)-([0-9]+):([0-9]+):([0-9]+)").expect("duration pattern")
});
static RSL_IN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""rsl_in":\s*(-?[0-9]+)"#).expect("rsl_in pattern"));
static RSL_OUT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""rsl_out":\s*(-?[0-9]+)"#).expect("rsl_out pattern"));
static RPL_RANK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""rpl_rank":\s*([0-9]+)"#).expect("rpl_rank pattern"));

/// Converts a `D-HH:MM:SS` counter on the last non-empty line into minutes,
/// rounded to two decimals. Returns `0.0` when the line does not match.
pub fn extract_duration(raw: &str) -> f64 {
    let Some(line) = raw.lines().map(str::trim).filter(|l| !l.is_empty()).last() else {
        return 0.0;
    };
    match parse_duration_minutes(line) {
        Some(minutes) => minutes,
        None => {
            tracing::warn!(line, "unrecognized duration counter");
            0.0
        }
    }
}

fn parse_duration_minutes(line: &str) -> Option<f64> {
    let caps = DURATION_RE.captures(line)?;
    let group = |idx: usize| -> Option<u64> { caps.get(idx)?.as_str().parse().ok() };
    let days = group(1)?;
    let hours = group(2)?;
    let minutes = group(3)?;
    let seconds = group(4)?;

    let total = days as f64 * 1440.0 + hours as f64 * 60.0 + minutes as f64 + seconds as f64 / 60.0;
    Some(round_hundredths(total))
}

fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Pulls `rsl_in`, `rsl_out` and `rpl_rank` out of the neighbor status text.
/// All three must be present, otherwise the whole triple is zeroed.
pub fn extract_neighbor_fields(raw: &str) -> (i64, i64, u64) {
    match parse_neighbor_fields(raw) {
        Some(fields) => fields,
        None => {
            tracing::warn!("failed to parse neighbor status (rsl_in/rsl_out/rpl_rank)");
            (0, 0, 0)
        }
    }
}

fn parse_neighbor_fields(raw: &str) -> Option<(i64, i64, u64)> {
    let rsl_in = RSL_IN_RE.captures(raw)?.get(1)?.as_str().parse().ok()?;
    let rsl_out = RSL_OUT_RE.captures(raw)?.get(1)?.as_str().parse().ok()?;
    let rpl_rank = RPL_RANK_RE.captures(raw)?.get(1)?.as_str().parse().ok()?;
    Some((rsl_in, rsl_out, rpl_rank))
}

/// Decodes the object spanning the first `{` to the last `}` of `raw`.
pub fn extract_json_object(raw: &str) -> Option<Map<String, Value>> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        tracing::warn!("closing brace precedes opening brace; no JSON object");
        return None;
    }
    match serde_json::from_str::<Map<String, Value>>(&raw[start..=end]) {
        Ok(object) => Some(object),
        Err(err) => {
            tracing::warn!(error = %err, "JSON extraction failed");
            None
        }
    }
}

/// Reads a numeric member as `f64`; numeric strings are accepted, anything
/// else (missing, null, non-finite) reads as zero.
pub fn json_f64(object: &Map<String, Value>, key: &str) -> f64 {
    let value = match object.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Reads a non-negative integer member, truncating fractional numbers.
pub fn json_u64(object: &Map<String, Value>, key: &str) -> u64 {
    match object.get(key) {
        Some(Value::Number(n)) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .map(|v| v.trunc() as u64)
        }),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
    .unwrap_or(0)
}
