//! Internal helpers for input validation and document handling.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and conversion logic so every entry point enforces the same
//! invariants.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use unicode_normalization::UnicodeNormalization;

use crate::{EngineError, Money, ResultEngine};

/// Trim and NFC-normalize a label, rejecting empty values.
pub(crate) fn normalize_label(value: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidLabel(
            "label must not be empty".to_string(),
        ));
    }
    Ok(trimmed.nfc().collect())
}

/// Read a loosely typed numeric value (number or numeric string).
///
/// Returns `None` for anything that is not an integral number in `i64`
/// range.
pub(crate) fn integral(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Read a loosely typed amount from a raw document.
///
/// Missing or `null` amounts count as zero; anything else must be a
/// non-negative integer.
pub(crate) fn document_amount(value: Option<&Value>) -> ResultEngine<Money> {
    match value {
        None | Some(Value::Null) => Ok(Money::ZERO),
        Some(v) => {
            let raw = integral(v).ok_or_else(|| {
                EngineError::InvalidDocument(format!("amount is not an integer: {v}"))
            })?;
            Money::non_negative(raw)
        }
    }
}

/// Parse a timestamp from a raw document: RFC 3339, or a bare `YYYY-MM-DD`
/// date taken as midnight UTC. Anything else yields `None`.
pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Deep-merge `patch` into `target`.
///
/// Objects are merged key by key at every nesting level, so keys absent from
/// `patch` keep their value. Any non-object value in `patch` replaces the
/// target value.
pub(crate) fn deep_merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}
