// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Lenient field decoders for activity payloads.
//!
//! Imported payloads come from Strava exports and older app versions, so
//! any field may be missing, `null`, or of the wrong JSON type. These
//! decoders turn anything unusable into `None` instead of failing the
//! whole record.

use crate::models::activity::ActivityId;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Decode an activity id: a non-negative integer or a string. Anything
/// else (negative, fractional, bool, object) becomes `None`.
pub fn activity_id<'de, D>(deserializer: D) -> Result<Option<ActivityId>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => Ok(n.as_u64().map(ActivityId::Numeric)),
        Some(Value::String(s)) => Ok(Some(ActivityId::Text(s))),
        _ => Ok(None),
    }
}

/// Decode a finite number from a JSON number or a numeric string.
pub fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(as_finite_f64))
}

/// Decode a string, ignoring any other JSON type.
pub fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Ok(Some(s)),
        _ => Ok(None),
    }
}

/// Decode a coordinate array. Non-arrays become `None`; non-numeric
/// elements are dropped.
pub fn coordinates<'de, D>(deserializer: D) -> Result<Option<Vec<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Ok(Some(items.iter().filter_map(as_finite_f64).collect())),
        _ => Ok(None),
    }
}

fn as_finite_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}
