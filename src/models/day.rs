// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Day-of-year views over a user's activities.
//!
//! Activities are grouped by "MM-DD" with the year discarded, so every
//! February 3rd on record lands in the same bucket.

use crate::models::activity::ActivityId;
use serde::Serialize;
use std::collections::BTreeMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Date parts sliced from an activity's start timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDateParts {
    /// "MM-DD"
    pub key: String,
    /// "YYYY-MM-DD"
    pub full_date: String,
    /// "HH:MM", or empty when the timestamp has no time segment
    pub time: String,
}

/// Display-oriented projection of one activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivitySummary {
    pub id: Option<ActivityId>,
    pub name: Option<String>,
    pub sport: String,
    #[serde(rename = "dayKey")]
    pub day_key: Option<String>,
    #[serde(rename = "dateLocal")]
    pub date_local: Option<String>,
    #[serde(rename = "startTimeLocal")]
    pub start_time_local: Option<String>,
    pub distance_m: f64,
    pub distance_mi: f64,
    pub moving_time_s: f64,
    pub elapsed_time_s: f64,
    pub elevation_gain_m: f64,
    pub timezone: Option<String>,
    pub utc_offset: Option<f64>,
    pub start_latlng: Option<Vec<f64>>,
    pub end_latlng: Option<Vec<f64>>,
    pub location_city: Option<String>,
    pub location_state: Option<String>,
    pub location_country: Option<String>,
}

/// All activities sharing one day key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DayGroup {
    #[serde(rename = "dayKey")]
    pub day_key: String,
    /// Sorted by local start time, then local date
    pub activities: Vec<ActivitySummary>,
    pub count: u32,
    #[serde(rename = "totalDistanceMi")]
    pub total_distance_mi: f64,
}

/// Activity count per day key, sorted by key.
pub type DayCounts = BTreeMap<String, u32>;
