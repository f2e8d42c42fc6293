// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Peak and mountain-range reference data.

use serde::{Deserialize, Serialize};

/// A summit from the reference `peaks` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub peak_id: u64,
    pub peak_name: String,
    /// Two-letter state code
    pub state: String,
    #[serde(default)]
    pub range_id: Option<u64>,
    pub latitude: f64,
    pub longitude: f64,
    /// Reference column: entry radius in meters
    pub enter_m: f64,
    /// Reference column: exit radius in meters
    pub exit_m: f64,
    /// Reference column: consecutive-point count paired with `exit_m`
    pub exit_consec_points: u32,
}

/// A mountain range grouping peaks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountainRange {
    pub range_id: u64,
    pub range_name: String,
}
