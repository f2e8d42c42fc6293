// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod activity;
pub mod coerce;
pub mod day;
pub mod place;
pub mod user;

pub use activity::{
    ActivityId, ActivityRecord, ManualActivityRequest, NewManualActivity, StoredActivity,
};
pub use day::{ActivitySummary, DayCounts, DayGroup, LocalDateParts};
pub use place::{MountainRange, Peak};
pub use user::{AppUser, UserId, VerifiedIdentity};
