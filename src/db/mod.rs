// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storage layer.
//!
//! Handlers and the day cache talk to an [`ActivityStore`]; the concrete
//! backend (Firestore or in-memory) is picked at startup.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::models::{
    ActivityRecord, AppUser, MountainRange, NewManualActivity, Peak, StoredActivity, UserId,
    VerifiedIdentity,
};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const APP_USERS: &str = "app_users";
    pub const ACTIVITIES: &str = "activities";
    pub const PEAKS: &str = "peaks";
    pub const RANGES: &str = "ranges";
}

/// Durable storage for users, activities and reference data.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Every activity for a user, most recent start first.
    async fn fetch_all(&self, user_id: &UserId) -> Result<Vec<ActivityRecord>, StoreError>;

    /// One page of a user's activities, in the same order as `fetch_all`.
    async fn fetch_page(
        &self,
        user_id: &UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ActivityRecord>, StoreError>;

    /// Store a manually entered activity.
    async fn insert_manual(
        &self,
        user_id: &UserId,
        activity: &NewManualActivity,
    ) -> Result<StoredActivity, StoreError>;

    /// Find the app user for a Firebase identity, creating it on first sight.
    async fn get_or_create_user(&self, identity: &VerifiedIdentity)
        -> Result<AppUser, StoreError>;

    /// Peaks ordered by name, optionally restricted to one state.
    async fn list_peaks(&self, state: Option<&str>, limit: u32) -> Result<Vec<Peak>, StoreError>;

    /// Mountain ranges ordered by id.
    async fn list_ranges(&self) -> Result<Vec<MountainRange>, StoreError>;
}

/// Document ID for a new manual activity.
pub(crate) fn manual_activity_id(user_id: &UserId, now: chrono::DateTime<chrono::Utc>) -> String {
    format!(
        "manual-{}-{}",
        user_id,
        now.timestamp_nanos_opt().unwrap_or_else(|| now.timestamp_micros())
    )
}

/// Stored timestamp text: RFC 3339, whole seconds, `Z` suffix.
pub(crate) fn format_timestamp(at: chrono::DateTime<chrono::Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// App user document ID for a Firebase uid.
pub(crate) fn app_user_id(firebase_uid: &str) -> UserId {
    UserId::from(format!("fb-{firebase_uid}"))
}

/// Order stored activities most recent first, undated last.
pub(crate) fn sort_newest_first(activities: &mut [StoredActivity]) {
    activities.sort_by(|a, b| match (&a.start_date, &b.start_date) {
        (Some(a), Some(b)) => b.cmp(a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}
