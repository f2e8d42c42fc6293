// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process activity store for local development and tests.

use crate::db::{
    app_user_id, format_timestamp, manual_activity_id, sort_newest_first, ActivityStore,
};
use crate::error::StoreError;
use crate::models::activity::SOURCE_STRAVA;
use crate::models::{
    ActivityId, ActivityRecord, AppUser, MountainRange, NewManualActivity, Peak, StoredActivity,
    UserId, VerifiedIdentity,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    /// Keyed by Firebase uid
    users: HashMap<String, AppUser>,
    activities: HashMap<UserId, Vec<StoredActivity>>,
    peaks: Vec<Peak>,
    ranges: Vec<MountainRange>,
}

/// Activity store held entirely in memory.
///
/// Cloning shares the underlying tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed imported activities for a user.
    pub async fn seed_strava_activities(
        &self,
        user_id: &UserId,
        records: impl IntoIterator<Item = ActivityRecord>,
    ) {
        let created_at = format_timestamp(chrono::Utc::now());
        let mut tables = self.tables.write().await;
        let list = tables.activities.entry(user_id.clone()).or_default();

        for record in records {
            let strava_activity_id = match &record.id {
                Some(ActivityId::Numeric(id)) => Some(*id),
                _ => None,
            };
            let id = strava_activity_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| format!("strava-{}-{}", user_id, list.len()));

            list.push(StoredActivity {
                id,
                user_id: user_id.clone(),
                strava_activity_id,
                activity_source: SOURCE_STRAVA.to_string(),
                start_date: record.start_date.clone(),
                created_at: created_at.clone(),
                payload: record,
            });
        }
    }

    /// Replace the peak and range reference tables.
    pub async fn seed_places(&self, peaks: Vec<Peak>, ranges: Vec<MountainRange>) {
        let mut tables = self.tables.write().await;
        tables.peaks = peaks;
        tables.ranges = ranges;
    }

    /// Number of stored activities for a user.
    pub async fn activity_count(&self, user_id: &UserId) -> usize {
        self.tables
            .read()
            .await
            .activities
            .get(user_id)
            .map_or(0, Vec::len)
    }

    async fn sorted_activities(&self, user_id: &UserId) -> Vec<StoredActivity> {
        let mut activities = self
            .tables
            .read()
            .await
            .activities
            .get(user_id)
            .cloned()
            .unwrap_or_default();
        sort_newest_first(&mut activities);
        activities
    }
}

#[async_trait]
impl ActivityStore for MemoryStore {
    async fn fetch_all(&self, user_id: &UserId) -> Result<Vec<ActivityRecord>, StoreError> {
        Ok(self
            .sorted_activities(user_id)
            .await
            .into_iter()
            .map(|a| a.payload)
            .collect())
    }

    async fn fetch_page(
        &self,
        user_id: &UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ActivityRecord>, StoreError> {
        Ok(self
            .sorted_activities(user_id)
            .await
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|a| a.payload)
            .collect())
    }

    async fn insert_manual(
        &self,
        user_id: &UserId,
        activity: &NewManualActivity,
    ) -> Result<StoredActivity, StoreError> {
        let now = chrono::Utc::now();
        let stored = activity.clone().into_stored(
            manual_activity_id(user_id, now),
            user_id.clone(),
            format_timestamp(now),
        );

        self.tables
            .write()
            .await
            .activities
            .entry(user_id.clone())
            .or_default()
            .push(stored.clone());

        Ok(stored)
    }

    async fn get_or_create_user(
        &self,
        identity: &VerifiedIdentity,
    ) -> Result<AppUser, StoreError> {
        let now = format_timestamp(chrono::Utc::now());
        let mut tables = self.tables.write().await;

        let user = tables
            .users
            .entry(identity.uid.clone())
            .and_modify(|user| user.touch(identity, &now))
            .or_insert_with(|| AppUser::new(app_user_id(&identity.uid), identity, &now));

        Ok(user.clone())
    }

    async fn list_peaks(&self, state: Option<&str>, limit: u32) -> Result<Vec<Peak>, StoreError> {
        let tables = self.tables.read().await;
        let mut peaks: Vec<Peak> = tables
            .peaks
            .iter()
            .filter(|p| state.is_none_or(|s| p.state == s))
            .cloned()
            .collect();
        peaks.sort_by(|a, b| a.peak_name.cmp(&b.peak_name));
        peaks.truncate(limit as usize);
        Ok(peaks)
    }

    async fn list_ranges(&self) -> Result<Vec<MountainRange>, StoreError> {
        let mut ranges = self.tables.read().await.ranges.clone();
        ranges.sort_by_key(|r| r.range_id);
        Ok(ranges)
    }
}
