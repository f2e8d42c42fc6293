// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity write path.
//!
//! Every write for a user goes through here so the day cache is invalidated
//! before the write is acknowledged.

use crate::db::ActivityStore;
use crate::error::Result;
use crate::models::{ManualActivityRequest, StoredActivity, UserId};
use crate::services::DayCache;
use std::sync::Arc;

pub struct ActivityService {
    store: Arc<dyn ActivityStore>,
    day_cache: Arc<DayCache>,
}

impl ActivityService {
    pub fn new(store: Arc<dyn ActivityStore>, day_cache: Arc<DayCache>) -> Self {
        Self { store, day_cache }
    }

    /// Validate and store a manual activity, then invalidate the user's views.
    pub async fn create_manual(
        &self,
        user_id: &UserId,
        request: ManualActivityRequest,
    ) -> Result<StoredActivity> {
        let activity = request.into_new_activity()?;
        let stored = self.store.insert_manual(user_id, &activity).await?;

        self.day_cache.invalidate(user_id, "manual_insert");

        tracing::info!(
            user_id = %user_id,
            activity_id = %stored.id,
            sport = %activity.sport_type,
            "Created manual activity"
        );

        Ok(stored)
    }

    /// Drop the user's cached views on request.
    pub fn clear_cache(&self, user_id: &UserId) {
        self.day_cache.invalidate(user_id, "user_request");
    }
}
