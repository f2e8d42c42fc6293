// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Mountain-Grid: a calendar of every activity, by day of the year
//!
//! This crate provides the backend API that stores a user's activities
//! (Strava imports and manual entries) and serves them grouped by
//! month-day across all years.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::ActivityStore;
use services::{ActivityService, DayCache, FirebaseVerifier};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn ActivityStore>,
    pub day_cache: Arc<DayCache>,
    pub activities: ActivityService,
    pub identity: FirebaseVerifier,
}

impl AppState {
    /// Wire the cache and write path around a store.
    pub fn new(config: Config, store: Arc<dyn ActivityStore>, identity: FirebaseVerifier) -> Self {
        let day_cache = Arc::new(DayCache::new(Arc::clone(&store)));
        let activities = ActivityService::new(Arc::clone(&store), Arc::clone(&day_cache));

        Self {
            config,
            store,
            day_cache,
            activities,
            identity,
        }
    }
}
