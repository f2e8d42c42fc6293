// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::models::{
    ActivityRecord, AppUser, DayGroup, ManualActivityRequest, MountainRange, Peak, StoredActivity,
    VerifiedIdentity,
};
use crate::services::daily::find_day;
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Route names advertised by the health check.
pub const ADVERTISED_ROUTES: &[&str] = &[
    "by-day",
    "day-counts",
    "activities",
    "activities/manual",
    "cache/clear",
    "peaks",
    "ranges",
];

const MAX_PEAKS: u32 = 5000;

/// Routes that need a verified identity only.
pub fn identity_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/whoami", get(whoami))
}

/// Routes that need a resolved app user.
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/debug/dbuser", get(debug_db_user))
        .route("/api/activities/by-day", get(get_by_day))
        .route("/api/activities/day-counts", get(get_day_counts))
        .route("/api/activities", get(get_activities))
        .route("/api/activities/manual", post(create_manual_activity))
        .route("/api/cache/clear", post(clear_cache))
        .route("/api/peaks", get(get_peaks))
        .route("/api/ranges", get(get_ranges))
}

// ─── Identity ────────────────────────────────────────────────

#[derive(Serialize)]
pub struct WhoAmIResponse {
    pub ok: bool,
    pub user: VerifiedIdentity,
}

async fn whoami(Extension(identity): Extension<VerifiedIdentity>) -> Json<WhoAmIResponse> {
    Json(WhoAmIResponse {
        ok: true,
        user: identity,
    })
}

#[derive(Serialize)]
pub struct DbUserResponse {
    pub ok: bool,
    #[serde(rename = "firebaseUid")]
    pub firebase_uid: String,
    #[serde(rename = "dbUser")]
    pub db_user: AppUser,
}

async fn debug_db_user(
    Extension(identity): Extension<VerifiedIdentity>,
    Extension(user): Extension<AppUser>,
) -> Json<DbUserResponse> {
    Json(DbUserResponse {
        ok: true,
        firebase_uid: identity.uid,
        db_user: user,
    })
}

// ─── Day Views ───────────────────────────────────────────────

#[derive(Deserialize)]
struct ByDayQuery {
    #[serde(rename = "dayKey")]
    day_key: Option<String>,
}

/// Activities grouped by "MM-DD", or one day's group (null if none).
async fn get_by_day(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AppUser>,
    Query(params): Query<ByDayQuery>,
) -> Result<Response> {
    let groups = state.day_cache.grouped(&user.id).await?;

    let response = match params.day_key.as_deref() {
        Some(day_key) => Json(find_day(&groups, day_key)).into_response(),
        None => Json::<&[DayGroup]>(groups.as_slice()).into_response(),
    };

    Ok(response)
}

async fn get_day_counts(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AppUser>,
) -> Result<Response> {
    let counts = state.day_cache.counts(&user.id).await?;
    Ok(Json(&*counts).into_response())
}

// ─── Activities ──────────────────────────────────────────────

#[derive(Deserialize)]
struct ActivitiesQuery {
    limit: Option<u32>,
    #[serde(default)]
    offset: u32,
}

/// Raw activity payloads, most recent first.
async fn get_activities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AppUser>,
    Query(params): Query<ActivitiesQuery>,
) -> Result<Json<Vec<ActivityRecord>>> {
    let max = state.config.activity_list_limit;
    let limit = checked_limit(params.limit, max)?;

    let activities = state
        .store
        .fetch_page(&user.id, limit, params.offset)
        .await?;

    tracing::debug!(
        user_id = %user.id,
        limit,
        offset = params.offset,
        returned = activities.len(),
        "Listed activities"
    );

    Ok(Json(activities))
}

async fn create_manual_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AppUser>,
    Json(request): Json<ManualActivityRequest>,
) -> Result<(StatusCode, Json<StoredActivity>)> {
    let stored = state.activities.create_manual(&user.id, request).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct OkResponse {
    pub ok: bool,
}

async fn clear_cache(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AppUser>,
) -> Json<OkResponse> {
    state.activities.clear_cache(&user.id);
    Json(OkResponse { ok: true })
}

// ─── Reference Data ──────────────────────────────────────────

#[derive(Deserialize)]
struct PeaksQuery {
    state: Option<String>,
    limit: Option<u32>,
}

async fn get_peaks(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PeaksQuery>,
) -> Result<Json<Vec<Peak>>> {
    let limit = checked_limit(params.limit, MAX_PEAKS)?;
    let region = params.state.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let peaks = state.store.list_peaks(region, limit).await?;
    Ok(Json(peaks))
}

async fn get_ranges(State(state): State<Arc<AppState>>) -> Result<Json<Vec<MountainRange>>> {
    Ok(Json(state.store.list_ranges().await?))
}

/// Default to `max`; reject 0 or anything above `max`.
fn checked_limit(requested: Option<u32>, max: u32) -> Result<u32> {
    match requested {
        None => Ok(max),
        Some(limit) if (1..=max).contains(&limit) => Ok(limit),
        Some(_) => Err(AppError::BadRequest(format!(
            "limit must be between 1 and {max}"
        ))),
    }
}
