// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity records (imported from Strava or entered manually).

use crate::error::AppError;
use crate::models::coerce;
use crate::models::user::UserId;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::{Validate, ValidationError};

/// `activity_source` of Strava imports.
pub const SOURCE_STRAVA: &str = "strava";
/// `activity_source` of manually entered activities.
pub const SOURCE_MANUAL: &str = "manual";

/// Message returned when a manual activity is missing required fields.
pub const REQUIRED_FIELDS_MESSAGE: &str =
    "Missing required fields. Required: name, sportType, activityType, startDateLocal, elapsedTime";

/// Activity identifier: numeric for Strava imports, text for manual entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(untagged)]
pub enum ActivityId {
    Numeric(u64),
    Text(String),
}

/// Raw activity payload in Strava's shape.
///
/// Every field is optional and decoded leniently, so a single bad field
/// never makes a whole record unreadable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    #[serde(default, deserialize_with = "coerce::activity_id")]
    pub id: Option<ActivityId>,
    #[serde(default, deserialize_with = "coerce::string")]
    pub name: Option<String>,
    /// Current Strava sport classification
    #[serde(default, deserialize_with = "coerce::string")]
    pub sport_type: Option<String>,
    /// Legacy Strava classification
    #[serde(rename = "type", default, deserialize_with = "coerce::string")]
    pub activity_type: Option<String>,
    /// Local wall-clock start ("YYYY-MM-DDTHH:MM:SSZ", Z notwithstanding)
    #[serde(default, deserialize_with = "coerce::string")]
    pub start_date_local: Option<String>,
    /// UTC start
    #[serde(default, deserialize_with = "coerce::string")]
    pub start_date: Option<String>,
    /// Meters
    #[serde(default, deserialize_with = "coerce::number")]
    pub distance: Option<f64>,
    /// Seconds
    #[serde(default, deserialize_with = "coerce::number")]
    pub moving_time: Option<f64>,
    /// Seconds
    #[serde(default, deserialize_with = "coerce::number")]
    pub elapsed_time: Option<f64>,
    /// Meters
    #[serde(default, deserialize_with = "coerce::number")]
    pub total_elevation_gain: Option<f64>,
    #[serde(default, deserialize_with = "coerce::string")]
    pub timezone: Option<String>,
    /// Seconds east of UTC
    #[serde(default, deserialize_with = "coerce::number")]
    pub utc_offset: Option<f64>,
    #[serde(default, deserialize_with = "coerce::coordinates")]
    pub start_latlng: Option<Vec<f64>>,
    #[serde(default, deserialize_with = "coerce::coordinates")]
    pub end_latlng: Option<Vec<f64>>,
    #[serde(default, deserialize_with = "coerce::string")]
    pub location_city: Option<String>,
    #[serde(default, deserialize_with = "coerce::string")]
    pub location_state: Option<String>,
    #[serde(default, deserialize_with = "coerce::string")]
    pub location_country: Option<String>,
    #[serde(default, deserialize_with = "coerce::string")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "coerce::string")]
    pub notes: Option<String>,
}

/// Stored activity document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredActivity {
    /// Document ID
    pub id: String,
    /// Owning app user
    pub user_id: UserId,
    /// Strava activity ID (imports only)
    #[serde(default)]
    pub strava_activity_id: Option<u64>,
    /// "strava" or "manual"
    pub activity_source: String,
    /// UTC start (ISO 8601), duplicated from the payload for ordering
    #[serde(default)]
    pub start_date: Option<String>,
    /// When the document was written
    pub created_at: String,
    /// Strava-shaped payload
    pub payload: ActivityRecord,
}

/// Body of `POST /api/activities/manual`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ManualActivityRequest {
    #[validate(required, length(min = 1, code = "required"))]
    #[serde(default, deserialize_with = "coerce::string")]
    pub name: Option<String>,
    #[validate(required, length(min = 1, code = "required"))]
    #[serde(default, deserialize_with = "coerce::string")]
    pub sport_type: Option<String>,
    #[validate(required, length(min = 1, code = "required"))]
    #[serde(default, deserialize_with = "coerce::string")]
    pub activity_type: Option<String>,
    #[validate(
        required,
        length(min = 1, code = "required"),
        custom(function = "validate_start_date")
    )]
    #[serde(default, deserialize_with = "coerce::string")]
    pub start_date_local: Option<String>,
    #[validate(range(min = 0.0))]
    #[serde(default, deserialize_with = "coerce::number")]
    pub distance: Option<f64>,
    #[validate(required, range(min = 0.0))]
    #[serde(default, deserialize_with = "coerce::number")]
    pub elapsed_time: Option<f64>,
    #[validate(range(min = 0.0))]
    #[serde(default, deserialize_with = "coerce::number")]
    pub moving_time: Option<f64>,
    #[serde(default, deserialize_with = "coerce::number")]
    pub total_elevation_gain: Option<f64>,
    #[serde(default, deserialize_with = "coerce::string")]
    pub notes: Option<String>,
}

/// A validated manual activity, ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewManualActivity {
    pub name: String,
    pub sport_type: String,
    pub activity_type: String,
    pub start_date_local: String,
    pub distance: Option<f64>,
    pub elapsed_time: f64,
    pub moving_time: Option<f64>,
    pub total_elevation_gain: Option<f64>,
    pub notes: Option<String>,
}

impl ManualActivityRequest {
    /// Validate the request and convert it into a storable activity.
    pub fn into_new_activity(self) -> Result<NewManualActivity, AppError> {
        if let Err(errors) = self.validate() {
            let missing_required = errors
                .field_errors()
                .values()
                .flat_map(|errs| errs.iter())
                .any(|e| e.code == "required");

            return Err(AppError::BadRequest(if missing_required {
                REQUIRED_FIELDS_MESSAGE.to_string()
            } else {
                errors.to_string()
            }));
        }

        match (
            self.name,
            self.sport_type,
            self.activity_type,
            self.start_date_local,
            self.elapsed_time,
        ) {
            (
                Some(name),
                Some(sport_type),
                Some(activity_type),
                Some(start_date_local),
                Some(elapsed_time),
            ) => Ok(NewManualActivity {
                name,
                sport_type,
                activity_type,
                start_date_local,
                distance: self.distance,
                elapsed_time,
                moving_time: self.moving_time,
                total_elevation_gain: self.total_elevation_gain,
                notes: self.notes,
            }),
            _ => Err(AppError::BadRequest(REQUIRED_FIELDS_MESSAGE.to_string())),
        }
    }
}

impl NewManualActivity {
    /// Build the stored document for this activity.
    ///
    /// No timezone work is done: the local start doubles as the UTC start.
    pub fn into_stored(self, id: String, user_id: UserId, created_at: String) -> StoredActivity {
        let start = self.start_date_local;
        let payload = ActivityRecord {
            id: Some(ActivityId::Text(id.clone())),
            name: Some(self.name),
            sport_type: Some(self.sport_type),
            activity_type: Some(self.activity_type),
            start_date_local: Some(start.clone()),
            start_date: Some(start.clone()),
            distance: self.distance,
            moving_time: self.moving_time,
            elapsed_time: Some(self.elapsed_time),
            total_elevation_gain: self.total_elevation_gain,
            source: Some(SOURCE_MANUAL.to_string()),
            notes: self.notes,
            ..ActivityRecord::default()
        };

        StoredActivity {
            id,
            user_id,
            strava_activity_id: None,
            activity_source: SOURCE_MANUAL.to_string(),
            start_date: Some(start),
            created_at,
            payload,
        }
    }
}

/// Accept RFC 3339 or a naive local date-time ("2026-02-03T16:08[:11]").
fn validate_start_date(value: &str) -> Result<(), ValidationError> {
    let parses = chrono::DateTime::parse_from_rfc3339(value).is_ok()
        || chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").is_ok()
        || chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M").is_ok();

    if parses {
        Ok(())
    } else {
        Err(ValidationError::new("start_date_format")
            .with_message("startDateLocal must be an ISO 8601 date-time".into()))
    }
}
