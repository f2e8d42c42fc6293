// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides the [`ActivityStore`] operations over:
//! - App users (keyed by Firebase uid)
//! - Activities (Strava imports and manual entries)
//! - Peaks and ranges (read-only reference data)

use crate::db::{
    app_user_id, collections, format_timestamp, manual_activity_id, ActivityStore,
};
use crate::error::StoreError;
use crate::models::{
    ActivityRecord, AppUser, MountainRange, NewManualActivity, Peak, StoredActivity, UserId,
    VerifiedIdentity,
};
use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::FirestoreQueryDirection;
use gcloud_sdk::google::firestore::v1::Document;

/// Decode activity documents, skipping any that are not a [`StoredActivity`].
fn decode_activities(user_id: &UserId, documents: &[Document]) -> Vec<StoredActivity> {
    documents
        .iter()
        .filter_map(|doc| {
            firestore::FirestoreDb::deserialize_doc_to::<StoredActivity>(doc)
                .inspect_err(|e| {
                    tracing::warn!(
                        user_id = %user_id,
                        document = %doc.name,
                        error = %e,
                        "Skipping undecodable activity document"
                    )
                })
                .ok()
        })
        .collect()
}

fn store_error(err: FirestoreError) -> StoreError {
    match err {
        FirestoreError::DeserializeError(e) => StoreError::Decode(e.to_string()),
        FirestoreError::NetworkError(e) => StoreError::Unavailable(e.to_string()),
        other => StoreError::Query(other.to_string()),
    }
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, StoreError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id).await.map_err(|e| {
            StoreError::Unavailable(format!("Failed to connect to Firestore: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, StoreError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            StoreError::Unavailable(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, StoreError> {
        self.client.as_ref().ok_or_else(|| {
            StoreError::Unavailable("Database not connected (offline mode)".to_string())
        })
    }

    // ─── Activity Operations ─────────────────────────────────────

    /// Query a user's activities, most recent first.
    ///
    /// Documents with a null `start_date` sort after dated ones. A document
    /// that does not decode as a [`StoredActivity`] is skipped with a warning
    /// rather than failing the whole query.
    async fn query_activities(
        &self,
        user_id: &UserId,
        page: Option<(u32, u32)>,
    ) -> Result<Vec<StoredActivity>, StoreError> {
        let owner = user_id.as_str().to_string();

        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(move |q| q.field("user_id").eq(owner.clone()))
            .order_by([("start_date", FirestoreQueryDirection::Descending)]);

        let query = match page {
            Some((limit, offset)) => query.limit(limit).offset(offset),
            None => query,
        };

        let documents = query.query().await.map_err(store_error)?;
        Ok(decode_activities(user_id, &documents))
    }

    /// Store an activity document.
    pub async fn set_activity(&self, activity: &StoredActivity) -> Result<(), StoreError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::ACTIVITIES)
            .document_id(&activity.id)
            .object(activity)
            .execute()
            .await
            .map_err(store_error)?;
        Ok(())
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get an app user by ID.
    pub async fn get_user(&self, user_id: &UserId) -> Result<Option<AppUser>, StoreError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::APP_USERS)
            .obj()
            .one(user_id.as_str())
            .await
            .map_err(store_error)
    }

    /// Create or update an app user.
    pub async fn upsert_user(&self, user: &AppUser) -> Result<(), StoreError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::APP_USERS)
            .document_id(user.id.as_str())
            .object(user)
            .execute()
            .await
            .map_err(store_error)?;
        Ok(())
    }
}

#[async_trait]
impl ActivityStore for FirestoreDb {
    async fn fetch_all(&self, user_id: &UserId) -> Result<Vec<ActivityRecord>, StoreError> {
        let activities = self.query_activities(user_id, None).await?;
        tracing::debug!(user_id = %user_id, count = activities.len(), "Fetched activities");
        Ok(activities.into_iter().map(|a| a.payload).collect())
    }

    async fn fetch_page(
        &self,
        user_id: &UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ActivityRecord>, StoreError> {
        let activities = self.query_activities(user_id, Some((limit, offset))).await?;
        Ok(activities.into_iter().map(|a| a.payload).collect())
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

        self.set_activity(&stored).await?;

        tracing::info!(user_id = %user_id, activity_id = %stored.id, "Stored manual activity");
        Ok(stored)
    }

    /// Read then upsert; two first sign-ins racing both write the same
    /// document, and the later `created_at` wins.
    async fn get_or_create_user(
        &self,
        identity: &VerifiedIdentity,
    ) -> Result<AppUser, StoreError> {
        let id = app_user_id(&identity.uid);
        let now = format_timestamp(chrono::Utc::now());

        let user = match self.get_user(&id).await? {
            Some(mut user) => {
                user.touch(identity, &now);
                user
            }
            None => {
                tracing::info!(user_id = %id, "Creating app user");
                AppUser::new(id, identity, &now)
            }
        };

        self.upsert_user(&user).await?;
        Ok(user)
    }

    async fn list_peaks(&self, state: Option<&str>, limit: u32) -> Result<Vec<Peak>, StoreError> {
        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::PEAKS);

        let query = match state {
            Some(state) => {
                let state = state.to_string();
                query.filter(move |q| q.field("state").eq(state.clone()))
            }
            None => query,
        };

        query
            .order_by([("peak_name", FirestoreQueryDirection::Ascending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(store_error)
    }

    async fn list_ranges(&self) -> Result<Vec<MountainRange>, StoreError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::RANGES)
            .order_by([("range_id", FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(store_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivityId;
    use serde_json::json;

    fn doc(id: &str, value: serde_json::Value) -> Document {
        firestore::FirestoreDb::serialize_to_doc(
            format!("projects/test/databases/(default)/documents/activities/{id}"),
            &value,
        )
        .unwrap()
    }

    #[test]
    fn test_decode_skips_broken_documents() {
        let user = UserId::from("fb-u1");
        let documents = vec![
            doc(
                "good",
                json!({
                    "id": "good",
                    "user_id": "fb-u1",
                    "activity_source": "strava",
                    "start_date": "2026-02-03T16:08:11Z",
                    "created_at": "2026-02-04T00:00:00Z",
                    "payload": {
                        "id": -5,
                        "start_date_local": "2026-02-03T08:08:11Z",
                        "distance": "1609.344"
                    }
                }),
            ),
            doc(
                "no-payload",
                json!({
                    "id": "no-payload",
                    "user_id": "fb-u1",
                    "activity_source": "strava",
                    "created_at": "2026-02-04T00:00:00Z"
                }),
            ),
        ];

        let activities = decode_activities(&user, &documents);

        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].id, "good");
        assert_eq!(activities[0].payload.id, None::<ActivityId>);
        assert_eq!(activities[0].payload.distance, Some(1609.344));
    }

    #[test]
    fn test_deserialize_failure_maps_to_decode() {
        let broken = doc("x", json!({ "user_id": 7 }));
        let err = firestore::FirestoreDb::deserialize_doc_to::<StoredActivity>(&broken)
            .unwrap_err();
        assert!(matches!(store_error(err), StoreError::Decode(_)));
    }
}
