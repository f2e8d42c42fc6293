// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use mountain_grid::config::Config;
use mountain_grid::db::{ActivityStore, FirestoreDb, MemoryStore};
use mountain_grid::error::StoreError;
use mountain_grid::models::{
    ActivityId, ActivityRecord, AppUser, MountainRange, NewManualActivity, Peak, StoredActivity,
    UserId, VerifiedIdentity,
};
use mountain_grid::routes::create_router;
use mountain_grid::services::FirebaseVerifier;
use mountain_grid::AppState;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Semaphore;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Memory store that counts `fetch_all` calls and can hold or fail them.
#[allow(dead_code)]
#[derive(Clone)]
pub struct CountingStore {
    pub inner: MemoryStore,
    fetches: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
    gate: Option<Arc<Semaphore>>,
}

#[allow(dead_code)]
impl CountingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            fetches: Arc::new(AtomicUsize::new(0)),
            fail: Arc::new(AtomicBool::new(false)),
            gate: None,
        }
    }

    /// Every `fetch_all` waits for a permit from [`CountingStore::release`].
    pub fn gated(inner: MemoryStore) -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::new(inner)
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Let `n` gated fetches proceed.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }
}

#[async_trait]
impl ActivityStore for CountingStore {
    async fn fetch_all(&self, user_id: &UserId) -> Result<Vec<ActivityRecord>, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))?
                .forget();
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }

        self.inner.fetch_all(user_id).await
    }

    async fn fetch_page(
        &self,
        user_id: &UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ActivityRecord>, StoreError> {
        self.inner.fetch_page(user_id, limit, offset).await
    }

    async fn insert_manual(
        &self,
        user_id: &UserId,
        activity: &NewManualActivity,
    ) -> Result<StoredActivity, StoreError> {
        self.inner.insert_manual(user_id, activity).await
    }

    async fn get_or_create_user(
        &self,
        identity: &VerifiedIdentity,
    ) -> Result<AppUser, StoreError> {
        self.inner.get_or_create_user(identity).await
    }

    async fn list_peaks(&self, state: Option<&str>, limit: u32) -> Result<Vec<Peak>, StoreError> {
        self.inner.list_peaks(state, limit).await
    }

    async fn list_ranges(&self) -> Result<Vec<MountainRange>, StoreError> {
        self.inner.list_ranges().await
    }
}

/// Test application backed by a memory store.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub store: CountingStore,
}

/// Create a test app with an in-memory store and static-secret tokens.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with(Config::default(), CountingStore::new(MemoryStore::new()))
}

#[allow(dead_code)]
pub fn create_test_app_with(config: Config, store: CountingStore) -> TestApp {
    let secret = config
        .auth_dev_secret
        .clone()
        .expect("test config has a dev secret");
    let identity = FirebaseVerifier::new_with_secret(&config.firebase_project_id, &secret)
        .expect("verifier");

    let shared: Arc<dyn ActivityStore> = Arc::new(store.clone());
    let state = Arc::new(AppState::new(config, shared, identity));

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
    }
}

/// Sign an ID token the test app accepts.
#[allow(dead_code)]
pub fn test_token(uid: &str) -> String {
    let config = Config::default();
    let secret = config.auth_dev_secret.expect("test config has a dev secret");
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();

    let claims = serde_json::json!({
        "iss": format!("https://securetoken.google.com/{}", config.firebase_project_id),
        "aud": config.firebase_project_id,
        "sub": uid,
        "iat": now,
        "auth_time": now,
        "exp": now + 3600,
        "email": format!("{uid}@example.com"),
    });

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&secret),
    )
    .unwrap()
}

/// Build an authenticated request.
#[allow(dead_code)]
pub fn authed(method: &str, uri: &str, uid: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", test_token(uid)));

    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// A Strava-shaped activity record.
#[allow(dead_code)]
pub fn strava_activity(id: u64, start_local: &str, sport: &str, meters: f64) -> ActivityRecord {
    ActivityRecord {
        id: Some(ActivityId::Numeric(id)),
        name: Some(format!("{sport} {id}")),
        sport_type: Some(sport.to_string()),
        activity_type: Some(sport.to_string()),
        start_date_local: Some(start_local.to_string()),
        start_date: Some(start_local.to_string()),
        distance: Some(meters),
        moving_time: Some(1200.0),
        elapsed_time: Some(1300.0),
        ..ActivityRecord::default()
    }
}
