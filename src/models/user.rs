// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use serde::{Deserialize, Serialize};
use std::fmt;

/// App user identifier (document ID of the user record).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identity proven by a verified Firebase ID token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifiedIdentity {
    /// Firebase uid (token subject)
    pub uid: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// App user record, created on first sign-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppUser {
    pub id: UserId,
    pub firebase_uid: String,
    /// Email address (may be None if not shared)
    pub email: Option<String>,
    pub display_name: Option<String>,
    /// When the user first signed in
    pub created_at: String,
    /// Most recent authenticated request
    pub last_seen_at: String,
}

impl AppUser {
    /// First sign-in for an identity.
    pub fn new(id: UserId, identity: &VerifiedIdentity, now: &str) -> Self {
        Self {
            id,
            firebase_uid: identity.uid.clone(),
            email: identity.email.clone(),
            display_name: identity.name.clone(),
            created_at: now.to_string(),
            last_seen_at: now.to_string(),
        }
    }

    /// Merge a fresh sign-in into an existing record.
    ///
    /// Known email/display name are kept unless the token supplies new ones.
    pub fn touch(&mut self, identity: &VerifiedIdentity, now: &str) {
        if let Some(email) = &identity.email {
            self.email = Some(email.clone());
        }
        if let Some(name) = &identity.name {
            self.display_name = Some(name.clone());
        }
        self.last_seen_at = now.to_string();
    }
}
