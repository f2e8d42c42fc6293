// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase authentication middleware.
//!
//! `require_auth` proves who the caller is; `require_db_user` maps that
//! identity onto an app user. Handlers read both from request extensions
//! and never take a user id from the client.

use crate::error::AppError;
use crate::models::VerifiedIdentity;
use crate::services::IdentityError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Middleware that requires a valid Firebase ID token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request.headers().get(header::AUTHORIZATION);
    if auth_header.is_none() {
        return Err(AppError::Unauthorized);
    }

    let identity = match state.identity.verify_bearer(auth_header).await {
        Ok(identity) => identity,
        Err(IdentityError::Rejected(reason)) => {
            tracing::debug!(reason = %reason, "Rejected ID token");
            return Err(AppError::InvalidToken);
        }
        Err(IdentityError::Transient(reason)) => {
            return Err(AppError::Internal(anyhow::anyhow!(
                "token verification unavailable: {reason}"
            )));
        }
    };

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Middleware that resolves the verified identity to an app user.
///
/// Must run after [`require_auth`].
pub async fn require_db_user(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = request
        .extensions()
        .get::<VerifiedIdentity>()
        .cloned()
        .ok_or(AppError::Unauthorized)?;

    let user = state.store.get_or_create_user(&identity).await?;

    tracing::debug!(user_id = %user.id, uid = %identity.uid, "Resolved app user");

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
