// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod activity;
pub mod daily;
pub mod day_cache;
pub mod identity;

pub use activity::ActivityService;
pub use day_cache::{DayCache, DayView, SlotState, ViewKind};
pub use identity::{FirebaseVerifier, IdentityError};
