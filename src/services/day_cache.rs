// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-user cache of the day views.
//!
//! Each (user, view) slot is empty, building or ready. A build is a spawned
//! task shared by every caller that arrives while it runs, so there is at
//! most one store fetch per slot at a time and a caller that gives up does
//! not cancel the build for everyone else.
//!
//! Invalidation removes the slot outright. A build that was running at the
//! time still answers its own waiters but does not write its result back,
//! since the slot no longer carries its build id.

use crate::db::ActivityStore;
use crate::error::StoreError;
use crate::models::{ActivityRecord, DayCounts, DayGroup, UserId};
use crate::services::daily::{build_day_counts, build_grouped_by_day};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Which derived view a slot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Grouped,
    Counts,
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ViewKind::Grouped => "grouped",
            ViewKind::Counts => "counts",
        })
    }
}

/// A resolved view.
#[derive(Debug, Clone)]
pub enum DayView {
    Grouped(Arc<Vec<DayGroup>>),
    Counts(Arc<DayCounts>),
}

/// Observable state of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Empty,
    Building,
    Ready,
}

type BuildHandle<T> = Shared<BoxFuture<'static, Result<Arc<T>, StoreError>>>;

enum Slot<T> {
    Building { build_id: u64, handle: BuildHandle<T> },
    Ready(Arc<T>),
}

type Slots<T> = Arc<DashMap<UserId, Slot<T>>>;

/// Cache of grouped-by-day and day-count views, keyed by user.
pub struct DayCache {
    store: Arc<dyn ActivityStore>,
    grouped: Slots<Vec<DayGroup>>,
    counts: Slots<DayCounts>,
    next_build_id: AtomicU64,
}

impl DayCache {
    pub fn new(store: Arc<dyn ActivityStore>) -> Self {
        Self {
            store,
            grouped: Arc::new(DashMap::new()),
            counts: Arc::new(DashMap::new()),
            next_build_id: AtomicU64::new(1),
        }
    }

    /// Activities grouped by day key.
    pub async fn grouped(&self, user_id: &UserId) -> Result<Arc<Vec<DayGroup>>, StoreError> {
        self.get_or_build(&self.grouped, user_id, ViewKind::Grouped, build_grouped_by_day)
            .await
    }

    /// Activity counts by day key.
    pub async fn counts(&self, user_id: &UserId) -> Result<Arc<DayCounts>, StoreError> {
        self.get_or_build(&self.counts, user_id, ViewKind::Counts, build_day_counts)
            .await
    }

    pub async fn get(&self, user_id: &UserId, kind: ViewKind) -> Result<DayView, StoreError> {
        match kind {
            ViewKind::Grouped => self.grouped(user_id).await.map(DayView::Grouped),
            ViewKind::Counts => self.counts(user_id).await.map(DayView::Counts),
        }
    }

    /// Drop both views for a user.
    pub fn invalidate(&self, user_id: &UserId, reason: &str) {
        let grouped = self.grouped.remove(user_id).is_some();
        let counts = self.counts.remove(user_id).is_some();

        tracing::info!(
            user_id = %user_id,
            reason,
            had_grouped = grouped,
            had_counts = counts,
            "Invalidated day views"
        );
    }

    /// Drop every cached view for every user.
    pub fn invalidate_all(&self, reason: &str) {
        let slots = self.grouped.len() + self.counts.len();
        self.grouped.clear();
        self.counts.clear();

        tracing::info!(reason, slots, "Invalidated all day views");
    }

    pub fn slot_state(&self, user_id: &UserId, kind: ViewKind) -> SlotState {
        match kind {
            ViewKind::Grouped => state_of(&self.grouped, user_id),
            ViewKind::Counts => state_of(&self.counts, user_id),
        }
    }

    async fn get_or_build<T>(
        &self,
        slots: &Slots<T>,
        user_id: &UserId,
        kind: ViewKind,
        compute: fn(&[ActivityRecord]) -> T,
    ) -> Result<Arc<T>, StoreError>
    where
        T: Send + Sync + 'static,
    {
        // The entry guard must be released before awaiting.
        let handle = match slots.entry(user_id.clone()) {
            Entry::Occupied(entry) => match entry.get() {
                Slot::Ready(value) => {
                    tracing::debug!(user_id = %user_id, kind = %kind, "Day view cache hit");
                    return Ok(Arc::clone(value));
                }
                Slot::Building { handle, .. } => {
                    tracing::debug!(user_id = %user_id, kind = %kind, "Joining in-flight build");
                    handle.clone()
                }
            },
            Entry::Vacant(entry) => {
                let build_id = self.next_build_id.fetch_add(1, Ordering::Relaxed);
                let handle = self.spawn_build(slots, user_id, kind, build_id, compute);
                entry.insert(Slot::Building {
                    build_id,
                    handle: handle.clone(),
                });
                handle
            }
        };

        handle.await
    }

    fn spawn_build<T>(
        &self,
        slots: &Slots<T>,
        user_id: &UserId,
        kind: ViewKind,
        build_id: u64,
        compute: fn(&[ActivityRecord]) -> T,
    ) -> BuildHandle<T>
    where
        T: Send + Sync + 'static,
    {
        let store = Arc::clone(&self.store);
        let task_slots = Arc::clone(slots);
        let task_user = user_id.clone();

        let task = tokio::spawn(async move {
            let started = Instant::now();

            let records = match store.fetch_all(&task_user).await {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!(
                        user_id = %task_user,
                        kind = %kind,
                        error = %e,
                        "Day view build failed"
                    );
                    release_build(&task_slots, &task_user, build_id);
                    return Err(e);
                }
            };

            let value = Arc::new(compute(&records));

            let stored = match task_slots.get_mut(&task_user) {
                Some(mut slot) if is_build(&*slot, build_id) => {
                    *slot = Slot::Ready(Arc::clone(&value));
                    true
                }
                _ => false,
            };

            tracing::info!(
                user_id = %task_user,
                kind = %kind,
                records = records.len(),
                cached = stored,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Rebuilt day view"
            );

            Ok(value)
        });

        let abort_slots = Arc::clone(slots);
        let abort_user = user_id.clone();

        task.map(move |joined| match joined {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(
                    user_id = %abort_user,
                    kind = %kind,
                    error = %e,
                    "Day view build aborted"
                );
                release_build(&abort_slots, &abort_user, build_id);
                Err(StoreError::BuildAborted(e.to_string()))
            }
        })
        .boxed()
        .shared()
    }
}

fn is_build<T>(slot: &Slot<T>, build_id: u64) -> bool {
    matches!(slot, Slot::Building { build_id: id, .. } if *id == build_id)
}

/// Empty the slot if it still holds this build.
fn release_build<T>(slots: &DashMap<UserId, Slot<T>>, user_id: &UserId, build_id: u64) {
    slots.remove_if(user_id, |_, slot| is_build(slot, build_id));
}

fn state_of<T>(slots: &DashMap<UserId, Slot<T>>, user_id: &UserId) -> SlotState {
    match slots.get(user_id).as_deref() {
        None => SlotState::Empty,
        Some(Slot::Building { .. }) => SlotState::Building,
        Some(Slot::Ready(_)) => SlotState::Ready,
    }
}
