//! Reconciles confirmations into the organizer's state.
//!
//! Answers arrive on two channels: direct one-shot updates from receivers
//! (primary) and mailbox records in the store (fallback, polled on an
//! interval). Every record is deleted exactly once: when applied, when found
//! already applied, or when it expires.

use log::{debug, error, info, warn};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch, Mutex};

use crate::config::SyncConfig;
use crate::errors::Result;
use crate::event_store::EventStore;
use crate::models::{ConfirmationUpdate, Decision, Notification};
use crate::state::{AppState, ApplyOutcome};

/// What one poll did.
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TickReport {
    pub applied: usize,
    pub already_applied: usize,
    pub rejected: usize,
    pub stale: usize,
    pub unreadable: usize,
}

impl TickReport {
    pub fn evicted(&self) -> usize {
        self.applied + self.already_applied + self.rejected + self.stale + self.unreadable
    }
}

#[derive(Clone)]
pub struct ConfirmationPoller {
    store: EventStore,
    config: SyncConfig,
    notifications: broadcast::Sender<Notification>,
}

impl ConfirmationPoller {
    pub fn new(
        store: EventStore,
        config: SyncConfig,
        notifications: broadcast::Sender<Notification>,
    ) -> Self {
        Self {
            store,
            config,
            notifications,
        }
    }

    /// Drains the mailbox once.
    pub async fn tick(&self, state: &mut AppState) -> Result<TickReport> {
        let now = self.store.clock().now();
        let mut report = TickReport::default();

        for stored in self.store.confirmations().await? {
            let record = match stored.record {
                Ok(record) => record,
                Err(e) => {
                    warn!("Evicting unreadable confirmation {}: {}", stored.key, e);
                    self.evict(&stored.key).await;
                    report.unreadable += 1;
                    continue;
                }
            };

            if record.age(now) > self.config.freshness {
                info!(
                    "Evicting stale confirmation for guest {} from {}",
                    record.guest_id, record.timestamp
                );
                self.evict(&stored.key).await;
                report.stale += 1;
                continue;
            }

            match state.apply_decision(&record.guest_id, record.status) {
                ApplyOutcome::Applied { guest_name } => {
                    report.applied += 1;
                    self.notify(&record.guest_id, guest_name, record.status);
                }
                ApplyOutcome::AlreadyApplied => {
                    debug!("Confirmation for {} already applied", record.guest_id);
                    report.already_applied += 1;
                }
                ApplyOutcome::Conflict { current } => {
                    warn!(
                        "Ignoring {} for guest {} who already answered {}",
                        record.status, record.guest_id, current
                    );
                    report.rejected += 1;
                }
                ApplyOutcome::UnknownGuest => {
                    warn!("Ignoring confirmation for unknown guest {}", record.guest_id);
                    report.rejected += 1;
                }
            }
            self.evict(&stored.key).await;
        }

        if report.applied > 0 {
            self.store.save(state.guests(), state.event()).await?;
            info!("Applied {} confirmations from the mailbox", report.applied);
        }
        Ok(report)
    }

    /// Applies an update that arrived over the direct channel. The mailbox
    /// record written alongside it is left for the next tick to delete.
    pub async fn handle_direct_update(
        &self,
        state: &mut AppState,
        update: ConfirmationUpdate,
    ) -> Result<ApplyOutcome> {
        let outcome = state.apply_decision(&update.guest_id, update.status);
        match &outcome {
            ApplyOutcome::Applied { guest_name } => {
                self.store.save(state.guests(), state.event()).await?;
                self.notify(&update.guest_id, guest_name.clone(), update.status);
            }
            other => debug!(
                "Direct update for {} not applied: {:?}",
                update.guest_id, other
            ),
        }
        Ok(outcome)
    }

    /// Serves both channels until `shutdown` flips to true.
    pub async fn run(
        self,
        state: Arc<Mutex<AppState>>,
        mut updates: mpsc::Receiver<ConfirmationUpdate>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(
            "Confirmation sync started (interval {:?}, freshness {}s)",
            self.config.poll_interval,
            self.config.freshness.num_seconds()
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let mut guard = state.lock().await;
                    if let Err(e) = self.tick(&mut guard).await {
                        error!("Confirmation poll failed: {}", e);
                    }
                }
                Some(update) = updates.recv() => {
                    let mut guard = state.lock().await;
                    if let Err(e) = self.handle_direct_update(&mut guard, update).await {
                        error!("Failed to apply direct confirmation: {}", e);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Confirmation sync stopped");
    }

    fn notify(&self, guest_id: &str, guest_name: String, status: Decision) {
        let notification = Notification {
            guest_id: guest_id.to_string(),
            guest_name,
            status,
        };
        info!("{}", notification.text());
        // No subscribers is fine.
        let _ = self.notifications.send(notification);
    }

    async fn evict(&self, key: &str) {
        if let Err(e) = self.store.remove_confirmation(key).await {
            error!("Failed to delete confirmation {}: {}", key, e);
        }
    }
}
