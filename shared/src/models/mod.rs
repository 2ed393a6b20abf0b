use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::clock::random_suffix;

pub mod events;

pub use events::{ConfirmationUpdate, Notification};

/// Attendance status of a guest.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GuestStatus {
    #[default]
    Pending,
    Confirmed,
    Declined,
}

impl GuestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuestStatus::Pending => "pending",
            GuestStatus::Confirmed => "confirmed",
            GuestStatus::Declined => "declined",
        }
    }
}

impl fmt::Display for GuestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a guest answered on the confirmation page.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Confirmed,
    Declined,
}

impl From<Decision> for GuestStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Confirmed => GuestStatus::Confirmed,
            Decision::Declined => GuestStatus::Declined,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        GuestStatus::from(*self).fmt(f)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Guest {
    pub id: String,
    pub name: String,
    pub phone_number: String,
    #[serde(default)]
    pub status: GuestStatus,
    /// Advisory only: an outbound message was dispatched at some point.
    #[serde(default)]
    pub sent: bool,
}

impl Guest {
    /// Creates a pending guest with a freshly generated id.
    pub fn new(name: impl Into<String>, phone_number: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: generate_guest_id(now),
            name: name.into(),
            phone_number: phone_number.into(),
            status: GuestStatus::Pending,
            sent: false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == GuestStatus::Pending
    }
}

pub fn generate_guest_id(now: DateTime<Utc>) -> String {
    format!("guest_{}_{}", now.timestamp_millis(), random_suffix(9))
}

/// The occasion being organized. One per store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Event {
    pub name: String,
    /// As typed by the organizer, usually `YYYY-MM-DDTHH:MM`.
    pub date: String,
    pub location: String,
    pub description: String,
}

impl Event {
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
            && self.date.is_empty()
            && self.location.is_empty()
            && self.description.is_empty()
    }
}

/// Mailbox entry written by the receiver for the main context to consume.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationRecord {
    pub guest_id: String,
    pub status: Decision,
    pub timestamp: DateTime<Utc>,
}

impl ConfirmationRecord {
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.timestamp
    }
}

/// Dashboard counters.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GuestSummary {
    pub total: usize,
    pub confirmed: usize,
    pub declined: usize,
    pub pending: usize,
}

impl GuestSummary {
    pub fn from_guests(guests: &[Guest]) -> Self {
        guests.iter().fold(
            GuestSummary {
                total: guests.len(),
                ..Default::default()
            },
            |mut acc, guest| {
                match guest.status {
                    GuestStatus::Pending => acc.pending += 1,
                    GuestStatus::Confirmed => acc.confirmed += 1,
                    GuestStatus::Declined => acc.declined += 1,
                }
                acc
            },
        )
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct MessageResponse {
    pub message: String,
}
