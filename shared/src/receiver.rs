//! The guest-facing side: decoding a followed link and recording the answer.
//!
//! The receiver shares nothing with the organizer's state. It hands the
//! answer over twice: a one-shot message to the organizer (may be gone) and
//! a durable mailbox record in the store (always written).

use log::{debug, info, warn};
use reqwest::Url;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::errors::{Result, ValidationError};
use crate::event_store::EventStore;
use crate::link::{LinkPayload, LINK_VERSION};
use crate::models::{ConfirmationRecord, ConfirmationUpdate, Decision};
use crate::store::keys;

pub const NAME_PLACEHOLDER: &str = "event name unavailable";
pub const DATE_PLACEHOLDER: &str = "date unavailable";
pub const LOCATION_PLACEHOLDER: &str = "location unavailable";
pub const DESCRIPTION_PLACEHOLDER: &str = "description unavailable";

/// Appended to every acknowledgement; the organizer keeps the first answer.
pub const FIRST_ANSWER_NOTE: &str =
    "Only your first answer counts. To change it, please contact the organizer.";

/// Event fields ready for display; never empty.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    pub name: String,
    pub date: String,
    pub location: String,
    pub description: String,
}

/// What the confirmation prompt renders.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationPage {
    pub version: u32,
    pub event: EventView,
    pub guest_id: Option<String>,
    pub guest_name: Option<String>,
    pub image_key: Option<String>,
}

impl ConfirmationPage {
    /// Event-wide links carry no guest and cannot be answered.
    pub fn can_respond(&self) -> bool {
        self.guest_id.is_some()
    }
}

pub fn decode(url: &Url) -> ConfirmationPage {
    decode_payload(LinkPayload::from_url(url))
}

pub fn decode_payload(payload: LinkPayload) -> ConfirmationPage {
    let or = |value: Option<String>, placeholder: &str| value.unwrap_or_else(|| placeholder.to_string());

    ConfirmationPage {
        version: payload.version.unwrap_or(LINK_VERSION),
        event: EventView {
            name: or(payload.event_name, NAME_PLACEHOLDER),
            date: or(payload.event_date, DATE_PLACEHOLDER),
            location: or(payload.event_location, LOCATION_PLACEHOLDER),
            description: or(payload.event_description, DESCRIPTION_PLACEHOLDER),
        },
        guest_id: payload.guest_id,
        guest_name: payload.guest_name,
        image_key: payload.image_key,
    }
}

/// Terminal view shown after an answer is recorded.
///
/// The receiver cannot see the guest list, so it acknowledges every answer.
/// The organizer applies only a guest's first one; later answers are
/// dropped when reconciled, which `message` tells the guest.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Acknowledgement {
    pub guest_id: String,
    pub status: Decision,
    pub title: String,
    pub message: String,
    /// Whether the organizer was reachable directly.
    pub delivered_directly: bool,
}

#[derive(Clone)]
pub struct ConfirmationReceiver {
    store: EventStore,
    opener: Option<mpsc::Sender<ConfirmationUpdate>>,
}

impl ConfirmationReceiver {
    pub fn new(store: EventStore, opener: Option<mpsc::Sender<ConfirmationUpdate>>) -> Self {
        Self { store, opener }
    }

    pub async fn submit(
        &self,
        guest_id: &str,
        decision: Decision,
        guest_name: Option<&str>,
    ) -> Result<Acknowledgement> {
        let guest_id = guest_id.trim();
        if guest_id.is_empty() {
            return Err(ValidationError::EmptyGuestId.into());
        }
        if !keys::is_valid_id(guest_id) {
            return Err(ValidationError::InvalidGuestId(guest_id.to_string()).into());
        }

        let delivered_directly = self.notify_opener(guest_id, decision, guest_name);

        let record = ConfirmationRecord {
            guest_id: guest_id.to_string(),
            status: decision,
            timestamp: self.store.clock().now(),
        };
        self.store.put_confirmation(&record).await?;
        self.store.touch_last_update().await?;

        info!(
            "Recorded {} for guest {} (direct delivery: {})",
            decision, guest_id, delivered_directly
        );

        let (title, message) = match decision {
            Decision::Confirmed => ("Attendance confirmed!", "Thank you, see you there!"),
            Decision::Declined => ("Answer recorded", "Understood. Thanks for letting us know!"),
        };
        Ok(Acknowledgement {
            guest_id: guest_id.to_string(),
            status: decision,
            title: title.to_string(),
            message: format!("{message} {FIRST_ANSWER_NOTE}"),
            delivered_directly,
        })
    }

    fn notify_opener(&self, guest_id: &str, decision: Decision, guest_name: Option<&str>) -> bool {
        let Some(opener) = &self.opener else {
            debug!("No opener channel, relying on the mailbox record");
            return false;
        };
        let update = ConfirmationUpdate {
            guest_id: guest_id.to_string(),
            status: decision,
            guest_name: guest_name.map(str::to_string),
        };
        match opener.try_send(update) {
            Ok(()) => true,
            Err(e) => {
                warn!("Direct confirmation hand-off failed: {}", e);
                false
            }
        }
    }
}
