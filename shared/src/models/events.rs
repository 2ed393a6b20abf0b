use serde::{Deserialize, Serialize};

use super::Decision;

/// One-shot message from a receiver to the main context.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationUpdate {
    pub guest_id: String,
    pub status: Decision,
    pub guest_name: Option<String>,
}

/// Emitted by the main context whenever a confirmation is applied.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub guest_id: String,
    pub guest_name: String,
    pub status: Decision,
}

impl Notification {
    pub fn text(&self) -> String {
        match self.status {
            Decision::Confirmed => format!("{} confirmed attendance", self.guest_name),
            Decision::Declined => format!("{} declined the invitation", self.guest_name),
        }
    }
}
