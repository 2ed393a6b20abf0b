use rsvp_shared::dispatch::{BulkReport, OutboundMessage};
use rsvp_shared::models::{Decision, Guest};
use serde::{Deserialize, Serialize};

// Request DTOs
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GuestEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone_number: String,
}

#[derive(Deserialize, Debug)]
pub struct ImportGuestsRequest {
    pub guests: Vec<GuestEntry>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UploadImageRequest {
    pub content_type: String,
    /// Base64, optionally as a `data:<type>;base64,` URL.
    pub data: String,
}

#[derive(Deserialize, Debug)]
pub struct LinkQuery {
    pub guest: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SubmitConfirmationRequest {
    pub guest_id: String,
    pub status: Decision,
    pub guest_name: Option<String>,
}

// Response DTOs
#[derive(Serialize, Debug)]
pub struct GuestsResponse {
    pub guests: Vec<Guest>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    pub image_key: String,
    pub url: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LinkResponse {
    pub link: String,
    pub guest_id: Option<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ManualMessage {
    #[serde(flatten)]
    pub message: OutboundMessage,
    pub manual_link: String,
}

impl From<OutboundMessage> for ManualMessage {
    fn from(message: OutboundMessage) -> Self {
        let manual_link = message.manual_link();
        Self {
            message,
            manual_link,
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BulkSendResponse {
    pub message: String,
    #[serde(flatten)]
    pub report: BulkReport,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ApiStatusResponse {
    pub configured: bool,
    pub reachable: Option<bool>,
    pub error: Option<String>,
}
