use axum::{
    extract::{Query, State},
    Json,
};
use log::info;
use rsvp_shared::link::LinkPayload;
use rsvp_shared::models::Notification;
use rsvp_shared::receiver::{decode_payload, Acknowledgement, ConfirmationPage};
use std::collections::HashMap;

use crate::context::AppContext;
use crate::error::Result;
use crate::models::SubmitConfirmationRequest;

// GET /confirm
// The query string is the confirmation link's own parameters. Missing or
// garbled fields decode to placeholders rather than an error.
pub async fn show_confirmation(Query(params): Query<HashMap<String, String>>) -> Json<ConfirmationPage> {
    let page = decode_payload(LinkPayload::from_pairs(params));
    info!(
        "Confirmation page opened (guest: {:?}, can respond: {})",
        page.guest_id,
        page.can_respond()
    );
    Json(page)
}

// POST /confirm
pub async fn submit_confirmation(
    State(ctx): State<AppContext>,
    Json(request): Json<SubmitConfirmationRequest>,
) -> Result<Json<Acknowledgement>> {
    let ack = ctx
        .receiver
        .submit(&request.guest_id, request.status, request.guest_name.as_deref())
        .await?;
    Ok(Json(ack))
}

// GET /notifications
pub async fn get_notifications(State(ctx): State<AppContext>) -> Json<Vec<Notification>> {
    Json(ctx.notifications.snapshot())
}
