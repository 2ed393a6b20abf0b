use axum::{extract::State, Json};
use log::info;
use rsvp_shared::errors::ValidationError;
use rsvp_shared::models::GuestSummary;

use crate::context::AppContext;
use crate::error::Result;
use crate::models::{GuestsResponse, ImportGuestsRequest};

// GET /guests
pub async fn get_guests(State(ctx): State<AppContext>) -> Json<GuestsResponse> {
    Json(GuestsResponse {
        guests: ctx.state.lock().await.guests().to_vec(),
    })
}

// POST /guests
// Replaces the whole list; every imported guest starts out pending.
pub async fn import_guests(
    State(ctx): State<AppContext>,
    Json(request): Json<ImportGuestsRequest>,
) -> Result<Json<GuestsResponse>> {
    let entries: Vec<(String, String)> = request
        .guests
        .into_iter()
        .map(|entry| (entry.name.trim().to_string(), entry.phone_number.trim().to_string()))
        .filter(|(name, phone)| !name.is_empty() || !phone.is_empty())
        .collect();

    if entries.is_empty() {
        return Err(ValidationError::EmptyGuestList.into());
    }

    let now = ctx.store.clock().now();
    let mut state = ctx.state.lock().await;
    state.import_guests(entries, now);
    ctx.store.save(state.guests(), state.event()).await?;

    info!("Imported {} guests", state.guests().len());
    Ok(Json(GuestsResponse {
        guests: state.guests().to_vec(),
    }))
}

// GET /guests/summary
pub async fn get_summary(State(ctx): State<AppContext>) -> Json<GuestSummary> {
    Json(ctx.state.lock().await.summary())
}
