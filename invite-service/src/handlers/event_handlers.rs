use axum::{extract::State, Json};
use log::info;
use rsvp_shared::models::Event;

use crate::context::AppContext;
use crate::error::Result;

// GET /event
pub async fn get_event(State(ctx): State<AppContext>) -> Json<Event> {
    Json(ctx.state.lock().await.event().clone())
}

// PUT /event
pub async fn update_event(
    State(ctx): State<AppContext>,
    Json(event): Json<Event>,
) -> Result<Json<Event>> {
    let mut state = ctx.state.lock().await;
    state.set_event(event);
    ctx.store.save(state.guests(), state.event()).await?;

    info!("Event updated: name={:?}, date={:?}", state.event().name, state.event().date);
    Ok(Json(state.event().clone()))
}
