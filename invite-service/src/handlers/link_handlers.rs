use axum::{
    extract::{Query, State},
    Json,
};

use crate::context::AppContext;
use crate::error::{AppError, Result};
use crate::models::{LinkQuery, LinkResponse};

// GET /links?guest=<id>
// Without a guest the link is event-wide and its page cannot record an answer.
pub async fn get_link(
    State(ctx): State<AppContext>,
    Query(query): Query<LinkQuery>,
) -> Result<Json<LinkResponse>> {
    let state = ctx.state.lock().await;

    let guest = match query.guest.as_deref().filter(|id| !id.is_empty()) {
        Some(guest_id) => Some(
            state
                .find_guest(guest_id)
                .ok_or_else(|| AppError::not_found(format!("Guest {guest_id} not found")))?,
        ),
        None => None,
    };

    let link = ctx.encoder.build_link(state.event(), guest, state.image_key());
    Ok(Json(LinkResponse {
        link: link.to_string(),
        guest_id: guest.map(|g| g.id.clone()),
    }))
}
