use axum::{extract::State, Json};
use log::{info, warn};
use rsvp_shared::dispatch::{record_results, SingleSendOutcome};
use rsvp_shared::errors::ValidationError;

use crate::context::AppContext;
use crate::error::{AppError, Result};
use crate::models::{ApiStatusResponse, BulkSendResponse, ManualMessage};

// GET /messages/manual
// Rendered messages with click-to-chat links; needs no API credentials.
pub async fn get_manual_messages(State(ctx): State<AppContext>) -> Result<Json<Vec<ManualMessage>>> {
    let state = ctx.state.lock().await;
    state.ready_to_send()?;

    let messages = ctx.dispatcher.prepare(&state, &ctx.template, &ctx.encoder);
    Ok(Json(messages.into_iter().map(ManualMessage::from).collect()))
}

// POST /messages/send
pub async fn send_invitations(State(ctx): State<AppContext>) -> Result<Json<BulkSendResponse>> {
    // Render under the lock, send without it so confirmations keep flowing.
    let messages = {
        let state = ctx.state.lock().await;
        state.ready_to_send()?;
        ctx.dispatcher.config().validate()?;
        ctx.dispatcher.prepare(&state, &ctx.template, &ctx.encoder)
    };

    info!("Sending {} invitations", messages.len());
    let report = ctx.dispatcher.send_bulk(&messages).await?;

    let mut state = ctx.state.lock().await;
    let marked = record_results(&mut state, &report.results);
    if marked > 0 {
        ctx.store.save(state.guests(), state.event()).await?;
    }

    Ok(Json(BulkSendResponse {
        message: report.summary(),
        report,
    }))
}

// POST /messages/test
// Sends to the first guest only. Any failure, a missing configuration
// included, degrades to a manual click-to-chat link.
pub async fn send_test_message(State(ctx): State<AppContext>) -> Result<Json<SingleSendOutcome>> {
    let message = {
        let state = ctx.state.lock().await;
        state.ready_to_send()?;
        ctx.dispatcher
            .prepare(&state, &ctx.template, &ctx.encoder)
            .into_iter()
            .next()
            .ok_or_else(|| AppError::from(ValidationError::EmptyGuestList))?
    };

    let outcome = match ctx.dispatcher.send_single(&message).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("Messaging API not configured, using manual link: {}", e);
            SingleSendOutcome::ManualFallback {
                url: message.manual_link(),
                error: e.to_string(),
            }
        }
    };

    if let SingleSendOutcome::Sent { result } = &outcome {
        let mut state = ctx.state.lock().await;
        if state.mark_sent(&result.guest_id) {
            ctx.store.save(state.guests(), state.event()).await?;
        }
    }
    Ok(Json(outcome))
}

// GET /messages/status
pub async fn get_api_status(State(ctx): State<AppContext>) -> Json<ApiStatusResponse> {
    let config = ctx.dispatcher.config();
    if let Err(e) = config.validate() {
        return Json(ApiStatusResponse {
            configured: false,
            reachable: None,
            error: Some(e.to_string()),
        });
    }

    info!("Checking messaging API access with token {}", config.redacted_token());
    let response = match ctx.dispatcher.check_access().await {
        Ok(()) => ApiStatusResponse {
            configured: true,
            reachable: Some(true),
            error: None,
        },
        Err(e) => ApiStatusResponse {
            configured: true,
            reachable: Some(false),
            error: Some(e.to_string()),
        },
    };
    Json(response)
}
