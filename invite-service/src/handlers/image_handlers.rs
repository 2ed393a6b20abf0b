use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use http::header;
use log::info;
use rsvp_shared::event_store::MAX_IMAGE_BYTES;
use rsvp_shared::models::MessageResponse;

use crate::context::AppContext;
use crate::error::{AppError, Result};
use crate::models::{ImageResponse, UploadImageRequest};

/// Request body budget for uploads: a base64 image at the size cap plus the
/// JSON envelope and an optional data-URL prefix.
pub const UPLOAD_BODY_LIMIT: usize = MAX_IMAGE_BYTES / 3 * 4 + 64 * 1024;

// POST /images
// Stores the invite image and makes it the current selection.
pub async fn upload_image(
    State(ctx): State<AppContext>,
    Json(request): Json<UploadImageRequest>,
) -> Result<Json<ImageResponse>> {
    let encoded = match request.data.split_once(";base64,") {
        Some((_, payload)) => payload,
        None => request.data.as_str(),
    };
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| AppError::bad_request(format!("Image data is not valid base64: {e}")))?;

    let image_key = ctx.store.put_image(&bytes, &request.content_type).await?;

    let mut state = ctx.state.lock().await;
    state.set_image_key(Some(image_key.clone()));
    // Saving also prunes images beyond the retention count.
    ctx.store.save(state.guests(), state.event()).await?;

    let url = ctx.encoder.image_url(&image_key).to_string();
    Ok(Json(ImageResponse { image_key, url }))
}

// DELETE /images/current
pub async fn clear_image(State(ctx): State<AppContext>) -> Json<MessageResponse> {
    ctx.state.lock().await.set_image_key(None);
    info!("Invite image cleared");
    Json(MessageResponse {
        message: "Image removed".to_string(),
    })
}

// GET /images/:key
pub async fn get_image(
    State(ctx): State<AppContext>,
    Path(image_key): Path<String>,
) -> Result<impl IntoResponse> {
    let blob = ctx
        .store
        .get_image(&image_key)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Image {image_key} not found")))?;

    Ok(([(header::CONTENT_TYPE, blob.content_type)], blob.bytes))
}
