use axum::{
    extract::{DefaultBodyLimit, Request},
    middleware,
    routing::{delete, get, post},
    Router,
};
use log::{info, warn};
use tower_http::cors::{Any, CorsLayer};

use crate::context::AppContext;
use crate::handlers::{
    confirmation_handlers::{get_notifications, show_confirmation, submit_confirmation},
    event_handlers::{get_event, update_event},
    guest_handlers::{get_guests, get_summary, import_guests},
    image_handlers::{clear_image, get_image, upload_image, UPLOAD_BODY_LIMIT},
    link_handlers::get_link,
    message_handlers::{get_api_status, get_manual_messages, send_invitations, send_test_message},
};

/// Creates the organizer and guest-facing API around a built context.
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    async fn logging_middleware(
        req: Request,
        next: axum::middleware::Next,
    ) -> impl axum::response::IntoResponse {
        info!(
            "Router received request: method={}, uri={}",
            req.method(),
            req.uri()
        );
        next.run(req).await
    }

    // Organizer routes
    let organizer_routes = Router::new()
        .route("/event", get(get_event).put(update_event))
        .route("/guests", get(get_guests).post(import_guests))
        .route("/guests/summary", get(get_summary))
        .route(
            "/images",
            post(upload_image).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/images/current", delete(clear_image))
        .route("/links", get(get_link))
        .route("/messages/manual", get(get_manual_messages))
        .route("/messages/send", post(send_invitations))
        .route("/messages/test", post(send_test_message))
        .route("/messages/status", get(get_api_status))
        .route("/notifications", get(get_notifications));

    // Guest-facing routes, reached through confirmation links
    let guest_routes = Router::new()
        .route("/confirm", get(show_confirmation).post(submit_confirmation))
        .route("/images/:key", get(get_image));

    let router = organizer_routes
        .merge(guest_routes)
        .layer(cors)
        .layer(middleware::from_fn(logging_middleware))
        .with_state(ctx);

    info!("Router configured with all routes and middleware");

    router.fallback(|req: Request| async move {
        warn!("No route matched for: {} {}", req.method(), req.uri());
        (
            axum::http::StatusCode::NOT_FOUND,
            "The requested resource was not found".to_string(),
        )
    })
}
