mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::service::CollageService;

/// Build the HTTP surface. Request bodies larger than `max_upload_bytes` are
/// rejected before they reach a handler.
pub fn create_router(service: CollageService, max_upload_bytes: usize) -> Router {
    let api = Router::new()
        // Pending images
        .route("/sessions/{session}/images", get(handlers::list_pending))
        .route("/sessions/{session}/images", post(handlers::add_image))
        // Confirm / decline
        .route("/sessions/{session}/decision", post(handlers::decide))
        // Source images
        .route("/images/{id}", get(handlers::get_image))
        // Health
        .route("/health", get(handlers::health));

    let mut router = Router::new()
        .route("/", get(handlers::index))
        .nest("/api/v1", api);

    // Locally delivered collages are served by us.
    if let Some(root) = service.sink().local_root() {
        router = router.nest_service("/media", ServeDir::new(root));
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .with_state(service)
}
