pub mod drinks;

use axum::{extract::DefaultBodyLimit, routing::get, Json, Router};
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;

use common::types::Health;

use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Room for the multipart framing and text fields on top of the files.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "OK", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the full application router: drink API, uploaded images, static front-end.
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    let uploads = state.drinks.uploads();
    let rules = uploads.rules();
    let body_limit = rules.max_files.saturating_mul(rules.max_file_bytes).saturating_add(FORM_OVERHEAD_BYTES);
    let uploads_prefix = uploads.public_prefix().to_string();
    let uploads_dir = ServeDir::new(uploads.dir());
    let static_dir = ServeDir::new(&state.public_dir);

    let api = Router::new()
        .route("/api/drinks", get(drinks::list_drinks).post(drinks::create_drink))
        .route(
            "/api/drinks/:id",
            get(drinks::get_drink).put(drinks::update_drink).delete(drinks::delete_drink),
        )
        .layer(DefaultBodyLimit::max(body_limit));

    Router::new()
        .route("/health", get(health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .merge(api)
        .nest_service(&uploads_prefix, uploads_dir)
        .fallback_service(static_dir)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
