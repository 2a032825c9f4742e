//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression,
//! tracing), and creates the axum router ready for serving.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration - permissive for development, should be restricted in production
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Entity catalog
        .route("/entities", get(handlers::list_entities))
        .route("/entities/{entity}/schema", get(handlers::get_schema))
        // Generic entity CRUD
        .route(
            "/data/{entity}",
            get(handlers::list_records).post(handlers::create_record),
        )
        .route(
            "/data/{entity}/bulk",
            post(handlers::bulk_create)
                .patch(handlers::bulk_update)
                .delete(handlers::bulk_delete),
        )
        .route(
            "/data/{entity}/{id}",
            get(handlers::get_record)
                .patch(handlers::update_record)
                .delete(handlers::delete_record),
        )
        // Scheduling
        .route("/doctors/{doctor_id}/slots", get(handlers::get_available_slots))
        .route("/doctors/{doctor_id}/schedule", put(handlers::put_schedule))
        .route("/appointments", post(handlers::book_appointment))
        .route("/appointments/{id}", get(handlers::get_appointment))
        .route("/appointments/{id}/confirm", post(handlers::confirm_appointment))
        .route("/appointments/{id}/cancel", post(handlers::cancel_appointment))
        .route("/appointments/{id}/complete", post(handlers::complete_appointment))
        .route("/appointments/{id}/no-show", post(handlers::mark_no_show))
        .route("/appointments/{id}/reschedule", post(handlers::reschedule_appointment));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
