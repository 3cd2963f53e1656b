//! Fieldnotes API Gateway
//!
//! HTTP surface for field records and their supporting entities.
//! Handles:
//! - Authentication (bearer JWT → principal)
//! - Rate limiting
//! - Request routing under `/api/v1`
//! - Observability (request ids, tracing, metrics)

pub mod extract;
pub mod handlers;
pub mod middleware;

use axum::{
    extract::FromRef,
    routing::get,
    Router,
};
use fieldnotes_common::{
    auth::JwtManager,
    config::AppConfig,
    db::{DbPool, Repository},
    errors::Result,
    storage::BlobStore,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Mount point of every route
pub const API_PREFIX: &str = "/api/v1";

/// Application state shared across handlers
#[derive(Clone, FromRef)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub jwt: Arc<JwtManager>,
    pub blobs: Arc<dyn BlobStore>,
    /// Set when the Prometheus recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn repo(&self) -> Repository {
        Repository::new(self.db.clone())
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Result<Router> {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let api_routes = Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/metrics", get(handlers::health::metrics))

        // Users
        .route("/users/me", get(handlers::users::me))
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )

        // Records
        .route(
            "/records",
            get(handlers::records::list_records).post(handlers::records::create_record),
        )
        .route(
            "/records/{id}",
            get(handlers::records::get_record)
                .put(handlers::records::update_record)
                .delete(handlers::records::delete_record),
        )
        .route("/records/{id}/images", get(handlers::records::list_images))
        .route(
            "/records/{id}/images/{image_id}/file",
            get(handlers::records::image_file),
        )

        // Export
        .route("/export/records/{format}", get(handlers::export::export_records))

        // Fields
        .route(
            "/fields",
            get(handlers::fields::list_fields).post(handlers::fields::create_field),
        )
        .route("/fields/regions", get(handlers::fields::regions))
        .route(
            "/fields/{id}",
            get(handlers::fields::get_field)
                .put(handlers::fields::update_field)
                .delete(handlers::fields::delete_field),
        )

        // Participants
        .route(
            "/participants",
            get(handlers::participants::list_participants)
                .post(handlers::participants::create_participant),
        )
        .route(
            "/participants/{id}",
            get(handlers::participants::get_participant)
                .put(handlers::participants::update_participant)
                .delete(handlers::participants::delete_participant),
        )

        // Tag categories and tags
        .route(
            "/tags/categories",
            get(handlers::tags::list_categories).post(handlers::tags::create_category),
        )
        .route(
            "/tags/categories/{id}",
            get(handlers::tags::get_category)
                .put(handlers::tags::update_category)
                .delete(handlers::tags::delete_category),
        )
        .route(
            "/tags",
            get(handlers::tags::list_tags).post(handlers::tags::create_tag),
        )
        .route(
            "/tags/{id}",
            get(handlers::tags::get_tag)
                .put(handlers::tags::update_tag)
                .delete(handlers::tags::delete_tag),
        )

        // Stats
        .route("/stats/overview", get(handlers::stats::overview))
        .route("/stats/recent-activities", get(handlers::stats::recent_activities));

    let mut app = Router::new()
        .nest(API_PREFIX, api_routes)
        .layer(axum::middleware::from_fn(middleware::metrics::track_requests));

    let limits = &state.config.rate_limit;
    if limits.enabled {
        let limiter = middleware::rate_limit::RateLimit::new(limits.requests_per_second, limits.burst)?;
        app = app.layer(axum::middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit::rate_limit_middleware,
        ));
    }

    let timeout = state.config.request_timeout();

    // Compose the app
    Ok(app
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state))
}
