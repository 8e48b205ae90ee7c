use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod storage;

pub use config::Config;
pub use services::AppState;

/// CSP middleware adds Content-Security-Policy header to all responses
async fn csp_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
    );
    response
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        .nest("/api/v1/practice", practice_routes())
        .nest("/api/v1/users", competency_routes())
        .with_state(app_state)
        .layer(cors)
        .layer(middleware::from_fn(csp_middleware))
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(middleware::from_fn(
            middlewares::trace::request_id_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn practice_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions", post(handlers::practice::start_session))
        .route(
            "/sessions/{id}",
            get(handlers::practice::get_session).delete(handlers::practice::end_session),
        )
        .route("/sessions/{id}/next", post(handlers::practice::next_question))
        .route(
            "/sessions/{id}/answers",
            post(handlers::practice::submit_answer),
        )
        .route(
            "/sessions/{id}/hint-check",
            post(handlers::practice::hint_check),
        )
}

fn competency_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/{user_id}/competencies",
            get(handlers::competencies::get_dashboard),
        )
        .route(
            "/{user_id}/competencies/{topic_id}",
            get(handlers::competencies::get_topic_competency),
        )
        .route(
            "/{user_id}/readiness",
            get(handlers::competencies::get_readiness),
        )
        .route(
            "/{user_id}/recommendations",
            get(handlers::competencies::get_recommendations),
        )
}
