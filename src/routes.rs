// src/routes.rs

use std::time::Duration;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    middleware,
    routing::{get, post, put},
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{admin, auth, exams, questions, results},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let origins = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();

    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .expose_headers([CONTENT_DISPOSITION])
        .max_age(Duration::from_secs(3600));

    if origins.is_empty() {
        base.allow_origin(Any)
    } else {
        base.allow_origin(AllowOrigin::list(origins))
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

/// Assembles the main application router.
///
/// * Every domain route requires a token; management routes also require the admin role.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (pool and config).
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.cors_origins);
    let upload_limit = DefaultBodyLimit::max(state.config.max_upload_mb * 1024 * 1024);
    let authenticated = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let exam_routes = Router::new()
        .route("/", get(exams::list_exams))
        .route("/{id}", get(exams::get_exam))
        .merge(
            Router::new()
                .route("/", post(exams::create_exam))
                .route("/{id}", put(exams::update_exam).delete(exams::delete_exam))
                .layer(middleware::from_fn(admin_middleware)),
        )
        .layer(authenticated.clone());

    let question_routes = Router::new()
        .route(
            "/",
            get(questions::list_questions).post(questions::create_question),
        )
        .route("/import", post(questions::import_questions))
        .route("/import-excel", post(questions::import_excel))
        .layer(upload_limit)
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(authenticated.clone());

    let result_routes = Router::new()
        .route("/submit", post(results::submit_exam))
        .route("/mine", get(results::my_results))
        .route("/{id}/detail", get(results::result_detail))
        .route("/analytics/overview", get(results::analytics_overview))
        .merge(
            Router::new()
                .route("/analytics/students", get(results::analytics_students))
                .route("/analytics/user/{user_id}", get(results::analytics_user))
                .route("/analytics/admin/series", get(results::admin_series))
                .route("/analytics/admin/top-exams", get(results::top_exams))
                .route("/analytics/admin/recent", get(results::recent_results))
                .route("/export/csv", get(results::export_csv))
                .layer(middleware::from_fn(admin_middleware)),
        )
        .layer(authenticated.clone());

    let admin_routes = Router::new()
        .route("/reset", post(admin::reset))
        .layer(middleware::from_fn(admin_middleware))
        .layer(authenticated);

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/exams", exam_routes)
        .nest("/api/questions", question_routes)
        .nest("/api/results", result_routes)
        .nest("/api/admin", admin_routes)
        .route("/api/health", get(health))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
