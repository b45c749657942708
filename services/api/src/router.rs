use crate::error::{ApiError, INTERNAL_ERROR};
use crate::handlers::{
    catalog_handler, complete_interview, conversational_response, get_question, health_handler,
    not_found, record_answer, save_answer, speak, start_interview, stop_speech,
};
use crate::state::AppState;
use axum::Router;
use axum::handler::HandlerWithoutStateExt;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use std::any::Any;
use std::path::Path;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// JSON API under `/api`, the browser frontend from `static_dir` everywhere else.
pub fn create_router(state: AppState, static_dir: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let api = Router::new()
        .route("/health", get(health_handler))
        .route("/catalog", get(catalog_handler))
        .route("/start-interview", post(start_interview))
        .route("/speak", post(speak))
        .route("/stop-speech", post(stop_speech))
        .route("/conversational-response", post(conversational_response))
        .route("/get-question", post(get_question))
        .route("/record-answer", post(record_answer))
        .route("/save-answer", post(save_answer))
        .route("/complete-interview", post(complete_interview))
        .fallback(not_found);

    let frontend = ServeDir::new(static_dir).not_found_service(not_found.into_service());

    Router::new()
        .nest("/api", api)
        .fallback_service(frontend)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!("handler panicked: {detail}");
    ApiError::Internal(INTERNAL_ERROR.to_string()).into_response()
}
