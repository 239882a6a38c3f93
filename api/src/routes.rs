use crate::chat_page::CHAT_PAGE;
use crate::query_payload::QueryPayload;
use crate::rag_response::{ErrorResponse, HealthResponse, RagResponse, RootResponse};
use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use intake_rag::QueryError;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/chat", get(chat_page))
        .route("/health", get(health))
        .route("/query", post(handle_query))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Backend is up and running.".to_string(),
    })
}

async fn chat_page() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        ready: state.qa.is_ready(),
    })
}

pub async fn handle_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryPayload>,
) -> Result<Json<RagResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.qa.ask(&payload.query).await {
        Ok(response) => Ok(Json(RagResponse { response })),
        Err(e) => Err(error_response(e)),
    }
}

fn error_response(error: QueryError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, code) = match &error {
        QueryError::NotReady => (StatusCode::SERVICE_UNAVAILABLE, "not_ready"),
        QueryError::EmptyQuery => (StatusCode::BAD_REQUEST, "invalid_query"),
        QueryError::Upstream(e) => {
            log::error!("Query failed: {:#}", e);
            (StatusCode::BAD_GATEWAY, "upstream_error")
        }
    };

    (
        status,
        Json(ErrorResponse {
            status: code.to_string(),
            error: error.to_string(),
        }),
    )
}
