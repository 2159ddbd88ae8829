use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::wiring::AppState;

/// Build the axum router with all ledger endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/submit", post(handler::submit))
        .route("/record", get(handler::get_record))
        .route("/query/account", get(handler::query_account))
        .route("/query/transaction", get(handler::query_transaction))
        .route("/query/subaccounts", get(handler::query_subaccounts))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
