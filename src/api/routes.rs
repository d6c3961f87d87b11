//! Route definitions.
//!
//! Maps URLs to handlers with type-safe routing.

use super::{handlers::*, websocket::websocket_handler};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Build the API router with all endpoints.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_handler))
        // Coinflip: commitment query, play, history
        .route("/api/seed", get(seed_handler))
        .route("/api/flip", post(flip_handler))
        .route("/api/flip/history", get(flip_history_handler))
        // Mines: reveal, cashout, verification
        .route("/api/mines/play", post(mines_play_handler))
        .route("/api/mines/cashout", post(mines_cashout_handler))
        .route("/api/mines/verify/:id", get(mines_verify_handler))
        // Crash: current commitment, history, verification (live play goes over /ws)
        .route("/crash/round", get(crash_round_handler))
        .route("/crash/history", get(crash_history_handler))
        .route("/crash/verify/:id", get(crash_verify_handler))
        // Account ledger interface
        .route("/api/accounts", post(register_account_handler))
        .route("/api/accounts/:id", get(account_handler))
        .route("/api/accounts/:id/ban", post(ban_account_handler))
        // WebSocket for real-time crash rounds
        .route("/ws", get(websocket_handler))
        // Attach shared state
        .with_state(state)
}
