//! HTTP handlers for every game endpoint.

use super::errors::ApiError;
use super::middleware::RequestId;
use super::models::{BanRequest, HealthResponse, MinesCashoutRequest, RegisterRequest};
use crate::bank::{Account, Accounts};
use crate::coinflip::{Coinflip, FlipRecord, FlipRequest, SeedInfo};
use crate::crash::engine::CrashHandle;
use crate::crash::round::CrashRecord;
use crate::mines::{MinesCashout, MinesEngine, MinesProof, RevealRequest, RevealResponse};
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Extension, Json,
};
use std::sync::Arc;

/// Shared state for all handlers.
pub struct AppState {
    pub accounts: Arc<Accounts>,
    pub coinflip: Arc<Coinflip>,
    pub mines: Arc<MinesEngine>,
    pub crash: CrashHandle,
    pub version: String,
}

type Handler<T> = Result<Json<T>, ApiError>;

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: state.version.clone(),
    })
}

/// The commitment the next coinflip will be resolved against.
pub async fn seed_handler(State(state): State<Arc<AppState>>) -> Json<SeedInfo> {
    Json(state.coinflip.seed_info())
}

pub async fn flip_handler(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Json(request): Json<FlipRequest>,
) -> Handler<FlipRecord> {
    state
        .coinflip
        .flip(request)
        .map(Json)
        .map_err(|e| ApiError::new(request_id, e))
}

pub async fn flip_history_handler(State(state): State<Arc<AppState>>) -> Json<Vec<FlipRecord>> {
    Json(state.coinflip.recent(20))
}

pub async fn mines_play_handler(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Json(request): Json<RevealRequest>,
) -> Handler<RevealResponse> {
    state
        .mines
        .reveal(request)
        .map(Json)
        .map_err(|e| ApiError::new(request_id, e))
}

pub async fn mines_cashout_handler(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Json(request): Json<MinesCashoutRequest>,
) -> Handler<MinesCashout> {
    state
        .mines
        .cashout(&request.account_id, &request.game_id)
        .map(Json)
        .map_err(|e| ApiError::new(request_id, e))
}

/// Fairness proof for a concluded mines game; for a game still in flight,
/// the commitment hash alone.
pub async fn mines_verify_handler(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Path(game_id): Path<String>,
) -> Result<Response, ApiError> {
    match state.mines.verify(&game_id) {
        Ok(proof) => Ok(Json::<MinesProof>(proof).into_response()),
        Err(crate::errors::GameError::NotFound(_)) => state
            .mines
            .active_commitment(&game_id)
            .map(|seed_only| Json(seed_only).into_response())
            .map_err(|e| ApiError::new(request_id, e)),
        Err(e) => Err(ApiError::new(request_id, e)),
    }
}

pub async fn crash_history_handler(State(state): State<Arc<AppState>>) -> Json<Vec<CrashRecord>> {
    Json(state.crash.history().recent(50))
}

/// Commitment and phase of the round currently in flight.
pub async fn crash_round_handler(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
) -> Handler<crate::crash::CrashSnapshot> {
    state
        .crash
        .snapshot()
        .await
        .map(Json)
        .map_err(|e| ApiError::new(request_id, e))
}

pub async fn crash_verify_handler(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Path(round_id): Path<String>,
) -> Result<Response, ApiError> {
    state
        .crash
        .verify(&round_id)
        .await
        .map(|proof| Json(proof).into_response())
        .map_err(|e| ApiError::new(request_id, e))
}

pub async fn register_account_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Json<Account> {
    Json(state.accounts.register(&request.external_id))
}

pub async fn account_handler(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Path(account_id): Path<String>,
) -> Handler<Account> {
    state
        .accounts
        .get(&account_id)
        .map(Json)
        .map_err(|e| ApiError::new(request_id, e))
}

pub async fn ban_account_handler(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Path(account_id): Path<String>,
    Json(request): Json<BanRequest>,
) -> Handler<Account> {
    state
        .accounts
        .set_banned(&account_id, request.banned)
        .and_then(|_| state.accounts.get(&account_id))
        .map(Json)
        .map_err(|e| ApiError::new(request_id, e))
}
