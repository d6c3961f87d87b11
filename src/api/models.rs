//! Request and response DTOs that are not owned by a game engine.

use serde::{Deserialize, Serialize};

/// Register a new account.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub external_id: String,
}

/// Flip/ban administration on an account.
#[derive(Debug, Clone, Deserialize)]
pub struct BanRequest {
    pub banned: bool,
}

/// Mines cashout request. The multiplier is intentionally absent: the
/// server-held value is the only one that counts.
#[derive(Debug, Clone, Deserialize)]
pub struct MinesCashoutRequest {
    pub account_id: String,
    pub game_id: String,
}

/// Liveness response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: String,
}
