//! Hash-commitment engine for provably fair outcomes.
//!
//! A secret is drawn per round/game, its SHA-256 hash is published before
//! any bet is accepted, and the secret is revealed after the round/game
//! concludes. Every outcome is derived from HMAC-SHA256(secret, message),
//! so any party holding the revealed secret can recompute it exactly.

use crate::errors::{GameError, GameResult};
use crate::multiplier::Multiplier;
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Message label for the crash-point derivation.
pub const CRASH_LABEL: &str = "crash";

/// House edge applied to fair-odds payouts (3%).
pub const HOUSE_EDGE: f64 = 0.97;

/// Hard cap on the crash multiplier.
pub const MAX_CRASH_MULTIPLIER: f64 = 10_000.0;

/// Number of cells on a mines board.
pub const BOARD_SIZE: usize = 25;

/// A server secret together with its published hash.
///
/// The hash is safe to publish immediately; the secret must stay private
/// until the round/game concludes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commitment {
    pub id: String,
    /// Hex-encoded 32-byte secret.
    pub secret: String,
    /// Hex-encoded SHA-256 of the secret bytes.
    pub public_hash: String,
}

impl Commitment {
    /// Draw a fresh cryptographically secure secret and commit to it.
    pub fn generate() -> Self {
        let mut secret = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut secret);

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            secret: hex::encode(secret),
            public_hash: hex::encode(Sha256::digest(secret)),
        }
    }

    pub fn secret_bytes(&self) -> Vec<u8> {
        hex::decode(&self.secret).expect("commitment secret is valid hex")
    }
}

/// Check that a revealed secret matches its published hash.
///
/// A mismatch is a fairness violation and is always surfaced to the caller.
pub fn verify_reveal(secret_hex: &str, public_hash: &str) -> GameResult<()> {
    let secret = hex::decode(secret_hex)
        .map_err(|e| GameError::Fairness(format!("secret is not valid hex: {}", e)))?;
    let computed = hex::encode(Sha256::digest(&secret));

    if computed != public_hash {
        return Err(GameError::Fairness(format!(
            "seed hash mismatch: expected {}, computed {}",
            public_hash, computed
        )));
    }
    Ok(())
}

fn hmac_digest(secret: &[u8], message: &[u8]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(message);
    mac.finalize().into_bytes().into()
}

/// Derive a float in [0, 1) from the first 4 HMAC bytes (32-bit precision).
pub fn derive_float_u32(secret: &[u8], message: &str) -> f64 {
    let digest = hmac_digest(secret, message.as_bytes());
    let value = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    value as f64 / (1u64 << 32) as f64
}

/// Derive a float in [0, 1) from the first 13 hex nibbles (52-bit precision).
pub fn derive_float_u52(secret: &[u8], message: &str) -> f64 {
    let digest = hmac_digest(secret, message.as_bytes());
    let hex_str = hex::encode(digest);
    let value = u64::from_str_radix(&hex_str[..13], 16).expect("13 hex nibbles fit in u64");
    value as f64 / (1u64 << 52) as f64
}

/// Coin faces.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CoinSide {
    Heads,
    Tails,
}

impl std::fmt::Display for CoinSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoinSide::Heads => write!(f, "heads"),
            CoinSide::Tails => write!(f, "tails"),
        }
    }
}

impl std::str::FromStr for CoinSide {
    type Err = GameError;

    fn from_str(s: &str) -> GameResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "heads" => Ok(CoinSide::Heads),
            "tails" => Ok(CoinSide::Tails),
            other => Err(GameError::Validation(format!("unknown coin side: {}", other))),
        }
    }
}

/// Coinflip outcome from `(secret, client_seed)`.
pub fn coinflip_outcome(secret: &[u8], client_seed: &str) -> CoinSide {
    if derive_float_u32(secret, client_seed) < 0.5 {
        CoinSide::Heads
    } else {
        CoinSide::Tails
    }
}

/// Crash point from the secret alone, fixed at round creation.
///
/// `x` is 52-bit uniform; `1/(1-x)` gives the fair heavy-tailed curve,
/// floored to hundredths, discounted by the house edge, floored again,
/// clamped to [1.00, 10000.00].
pub fn crash_point(secret: &[u8]) -> Multiplier {
    let x = derive_float_u52(secret, CRASH_LABEL);
    let raw = ((1.0 / (1.0 - x)) * 100.0).floor() / 100.0;
    let raw = raw.max(1.0);
    let edged = (raw * HOUSE_EDGE * 100.0).floor() / 100.0;
    Multiplier::from_f64(edged.max(1.0).min(MAX_CRASH_MULTIPLIER))
}

/// Mines board from `(secret, client_seed, bomb_count)`: `true` marks a bomb.
///
/// The LCG state starts from the first 4 HMAC bytes; each step selects
/// `state % 25`, skipping cells already marked, until `bomb_count` distinct
/// bombs are placed. Fully reproducible from the revealed secret.
pub fn mines_board(secret: &[u8], client_seed: &str, bomb_count: usize) -> [bool; BOARD_SIZE] {
    let digest = hmac_digest(secret, client_seed.as_bytes());
    let mut state = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);

    let mut board = [false; BOARD_SIZE];
    let mut placed = 0;
    while placed < bomb_count.min(BOARD_SIZE) {
        state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345) & 0x7fff_ffff;
        let idx = state as usize % BOARD_SIZE;
        if !board[idx] {
            board[idx] = true;
            placed += 1;
        }
    }
    board
}
