//! Fairhouse - Provably Fair Wager Games
//!
//! A coinflip, crash, and mines server whose outcomes are committed to
//! before any bet is accepted: each round/game publishes the SHA-256 hash
//! of a fresh secret, derives every outcome from HMAC-SHA256 over that
//! secret, and reveals the secret after conclusion so any player can
//! recompute the result.

pub mod api;
pub mod bank;
pub mod coinflip;
pub mod commitment;
pub mod config;
pub mod crash;
pub mod errors;
pub mod history;
pub mod mines;
pub mod multiplier;

pub use config::FairhouseConfig;
pub use errors::{GameError, GameResult};
pub use multiplier::Multiplier;
