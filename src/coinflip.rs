//! Coinflip with a rotating seed commitment.
//!
//! The hash of the current secret is published before any flip; a flip
//! consumes that secret, settles the bet, persists the outcome, and only
//! then rotates to a fresh commitment — so the revealed seed always
//! matches the hash the player saw before betting.

use crate::bank::Accounts;
use crate::commitment::{coinflip_outcome, CoinSide, Commitment};
use crate::errors::{GameError, GameResult};
use crate::history::{History, HistoryRecord};
use crate::multiplier::Multiplier;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Even-money payout after house edge, in hundredths (1.96x).
const WIN_PAYOUT_HUNDREDTHS: u64 = 196;

/// The published commitment for the next flip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedInfo {
    pub seed_id: String,
    pub seed_hash: String,
}

/// A flip request.
#[derive(Debug, Clone, Deserialize)]
pub struct FlipRequest {
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub client_seed: Option<String>,
    #[serde(default)]
    pub bet: u64,
    #[serde(default)]
    pub choice: Option<CoinSide>,
}

/// A settled flip, with the secret revealed for verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlipRecord {
    pub id: String,
    pub outcome: CoinSide,
    pub account_id: Option<String>,
    pub ts: i64,
    pub server_seed: String,
    pub seed_hash: String,
    pub seed_id: String,
    pub client_seed: String,
    pub bet: u64,
    pub won: bool,
    pub payout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<u64>,
}

impl HistoryRecord for FlipRecord {
    fn record_id(&self) -> &str {
        &self.id
    }
}

/// Coinflip engine.
pub struct Coinflip {
    // Guards the rotate-after-persist invariant: a flip holds this lock
    // from outcome derivation through rotation.
    current: Mutex<Commitment>,
    history: History<FlipRecord>,
    accounts: Arc<Accounts>,
    min_bet: u64,
}

impl Coinflip {
    pub fn new(accounts: Arc<Accounts>, min_bet: u64, history_limit: usize) -> Self {
        Self {
            current: Mutex::new(Commitment::generate()),
            history: History::new(history_limit),
            accounts,
            min_bet,
        }
    }

    /// The commitment the next flip will be resolved against.
    pub fn seed_info(&self) -> SeedInfo {
        let current = self.current.lock().expect("seed lock poisoned");
        SeedInfo {
            seed_id: current.id.clone(),
            seed_hash: current.public_hash.clone(),
        }
    }

    /// Resolve a flip. Stakeless flips are allowed; a staked flip requires
    /// a registered, unbanned account with sufficient balance.
    pub fn flip(&self, request: FlipRequest) -> GameResult<FlipRecord> {
        let client_seed = request
            .client_seed
            .unwrap_or_else(|| hex::encode(rand::random::<[u8; 8]>()));

        if request.bet > 0 {
            if request.bet < self.min_bet {
                return Err(GameError::Validation(format!(
                    "minimum bet is {}",
                    self.min_bet
                )));
            }
            if request.account_id.is_none() {
                return Err(GameError::Validation(
                    "staked flips require an account".into(),
                ));
            }
        }

        let mut current = self.current.lock().expect("seed lock poisoned");
        let outcome = coinflip_outcome(&current.secret_bytes(), &client_seed);

        let mut won = false;
        let mut payout = 0;
        let mut balance = None;

        if request.bet > 0 {
            let account_id = request.account_id.as_deref().expect("checked above");
            self.accounts.check_playable(account_id)?;
            let mut after = self.accounts.debit(account_id, request.bet)?;

            if request.choice == Some(outcome) {
                won = true;
                payout = Multiplier::from_hundredths(WIN_PAYOUT_HUNDREDTHS).payout(request.bet);
                after = self.accounts.credit(account_id, payout)?;
            }
            balance = Some(after);
        }

        let record = FlipRecord {
            id: uuid::Uuid::new_v4().to_string(),
            outcome,
            account_id: request.account_id,
            ts: chrono::Utc::now().timestamp_millis(),
            server_seed: current.secret.clone(),
            seed_hash: current.public_hash.clone(),
            seed_id: current.id.clone(),
            client_seed,
            bet: request.bet,
            won,
            payout,
            balance,
        };

        // Persist the played outcome, then rotate. Holding the lock across
        // both keeps the revealed seed tied to the published hash.
        self.history.push(record.clone());
        *current = Commitment::generate();

        Ok(record)
    }

    pub fn recent(&self, limit: usize) -> Vec<FlipRecord> {
        self.history.recent(limit)
    }

    pub fn find(&self, id: &str) -> GameResult<FlipRecord> {
        self.history
            .find(id)
            .ok_or_else(|| GameError::NotFound(format!("flip {}", id)))
    }
}
