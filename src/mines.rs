//! Mines: incremental tile reveals over a committed 25-cell board.
//!
//! The board is derived once from `(secret, client_seed, bomb_count)` at
//! game creation and never regenerated; every reveal looks the same board
//! up. The multiplier compounds fair odds per safe reveal, with the house
//! edge applied exactly once at the first step.

use crate::bank::Accounts;
use crate::commitment::{mines_board, verify_reveal, Commitment, BOARD_SIZE};
use crate::errors::{GameError, GameResult};
use crate::history::{History, HistoryRecord};
use crate::multiplier::Multiplier;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Terminal states of a mines game.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MinesOutcome {
    Playing,
    Bust,
    Cashout,
}

/// A mines game owned by its player until it leaves `Playing`.
#[derive(Debug, Clone)]
pub struct MinesGame {
    pub id: String,
    pub account_id: String,
    pub commitment: Commitment,
    pub client_seed: String,
    pub bomb_count: usize,
    pub bet: u64,
    pub board: [bool; BOARD_SIZE],
    pub moves: Vec<usize>,
    pub multiplier: Multiplier,
    pub outcome: MinesOutcome,
    pub payout: u64,
}

/// Reveal request; the first reveal of a session omits `game_id`.
#[derive(Debug, Clone, Deserialize)]
pub struct RevealRequest {
    pub account_id: String,
    #[serde(default)]
    pub game_id: Option<String>,
    pub bet: u64,
    pub bomb_count: usize,
    pub revealed_index: usize,
    pub client_seed: String,
}

/// Outcome of a single reveal. Board and secret appear only once the game
/// has concluded; an in-flight game exposes the commitment hash alone.
#[derive(Debug, Clone, Serialize)]
pub struct RevealResponse {
    pub game_id: String,
    pub seed_hash: String,
    pub index: usize,
    pub bomb: bool,
    pub outcome: MinesOutcome,
    pub multiplier: Multiplier,
    pub potential_payout: u64,
    pub safe_revealed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_seed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board: Option<Vec<u8>>,
}

/// Cashout result.
#[derive(Debug, Clone, Serialize)]
pub struct MinesCashout {
    pub game_id: String,
    pub multiplier: Multiplier,
    pub payout: u64,
    pub balance: u64,
    pub server_seed: String,
    pub board: Vec<u8>,
}

/// Concluded game persisted for verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinesRecord {
    pub id: String,
    pub account_id: String,
    pub bet: u64,
    pub bomb_count: usize,
    pub server_seed: String,
    pub client_seed: String,
    pub seed_hash: String,
    pub board: Vec<u8>,
    pub moves: Vec<usize>,
    pub outcome: MinesOutcome,
    pub multiplier: Multiplier,
    pub payout: u64,
    pub ts: i64,
}

impl HistoryRecord for MinesRecord {
    fn record_id(&self) -> &str {
        &self.id
    }
}

/// Fairness proof served by the verification endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct MinesProof {
    pub id: String,
    pub bet: u64,
    pub bomb_count: usize,
    pub outcome: MinesOutcome,
    pub multiplier: Multiplier,
    pub payout: u64,
    pub server_seed: String,
    pub client_seed: String,
    pub seed_hash: String,
    pub board: Vec<u8>,
    pub moves: Vec<usize>,
    pub verification: MinesChecks,
}

#[derive(Debug, Clone, Serialize)]
pub struct MinesChecks {
    pub board_reconstructed: bool,
    pub seed_hash_verified: bool,
    pub board_valid: bool,
}

fn board_to_wire(board: &[bool; BOARD_SIZE]) -> Vec<u8> {
    board.iter().map(|&b| b as u8).collect()
}

/// Mines engine: active games keyed by id, concluded games in history.
pub struct MinesEngine {
    active: DashMap<String, MinesGame>,
    history: History<MinesRecord>,
    accounts: Arc<Accounts>,
    min_bet: u64,
}

impl MinesEngine {
    pub fn new(accounts: Arc<Accounts>, min_bet: u64, history_limit: usize) -> Self {
        Self {
            active: DashMap::new(),
            history: History::new(history_limit),
            accounts,
            min_bet,
        }
    }

    /// Reveal a cell, creating the game on the first call.
    pub fn reveal(&self, request: RevealRequest) -> GameResult<RevealResponse> {
        if request.revealed_index >= BOARD_SIZE {
            return Err(GameError::Validation(format!(
                "cell index must be below {}",
                BOARD_SIZE
            )));
        }

        match &request.game_id {
            None => self.start_game(request),
            Some(id) => self.reveal_existing(id.clone(), request),
        }
    }

    fn start_game(&self, request: RevealRequest) -> GameResult<RevealResponse> {
        if !(1..BOARD_SIZE).contains(&request.bomb_count) {
            return Err(GameError::Validation("bomb count must be 1-24".into()));
        }
        if request.bet < self.min_bet {
            return Err(GameError::Validation(format!(
                "minimum bet is {}",
                self.min_bet
            )));
        }

        self.accounts.check_playable(&request.account_id)?;
        self.accounts.debit(&request.account_id, request.bet)?;

        let commitment = Commitment::generate();
        let board = mines_board(
            &commitment.secret_bytes(),
            &request.client_seed,
            request.bomb_count,
        );

        let mut game = MinesGame {
            id: uuid::Uuid::new_v4().to_string(),
            account_id: request.account_id,
            commitment,
            client_seed: request.client_seed,
            bomb_count: request.bomb_count,
            bet: request.bet,
            board,
            moves: Vec::new(),
            multiplier: Multiplier::ONE,
            outcome: MinesOutcome::Playing,
            payout: 0,
        };

        let response = Self::apply_reveal(&mut game, request.revealed_index);

        if game.outcome == MinesOutcome::Playing {
            self.active.insert(game.id.clone(), game);
        } else {
            self.conclude(game);
        }
        Ok(response)
    }

    fn reveal_existing(&self, id: String, request: RevealRequest) -> GameResult<RevealResponse> {
        let response = {
            let mut entry = self
                .active
                .get_mut(&id)
                .ok_or_else(|| GameError::NotFound(format!("mines game {}", id)))?;

            if entry.account_id != request.account_id {
                return Err(GameError::NotFound(format!("mines game {}", id)));
            }
            if entry.outcome != MinesOutcome::Playing {
                return Err(GameError::phase("game_over"));
            }
            if entry.moves.contains(&request.revealed_index) {
                return Err(GameError::Validation("cell already revealed".into()));
            }

            Self::apply_reveal(&mut entry, request.revealed_index)
        };

        if response.outcome != MinesOutcome::Playing {
            if let Some((_, game)) = self.active.remove(&id) {
                self.conclude(game);
            }
        }
        Ok(response)
    }

    /// Evaluate one reveal against the committed board and update the
    /// compounding multiplier. Must be called with the game exclusively held.
    fn apply_reveal(game: &mut MinesGame, index: usize) -> RevealResponse {
        game.moves.push(index);
        let bomb = game.board[index];

        if bomb {
            game.outcome = MinesOutcome::Bust;
            game.payout = 0;
        } else {
            let safe_cells = (BOARD_SIZE - game.bomb_count) as u64;
            let revealed_before = (game.moves.len() - 1) as u64;

            game.multiplier = if revealed_before == 0 {
                // Fair odds on the first reveal, discounted once by the edge.
                Multiplier::from_frac(BOARD_SIZE as u64, safe_cells).mul(Multiplier::HOUSE_EDGE)
            } else {
                let fields_remaining = BOARD_SIZE as u64 - revealed_before;
                let safe_remaining = safe_cells - revealed_before;
                game.multiplier
                    .div(Multiplier::from_frac(safe_remaining, fields_remaining))
            };
        }

        let concluded = game.outcome != MinesOutcome::Playing;
        RevealResponse {
            game_id: game.id.clone(),
            seed_hash: game.commitment.public_hash.clone(),
            index,
            bomb,
            outcome: game.outcome,
            multiplier: game.multiplier,
            potential_payout: game.multiplier.payout(game.bet),
            safe_revealed: game.moves.len() - bomb as usize,
            server_seed: concluded.then(|| game.commitment.secret.clone()),
            board: concluded.then(|| board_to_wire(&game.board)),
        }
    }

    /// Cash out an in-flight game at the server-held multiplier.
    pub fn cashout(&self, account_id: &str, game_id: &str) -> GameResult<MinesCashout> {
        let game = {
            let mut entry = self
                .active
                .get_mut(game_id)
                .ok_or_else(|| GameError::NotFound(format!("mines game {}", game_id)))?;

            if entry.account_id != account_id {
                return Err(GameError::NotFound(format!("mines game {}", game_id)));
            }
            if entry.outcome != MinesOutcome::Playing {
                return Err(GameError::phase("game_over"));
            }

            entry.outcome = MinesOutcome::Cashout;
            entry.payout = entry.multiplier.payout(entry.bet);
            entry.clone()
        };

        let balance = self.accounts.credit(account_id, game.payout)?;
        let cashout = MinesCashout {
            game_id: game.id.clone(),
            multiplier: game.multiplier,
            payout: game.payout,
            balance,
            server_seed: game.commitment.secret.clone(),
            board: board_to_wire(&game.board),
        };

        self.active.remove(game_id);
        self.conclude(game);
        Ok(cashout)
    }

    fn conclude(&self, game: MinesGame) {
        self.history.push(MinesRecord {
            id: game.id,
            account_id: game.account_id,
            bet: game.bet,
            bomb_count: game.bomb_count,
            server_seed: game.commitment.secret,
            client_seed: game.client_seed,
            seed_hash: game.commitment.public_hash,
            board: board_to_wire(&game.board),
            moves: game.moves,
            outcome: game.outcome,
            multiplier: game.multiplier,
            payout: game.payout,
            ts: chrono::Utc::now().timestamp_millis(),
        });
    }

    /// Fairness proof for a concluded game: the board is rebuilt from the
    /// revealed seeds and compared against what was played.
    pub fn verify(&self, game_id: &str) -> GameResult<MinesProof> {
        let record = self
            .history
            .find(game_id)
            .ok_or_else(|| GameError::NotFound(format!("mines game {}", game_id)))?;

        let seed_hash_verified = verify_reveal(&record.server_seed, &record.seed_hash).is_ok();
        let secret = hex::decode(&record.server_seed)
            .map_err(|e| GameError::Fairness(format!("stored seed is not hex: {}", e)))?;
        let rebuilt = mines_board(&secret, &record.client_seed, record.bomb_count);
        let board_reconstructed = board_to_wire(&rebuilt) == record.board;

        Ok(MinesProof {
            id: record.id.clone(),
            bet: record.bet,
            bomb_count: record.bomb_count,
            outcome: record.outcome,
            multiplier: record.multiplier,
            payout: record.payout,
            server_seed: record.server_seed.clone(),
            client_seed: record.client_seed.clone(),
            seed_hash: record.seed_hash.clone(),
            board: record.board.clone(),
            moves: record.moves.clone(),
            verification: MinesChecks {
                board_reconstructed,
                seed_hash_verified,
                board_valid: board_reconstructed && seed_hash_verified,
            },
        })
    }

    /// Commitment-only view of an in-flight game (no secret before conclusion).
    pub fn active_commitment(&self, game_id: &str) -> GameResult<SeedOnly> {
        let game = self
            .active
            .get(game_id)
            .ok_or_else(|| GameError::NotFound(format!("mines game {}", game_id)))?;
        Ok(SeedOnly {
            id: game.id.clone(),
            seed_hash: game.commitment.public_hash.clone(),
            outcome: game.outcome,
        })
    }
}

/// In-flight view: hash only.
#[derive(Debug, Clone, Serialize)]
pub struct SeedOnly {
    pub id: String,
    pub seed_hash: String,
    pub outcome: MinesOutcome,
}
