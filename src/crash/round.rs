//! Pure crash-round state machine.
//!
//! All transitions take an explicit `Instant` so the engine task drives it
//! with real time and tests drive it with simulated offsets. The crash
//! point is fixed at construction from the round's secret and never
//! recomputed; the live curve exists only as a signal to players.

use crate::bank::Bank;
use crate::commitment::Commitment;
use crate::errors::{CashoutReceipt, GameError, GameResult};
use crate::history::HistoryRecord;
use crate::multiplier::Multiplier;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Round lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundStatus {
    Betting,
    Running,
    Crashed,
}

/// One client's stake in a round. Mutated at most once, on cashout.
#[derive(Debug, Clone)]
pub struct BetRecord {
    pub amount: u64,
    pub cashed_out: bool,
    pub payout: u64,
}

/// Timing and stake parameters for a round.
#[derive(Debug, Clone)]
pub struct RoundParams {
    pub betting_window: Duration,
    pub growth_base: f64,
    pub min_bet: u64,
}

/// Result of advancing the curve one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Curve advanced; broadcast the current multiplier.
    Tick(Multiplier),
    /// The curve met the crash point; the round is frozen.
    Crashed(Multiplier),
}

/// A single crash round, owned exclusively by the engine task.
#[derive(Debug)]
pub struct Round {
    pub id: String,
    pub commitment: Commitment,
    pub crash_point: Multiplier,
    pub bets: HashMap<String, BetRecord>,
    pub status: RoundStatus,
    pub betting_ends_at: Instant,
    started_at: Option<Instant>,
    params: RoundParams,
}

impl Round {
    pub fn new(commitment: Commitment, crash_point: Multiplier, params: RoundParams, now: Instant) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            commitment,
            crash_point,
            bets: HashMap::new(),
            status: RoundStatus::Betting,
            betting_ends_at: now + params.betting_window,
            started_at: None,
            params,
        }
    }

    /// Accept a stake while the betting window is open. One bet per client
    /// per round; a second attempt is rejected, never overwritten.
    pub fn place_bet(&mut self, client_id: &str, amount: u64, now: Instant) -> GameResult<()> {
        if self.status != RoundStatus::Betting || now >= self.betting_ends_at {
            return Err(GameError::phase("betting_closed"));
        }
        if amount < self.params.min_bet.max(1) {
            return Err(GameError::Validation(format!(
                "minimum bet is {}",
                self.params.min_bet.max(1)
            )));
        }
        if self.bets.contains_key(client_id) {
            return Err(GameError::Validation("bet already placed this round".into()));
        }

        self.bets.insert(
            client_id.to_string(),
            BetRecord {
                amount,
                cashed_out: false,
                payout: 0,
            },
        );
        Ok(())
    }

    /// Whether the betting window has elapsed.
    pub fn betting_over(&self, now: Instant) -> bool {
        self.status == RoundStatus::Betting && now >= self.betting_ends_at
    }

    pub fn begin_running(&mut self, now: Instant) {
        debug_assert_eq!(self.status, RoundStatus::Betting);
        self.status = RoundStatus::Running;
        self.started_at = Some(now);
    }

    /// The authoritative multiplier at `now`: `max(1, growth_base^t)`,
    /// floored to hundredths, capped at the crash point.
    pub fn multiplier_at(&self, now: Instant) -> Multiplier {
        match self.status {
            RoundStatus::Betting => Multiplier::ONE,
            RoundStatus::Crashed => self.crash_point,
            RoundStatus::Running => {
                let started = self.started_at.expect("running round has a start instant");
                let elapsed = now.saturating_duration_since(started).as_secs_f64();
                let raw = self.params.growth_base.powf(elapsed);
                let m = Multiplier::from_f64(raw.max(1.0)).floor_to_hundredths();
                m.min(self.crash_point)
            }
        }
    }

    /// Advance the curve. Must only be called while Running; the same call
    /// that detects the crossing freezes the round, so no cashout processed
    /// after it can still win this instant.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        debug_assert_eq!(self.status, RoundStatus::Running);
        let m = self.multiplier_at(now);
        if m >= self.crash_point {
            self.status = RoundStatus::Crashed;
            TickOutcome::Crashed(self.crash_point)
        } else {
            TickOutcome::Tick(m)
        }
    }

    /// Cash a client out at the server-recomputed multiplier.
    ///
    /// The payout is clamped to the bank pool: a win larger than the pool
    /// drains it rather than failing. The bet record flips `cashed_out`
    /// exactly once.
    pub fn cashout(&mut self, client_id: &str, now: Instant, bank: &mut Bank) -> GameResult<CashoutReceipt> {
        match self.status {
            RoundStatus::Betting => return Err(GameError::phase("not_running")),
            RoundStatus::Crashed => return Err(GameError::phase("too_late")),
            RoundStatus::Running => {}
        }

        let m = self.multiplier_at(now);
        if m >= self.crash_point {
            // The curve has already met the crash point; the round just has
            // not ticked yet. The cashout lost the race.
            return Err(GameError::phase("too_late"));
        }

        let bet = self
            .bets
            .get_mut(client_id)
            .ok_or_else(|| GameError::NotFound(format!("no bet for client {}", client_id)))?;
        if bet.cashed_out {
            return Err(GameError::phase("already_cashed_out"));
        }

        let payout = bank.debit_pool(m.payout(bet.amount));
        bet.cashed_out = true;
        bet.payout = payout;

        Ok(CashoutReceipt {
            round_id: self.id.clone(),
            multiplier: m,
            payout,
        })
    }

    /// Sum of stakes still open (forfeited when the round crashes).
    pub fn open_stakes(&self) -> u64 {
        self.bets
            .values()
            .filter(|b| !b.cashed_out)
            .map(|b| b.amount)
            .sum()
    }

    /// Immutable copy for the history store.
    pub fn to_record(&self) -> CrashRecord {
        CrashRecord {
            id: self.id.clone(),
            crash_multiplier: self.crash_point,
            server_seed: self.commitment.secret.clone(),
            seed_hash: self.commitment.public_hash.clone(),
            ts: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// A finished round as served by the verification endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrashRecord {
    pub id: String,
    pub crash_multiplier: Multiplier,
    pub server_seed: String,
    pub seed_hash: String,
    pub ts: i64,
}

impl HistoryRecord for CrashRecord {
    fn record_id(&self) -> &str {
        &self.id
    }
}
