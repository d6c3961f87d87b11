//! Crash round engine: a single-writer actor task.
//!
//! All round state, the bank pool, and the ticker live inside one
//! sequential tokio task. Bets and cashouts arrive as messages with
//! oneshot reply channels; lifecycle events fan out over a broadcast
//! channel. A cashout and the crash transition are therefore processed in
//! one ordering domain and can never both win the same instant.

use crate::bank::{Accounts, Bank};
use crate::commitment::{crash_point, Commitment};
use crate::config::CrashConfig;
use crate::errors::{CashoutReceipt, GameError, GameResult};
use crate::history::History;
use crate::multiplier::Multiplier;
use super::round::{CrashRecord, Round, RoundParams, RoundStatus, TickOutcome};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info};

/// Events pushed to every connected observer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum CrashEvent {
    #[serde(rename = "round:start")]
    RoundStart {
        id: String,
        seed_hash: String,
        min_bet: u64,
        /// Unix milliseconds; clients render the countdown from this.
        betting_ends: i64,
    },

    #[serde(rename = "round:run")]
    RoundRun { id: String },

    #[serde(rename = "round:tick")]
    RoundTick { multiplier: Multiplier },

    #[serde(rename = "round:crash")]
    RoundCrash {
        id: String,
        crash_multiplier: Multiplier,
    },

    #[serde(rename = "bank:update")]
    BankUpdate { bank: u64 },

    #[serde(rename = "info")]
    Info {
        bank: u64,
        history: Vec<CrashRecord>,
    },
}

/// Acknowledgement for an accepted bet.
#[derive(Debug, Clone, Serialize)]
pub struct BetAccepted {
    pub round_id: String,
    pub amount: u64,
}

/// Point-in-time view of the engine for new observers and verification.
#[derive(Debug, Clone, Serialize)]
pub struct CrashSnapshot {
    pub round_id: String,
    pub seed_hash: String,
    pub status: RoundStatus,
    pub bank: u64,
    pub min_bet: u64,
    pub betting_ends: i64,
}

enum Command {
    PlaceBet {
        client_id: String,
        round_id: String,
        amount: u64,
        reply: oneshot::Sender<GameResult<BetAccepted>>,
    },
    Cashout {
        client_id: String,
        round_id: String,
        reply: oneshot::Sender<GameResult<CashoutReceipt>>,
    },
    Snapshot {
        reply: oneshot::Sender<CrashSnapshot>,
    },
}

/// Handle for submitting operations to the engine task.
#[derive(Clone)]
pub struct CrashHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<CrashEvent>,
    history: Arc<History<CrashRecord>>,
}

impl CrashHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<CrashEvent> {
        self.events.subscribe()
    }

    pub fn history(&self) -> &History<CrashRecord> {
        &self.history
    }

    pub async fn place_bet(&self, client_id: &str, round_id: &str, amount: u64) -> GameResult<BetAccepted> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::PlaceBet {
                client_id: client_id.to_string(),
                round_id: round_id.to_string(),
                amount,
                reply,
            })
            .await
            .map_err(|_| GameError::phase("engine_stopped"))?;
        rx.await.map_err(|_| GameError::phase("engine_stopped"))?
    }

    pub async fn cashout(&self, client_id: &str, round_id: &str) -> GameResult<CashoutReceipt> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Cashout {
                client_id: client_id.to_string(),
                round_id: round_id.to_string(),
                reply,
            })
            .await
            .map_err(|_| GameError::phase("engine_stopped"))?;
        rx.await.map_err(|_| GameError::phase("engine_stopped"))?
    }

    pub async fn snapshot(&self) -> GameResult<CrashSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Snapshot { reply })
            .await
            .map_err(|_| GameError::phase("engine_stopped"))?;
        rx.await.map_err(|_| GameError::phase("engine_stopped"))
    }

    /// Proof for a finished round, or the commitment-only view when the id
    /// names the round still in flight.
    pub async fn verify(&self, round_id: &str) -> GameResult<CrashProof> {
        if let Some(record) = self.history.find(round_id) {
            return Ok(CrashProof {
                id: record.id,
                seed_hash: record.seed_hash,
                server_seed: Some(record.server_seed),
                crash_multiplier: Some(record.crash_multiplier),
                concluded: true,
            });
        }

        let snapshot = self.snapshot().await?;
        if snapshot.round_id == round_id {
            // Never the secret before conclusion.
            return Ok(CrashProof {
                id: snapshot.round_id,
                seed_hash: snapshot.seed_hash,
                server_seed: None,
                crash_multiplier: None,
                concluded: false,
            });
        }

        Err(GameError::NotFound(format!("round {}", round_id)))
    }
}

/// Verification payload for a round.
#[derive(Debug, Clone, Serialize)]
pub struct CrashProof {
    pub id: String,
    pub seed_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_seed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crash_multiplier: Option<Multiplier>,
    pub concluded: bool,
}

/// Spawn the engine task and return its handle.
pub fn spawn(config: CrashConfig, accounts: Arc<Accounts>, history_limit: usize) -> CrashHandle {
    let (commands, command_rx) = mpsc::channel(1_024);
    let (events, _) = broadcast::channel(1_024);
    let history = Arc::new(History::new(history_limit));

    let engine = Engine {
        config,
        accounts,
        bank: Bank::new(0),
        history: history.clone(),
        events: events.clone(),
        current: None,
        next_round_at: None,
    };
    tokio::spawn(engine.run(command_rx));

    CrashHandle {
        commands,
        events,
        history,
    }
}

struct Engine {
    config: CrashConfig,
    accounts: Arc<Accounts>,
    bank: Bank,
    history: Arc<History<CrashRecord>>,
    events: broadcast::Sender<CrashEvent>,
    current: Option<Round>,
    next_round_at: Option<Instant>,
}

impl Engine {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        self.bank.credit_pool(self.config.initial_bank);
        self.start_round(Instant::now());

        let mut ticker = tokio::time::interval(Duration::from_millis(self.config.tick_interval_ms));

        loop {
            tokio::select! {
                biased;
                cmd = commands.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd),
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    self.handle_tick(Instant::now());
                }
            }
        }

        debug!("crash engine stopped");
    }

    fn round_params(&self) -> RoundParams {
        RoundParams {
            betting_window: Duration::from_millis(self.config.betting_window_ms),
            growth_base: self.config.growth_base,
            min_bet: self.config.min_bet,
        }
    }

    fn start_round(&mut self, now: Instant) {
        let commitment = Commitment::generate();
        let point = crash_point(&commitment.secret_bytes());
        let round = Round::new(commitment, point, self.round_params(), now);

        info!(round_id = %round.id, "crash round open for betting");
        self.broadcast(CrashEvent::RoundStart {
            id: round.id.clone(),
            seed_hash: round.commitment.public_hash.clone(),
            min_bet: self.config.min_bet,
            betting_ends: wall_clock_deadline(round.betting_ends_at, now),
        });

        self.current = Some(round);
        self.next_round_at = None;
    }

    fn handle_tick(&mut self, now: Instant) {
        let Some(round) = self.current.as_mut() else {
            return;
        };

        match round.status {
            RoundStatus::Betting => {
                if round.betting_over(now) {
                    round.begin_running(now);
                    let id = round.id.clone();
                    debug!(round_id = %id, "crash round running");
                    self.broadcast(CrashEvent::RoundRun { id });
                }
            }
            RoundStatus::Running => match round.tick(now) {
                TickOutcome::Tick(multiplier) => {
                    self.broadcast(CrashEvent::RoundTick { multiplier });
                }
                TickOutcome::Crashed(crash_multiplier) => {
                    let id = round.id.clone();
                    let forfeited = round.open_stakes();
                    info!(round_id = %id, %crash_multiplier, forfeited, "crash round ended");

                    self.history.push(round.to_record());
                    self.broadcast(CrashEvent::RoundCrash {
                        id,
                        crash_multiplier,
                    });
                    self.next_round_at = Some(now + Duration::from_millis(self.config.cooldown_ms));
                }
            },
            RoundStatus::Crashed => {
                if self.next_round_at.is_some_and(|at| now >= at) {
                    self.start_round(now);
                }
            }
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::PlaceBet {
                client_id,
                round_id,
                amount,
                reply,
            } => {
                let _ = reply.send(self.place_bet(&client_id, &round_id, amount));
            }
            Command::Cashout {
                client_id,
                round_id,
                reply,
            } => {
                let _ = reply.send(self.cashout(&client_id, &round_id));
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn place_bet(&mut self, client_id: &str, round_id: &str, amount: u64) -> GameResult<BetAccepted> {
        let now = Instant::now();
        let round = self.current_round_mut(round_id)?;

        // Validate the bet against the round before touching any balance.
        round.place_bet(client_id, amount, now)?;

        // Registered accounts stake from their balance; a failed debit
        // rolls the bet record back so nothing is partially applied.
        if self.accounts.exists(client_id) {
            if let Err(e) = self.accounts.debit(client_id, amount) {
                self.current
                    .as_mut()
                    .expect("round checked above")
                    .bets
                    .remove(client_id);
                return Err(e);
            }
        }

        self.bank.credit_pool(amount);
        let bank = self.bank.pool();
        self.broadcast(CrashEvent::BankUpdate { bank });

        Ok(BetAccepted {
            round_id: round_id.to_string(),
            amount,
        })
    }

    fn cashout(&mut self, client_id: &str, round_id: &str) -> GameResult<CashoutReceipt> {
        let now = Instant::now();
        let bank = &mut self.bank;
        let round = match self.current.as_mut() {
            Some(r) if r.id == round_id => r,
            _ => return Err(GameError::NotFound(format!("round {}", round_id))),
        };

        let receipt = round.cashout(client_id, now, bank)?;

        if self.accounts.exists(client_id) {
            self.accounts.credit(client_id, receipt.payout)?;
        }

        let bank = self.bank.pool();
        self.broadcast(CrashEvent::BankUpdate { bank });
        Ok(receipt)
    }

    fn snapshot(&self) -> CrashSnapshot {
        let round = self.current.as_ref().expect("engine always holds a round");
        CrashSnapshot {
            round_id: round.id.clone(),
            seed_hash: round.commitment.public_hash.clone(),
            status: round.status,
            bank: self.bank.pool(),
            min_bet: self.config.min_bet,
            betting_ends: wall_clock_deadline(round.betting_ends_at, Instant::now()),
        }
    }

    fn current_round_mut(&mut self, round_id: &str) -> GameResult<&mut Round> {
        match self.current.as_mut() {
            Some(round) if round.id == round_id => Ok(round),
            _ => Err(GameError::NotFound(format!("round {}", round_id))),
        }
    }

    fn broadcast(&self, event: CrashEvent) {
        // A send error only means nobody is listening right now.
        let _ = self.events.send(event);
    }
}

/// Project a monotonic deadline onto the wall clock for clients.
fn wall_clock_deadline(deadline: Instant, now: Instant) -> i64 {
    let remaining = deadline.saturating_duration_since(now).as_millis() as i64;
    chrono::Utc::now().timestamp_millis() + remaining
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrashConfig;

    fn test_config() -> CrashConfig {
        CrashConfig {
            betting_window_ms: 400,
            tick_interval_ms: 20,
            cooldown_ms: 100,
            // Steep test curve: even a capped 10000x point is reached in
            // about two seconds, so rounds conclude quickly.
            growth_base: 100.0,
            initial_bank: 1_000_000,
            min_bet: 1,
        }
    }

    async fn wait_for_betting_round(handle: &CrashHandle) -> CrashSnapshot {
        for _ in 0..500 {
            let snapshot = handle.snapshot().await.unwrap();
            if snapshot.status == RoundStatus::Betting {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no betting round appeared");
    }

    #[tokio::test]
    async fn test_bet_then_forfeit_or_cashout_lifecycle() {
        let accounts = Arc::new(Accounts::new(0));
        let handle = spawn(test_config(), accounts, 50);

        let snapshot = wait_for_betting_round(&handle).await;
        let accepted = handle.place_bet("alice", &snapshot.round_id, 100).await.unwrap();
        assert_eq!(accepted.amount, 100);

        // Stake flowed into the pool.
        let after = handle.snapshot().await.unwrap();
        assert_eq!(after.bank, 1_000_100);

        // Duplicate bet on the same round is rejected.
        let err = handle.place_bet("alice", &snapshot.round_id, 100).await.unwrap_err();
        assert_eq!(err.code(), "validation");
    }

    #[tokio::test]
    async fn test_round_eventually_crashes_into_history() {
        let accounts = Arc::new(Accounts::new(0));
        let handle = spawn(test_config(), accounts, 50);

        let snapshot = wait_for_betting_round(&handle).await;
        let round_id = snapshot.round_id.clone();

        // Wait for the round to conclude (low crash points end quickly; the
        // betting window is 200 ms in tests).
        for _ in 0..600 {
            if handle.history().find(&round_id).is_some() {
                let record = handle.history().find(&round_id).unwrap();
                assert_eq!(record.seed_hash, snapshot.seed_hash);
                crate::commitment::verify_reveal(&record.server_seed, &record.seed_hash).unwrap();
                // Replay: the persisted point derives from the revealed seed.
                let secret = hex::decode(&record.server_seed).unwrap();
                assert_eq!(crate::commitment::crash_point(&secret), record.crash_multiplier);
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("round never crashed");
    }

    #[tokio::test]
    async fn test_unknown_round_rejected() {
        let accounts = Arc::new(Accounts::new(0));
        let handle = spawn(test_config(), accounts, 50);
        wait_for_betting_round(&handle).await;

        let err = handle.place_bet("alice", "not-a-round", 100).await.unwrap_err();
        assert_eq!(err.code(), "not_found");
        let err = handle.cashout("alice", "not-a-round").await.unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[tokio::test]
    async fn test_registered_account_is_debited_and_rolled_back() {
        let accounts = Arc::new(Accounts::new(50));
        let handle = spawn(test_config(), accounts.clone(), 50);
        let account = accounts.register("p1");

        let snapshot = wait_for_betting_round(&handle).await;

        // Stake above balance: rejected with no partial debit and no
        // lingering bet record (a retry with a valid amount succeeds).
        let err = handle.place_bet(&account.id, &snapshot.round_id, 100).await.unwrap_err();
        assert_eq!(err.code(), "insufficient_funds");
        assert_eq!(accounts.get(&account.id).unwrap().balance, 50);

        handle.place_bet(&account.id, &snapshot.round_id, 50).await.unwrap();
        assert_eq!(accounts.get(&account.id).unwrap().balance, 0);
    }

    #[tokio::test]
    async fn test_verify_active_round_hides_secret() {
        let accounts = Arc::new(Accounts::new(0));
        let handle = spawn(test_config(), accounts, 50);
        let snapshot = wait_for_betting_round(&handle).await;

        let proof = handle.verify(&snapshot.round_id).await.unwrap();
        assert!(!proof.concluded);
        assert!(proof.server_seed.is_none());
        assert_eq!(proof.seed_hash, snapshot.seed_hash);
    }
}
