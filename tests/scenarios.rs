//! End-to-end scenarios over the round machine and game engines.

use fairhouse::bank::{Accounts, Bank};
use fairhouse::coinflip::{Coinflip, FlipRequest};
use fairhouse::commitment::{
    coinflip_outcome, crash_point, derive_float_u32, derive_float_u52, verify_reveal, Commitment,
};
use fairhouse::crash::round::{Round, RoundParams, RoundStatus, TickOutcome};
use fairhouse::mines::{MinesEngine, RevealRequest};
use fairhouse::multiplier::Multiplier;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn round_params() -> RoundParams {
    RoundParams {
        betting_window: Duration::from_secs(20),
        growth_base: 1.07,
        min_bet: 1,
    }
}

/// A round with a fixed 2.50 crash point and one 100-unit bet left open
/// crashes at exactly 2.50 and pays nothing.
#[test]
fn scenario_uncashed_bet_forfeits_at_crash() {
    let start = Instant::now();
    let mut round = Round::new(
        Commitment::generate(),
        Multiplier::from_hundredths(250),
        round_params(),
        start,
    );

    round.place_bet("client-1", 100, start).unwrap();
    let run_start = start + Duration::from_secs(20);
    round.begin_running(run_start);

    // Replay the tick loop on the fixed 100 ms cadence until the curve
    // meets the predetermined point.
    let mut crashed_at = None;
    for tick in 1..3_000 {
        let now = run_start + Duration::from_millis(tick * 100);
        match round.tick(now) {
            TickOutcome::Tick(m) => assert!(m < Multiplier::from_hundredths(250)),
            TickOutcome::Crashed(m) => {
                crashed_at = Some(m);
                break;
            }
        }
    }

    assert_eq!(crashed_at, Some(Multiplier::from_hundredths(250)));
    assert_eq!(round.status, RoundStatus::Crashed);

    let bet = &round.bets["client-1"];
    assert!(!bet.cashed_out);
    assert_eq!(bet.payout, 0);
    assert_eq!(round.open_stakes(), 100);
}

/// Cashing out while the server-recomputed curve reads 1.80 pays
/// floor(100 * 1.80) = 180 and the pool decreases by exactly 180.
#[test]
fn scenario_cashout_at_recomputed_multiplier() {
    let start = Instant::now();
    let mut round = Round::new(
        Commitment::generate(),
        Multiplier::from_hundredths(250),
        round_params(),
        start,
    );
    let mut bank = Bank::new(1_000);

    round.place_bet("client-1", 100, start).unwrap();
    let run_start = start + Duration::from_secs(20);
    round.begin_running(run_start);

    // 1.07^8.69 = 1.8002... floors to 1.80.
    let at = run_start + Duration::from_secs_f64(8.69);
    assert_eq!(round.multiplier_at(at), Multiplier::from_hundredths(180));

    let receipt = round.cashout("client-1", at, &mut bank).unwrap();
    assert_eq!(receipt.payout, 180);
    assert_eq!(bank.pool(), 820);
}

/// A cashout arriving one tick after the round crashed is rejected as
/// too late, never paid.
#[test]
fn scenario_late_cashout_rejected() {
    let start = Instant::now();
    let mut round = Round::new(
        Commitment::generate(),
        Multiplier::from_hundredths(250),
        round_params(),
        start,
    );
    let mut bank = Bank::new(1_000);

    round.place_bet("client-1", 100, start).unwrap();
    round.begin_running(start);

    // 1.07^14 = 2.578 >= 2.50: this tick crashes the round.
    let crash_tick = start + Duration::from_secs(14);
    assert!(matches!(round.tick(crash_tick), TickOutcome::Crashed(_)));

    // The cashout was queued behind the tick in the same ordering domain.
    let err = round
        .cashout("client-1", crash_tick + Duration::from_millis(100), &mut bank)
        .unwrap_err();
    assert_eq!(err.phase_reason(), Some("too_late"));
    assert_eq!(bank.pool(), 1_000);
}

/// Five-bomb mines: first safe reveal multiplies to 1.2125, the second
/// compounds to 1.5316.
#[test]
fn scenario_mines_multiplier_chain() {
    let accounts = Arc::new(Accounts::new(100_000_000));
    let engine = MinesEngine::new(accounts.clone(), 100_000, 50);
    let account = accounts.register("player");

    'attempt: for attempt in 0..300 {
        let client_seed = format!("scenario-seed-{}", attempt);
        let mut game_id = None;
        let mut multipliers = Vec::new();

        for index in 0..25 {
            let response = engine
                .reveal(RevealRequest {
                    account_id: account.id.clone(),
                    game_id: game_id.clone(),
                    bet: 100_000,
                    bomb_count: 5,
                    revealed_index: index,
                    client_seed: client_seed.clone(),
                })
                .unwrap();

            if response.bomb {
                continue 'attempt;
            }
            game_id = Some(response.game_id.clone());
            multipliers.push(response.multiplier);
            if multipliers.len() == 2 {
                assert_eq!(multipliers[0].raw(), 12_125);
                assert_eq!(multipliers[1].raw(), 15_316);
                return;
            }
        }
    }
    panic!("no game reached two safe reveals");
}

/// The derive functions are pure: same inputs, same outputs, across both
/// precisions.
#[test]
fn derive_float_determinism() {
    let commitment = Commitment::generate();
    let secret = commitment.secret_bytes();

    for message in ["a", "client-seed", "crash", ""] {
        assert_eq!(
            derive_float_u32(&secret, message),
            derive_float_u32(&secret, message)
        );
        assert_eq!(
            derive_float_u52(&secret, message),
            derive_float_u52(&secret, message)
        );
    }
}

/// Full verification round-trip for a concluded coinflip: the revealed
/// seed hashes to the published commitment and reproduces the outcome.
#[test]
fn coinflip_verification_round_trip() {
    let accounts = Arc::new(Accounts::new(0));
    let coinflip = Coinflip::new(accounts, 100, 50);

    let committed_hash = coinflip.seed_info().seed_hash;
    let record = coinflip
        .flip(FlipRequest {
            account_id: None,
            client_seed: Some("my-seed".into()),
            bet: 0,
            choice: None,
        })
        .unwrap();

    assert_eq!(record.seed_hash, committed_hash);
    verify_reveal(&record.server_seed, &record.seed_hash).unwrap();

    let secret = hex::decode(&record.server_seed).unwrap();
    assert_eq!(coinflip_outcome(&secret, "my-seed"), record.outcome);
}

/// Replaying the documented crash formula on a revealed secret reproduces
/// the published point exactly, for many rounds.
#[test]
fn crash_point_replay() {
    for _ in 0..100 {
        let commitment = Commitment::generate();
        let secret = commitment.secret_bytes();
        let point = crash_point(&secret);
        assert_eq!(point, crash_point(&secret));
        assert!(point >= Multiplier::ONE);
    }
}

/// Any sequence of pool debits leaves the pool non-negative.
#[test]
fn pool_never_negative() {
    let mut bank = Bank::new(1_000);
    let mut total = 0;
    for amount in [400, 300, 200, 500, 1] {
        total += bank.debit_pool(amount);
        assert!(bank.pool() <= 1_000);
    }
    assert_eq!(total, 1_000);
    assert_eq!(bank.pool(), 0);
}
