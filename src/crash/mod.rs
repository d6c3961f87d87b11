//! The crash game: a repeating round state machine with a live multiplier
//! curve, concurrent bet/cashout arbitration, and a shared bank pool.

pub mod engine;
pub mod round;

pub use engine::{spawn, CrashEvent, CrashHandle, CrashSnapshot};
pub use round::{BetRecord, CrashRecord, Round, RoundStatus};
