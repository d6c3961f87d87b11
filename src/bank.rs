//! Account ledger and the shared crash bank pool.
//!
//! Accounts back the coinflip and mines games; the crash game pays out of a
//! single shared pool. Balance operations are whole-or-nothing: a debit
//! that would go negative is rejected, never clipped (the one exception is
//! `Bank::debit_pool`, which caps payouts at the remaining pool by design
//! of the crash game).

use crate::errors::{GameError, GameResult};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// A player account with an in-process balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    /// Caller-provided identity (e.g. an upstream auth subject).
    pub external_id: String,
    pub balance: u64,
    pub banned: bool,
}

/// Thread-safe account table.
///
/// All balance changes go through `debit`/`credit`; each operation holds
/// the account's map entry for its whole read-modify-write.
pub struct Accounts {
    accounts: DashMap<String, Account>,
    starting_balance: u64,
}

impl Accounts {
    pub fn new(starting_balance: u64) -> Self {
        Self {
            accounts: DashMap::new(),
            starting_balance,
        }
    }

    /// Register a new account and return it.
    pub fn register(&self, external_id: &str) -> Account {
        let account = Account {
            id: uuid::Uuid::new_v4().to_string(),
            external_id: external_id.to_string(),
            balance: self.starting_balance,
            banned: false,
        };
        self.accounts.insert(account.id.clone(), account.clone());
        account
    }

    pub fn get(&self, id: &str) -> GameResult<Account> {
        self.accounts
            .get(id)
            .map(|a| a.clone())
            .ok_or_else(|| GameError::NotFound(format!("account {}", id)))
    }

    pub fn exists(&self, id: &str) -> bool {
        self.accounts.contains_key(id)
    }

    /// Reject banned accounts before accepting any bet.
    pub fn check_playable(&self, id: &str) -> GameResult<()> {
        let account = self.get(id)?;
        if account.banned {
            return Err(GameError::Banned);
        }
        Ok(())
    }

    /// Remove `amount` from the balance; fails without partial application.
    pub fn debit(&self, id: &str, amount: u64) -> GameResult<u64> {
        let mut entry = self
            .accounts
            .get_mut(id)
            .ok_or_else(|| GameError::NotFound(format!("account {}", id)))?;
        if entry.banned {
            return Err(GameError::Banned);
        }
        if entry.balance < amount {
            return Err(GameError::InsufficientFunds);
        }
        entry.balance -= amount;
        Ok(entry.balance)
    }

    /// Add `amount` to the balance.
    pub fn credit(&self, id: &str, amount: u64) -> GameResult<u64> {
        let mut entry = self
            .accounts
            .get_mut(id)
            .ok_or_else(|| GameError::NotFound(format!("account {}", id)))?;
        entry.balance = entry.balance.saturating_add(amount);
        Ok(entry.balance)
    }

    pub fn set_banned(&self, id: &str, banned: bool) -> GameResult<()> {
        let mut entry = self
            .accounts
            .get_mut(id)
            .ok_or_else(|| GameError::NotFound(format!("account {}", id)))?;
        entry.banned = banned;
        Ok(())
    }
}

/// The shared crash pool.
///
/// Owned by the crash engine task; all reads and writes happen inside that
/// single serialization domain, so no lock is needed here.
#[derive(Debug)]
pub struct Bank {
    pool: u64,
}

impl Bank {
    pub fn new(pool: u64) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> u64 {
        self.pool
    }

    /// Stakes flow into the pool when a bet is accepted.
    pub fn credit_pool(&mut self, amount: u64) {
        self.pool = self.pool.saturating_add(amount);
    }

    /// Debit up to `amount`, clamping at zero. Returns the amount actually
    /// debited; a payout larger than the pool drains it rather than failing.
    pub fn debit_pool(&mut self, amount: u64) -> u64 {
        let debited = amount.min(self.pool);
        self.pool -= debited;
        debited
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_get() {
        let accounts = Accounts::new(1_000_000);
        let account = accounts.register("discord:123");
        let fetched = accounts.get(&account.id).unwrap();
        assert_eq!(fetched.balance, 1_000_000);
        assert_eq!(fetched.external_id, "discord:123");
        assert!(!fetched.banned);
    }

    #[test]
    fn test_debit_rejects_insufficient_funds() {
        let accounts = Accounts::new(100);
        let account = accounts.register("p1");
        assert_eq!(
            accounts.debit(&account.id, 101),
            Err(GameError::InsufficientFunds)
        );
        // Rejection leaves the balance untouched.
        assert_eq!(accounts.get(&account.id).unwrap().balance, 100);
        assert_eq!(accounts.debit(&account.id, 100), Ok(0));
    }

    #[test]
    fn test_credit_after_debit() {
        let accounts = Accounts::new(500);
        let account = accounts.register("p1");
        accounts.debit(&account.id, 200).unwrap();
        assert_eq!(accounts.credit(&account.id, 360), Ok(660));
    }

    #[test]
    fn test_banned_account_cannot_play_or_bet() {
        let accounts = Accounts::new(500);
        let account = accounts.register("p1");
        accounts.set_banned(&account.id, true).unwrap();
        assert_eq!(accounts.check_playable(&account.id), Err(GameError::Banned));
        assert_eq!(accounts.debit(&account.id, 10), Err(GameError::Banned));
    }

    #[test]
    fn test_unknown_account() {
        let accounts = Accounts::new(0);
        assert!(matches!(
            accounts.get("missing"),
            Err(GameError::NotFound(_))
        ));
    }

    #[test]
    fn test_pool_clamps_at_zero() {
        let mut bank = Bank::new(150);
        assert_eq!(bank.debit_pool(100), 100);
        assert_eq!(bank.pool(), 50);
        // Payout larger than the pool drains it, never goes negative.
        assert_eq!(bank.debit_pool(100), 50);
        assert_eq!(bank.pool(), 0);
        assert_eq!(bank.debit_pool(10), 0);
    }

    #[test]
    fn test_pool_credit() {
        let mut bank = Bank::new(0);
        bank.credit_pool(500);
        assert_eq!(bank.pool(), 500);
    }
}
