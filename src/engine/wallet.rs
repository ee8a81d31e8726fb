//! Per-user balances and the append-only transaction log.

use std::collections::HashMap;

use crate::Amount;
use crate::clock::SharedClock;
use crate::model::{Transaction, TxId, TxKind, UserId};

use super::error::WalletError;
use super::state::Wallet;

pub const WITHDRAWAL_TITLE: &str = "Withdrawal";

/// Owns every wallet balance and the ledger of postings against them.
pub struct WalletService {
    wallets: HashMap<UserId, Wallet>,
    /// Every posting, in insertion order
    transactions: Vec<Transaction>,
    /// Display names used in transfer titles
    display_names: HashMap<UserId, String>,
    next_tx_id: TxId,
    clock: SharedClock,
}

/// Public API
impl WalletService {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            wallets: HashMap::new(),
            transactions: Vec::new(),
            display_names: HashMap::new(),
            next_tx_id: 1,
            clock,
        }
    }

    /// Balance of `user`, zero if the wallet was never referenced.
    pub fn balance(&self, user: &str) -> Amount {
        self.wallets
            .get(user)
            .map(Wallet::balance)
            .unwrap_or_default()
    }

    /// Postings for `user`, oldest first.
    pub fn transactions<'a>(&'a self, user: &'a str) -> impl Iterator<Item = &'a Transaction> + 'a {
        self.transactions.iter().filter(move |t| t.user_id == user)
    }

    /// Every posting across all wallets, oldest first.
    pub fn ledger(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Every known wallet with its balance, in no particular order.
    pub fn wallets(&self) -> impl Iterator<Item = (&str, Amount)> + '_ {
        self.wallets
            .iter()
            .map(|(user, wallet)| (user.as_str(), wallet.balance()))
    }

    /// Name shown to the receiving side of a transfer from `user`.
    pub fn register_display_name(&mut self, user: &str, name: impl Into<String>) {
        self.display_names.insert(user.to_string(), name.into());
    }

    pub fn display_name<'a>(&'a self, user: &'a str) -> &'a str {
        self.display_names
            .get(user)
            .map(String::as_str)
            .unwrap_or(user)
    }

    /// Credit `amount` to `user`, creating the wallet if needed.
    pub fn deposit(
        &mut self,
        user: &str,
        amount: Amount,
        title: impl Into<String>,
    ) -> Result<TxId, WalletError> {
        Self::ensure_positive(amount)?;
        let credited = self.credited_balance(user, amount)?;

        self.wallets
            .insert(user.to_string(), Wallet::with_balance(credited));
        Ok(self.post(user, amount, title.into(), TxKind::Credit))
    }

    /// Debit `amount` from `user`.
    pub fn withdraw(&mut self, user: &str, amount: Amount) -> Result<TxId, WalletError> {
        Self::ensure_positive(amount)?;
        self.ensure_funds(user, amount)?;

        self.wallet_mut(user).debit(amount);
        Ok(self.post(user, amount, WITHDRAWAL_TITLE.to_string(), TxKind::Debit))
    }

    /// Move `amount` from `from` to `to`. The receiver is created at zero if unknown.
    pub fn transfer(
        &mut self,
        from: &str,
        to: &str,
        amount: Amount,
        recipient_name: &str,
    ) -> Result<(), WalletError> {
        Self::ensure_positive(amount)?;
        if from == to {
            return Err(WalletError::SelfTransfer(from.to_string()));
        }
        self.ensure_funds(from, amount)?;
        let credited = self.credited_balance(to, amount)?;

        self.wallet_mut(from).debit(amount);
        self.wallets
            .insert(to.to_string(), Wallet::with_balance(credited));

        let sender_name = self.display_name(from).to_string();
        self.post(
            from,
            amount,
            format!("Transfer to {recipient_name}"),
            TxKind::Debit,
        );
        self.post(
            to,
            amount,
            format!("Transfer from {sender_name}"),
            TxKind::Credit,
        );

        Ok(())
    }
}

/// Private API
impl WalletService {
    /// Rebuild a service from persisted state; the id counter resumes after the highest id.
    pub(crate) fn restore(
        clock: SharedClock,
        balances: impl IntoIterator<Item = (UserId, Amount)>,
        mut transactions: Vec<Transaction>,
    ) -> Self {
        transactions.sort_by_key(|t| t.id);
        let next_tx_id = transactions.last().map_or(1, |t| t.id + 1);
        Self {
            wallets: balances
                .into_iter()
                .map(|(user, balance)| (user, Wallet::with_balance(balance)))
                .collect(),
            transactions,
            display_names: HashMap::new(),
            next_tx_id,
            clock,
        }
    }

    fn ensure_positive(amount: Amount) -> Result<(), WalletError> {
        if !amount.is_positive() {
            return Err(WalletError::InvalidAmount(amount));
        }
        Ok(())
    }

    fn ensure_funds(&self, user: &str, amount: Amount) -> Result<(), WalletError> {
        let available = self.balance(user);
        if amount > available {
            return Err(WalletError::InsufficientFunds(
                user.to_string(),
                available,
                amount,
            ));
        }
        Ok(())
    }

    fn credited_balance(&self, user: &str, amount: Amount) -> Result<Amount, WalletError> {
        self.wallets
            .get(user)
            .copied()
            .unwrap_or_default()
            .credited(amount)
            .ok_or_else(|| WalletError::BalanceOverflow(user.to_string()))
    }

    fn wallet_mut(&mut self, user: &str) -> &mut Wallet {
        self.wallets.entry(user.to_string()).or_default()
    }

    /// Append one posting and return its id
    fn post(&mut self, user: &str, amount: Amount, title: String, kind: TxKind) -> TxId {
        let id = self.next_tx_id;
        self.next_tx_id += 1;
        self.transactions.push(Transaction {
            id,
            title,
            date: self.clock.today(),
            amount,
            kind,
            user_id: user.to_string(),
        });
        id
    }
}
