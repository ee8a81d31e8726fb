//! Ledger engine.
//!
//! The engine owns the wallet ledger and the advance request book and applies
//! [`Command`]s to them one at a time. It also consumes an async stream of
//! commands, which is how concurrent producers share a single ledger.

use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info};

use crate::Amount;
use crate::clock::SharedClock;
use crate::config::Config;
use crate::model::{Command, RequestId, UserId};

mod advance;
pub use advance::{
    AdvanceService, EligibilityCheck, FeeSchedule, MaxAdvance, SALARY_ADVANCE_TITLE,
    SettlementPolicy, Unrestricted,
};

mod wallet;
pub use wallet::{WITHDRAWAL_TITLE, WalletService};

mod state;
pub use state::Wallet;

mod error;
pub use error::{AdvanceError, EngineError, WalletError};

/// The ledger engine.
pub struct Engine {
    wallets: WalletService,
    advances: AdvanceService,
}

/// Public API
impl Engine {
    pub fn new(clock: SharedClock) -> Self {
        Self::from_parts(
            WalletService::new(clock.clone()),
            AdvanceService::new(clock),
        )
    }

    /// Engine with the fee schedule, eligibility limit and settlement policy from `config`.
    pub fn with_config(config: &Config, clock: SharedClock) -> Self {
        Self::from_parts(
            WalletService::new(clock.clone()),
            config.advance_service(clock),
        )
    }

    pub fn from_parts(wallets: WalletService, advances: AdvanceService) -> Self {
        Self { wallets, advances }
    }

    pub fn wallets(&self) -> &WalletService {
        &self.wallets
    }

    pub fn wallets_mut(&mut self) -> &mut WalletService {
        &mut self.wallets
    }

    pub fn advances(&self) -> &AdvanceService {
        &self.advances
    }

    pub fn advances_mut(&mut self) -> &mut AdvanceService {
        &mut self.advances
    }

    /// Approve a pending request and credit its principal.
    pub fn approve_request(&mut self, id: RequestId) -> Result<(), AdvanceError> {
        self.advances.approve_request(id, &mut self.wallets)
    }

    /// Every wallet with its balance, sorted by user.
    pub fn balances(&self) -> Vec<(UserId, Amount)> {
        let mut balances: Vec<_> = self
            .wallets
            .wallets()
            .map(|(user, balance)| (user.to_string(), balance))
            .collect();
        balances.sort();
        balances
    }

    /// Run the engine with the given command stream
    pub async fn run(&mut self, mut stream: impl Stream<Item = Command> + Unpin) {
        while let Some(command) = stream.next().await {
            // a failed command must not stop the engine; the outcome is already logged
            let _ = self.apply(command);
        }
        debug!("command stream exhausted");
    }

    /// Apply a single command on top of the current engine state
    pub fn apply(&mut self, command: Command) -> Result<(), EngineError> {
        match command {
            Command::Deposit {
                user,
                amount,
                title,
            } => {
                let result = self.wallets.deposit(&user, amount, title).map(drop);
                Self::log_result("deposit", Subject::User(&user), Some(amount), &result);
                result?;
            }
            Command::Withdraw { user, amount } => {
                let result = self.wallets.withdraw(&user, amount).map(drop);
                Self::log_result("withdrawal", Subject::User(&user), Some(amount), &result);
                result?;
            }
            Command::SetDisplayName { user, name } => {
                self.wallets.register_display_name(&user, name);
                debug!(user, "display name set");
            }
            Command::Transfer {
                from,
                to,
                amount,
                recipient_name,
            } => {
                let result = self.wallets.transfer(&from, &to, amount, &recipient_name);
                Self::log_result("transfer", Subject::User(&from), Some(amount), &result);
                result?;
            }
            Command::RequestAdvance {
                user,
                amount,
                fee,
                repayment_date,
            } => {
                let result = self
                    .advances
                    .request_advance(&user, amount, fee, repayment_date)
                    .map(drop);
                Self::log_result("advance request", Subject::User(&user), Some(amount), &result);
                result?;
            }
            Command::ApproveAdvance { request } => {
                let result = self.approve_request(request);
                Self::log_result("advance approval", Subject::Request(request), None, &result);
                result?;
            }
            Command::RejectAdvance { request } => {
                let result = self.advances.reject_request(request);
                Self::log_result("advance rejection", Subject::Request(request), None, &result);
                result?;
            }
            Command::MarkAdvancePaid { request } => {
                let result = self.advances.mark_paid(request);
                Self::log_result("advance repayment", Subject::Request(request), None, &result);
                result?;
            }
        }
        Ok(())
    }
}

/// What a logged command was about
enum Subject<'a> {
    User(&'a str),
    Request(RequestId),
}

/// Private API
impl Engine {
    /// Small helper to log `apply` results
    fn log_result<E: std::fmt::Display>(
        op: &str,
        subject: Subject<'_>,
        amount: Option<Amount>,
        result: &Result<(), E>,
    ) {
        match (subject, result) {
            (Subject::User(user), Ok(())) => {
                info!(user, amount = ?amount.map(|a| a.to_string()), "{op} applied");
            }
            (Subject::Request(request), Ok(())) => {
                info!(request, "{op} applied");
            }
            (Subject::User(user), Err(e)) => {
                info!(
                    user,
                    amount = ?amount.map(|a| a.to_string()),
                    reason = %e,
                    "{op} skipped"
                );
            }
            (Subject::Request(request), Err(e)) => {
                info!(request, reason = %e, "{op} skipped");
            }
        }
    }
}
