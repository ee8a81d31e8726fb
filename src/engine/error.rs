//! Error types for ledger and advance operations.

use thiserror::Error;

use crate::Amount;
use crate::model::{AdvanceStatus, RequestId, UserId};

/// Top-level error returned by [`Engine::apply`](super::Engine::apply).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("wallet operation failed: {0}")]
    Wallet(#[from] WalletError),

    #[error("advance operation failed: {0}")]
    Advance(#[from] AdvanceError),
}

/// Error during deposit, withdrawal or transfer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("amount must be positive, got {0}")]
    InvalidAmount(Amount),
    #[error("insufficient funds for user {0}: available {1}, requested {2}")]
    InsufficientFunds(UserId, Amount, Amount),
    #[error("user {0} cannot transfer to their own wallet")]
    SelfTransfer(UserId),
    #[error("balance of user {0} would overflow")]
    BalanceOverflow(UserId),
}

/// Error during the advance request lifecycle.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdvanceError {
    #[error("invalid advance: amount {0}, fee {1}")]
    InvalidAmount(Amount, Amount),
    #[error("user {0} is not eligible: {1}")]
    NotEligible(UserId, String),
    #[error("advance request {0} not found")]
    RequestNotFound(RequestId),
    #[error("advance request {0} is {1}, not pending")]
    RequestNotPending(RequestId, AdvanceStatus),
    #[error("advance request {0} is {1}, not approved")]
    RequestNotApproved(RequestId, AdvanceStatus),
    #[error("settlement failed: {0}")]
    Wallet(#[from] WalletError),
}
