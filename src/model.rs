//! Core domain types for the wage-advance ledger.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Amount;

/// User identifier, shared by wallets, advance requests and profiles.
pub type UserId = String;

/// Ledger transaction identifier.
pub type TxId = u64;

/// Advance request identifier.
pub type RequestId = u64;

/// Direction of a ledger entry relative to the owning wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    Credit,
    Debit,
}

/// An immutable entry in the wallet ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TxId,
    pub title: String,
    pub date: NaiveDate,
    pub amount: Amount,
    #[serde(rename = "type")]
    pub kind: TxKind,
    pub user_id: UserId,
}

/// Lifecycle of an advance request.
///
/// ```text
/// Pending --approve--> Approved --mark_paid--> Paid
///    \
///     `---reject-----> Rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvanceStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Paid,
}

impl fmt::Display for AdvanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AdvanceStatus::Pending => "pending",
            AdvanceStatus::Approved => "approved",
            AdvanceStatus::Rejected => "rejected",
            AdvanceStatus::Paid => "paid",
        };
        f.write_str(label)
    }
}

/// A request for a salary advance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceRequest {
    pub id: RequestId,
    pub user_id: UserId,
    /// Requested principal, credited to the wallet on approval.
    pub amount: Amount,
    pub fee: Amount,
    pub status: AdvanceStatus,
    pub request_date: DateTime<Utc>,
    /// Set iff the request was approved (Approved or Paid).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_date: Option<DateTime<Utc>>,
    pub repayment_date: NaiveDate,
}

impl AdvanceRequest {
    /// Whether the approval date matches the status.
    pub fn is_consistent(&self) -> bool {
        let approved = matches!(self.status, AdvanceStatus::Approved | AdvanceStatus::Paid);
        approved == self.approval_date.is_some()
    }
}

/// An operation submitted to the [`Engine`](crate::Engine).
#[derive(Debug, Clone)]
pub enum Command {
    /// Credit funds to a wallet.
    Deposit {
        user: UserId,
        amount: Amount,
        title: String,
    },
    /// Debit funds from a wallet.
    Withdraw { user: UserId, amount: Amount },
    /// Set the name the receiving side sees on transfers from `user`.
    SetDisplayName { user: UserId, name: String },
    /// Move funds between two wallets.
    Transfer {
        from: UserId,
        to: UserId,
        amount: Amount,
        recipient_name: String,
    },
    /// Open a pending advance request.
    RequestAdvance {
        user: UserId,
        amount: Amount,
        fee: Amount,
        repayment_date: NaiveDate,
    },
    /// Approve a pending request and credit its principal.
    ApproveAdvance { request: RequestId },
    /// Decline a pending request.
    RejectAdvance { request: RequestId },
    /// Record that an approved advance was repaid.
    MarkAdvancePaid { request: RequestId },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request(status: AdvanceStatus, approved: bool) -> AdvanceRequest {
        let at = Utc.with_ymd_and_hms(2025, 5, 20, 9, 0, 0).unwrap();
        AdvanceRequest {
            id: 1,
            user_id: "u1".into(),
            amount: Amount::from_major(10_000),
            fee: Amount::from_major(350),
            status,
            request_date: at,
            approval_date: approved.then_some(at),
            rejection_date: None,
            paid_date: None,
            repayment_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        }
    }

    #[test]
    fn advance_status_default() {
        assert_eq!(AdvanceStatus::default(), AdvanceStatus::Pending);
    }

    #[test]
    fn approval_date_consistency() {
        assert!(request(AdvanceStatus::Pending, false).is_consistent());
        assert!(request(AdvanceStatus::Approved, true).is_consistent());
        assert!(request(AdvanceStatus::Paid, true).is_consistent());
        assert!(!request(AdvanceStatus::Approved, false).is_consistent());
        assert!(!request(AdvanceStatus::Rejected, true).is_consistent());
    }

    #[test]
    fn transaction_kind_serializes_as_type() {
        let tx = Transaction {
            id: 7,
            title: "Withdrawal".into(),
            date: NaiveDate::from_ymd_opt(2025, 5, 8).unwrap(),
            amount: Amount::from_major(100),
            kind: TxKind::Debit,
            user_id: "u1".into(),
        };
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "debit");
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["amount"], 10_000);
    }
}
