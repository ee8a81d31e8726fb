//! Advance request lifecycle and settlement into the wallet ledger.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::Amount;
use crate::clock::SharedClock;
use crate::model::{AdvanceRequest, AdvanceStatus, RequestId};

use super::error::AdvanceError;
use super::wallet::WalletService;

pub const SALARY_ADVANCE_TITLE: &str = "Salary Advance";

/// Decides whether a user may take another advance.
pub trait EligibilityCheck: Send + Sync {
    /// `exposure` is the principal of the user's pending and approved (unpaid) requests.
    fn check(&self, user: &str, amount: Amount, exposure: Amount) -> Result<(), String>;
}

/// Accepts every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unrestricted;

impl EligibilityCheck for Unrestricted {
    fn check(&self, _user: &str, _amount: Amount, _exposure: Amount) -> Result<(), String> {
        Ok(())
    }
}

/// Caps the open principal a user may hold at once.
#[derive(Debug, Clone, Copy)]
pub struct MaxAdvance(pub Amount);

impl EligibilityCheck for MaxAdvance {
    fn check(&self, _user: &str, amount: Amount, exposure: Amount) -> Result<(), String> {
        let available = self.0 - exposure;
        if amount > available {
            return Err(format!("requested {amount}, available {available}"));
        }
        Ok(())
    }
}

/// Advance fee as a proportion of the principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    pub rate_bps: u32,
}

impl FeeSchedule {
    pub fn fee_for(&self, amount: Amount) -> Amount {
        amount.percent_bps(self.rate_bps)
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self { rate_bps: 350 }
    }
}

/// What approval does with the fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SettlementPolicy {
    /// Credit the principal; the fee is informational.
    #[default]
    PrincipalOnly,
    /// Credit the principal and carry the fee as payable until the advance is paid.
    FeePayable,
}

/// Tracks advance requests from submission to repayment.
pub struct AdvanceService {
    /// Sorted by id
    requests: Vec<AdvanceRequest>,
    last_id: RequestId,
    fees: FeeSchedule,
    settlement: SettlementPolicy,
    eligibility: Box<dyn EligibilityCheck>,
    clock: SharedClock,
}

/// Public API
impl AdvanceService {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            requests: Vec::new(),
            last_id: 0,
            fees: FeeSchedule::default(),
            settlement: SettlementPolicy::default(),
            eligibility: Box::new(Unrestricted),
            clock,
        }
    }

    pub fn with_fee_schedule(mut self, fees: FeeSchedule) -> Self {
        self.fees = fees;
        self
    }

    pub fn with_settlement(mut self, settlement: SettlementPolicy) -> Self {
        self.settlement = settlement;
        self
    }

    pub fn with_eligibility(mut self, eligibility: impl EligibilityCheck + 'static) -> Self {
        self.eligibility = Box::new(eligibility);
        self
    }

    /// Fee the configured schedule charges for `amount`.
    pub fn quote_fee(&self, amount: Amount) -> Amount {
        self.fees.fee_for(amount)
    }

    pub fn get(&self, id: RequestId) -> Option<&AdvanceRequest> {
        self.index_of(id).ok().map(|i| &self.requests[i])
    }

    /// All requests, oldest first.
    pub fn requests(&self) -> &[AdvanceRequest] {
        &self.requests
    }

    /// Every request of `user` regardless of status, oldest first.
    pub fn user_requests<'a>(
        &'a self,
        user: &'a str,
    ) -> impl Iterator<Item = &'a AdvanceRequest> + 'a {
        self.requests.iter().filter(move |r| r.user_id == user)
    }

    /// Review queue for employers, oldest first.
    pub fn pending_requests(&self) -> impl Iterator<Item = &AdvanceRequest> + '_ {
        self.requests
            .iter()
            .filter(|r| r.status == AdvanceStatus::Pending)
    }

    /// Fees owed on approved, not yet repaid advances, saturating at [`Amount::MAX`].
    /// Always zero under [`SettlementPolicy::PrincipalOnly`].
    pub fn outstanding_fees(&self, user: &str) -> Amount {
        match self.settlement {
            SettlementPolicy::PrincipalOnly => Amount::ZERO,
            SettlementPolicy::FeePayable => self
                .user_requests(user)
                .filter(|r| r.status == AdvanceStatus::Approved)
                .fold(Amount::ZERO, |total, r| total.saturating_add(r.fee)),
        }
    }

    /// Open a pending request:
    /// - Ensure amount is positive and fee is not negative
    /// - Refuse when the user's open principal would overflow
    /// - Ask the eligibility check against the user's open exposure
    /// - Assign the next id and stamp the request date
    pub fn request_advance(
        &mut self,
        user: &str,
        amount: Amount,
        fee: Amount,
        repayment_date: NaiveDate,
    ) -> Result<&AdvanceRequest, AdvanceError> {
        if !amount.is_positive() || fee.is_negative() {
            return Err(AdvanceError::InvalidAmount(amount, fee));
        }

        let exposure = self
            .exposure(user)
            .filter(|exposure| exposure.checked_add(amount).is_some())
            .ok_or_else(|| {
                AdvanceError::NotEligible(user.to_string(), "open principal would overflow".into())
            })?;
        self.eligibility
            .check(user, amount, exposure)
            .map_err(|reason| AdvanceError::NotEligible(user.to_string(), reason))?;

        self.last_id += 1;
        self.requests.push(AdvanceRequest {
            id: self.last_id,
            user_id: user.to_string(),
            amount,
            fee,
            status: AdvanceStatus::Pending,
            request_date: self.clock.now(),
            approval_date: None,
            rejection_date: None,
            paid_date: None,
            repayment_date,
        });

        Ok(&self.requests[self.requests.len() - 1])
    }

    /// Approve a pending request:
    /// - Ensure the request exists and is pending
    /// - Credit the principal to the requester's wallet
    /// - Only then mark it approved, so a failed credit leaves it pending
    pub fn approve_request(
        &mut self,
        id: RequestId,
        wallets: &mut WalletService,
    ) -> Result<(), AdvanceError> {
        let index = self.pending_index(id)?;

        let request = &self.requests[index];
        wallets.deposit(&request.user_id, request.amount, SALARY_ADVANCE_TITLE)?;

        let now = self.clock.now();
        let request = &mut self.requests[index];
        request.status = AdvanceStatus::Approved;
        request.approval_date = Some(now);
        Ok(())
    }

    /// Decline a pending request. Rejection is terminal and touches no wallet.
    pub fn reject_request(&mut self, id: RequestId) -> Result<(), AdvanceError> {
        let index = self.pending_index(id)?;

        let now = self.clock.now();
        let request = &mut self.requests[index];
        request.status = AdvanceStatus::Rejected;
        request.rejection_date = Some(now);
        Ok(())
    }

    /// Record repayment of an approved advance. Repayment is collected from
    /// payroll, outside the wallet, so no posting is made.
    pub fn mark_paid(&mut self, id: RequestId) -> Result<(), AdvanceError> {
        let index = self
            .index_of(id)
            .map_err(|_| AdvanceError::RequestNotFound(id))?;

        let now = self.clock.now();
        let request = &mut self.requests[index];
        if request.status != AdvanceStatus::Approved {
            return Err(AdvanceError::RequestNotApproved(id, request.status));
        }
        request.status = AdvanceStatus::Paid;
        request.paid_date = Some(now);
        Ok(())
    }
}

/// Private API
impl AdvanceService {
    /// Replace the request book with persisted requests; ids resume after the highest.
    pub(crate) fn restore(mut self, mut requests: Vec<AdvanceRequest>) -> Self {
        requests.sort_by_key(|r| r.id);
        self.last_id = requests.last().map_or(0, |r| r.id);
        self.requests = requests;
        self
    }

    fn index_of(&self, id: RequestId) -> Result<usize, usize> {
        self.requests.binary_search_by_key(&id, |r| r.id)
    }

    fn pending_index(&self, id: RequestId) -> Result<usize, AdvanceError> {
        let index = self
            .index_of(id)
            .map_err(|_| AdvanceError::RequestNotFound(id))?;
        let status = self.requests[index].status;
        if status != AdvanceStatus::Pending {
            return Err(AdvanceError::RequestNotPending(id, status));
        }
        Ok(index)
    }

    /// Principal of the user's pending and approved requests, `None` on overflow.
    fn exposure(&self, user: &str) -> Option<Amount> {
        self.user_requests(user)
            .filter(|r| matches!(r.status, AdvanceStatus::Pending | AdvanceStatus::Approved))
            .try_fold(Amount::ZERO, |total, r| total.checked_add(r.amount))
    }
}
