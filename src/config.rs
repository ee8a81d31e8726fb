//! Runtime configuration.
//!
//! Values come from `WAGE_LEDGER_`-prefixed environment variables, after an
//! optional `.env` file has been loaded:
//!
//! - `WAGE_LEDGER_FEE_RATE_BPS`: advance fee in basis points (default 350, i.e. 3.5%)
//! - `WAGE_LEDGER_MAX_ADVANCE`: open principal cap per user in minor units
//!   (default 2_700_000, i.e. 27,000.00; 0 disables the cap)
//! - `WAGE_LEDGER_SETTLEMENT`: `principal-only` (default) or `fee-payable`

use serde::Deserialize;

use crate::Amount;
use crate::clock::SharedClock;
use crate::engine::{AdvanceService, FeeSchedule, MaxAdvance, SettlementPolicy};

const ENV_PREFIX: &str = "WAGE_LEDGER_";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(default = "default_fee_rate_bps")]
    pub fee_rate_bps: u32,

    #[serde(default = "default_max_advance")]
    pub max_advance: i64,

    #[serde(default)]
    pub settlement: SettlementPolicy,
}

fn default_fee_rate_bps() -> u32 {
    350
}

fn default_max_advance() -> i64 {
    2_700_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fee_rate_bps: default_fee_rate_bps(),
            max_advance: default_max_advance(),
            settlement: SettlementPolicy::default(),
        }
    }
}

impl Config {
    /// Load configuration from the environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Load configuration from explicit key/value pairs.
    pub fn from_vars<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(ENV_PREFIX).from_iter(vars)
    }

    pub fn fee_schedule(&self) -> FeeSchedule {
        FeeSchedule {
            rate_bps: self.fee_rate_bps,
        }
    }

    /// Per-user cap on open principal, if any.
    pub fn max_advance(&self) -> Option<Amount> {
        (self.max_advance > 0).then(|| Amount::from_minor(self.max_advance))
    }

    /// An advance service wired with this configuration.
    pub fn advance_service(&self, clock: SharedClock) -> AdvanceService {
        let service = AdvanceService::new(clock)
            .with_fee_schedule(self.fee_schedule())
            .with_settlement(self.settlement);
        match self.max_advance() {
            Some(limit) => service.with_eligibility(MaxAdvance(limit)),
            None => service,
        }
    }
}
