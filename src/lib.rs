pub mod amount;
pub mod clock;
pub mod config;
pub mod csv;
pub mod engine;
pub mod model;
pub mod snapshot;
pub mod store;
pub mod users;

pub use amount::Amount;
pub use config::Config;
pub use engine::{AdvanceService, Engine, WalletService};
pub use model::{AdvanceRequest, AdvanceStatus, Command, RequestId, Transaction, TxId, TxKind, UserId};
