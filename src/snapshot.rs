//! Saving and restoring ledger state through a [`DocumentStore`].
//!
//! Collections:
//! - `wallets`: one document per user, `{ "balance": <minor units> }`
//! - `transactions`: one document per posting, keyed by transaction id
//! - `advanceRequests`: one document per request, keyed by request id
//!
//! Loading validates every document; a ledger that does not satisfy its own
//! invariants is refused rather than partially restored.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::Amount;
use crate::clock::SharedClock;
use crate::config::Config;
use crate::engine::{Engine, WalletService};
use crate::model::{AdvanceRequest, Transaction};
use crate::store::{DocumentStore, StoreError, decode, encode};

pub const WALLETS: &str = "wallets";
pub const TRANSACTIONS: &str = "transactions";
pub const ADVANCE_REQUESTS: &str = "advanceRequests";

#[derive(Debug, Serialize, Deserialize)]
struct WalletDocument {
    balance: Amount,
}

/// Write every wallet, posting and advance request of `engine` to `store`,
/// replacing any ledger previously saved there.
pub async fn save<S: DocumentStore>(engine: &Engine, store: &S) -> Result<(), StoreError> {
    for collection in [WALLETS, TRANSACTIONS, ADVANCE_REQUESTS] {
        clear(store, collection).await?;
    }

    for (user, balance) in engine.balances() {
        let document = encode(&WalletDocument { balance })?;
        store.set(WALLETS, &user, document, false).await?;
    }

    for tx in engine.wallets().ledger() {
        store
            .set(TRANSACTIONS, &tx.id.to_string(), encode(tx)?, false)
            .await?;
    }

    for request in engine.advances().requests() {
        store
            .set(ADVANCE_REQUESTS, &request.id.to_string(), encode(request)?, false)
            .await?;
    }

    info!(
        wallets = engine.balances().len(),
        transactions = engine.wallets().ledger().len(),
        requests = engine.advances().requests().len(),
        "ledger saved"
    );
    Ok(())
}

/// Rebuild an engine configured by `config` from the documents in `store`.
pub async fn load<S: DocumentStore>(
    store: &S,
    config: &Config,
    clock: SharedClock,
) -> Result<Engine, StoreError> {
    let mut balances = Vec::new();
    for (user, document) in store.query(WALLETS, |_| true).await? {
        let wallet: WalletDocument = decode(WALLETS, &user, document)?;
        if wallet.balance.is_negative() {
            return Err(StoreError::malformed(WALLETS, &user, "negative balance"));
        }
        balances.push((user, wallet.balance));
    }

    let mut transactions = Vec::new();
    for (id, document) in store.query(TRANSACTIONS, |_| true).await? {
        let tx: Transaction = decode(TRANSACTIONS, &id, document)?;
        check_key(TRANSACTIONS, &id, tx.id)?;
        if !tx.amount.is_positive() {
            return Err(StoreError::malformed(TRANSACTIONS, &id, "non-positive amount"));
        }
        transactions.push(tx);
    }

    let mut requests = Vec::new();
    for (id, document) in store.query(ADVANCE_REQUESTS, |_| true).await? {
        let request: AdvanceRequest = decode(ADVANCE_REQUESTS, &id, document)?;
        check_key(ADVANCE_REQUESTS, &id, request.id)?;
        if !request.amount.is_positive() || request.fee.is_negative() {
            return Err(StoreError::malformed(ADVANCE_REQUESTS, &id, "invalid amount or fee"));
        }
        if !request.is_consistent() {
            return Err(StoreError::malformed(
                ADVANCE_REQUESTS,
                &id,
                format!("approval date does not match status {}", request.status),
            ));
        }
        requests.push(request);
    }

    info!(
        wallets = balances.len(),
        transactions = transactions.len(),
        requests = requests.len(),
        "ledger loaded"
    );

    let wallets = WalletService::restore(clock.clone(), balances, transactions);
    let advances = config.advance_service(clock).restore(requests);
    Ok(Engine::from_parts(wallets, advances))
}

async fn clear<S: DocumentStore>(store: &S, collection: &str) -> Result<(), StoreError> {
    for (id, _) in store.query(collection, |_| true).await? {
        store.delete(collection, &id).await?;
    }
    Ok(())
}

/// The document key must be the record id
fn check_key(collection: &str, key: &str, id: u64) -> Result<(), StoreError> {
    if key.parse::<u64>().ok() != Some(id) {
        return Err(StoreError::malformed(
            collection,
            key,
            format!("key does not match record id {id}"),
        ));
    }
    Ok(())
}
