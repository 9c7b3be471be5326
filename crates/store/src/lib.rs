pub mod audit;
mod memory;
mod sled_store;

use async_trait::async_trait;
use chainhook_relay_core::{ConfirmOutcome, InvoiceRecord, RelayResult};

pub use memory::MemoryInvoiceStore;
pub use sled_store::SledInvoiceStore;

/// Keyed invoice persistence. Writes to the same name are serialized by the
/// backend; every mutation is durable once the call returns.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Insert or re-issue `name` as a pending invoice awaiting `transaction_id`.
    async fn put(&self, name: &str, transaction_id: &str) -> RelayResult<InvoiceRecord>;

    async fn get_by_name(&self, name: &str) -> RelayResult<Option<InvoiceRecord>>;

    /// Some record currently waiting on `transaction_id`, compared in
    /// normalized form (hex case and `0x` prefix do not matter). When several
    /// share it, the most recently updated one is returned.
    async fn get_by_transaction_id(&self, transaction_id: &str)
        -> RelayResult<Option<InvoiceRecord>>;

    /// Mark `name` confirmed. Fails with `NotFound` for unknown names; safe to
    /// repeat on a confirmed record.
    async fn confirm(&self, name: &str, identifier: &str) -> RelayResult<ConfirmOutcome>;

    /// All records, newest first.
    async fn list(&self) -> RelayResult<Vec<InvoiceRecord>>;

    /// Push buffered writes to durable storage before shutdown.
    async fn flush(&self) -> RelayResult<()> {
        Ok(())
    }
}

fn newest_first(records: &mut [InvoiceRecord]) {
    records.sort_by_key(|r| r.created_at);
    records.reverse();
}
