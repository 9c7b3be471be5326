use std::collections::HashMap;

use async_trait::async_trait;
use chainhook_relay_core::{
    normalize_tx_id, ConfirmOutcome, InvoiceRecord, RelayError, RelayResult,
};
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{newest_first, InvoiceStore};

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryInvoiceStore {
    invoices: RwLock<HashMap<String, InvoiceRecord>>,
}

impl MemoryInvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvoiceStore for MemoryInvoiceStore {
    async fn put(&self, name: &str, transaction_id: &str) -> RelayResult<InvoiceRecord> {
        let now = Utc::now();
        let mut invoices = self.invoices.write().await;
        let record = invoices
            .entry(name.to_string())
            .and_modify(|rec| rec.reissue(transaction_id, now))
            .or_insert_with(|| InvoiceRecord::pending(name, transaction_id, now));
        Ok(record.clone())
    }

    async fn get_by_name(&self, name: &str) -> RelayResult<Option<InvoiceRecord>> {
        Ok(self.invoices.read().await.get(name).cloned())
    }

    async fn get_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> RelayResult<Option<InvoiceRecord>> {
        let lookup_key = normalize_tx_id(transaction_id);
        let invoices = self.invoices.read().await;
        Ok(invoices
            .values()
            .filter(|rec| rec.tx_lookup_key() == lookup_key)
            .max_by_key(|rec| rec.updated_at)
            .cloned())
    }

    async fn confirm(&self, name: &str, identifier: &str) -> RelayResult<ConfirmOutcome> {
        let mut invoices = self.invoices.write().await;
        let rec = invoices
            .get_mut(name)
            .ok_or_else(|| RelayError::NotFound(name.to_string()))?;
        Ok(rec.confirm(identifier, Utc::now()))
    }

    async fn list(&self) -> RelayResult<Vec<InvoiceRecord>> {
        let mut out: Vec<_> = self.invoices.read().await.values().cloned().collect();
        newest_first(&mut out);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract_tests;

    #[tokio::test]
    async fn put_then_get_is_pending() {
        contract_tests::put_then_get_is_pending(&MemoryInvoiceStore::new()).await;
    }

    #[tokio::test]
    async fn confirm_is_idempotent() {
        contract_tests::confirm_is_idempotent(&MemoryInvoiceStore::new()).await;
    }

    #[tokio::test]
    async fn confirm_unknown_is_not_found() {
        contract_tests::confirm_unknown_is_not_found(&MemoryInvoiceStore::new()).await;
    }

    #[tokio::test]
    async fn reissue_resets_confirmation() {
        contract_tests::reissue_resets_confirmation(&MemoryInvoiceStore::new()).await;
    }

    #[tokio::test]
    async fn lookup_by_transaction() {
        contract_tests::lookup_by_transaction(&MemoryInvoiceStore::new()).await;
    }

    #[tokio::test]
    async fn shared_transaction_survives_reissue() {
        contract_tests::shared_transaction_survives_reissue(&MemoryInvoiceStore::new()).await;
    }

    #[tokio::test]
    async fn lookup_matches_any_hex_spelling() {
        contract_tests::lookup_matches_any_hex_spelling(&MemoryInvoiceStore::new()).await;
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        contract_tests::list_is_newest_first(&MemoryInvoiceStore::new()).await;
    }
}
