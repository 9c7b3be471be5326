//! Applies delivered chainhook batches to pending invoices.
//!
//! Each data-bearing transaction in the `apply` set is matched to a pending
//! invoice by transaction id, an identifier is pulled from its payload with
//! the configured strategies, and the invoice is confirmed. Nothing that goes
//! wrong with one transaction stops the rest of the batch.

mod locks;
mod report;

use std::sync::Arc;

use chainhook_relay_core::extraction::{extract_identifier, Strategy, DEFAULT_STRATEGIES};
use chainhook_relay_core::payload::{ChainTransaction, WebhookBatch};
use chainhook_relay_core::{ConfirmOutcome, InvoiceStatus, RelayError};
use serde_json::Value;
use store::audit::{AuditEvent, AuditLog};
use store::InvoiceStore;

use locks::NameLocks;
pub use report::{ReconcileReport, TxOutcome};

pub struct Reconciler {
    store: Arc<dyn InvoiceStore>,
    strategies: Vec<Strategy>,
    audit: AuditLog,
    locks: NameLocks,
}

impl Reconciler {
    pub fn new(store: Arc<dyn InvoiceStore>) -> Self {
        Self::with_strategies(store, DEFAULT_STRATEGIES.to_vec())
    }

    /// Strategies run in the given order; the first identifier wins.
    pub fn with_strategies(store: Arc<dyn InvoiceStore>, strategies: Vec<Strategy>) -> Self {
        Self {
            store,
            strategies,
            audit: AuditLog::disabled(),
            locks: NameLocks::new(),
        }
    }

    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = audit;
        self
    }

    pub async fn reconcile(&self, batch: &WebhookBatch) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for block in &batch.apply {
            for raw in &block.transactions {
                let outcome = self.process_transaction(raw).await;
                report.tally(&outcome);
            }
        }

        // Confirmation is terminal, so rolled-back blocks are only noted.
        report.rolled_back = batch.rollback.iter().map(|b| b.transactions.len()).sum();
        if report.rolled_back > 0 {
            tracing::info!(transactions = report.rolled_back, "rollback received; confirmations are kept");
        }

        tracing::info!(
            seen = report.transactions_seen,
            matched = report.matched,
            confirmed = report.confirmed,
            extraction_failures = report.extraction_failures,
            store_errors = report.store_errors,
            "batch reconciled"
        );
        report
    }

    pub async fn process_transaction(&self, raw: &Value) -> TxOutcome {
        let tx = match ChainTransaction::from_value(raw) {
            Ok(tx) => tx,
            Err(e) => {
                tracing::warn!(error=%e, "skipping malformed transaction");
                return TxOutcome::Malformed;
            }
        };
        let (Some(data), Some(tx_id)) = (tx.data(), tx.tx_id()) else {
            tracing::debug!(tx_id = ?tx.tx_id(), "skipping transaction without data payload");
            return TxOutcome::Ignored;
        };

        let record = match self.store.get_by_transaction_id(tx_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::debug!(tx_id=%tx_id, "no invoice waiting on transaction");
                return TxOutcome::Untracked;
            }
            Err(e) => {
                tracing::error!(tx_id=%tx_id, error=%e, "invoice lookup failed");
                return TxOutcome::StoreError;
            }
        };
        let name = record.name;

        if record.status == InvoiceStatus::Confirmed {
            return TxOutcome::AlreadyConfirmed { name };
        }

        let Some((strategy, identifier)) = extract_identifier(&self.strategies, data) else {
            let err = RelayError::Extraction { tx_id: tx_id.to_string() };
            tracing::warn!(name=%name, error=%err, "invoice left pending");
            self.audit.record(
                AuditEvent::for_invoice("extraction_failed", &name, tx_id).with_error(err.to_string()),
            );
            return TxOutcome::ExtractionFailed { name };
        };

        let _guard = self.locks.lock(&name).await;
        match self.store.confirm(&name, &identifier).await {
            Ok(ConfirmOutcome::Confirmed) => {
                tracing::info!(name=%name, tx_id=%tx_id, identifier=%identifier, strategy, "invoice confirmed");
                self.audit.record(
                    AuditEvent::for_invoice("invoice_confirmed", &name, tx_id)
                        .with_identifier(&identifier),
                );
                TxOutcome::Confirmed { name, identifier }
            }
            Ok(ConfirmOutcome::AlreadyConfirmed) => {
                tracing::debug!(name=%name, "invoice was already confirmed");
                self.audit.record(AuditEvent::for_invoice(
                    "invoice_already_confirmed",
                    &name,
                    tx_id,
                ));
                TxOutcome::AlreadyConfirmed { name }
            }
            Err(RelayError::NotFound(_)) => TxOutcome::Untracked,
            Err(e) => {
                tracing::error!(name=%name, tx_id=%tx_id, error=%e, "confirming invoice failed");
                TxOutcome::StoreError
            }
        }
    }
}
