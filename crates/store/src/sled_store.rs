use std::path::Path;

use async_trait::async_trait;
use chainhook_relay_core::{
    normalize_tx_id, ConfirmOutcome, InvoiceRecord, RelayError, RelayResult,
};
use chrono::Utc;
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError, Transactional,
};
use sled::{Db, Tree};

use crate::{newest_first, InvoiceStore};

/// Embedded file-backed store.
///
/// `invoices` maps name -> JSON record. `tx_index` holds one empty-valued
/// key per record, `normalized tx id ‖ 0x00 ‖ name`, so several names can wait
/// on one transaction. Both trees change together inside one sled transaction.
#[derive(Clone)]
pub struct SledInvoiceStore {
    db: Db,
    invoices: Tree,
    tx_index: Tree,
}

type TxResult<T> = ConflictableTransactionResult<T, RelayError>;

fn unavailable(err: sled::Error) -> RelayError {
    RelayError::StoreUnavailable(err.to_string())
}

fn from_tx_error(err: TransactionError<RelayError>) -> RelayError {
    match err {
        TransactionError::Abort(err) => err,
        TransactionError::Storage(err) => unavailable(err),
    }
}

fn index_prefix(transaction_id: &str) -> Vec<u8> {
    let mut key = normalize_tx_id(transaction_id).into_bytes();
    key.push(0);
    key
}

fn index_key(transaction_id: &str, name: &str) -> Vec<u8> {
    let mut key = index_prefix(transaction_id);
    key.extend_from_slice(name.as_bytes());
    key
}

fn decode(bytes: &[u8]) -> RelayResult<InvoiceRecord> {
    Ok(serde_json::from_slice(bytes)?)
}

fn encode(rec: &InvoiceRecord) -> RelayResult<Vec<u8>> {
    Ok(serde_json::to_vec(rec)?)
}

impl SledInvoiceStore {
    pub fn open(path: impl AsRef<Path>) -> RelayResult<Self> {
        let db = sled::open(path).map_err(unavailable)?;
        Self::from_db(db)
    }

    /// A store deleted when dropped.
    pub fn temporary() -> RelayResult<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(unavailable)?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> RelayResult<Self> {
        let invoices = db.open_tree("invoices").map_err(unavailable)?;
        let tx_index = db.open_tree("tx_index").map_err(unavailable)?;
        Ok(Self {
            db,
            invoices,
            tx_index,
        })
    }

    fn read(&self, name: &str) -> RelayResult<Option<InvoiceRecord>> {
        match self.invoices.get(name.as_bytes()).map_err(unavailable)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn persist(&self) -> RelayResult<()> {
        self.db.flush_async().await.map_err(unavailable)?;
        Ok(())
    }
}

#[async_trait]
impl InvoiceStore for SledInvoiceStore {
    async fn put(&self, name: &str, transaction_id: &str) -> RelayResult<InvoiceRecord> {
        let now = Utc::now();
        let record = (&self.invoices, &self.tx_index)
            .transaction(|(invoices, tx_index)| -> TxResult<InvoiceRecord> {
                let record = match invoices.get(name.as_bytes())? {
                    Some(existing) => {
                        let mut rec = decode(&existing).map_err(ConflictableTransactionError::Abort)?;
                        tx_index.remove(index_key(&rec.transaction_id, name))?;
                        rec.reissue(transaction_id, now);
                        rec
                    }
                    None => InvoiceRecord::pending(name, transaction_id, now),
                };

                let bytes = encode(&record).map_err(ConflictableTransactionError::Abort)?;
                invoices.insert(name.as_bytes(), bytes)?;
                tx_index.insert(index_key(transaction_id, name), &[] as &[u8])?;
                Ok(record)
            })
            .map_err(from_tx_error)?;

        self.persist().await?;
        tracing::debug!(name=%name, tx_id=%transaction_id, "invoice record written");
        Ok(record)
    }

    async fn get_by_name(&self, name: &str) -> RelayResult<Option<InvoiceRecord>> {
        self.read(name)
    }

    async fn get_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> RelayResult<Option<InvoiceRecord>> {
        let prefix = index_prefix(transaction_id);
        let lookup_key = normalize_tx_id(transaction_id);
        let mut found: Option<InvoiceRecord> = None;

        for item in self.tx_index.scan_prefix(&prefix) {
            let (key, _) = item.map_err(unavailable)?;
            let name = String::from_utf8_lossy(&key[prefix.len()..]);
            let Some(rec) = self.read(&name)? else {
                continue;
            };
            if rec.tx_lookup_key() != lookup_key {
                continue;
            }
            if found.as_ref().map_or(true, |f| rec.updated_at > f.updated_at) {
                found = Some(rec);
            }
        }
        Ok(found)
    }

    async fn confirm(&self, name: &str, identifier: &str) -> RelayResult<ConfirmOutcome> {
        let now = Utc::now();
        let outcome = self
            .invoices
            .transaction(|invoices| -> TxResult<ConfirmOutcome> {
                let existing = invoices.get(name.as_bytes())?.ok_or_else(|| {
                    ConflictableTransactionError::Abort(RelayError::NotFound(name.to_string()))
                })?;
                let mut rec = decode(&existing).map_err(ConflictableTransactionError::Abort)?;
                let outcome = rec.confirm(identifier, now);
                if outcome == ConfirmOutcome::Confirmed {
                    let bytes = encode(&rec).map_err(ConflictableTransactionError::Abort)?;
                    invoices.insert(name.as_bytes(), bytes)?;
                }
                Ok(outcome)
            })
            .map_err(from_tx_error)?;

        if outcome == ConfirmOutcome::Confirmed {
            self.persist().await?;
        }
        Ok(outcome)
    }

    async fn list(&self) -> RelayResult<Vec<InvoiceRecord>> {
        let mut out = Vec::new();
        for item in self.invoices.iter() {
            let (_k, v) = item.map_err(unavailable)?;
            out.push(decode(&v)?);
        }
        newest_first(&mut out);
        Ok(out)
    }

    async fn flush(&self) -> RelayResult<()> {
        self.persist().await
    }
}
