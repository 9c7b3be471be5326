use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Confirmed,
}

/// An off-chain invoice waiting for (or holding) its on-chain confirmation.
///
/// The serialized form doubles as the persisted record and the API view, so
/// field names follow the dashboard's wire names (`txId`, `invoiceId`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRecord {
    pub name: String,
    #[serde(rename = "txId")]
    pub transaction_id: String,
    #[serde(rename = "invoiceId", default, skip_serializing_if = "Option::is_none")]
    pub confirmed_identifier: Option<String>,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Form a transaction id takes as a lookup key. Chainhook reports hashes as
/// lowercase `0x`-prefixed hex, so hex ids are brought into that form; other
/// ids are only trimmed. Records keep the id exactly as it was given.
pub fn normalize_tx_id(tx_id: &str) -> String {
    let tx_id = tx_id.trim();
    let digits = tx_id
        .strip_prefix("0x")
        .or_else(|| tx_id.strip_prefix("0X"))
        .unwrap_or(tx_id);
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit()) {
        format!("0x{}", digits.to_ascii_lowercase())
    } else {
        tx_id.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Confirmed,
    /// The record was confirmed earlier; its identifier was left untouched.
    AlreadyConfirmed,
}

impl InvoiceRecord {
    pub fn pending(name: &str, transaction_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            name: name.to_string(),
            transaction_id: transaction_id.to_string(),
            confirmed_identifier: None,
            status: InvoiceStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Re-issue under a new transaction id. Any earlier confirmation is dropped;
    /// `created_at` is kept.
    pub fn reissue(&mut self, transaction_id: &str, now: DateTime<Utc>) {
        self.transaction_id = transaction_id.to_string();
        self.confirmed_identifier = None;
        self.status = InvoiceStatus::Pending;
        self.updated_at = now;
    }

    /// Pending -> Confirmed. A second call never replaces the first identifier.
    pub fn confirm(&mut self, identifier: &str, now: DateTime<Utc>) -> ConfirmOutcome {
        if self.is_confirmed() {
            return ConfirmOutcome::AlreadyConfirmed;
        }
        self.confirmed_identifier = Some(identifier.to_string());
        self.status = InvoiceStatus::Confirmed;
        self.updated_at = now;
        ConfirmOutcome::Confirmed
    }

    pub fn tx_lookup_key(&self) -> String {
        normalize_tx_id(&self.transaction_id)
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == InvoiceStatus::Confirmed && self.confirmed_identifier.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_hex_ids() {
        assert_eq!(normalize_tx_id("0xABC"), "0xabc");
        assert_eq!(normalize_tx_id("abc123"), "0xabc123");
        assert_eq!(normalize_tx_id(" 0Xff "), "0xff");
    }

    #[test]
    fn leaves_non_hex_ids_alone() {
        assert_eq!(normalize_tx_id("tx-42"), "tx-42");
        assert_eq!(normalize_tx_id("0x"), "0x");
    }

    #[test]
    fn reissue_clears_confirmation_but_keeps_creation_time() {
        let created = Utc::now();
        let mut rec = InvoiceRecord::pending("inv-1", "0xabc", created);
        rec.confirm("42", Utc::now());

        rec.reissue("0xdef", Utc::now());

        assert_eq!(rec.transaction_id, "0xdef");
        assert_eq!(rec.status, InvoiceStatus::Pending);
        assert_eq!(rec.confirmed_identifier, None);
        assert_eq!(rec.created_at, created);
    }

    #[test]
    fn second_confirm_keeps_first_identifier() {
        let mut rec = InvoiceRecord::pending("inv-1", "0xabc", Utc::now());
        assert_eq!(rec.confirm("42", Utc::now()), ConfirmOutcome::Confirmed);
        assert_eq!(rec.confirm("43", Utc::now()), ConfirmOutcome::AlreadyConfirmed);
        assert_eq!(rec.confirmed_identifier.as_deref(), Some("42"));
        assert!(rec.is_confirmed());
    }

    #[test]
    fn serializes_with_dashboard_field_names() {
        let rec = InvoiceRecord::pending("inv-1", "0xabc", Utc::now());
        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["txId"], json!("0xabc"));
        assert_eq!(value["status"], json!("pending"));
        assert!(value.get("invoiceId").is_none());
        assert!(value.get("createdAt").is_some());
    }
}
