//! Webhook batch shapes as delivered by the chainhook service.
//!
//! Blocks are parsed eagerly, transactions lazily: a malformed transaction only
//! affects itself, never the rest of the batch.

use serde::Deserialize;
use serde_json::Value;

/// Event kinds that carry contract `print` output.
pub const CONTRACT_EVENT_KINDS: &[&str] = &["SmartContractEvent", "contract_event", "smart_contract_log"];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookBatch {
    #[serde(default)]
    pub apply: Vec<ChainBlock>,
    #[serde(default)]
    pub rollback: Vec<ChainBlock>,
    #[serde(default)]
    pub chainhook: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChainBlock {
    #[serde(default)]
    pub block_identifier: Option<Value>,
    #[serde(default)]
    pub transactions: Vec<Value>,
}

impl ChainBlock {
    pub fn height(&self) -> Option<u64> {
        self.block_identifier
            .as_ref()
            .and_then(|id| id.get("index"))
            .and_then(Value::as_u64)
    }
}

impl WebhookBatch {
    pub fn transaction_count(&self) -> usize {
        self.apply.iter().map(|b| b.transactions.len()).sum()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainTransaction {
    #[serde(default)]
    pub transaction_identifier: Option<TransactionIdentifier>,
    #[serde(default)]
    pub payload: Option<TransactionPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionIdentifier {
    pub hash: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionPayload {
    Data(DataPayload),
    #[serde(other)]
    Other,
}

/// Execution output of a data-bearing transaction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataPayload {
    /// Clarity repr string or decoded value.
    #[serde(default)]
    pub result: Option<Value>,
    /// Raw log entries; each is decoded on its own by the strategies that
    /// read them, so one odd entry cannot hide the result.
    #[serde(default)]
    pub events: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractLogEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl ContractLogEvent {
    pub fn from_value(value: &Value) -> Option<Self> {
        ContractLogEvent::deserialize(value).ok()
    }

    pub fn is_contract_event(&self) -> bool {
        CONTRACT_EVENT_KINDS.contains(&self.kind.as_str())
    }
}

impl ChainTransaction {
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        ChainTransaction::deserialize(value)
    }

    pub fn tx_id(&self) -> Option<&str> {
        self.transaction_identifier
            .as_ref()
            .map(|id| id.hash.as_str())
            .filter(|hash| !hash.is_empty())
    }

    /// The execution payload, for data-bearing transactions only.
    pub fn data(&self) -> Option<&DataPayload> {
        match &self.payload {
            Some(TransactionPayload::Data(data)) => Some(data),
            _ => None,
        }
    }
}
