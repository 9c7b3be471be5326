//! Ordered strategies that pull the contract-assigned invoice id out of a
//! confirmed transaction.

use serde_json::Value;

use crate::parsing::{clarity_id, find_id_field, is_clarity_err};
use crate::payload::{ContractLogEvent, DataPayload};

/// Marker the invoice contract prints when it registers an invoice.
pub const INVOICE_CREATED_MARKER: &str = "invoice-created";

pub type ExtractFn = fn(&DataPayload) -> Option<String>;

#[derive(Clone, Copy)]
pub struct Strategy {
    pub name: &'static str,
    pub extract: ExtractFn,
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Strategy").field(&self.name).finish()
    }
}

/// The function result is authoritative; the print log is a fallback.
pub const DEFAULT_STRATEGIES: [Strategy; 2] = [
    Strategy {
        name: "result",
        extract: from_result,
    },
    Strategy {
        name: "event_log",
        extract: from_event_log,
    },
];

/// Runs `strategies` in order and returns the first identifier found, with the
/// name of the strategy that produced it.
pub fn extract_identifier(
    strategies: &[Strategy],
    payload: &DataPayload,
) -> Option<(&'static str, String)> {
    strategies
        .iter()
        .find_map(|s| (s.extract)(payload).map(|id| (s.name, id)))
}

pub fn from_result(payload: &DataPayload) -> Option<String> {
    let result = payload.result.as_ref()?;
    match result {
        Value::String(repr) if is_clarity_err(repr) => None,
        Value::String(repr) => clarity_id(repr),
        Value::Object(map) => {
            let failed = map.get("success") == Some(&Value::Bool(false))
                || map
                    .values()
                    .any(|v| v.as_str().is_some_and(is_clarity_err));
            if failed {
                return None;
            }
            find_id_field(result)
        }
        _ => None,
    }
}

pub fn from_event_log(payload: &DataPayload) -> Option<String> {
    payload
        .events
        .iter()
        .filter_map(ContractLogEvent::from_value)
        .filter(|event| event.is_contract_event())
        .find_map(|event| {
            let serialized = serde_json::to_string(&event.data).ok()?;
            if !serialized.contains(INVOICE_CREATED_MARKER) {
                return None;
            }
            clarity_id(&serialized).or_else(|| find_id_field(&event.data))
        })
}
