//! Default chainhook definition for the invoice contract, used by the
//! dashboard when registering a new subscription.

use serde::{Deserialize, Serialize};

use crate::extraction::INVOICE_CREATED_MARKER;

pub const INVOICE_PAID_MARKER: &str = "invoice-paid";
pub const DEFAULT_DEFINITION_NAME: &str = "Stacks Payroll Invoices";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainhookDefinition {
    pub name: String,
    pub chain: String,
    pub network: Network,
    pub filters: ChainhookFilters,
    #[serde(default)]
    pub options: serde_json::Map<String, serde_json::Value>,
    pub action: ChainhookAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainhookFilters {
    pub contract_id: String,
    pub calls: Vec<FunctionCallFilter>,
    pub prints_contains: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallFilter {
    pub function_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChainhookAction {
    Webhook { url: String },
}

/// Subscribe to invoice creation and payment calls on `contract_id`,
/// delivering batches to `webhook_url`.
pub fn invoice_definition(contract_id: &str, webhook_url: &str, network: Network) -> ChainhookDefinition {
    let print_marker = |event: &str| format!("\"event\":\"{event}\"");
    ChainhookDefinition {
        name: DEFAULT_DEFINITION_NAME.to_string(),
        chain: "stacks".to_string(),
        network,
        filters: ChainhookFilters {
            contract_id: contract_id.to_string(),
            calls: ["create-invoice", "pay-invoice"]
                .into_iter()
                .map(|f| FunctionCallFilter {
                    function_name: f.to_string(),
                })
                .collect(),
            prints_contains: vec![
                print_marker(INVOICE_CREATED_MARKER),
                print_marker(INVOICE_PAID_MARKER),
            ],
        },
        options: serde_json::Map::new(),
        action: ChainhookAction::Webhook {
            url: webhook_url.to_string(),
        },
    }
}
