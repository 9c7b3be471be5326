mod rules;

use serde::Deserialize;

use crate::error::{RelayError, RelayResult};

/// Body of a "create invoice" call. Fields are optional so that missing
/// values surface as validation errors rather than decode failures.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateInvoiceRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "txId", alias = "transactionId")]
    pub tx_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoice {
    pub name: String,
    pub tx_id: String,
}

pub fn validate(req: &CreateInvoiceRequest) -> RelayResult<NewInvoice> {
    let mut errs = Vec::new();
    let name = rules::check_name(req.name.as_deref(), &mut errs);
    let tx_id = rules::check_tx_id(req.tx_id.as_deref(), &mut errs);

    match (name, tx_id) {
        (Some(name), Some(tx_id)) if errs.is_empty() => Ok(NewInvoice { name, tx_id }),
        _ => Err(RelayError::Validation(errs)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(name: Option<&str>, tx_id: Option<&str>) -> CreateInvoiceRequest {
        CreateInvoiceRequest {
            name: name.map(str::to_string),
            tx_id: tx_id.map(str::to_string),
        }
    }

    #[test]
    fn accepts_and_trims_valid_request() {
        let inv = validate(&req(Some(" inv-1 "), Some("0xABC"))).unwrap();
        assert_eq!(inv.name, "inv-1");
        assert_eq!(inv.tx_id, "0xABC");
    }

    #[test]
    fn reports_every_missing_field() {
        match validate(&req(None, Some("   "))) {
            Err(RelayError::Validation(errs)) => assert_eq!(errs.len(), 2),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_transaction_id_alias() {
        let req: CreateInvoiceRequest =
            serde_json::from_str(r#"{"name":"inv-2","transactionId":"0x01"}"#).unwrap();
        assert_eq!(validate(&req).unwrap().tx_id, "0x01");
    }
}
