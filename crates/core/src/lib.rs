pub mod chainhook;
pub mod error;
pub mod extraction;
pub mod models;
pub mod parsing;
pub mod payload;
pub mod validation;

pub use error::{RelayError, RelayResult};
pub use models::{normalize_tx_id, ConfirmOutcome, InvoiceRecord, InvoiceStatus};
