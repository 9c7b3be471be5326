use thiserror::Error;

pub type RelayResult<T> = Result<T, RelayError>;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid request: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("invoice not found: {0}")]
    NotFound(String),

    #[error("no confirmation identifier found in transaction {tx_id}")]
    Extraction { tx_id: String },

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("record serialization failed: {0}")]
    Serialization(String),
}

impl RelayError {
    /// Failures a direct caller should see as a server-side error.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            RelayError::StoreUnavailable(_) | RelayError::Serialization(_)
        )
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_joins_all_problems() {
        let err = RelayError::Validation(vec!["name is required".into(), "txId is required".into()]);
        assert_eq!(
            err.to_string(),
            "invalid request: name is required; txId is required"
        );
    }

    #[test]
    fn only_store_failures_are_server_errors() {
        assert!(RelayError::StoreUnavailable("io".into()).is_server_error());
        assert!(RelayError::Serialization("eof".into()).is_server_error());
        assert!(!RelayError::NotFound("inv-1".into()).is_server_error());
        assert!(!RelayError::Validation(vec![]).is_server_error());
    }
}
