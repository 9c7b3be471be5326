pub const MAX_NAME_LEN: usize = 256;
pub const MAX_TX_ID_LEN: usize = 130;

pub(super) fn check_name(name: Option<&str>, errs: &mut Vec<String>) -> Option<String> {
    let name = name.map(str::trim).unwrap_or_default();
    if name.is_empty() {
        errs.push("name is required".to_string());
        return None;
    }
    if name.len() > MAX_NAME_LEN {
        errs.push(format!("name must be at most {MAX_NAME_LEN} bytes"));
        return None;
    }
    Some(name.to_string())
}

pub(super) fn check_tx_id(tx_id: Option<&str>, errs: &mut Vec<String>) -> Option<String> {
    let tx_id = tx_id.map(str::trim).unwrap_or_default();
    if tx_id.is_empty() {
        errs.push("txId is required".to_string());
        return None;
    }
    if tx_id.len() > MAX_TX_ID_LEN
        || tx_id
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
    {
        errs.push("txId is malformed".to_string());
        return None;
    }
    Some(tx_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_id_is_kept_as_given() {
        let mut errs = Vec::new();
        assert_eq!(check_tx_id(Some(" 0xABC "), &mut errs).as_deref(), Some("0xABC"));
        assert!(errs.is_empty());
    }

    #[test]
    fn rejects_control_characters_in_tx_id() {
        let mut errs = Vec::new();
        assert_eq!(check_tx_id(Some("0xab\u{0}cd"), &mut errs), None);
        assert_eq!(errs, vec!["txId is malformed".to_string()]);
    }

    #[test]
    fn rejects_overlong_name() {
        let mut errs = Vec::new();
        let long = "n".repeat(MAX_NAME_LEN + 1);
        assert_eq!(check_name(Some(&long), &mut errs), None);
        assert_eq!(errs.len(), 1);
    }
}
