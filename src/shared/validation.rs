use lazy_static::lazy_static;
use regex::Regex;

use crate::core::error::AppError;

lazy_static! {
    /// Ticket ids are `<CODE>-<sequence>`
    /// - Valid: "DEFAULT-1", "QWERTYU-42"
    /// - Invalid: "default-1", "DEFAULT-", "DEFAULT-01x", "-3"
    pub static ref TICKET_ID_REGEX: Regex = Regex::new(r"^[A-Z]+-[1-9][0-9]*$").unwrap();
}

/// Malformed ticket ids can never exist, so they are reported as not found
pub fn ensure_ticket_id(ticket_id: &str) -> Result<(), AppError> {
    if TICKET_ID_REGEX.is_match(ticket_id) {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("Ticket {} not found", ticket_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_id_regex_valid() {
        assert!(TICKET_ID_REGEX.is_match("DEFAULT-1"));
        assert!(TICKET_ID_REGEX.is_match("QWERTYU-42"));
        assert!(TICKET_ID_REGEX.is_match("A-1000"));
    }

    #[test]
    fn test_ticket_id_regex_invalid() {
        assert!(!TICKET_ID_REGEX.is_match("default-1")); // lowercase
        assert!(!TICKET_ID_REGEX.is_match("DEFAULT-")); // no sequence
        assert!(!TICKET_ID_REGEX.is_match("DEFAULT-0")); // sequence starts at 1
        assert!(!TICKET_ID_REGEX.is_match("DEFAULT-01x"));
        assert!(!TICKET_ID_REGEX.is_match("-3"));
        assert!(!TICKET_ID_REGEX.is_match(""));
    }

    #[test]
    fn test_ensure_ticket_id() {
        assert!(ensure_ticket_id("DEFAULT-7").is_ok());
        assert!(matches!(
            ensure_ticket_id("not a ticket"),
            Err(AppError::NotFound(_))
        ));
    }
}
