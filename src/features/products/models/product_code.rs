use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Short code plus the sequence number of the next ticket minted for a product
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct ProductCode {
    pub product_id: String,
    pub code: String,
    pub count: i32,
}

impl ProductCode {
    /// Id of the ticket minted from the current count
    pub fn next_ticket_id(&self) -> String {
        format!("{}-{}", self.code, self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_ticket_id() {
        let code = ProductCode {
            product_id: "DEFAULT".to_string(),
            code: "DEFAULT".to_string(),
            count: 1,
        };
        assert_eq!(code.next_ticket_id(), "DEFAULT-1");

        let code = ProductCode {
            product_id: "3f2a9c1e-7b4d-4e8a".to_string(),
            code: "QWERTYU".to_string(),
            count: 42,
        };
        assert_eq!(code.next_ticket_id(), "QWERTYU-42");
    }
}
