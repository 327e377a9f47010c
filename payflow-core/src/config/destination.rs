//! Settlement destination account.

/// Bank account that receives the net amount of every credited invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferDestination {
    pub bank_code: String,
    pub branch_code: String,
    pub account_number: String,
    pub account_type: String,
    pub name: String,
    pub tax_id: String,
}

impl Default for TransferDestination {
    fn default() -> Self {
        Self {
            bank_code: "20018183".to_string(),
            branch_code: "0001".to_string(),
            account_number: "6341320293482496".to_string(),
            account_type: "payment".to_string(),
            name: "Stark Bank S.A.".to_string(),
            tax_id: "20.018.183/0001-80".to_string(),
        }
    }
}
