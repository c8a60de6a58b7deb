use thiserror::Error;

pub type CrmResult<T> = Result<T, CrmError>;

#[derive(Error, Debug)]
pub enum CrmError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Rule tree error: {0}")]
    RuleTree(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Unknown delivery receipt: no record for vendor message id {0}")]
    UnknownReceipt(String),

    #[error("Campaign not found: {0}")]
    CampaignNotFound(uuid::Uuid),

    #[error("Order with id {0} already exists")]
    DuplicateOrder(String),

    #[error("Customer with id {0} not found")]
    UnknownCustomer(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
