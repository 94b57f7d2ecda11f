pub mod catalog;
pub mod identity;
pub mod notify;
pub mod payment;

/// Error type shared by every collaborator trait.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Gateway rejected request: {0}")]
    GatewayRejected(String),
    #[error("Unexpected gateway response: {0}")]
    GatewayResponse(String),
    #[error("Lookup failed: {0}")]
    LookupFailed(String),
}
