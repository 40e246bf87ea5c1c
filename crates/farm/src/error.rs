/// Errors reported by a [`crate::client::FarmClient`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum FarmError {
    /// The request reached the service and was rejected.
    #[error("Farm service error: {0}")]
    Service(String),

    /// The request never reached the service (network, DNS, TLS, etc.).
    #[error("Transport error: {0}")]
    Transport(String),
}
