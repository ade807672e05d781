use thiserror::Error;

/// Errors that can occur within a [`MarketDataProvider`](super::MarketDataProvider)
/// implementation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network failure, timeout or undecodable body.
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The provider does not know the symbol.
    #[error("symbol {0} not found")]
    NotFound(String),

    /// The response parsed as JSON but not into the expected shape.
    #[error("malformed provider response: {0}")]
    Malformed(String),
}
