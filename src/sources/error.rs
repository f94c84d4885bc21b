//! Error handling for the external read sources

use crate::amount::AmountError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    /// Reqwest error, typically related to network issues or request failures.
    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// The gateway answered with a non-success status.
    #[error("HTTP error with status {status}: {message}")]
    Http { status: u16, message: String },

    /// Failed to decode a JSON body from the gateway
    #[error("Decoding error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The gateway returned an amount that is not an unsigned integer.
    #[error("Invalid amount from source: {0}")]
    Amount(#[from] AmountError),

    /// A yield rate that is not a decimal number.
    #[error("Invalid rate from source: {0}")]
    Rate(#[from] rust_decimal::Error),
}

impl SourceError {
    pub async fn from_response(response: reqwest::Response) -> SourceError {
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read response text".to_string());

        SourceError::Http { status, message }
    }
}
