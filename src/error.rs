use thiserror::Error;

/// Failure of a single exchange request.
///
/// These never leave the collector: a failed fetch is logged and
/// contributes zero tickers for its exchange/symbol.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdapterError {
    #[error("{exchange} unavailable: {reason}")]
    ExchangeUnavailable { exchange: String, reason: String },

    #[error("{exchange} does not list {symbol}")]
    SymbolNotFound { exchange: String, symbol: String },

    #[error("{exchange} rate limit hit")]
    RateLimited { exchange: String },

    #[error("{exchange} request timed out")]
    Timeout { exchange: String },

    #[error("{exchange} returned a malformed response: {reason}")]
    MalformedResponse { exchange: String, reason: String },
}

impl AdapterError {
    /// Exchange the error originated from.
    pub fn exchange(&self) -> &str {
        match self {
            AdapterError::ExchangeUnavailable { exchange, .. }
            | AdapterError::SymbolNotFound { exchange, .. }
            | AdapterError::RateLimited { exchange }
            | AdapterError::Timeout { exchange }
            | AdapterError::MalformedResponse { exchange, .. } => exchange,
        }
    }
}

/// Errors surfaced to callers of the pulse pipeline.
///
/// Only configuration-level problems are fatal; an all-adapters-failed
/// cycle is an empty `PulseResult`, not an error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PulseError {
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl PulseError {
    pub fn config(msg: impl Into<String>) -> Self {
        PulseError::Configuration(msg.into())
    }
}
