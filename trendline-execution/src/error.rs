use crate::instrument::InstrumentName;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use trendline_integration::error::SocketError;

/// Represents all errors produced by a market data or execution client.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Error)]
pub enum ClientError {
    #[error("Connectivity: {0}")]
    Connectivity(#[from] ConnectivityError),

    #[error("API: {0}")]
    Api(#[from] ApiError),

    #[error("market data for {instrument} unavailable: requested {requested} bars, received {received}")]
    DataUnavailable {
        instrument: InstrumentName,
        requested: usize,
        received: usize,
    },

    #[error("instrument {0} is not configured for this client")]
    UnknownInstrument(InstrumentName),

    #[error("order sizing failed: {0}")]
    Sizing(String),
}

/// Represents all connectivity-centric errors.
///
/// Connectivity errors are generally intermittent / non-deterministic (eg/ Timeouts).
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Error)]
pub enum ConnectivityError {
    #[error("request timed out")]
    Timeout,

    #[error("{0}")]
    Socket(String),
}

/// Represents all errors reported by the exchange API itself.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Error)]
pub enum ApiError {
    #[error("rate limit exceeded")]
    RateLimit,

    #[error("request unauthorised: {0}")]
    Unauthorised(String),

    #[error("insufficient margin: {0}")]
    BalanceInsufficient(String),

    #[error("order rejected: {0}")]
    OrderRejected(String),

    #[error("code {code}: {message}")]
    Custom { code: String, message: String },
}

impl From<SocketError> for ClientError {
    fn from(value: SocketError) -> Self {
        match value {
            SocketError::HttpTimeout(_) => Self::Connectivity(ConnectivityError::Timeout),
            error => Self::Connectivity(ConnectivityError::Socket(error.to_string())),
        }
    }
}
