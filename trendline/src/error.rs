use serde::{Deserialize, Serialize};
use thiserror::Error;
use trendline_execution::{error::ClientError, instrument::InstrumentName};
use trendline_integration::Unrecoverable;
use trendline_ta::error::IndicatorError;

/// Represents all errors that can occur in the [`Engine`](crate::engine::Engine).
///
/// Every error except [`EngineError::StartupReconciliation`] is recovered locally: the affected
/// instrument's state is left unchanged (or corrected via reconciliation) and the error is
/// surfaced in the relevant report.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Error)]
pub enum EngineError {
    #[error("insufficient data: {0}")]
    InsufficientData(#[from] IndicatorError),

    #[error("market data failure: {0}")]
    MarketData(ClientError),

    #[error("order failure: {0}")]
    Order(ClientError),

    #[error("reconciliation failure: {0}")]
    Reconciliation(#[from] ReconciliationError),

    #[error("instrument {0} is not configured")]
    UnknownInstrument(InstrumentName),

    #[error("startup reconciliation failed after {attempts} attempts: {error}")]
    StartupReconciliation {
        attempts: u32,
        error: ReconciliationError,
    },
}

/// Represents failures to align local position belief with the exchange position snapshot.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Error)]
pub enum ReconciliationError {
    #[error("position snapshot unavailable: {0}")]
    SnapshotUnavailable(ClientError),

    #[error("exchange reports both long and short positions for {0}")]
    ConflictingDirections(InstrumentName),
}

impl Unrecoverable for EngineError {
    fn is_unrecoverable(&self) -> bool {
        matches!(self, EngineError::StartupReconciliation { .. })
    }
}
