use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All errors generated in `trendline-ta`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Error)]
pub enum IndicatorError {
    #[error("insufficient data for {indicator}: required {required} values, received {received}")]
    InsufficientData {
        indicator: IndicatorKind,
        required: usize,
        received: usize,
    },
}

/// Indicator that produced an [`IndicatorError`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display)]
pub enum IndicatorKind {
    #[display("EMA")]
    ExponentialMovingAverage,
    #[display("ATR")]
    AverageTrueRange,
}
