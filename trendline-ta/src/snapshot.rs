use crate::{
    bar::{PriceBar, closes},
    error::IndicatorError,
    indicators::{average_true_range, trend_average},
};
use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// Periods used to compute an [`IndicatorSnapshot`].
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor,
)]
pub struct IndicatorConfig {
    #[serde(default = "default_trend_period")]
    pub trend_period: NonZeroUsize,
    #[serde(default = "default_volatility_period")]
    pub volatility_period: NonZeroUsize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            trend_period: default_trend_period(),
            volatility_period: default_volatility_period(),
        }
    }
}

impl IndicatorConfig {
    /// Minimum number of bars required to compute both indicators.
    pub fn required_bars(&self) -> usize {
        self.trend_period
            .get()
            .max(self.volatility_period.get() + 1)
    }
}

const DEFAULT_TREND_PERIOD: NonZeroUsize = NonZeroUsize::new(120).unwrap();
const DEFAULT_VOLATILITY_PERIOD: NonZeroUsize = NonZeroUsize::new(14).unwrap();

fn default_trend_period() -> NonZeroUsize {
    DEFAULT_TREND_PERIOD
}

fn default_volatility_period() -> NonZeroUsize {
    DEFAULT_VOLATILITY_PERIOD
}

/// Trend average and volatility of one instrument at one evaluation instant.
///
/// Recomputed on every evaluation and never persisted.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor,
)]
pub struct IndicatorSnapshot {
    pub trend_average: Decimal,
    pub volatility: Decimal,
}

impl IndicatorSnapshot {
    /// Compute both indicators from an ordered bar series.
    pub fn compute(config: &IndicatorConfig, bars: &[PriceBar]) -> Result<Self, IndicatorError> {
        let closes = closes(bars).collect::<Vec<_>>();
        let trend_average = trend_average(&closes, config.trend_period)?;
        let volatility = average_true_range(bars, config.volatility_period)?;

        Ok(Self {
            trend_average,
            volatility,
        })
    }
}
