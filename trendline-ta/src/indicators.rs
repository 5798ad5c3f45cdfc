use crate::{
    bar::PriceBar,
    error::{IndicatorError, IndicatorKind},
};
use rust_decimal::Decimal;
use std::num::NonZeroUsize;

/// Exponential moving average indicator, seeded by the simple average of the first `period`
/// values.
///
/// After the seed, each value updates the average with
/// `avg = (value − avg) × k + avg` where `k = 2 / (period + 1)`.
#[derive(Debug, Clone)]
pub struct ExponentialMovingAverage {
    period: NonZeroUsize,
    multiplier: Decimal,
    seed_sum: Decimal,
    seed_count: usize,
    value: Option<Decimal>,
}

impl ExponentialMovingAverage {
    /// Create a new EMA with the given period.
    pub fn new(period: NonZeroUsize) -> Self {
        let multiplier = Decimal::TWO / Decimal::from(period.get() + 1);
        Self {
            period,
            multiplier,
            seed_sum: Decimal::ZERO,
            seed_count: 0,
            value: None,
        }
    }

    /// Update the EMA with a new value, returning the latest average once seeded.
    pub fn update(&mut self, value: Decimal) -> Option<Decimal> {
        match self.value {
            Some(prev) => {
                let next = (value - prev) * self.multiplier + prev;
                self.value = Some(next);
            }
            None => {
                self.seed_sum += value;
                self.seed_count += 1;
                if self.seed_count == self.period.get() {
                    self.value = Some(self.seed_sum / Decimal::from(self.seed_count));
                }
            }
        }
        self.value
    }

    /// Current EMA value if seeded.
    pub fn value(&self) -> Option<Decimal> {
        self.value
    }

    /// Smoothing factor `k`.
    pub fn multiplier(&self) -> Decimal {
        self.multiplier
    }
}

/// Average True Range indicator using Wilder smoothing.
///
/// The first bar only provides a previous close. Every later bar contributes a true range; the
/// first `period` true ranges are averaged to seed the ATR, after which
/// `atr = ((period − 1) × atr + tr) / period`.
#[derive(Debug, Clone)]
pub struct AverageTrueRange {
    period: NonZeroUsize,
    prev_close: Option<Decimal>,
    seed_sum: Decimal,
    seed_count: usize,
    value: Option<Decimal>,
}

impl AverageTrueRange {
    /// Create a new ATR with the given period.
    pub fn new(period: NonZeroUsize) -> Self {
        Self {
            period,
            prev_close: None,
            seed_sum: Decimal::ZERO,
            seed_count: 0,
            value: None,
        }
    }

    /// Update the ATR with the next bar, returning the latest value once seeded.
    pub fn update(&mut self, bar: &PriceBar) -> Option<Decimal> {
        let Some(prev_close) = self.prev_close.replace(bar.close) else {
            return None;
        };

        let true_range = bar.true_range(prev_close);
        let period = Decimal::from(self.period.get());

        match self.value {
            Some(prev) => {
                self.value = Some(((period - Decimal::ONE) * prev + true_range) / period);
            }
            None => {
                self.seed_sum += true_range;
                self.seed_count += 1;
                if self.seed_count == self.period.get() {
                    self.value = Some(self.seed_sum / period);
                }
            }
        }
        self.value
    }

    /// Current ATR value if seeded.
    pub fn value(&self) -> Option<Decimal> {
        self.value
    }
}

/// Final trend average (EMA) of an ordered close series.
///
/// Fails with [`IndicatorError::InsufficientData`] if `closes.len() < period`.
pub fn trend_average(closes: &[Decimal], period: NonZeroUsize) -> Result<Decimal, IndicatorError> {
    let insufficient = IndicatorError::InsufficientData {
        indicator: IndicatorKind::ExponentialMovingAverage,
        required: period.get(),
        received: closes.len(),
    };

    if closes.len() < period.get() {
        return Err(insufficient);
    }

    let mut ema = ExponentialMovingAverage::new(period);
    closes.iter().for_each(|close| {
        ema.update(*close);
    });

    ema.value().ok_or(insufficient)
}

/// Final volatility measure (ATR) of an ordered bar series.
///
/// Fails with [`IndicatorError::InsufficientData`] if `bars.len() < period + 1`.
pub fn average_true_range(
    bars: &[PriceBar],
    period: NonZeroUsize,
) -> Result<Decimal, IndicatorError> {
    let insufficient = IndicatorError::InsufficientData {
        indicator: IndicatorKind::AverageTrueRange,
        required: period.get() + 1,
        received: bars.len(),
    };

    if bars.len() < period.get() + 1 {
        return Err(insufficient);
    }

    let mut atr = AverageTrueRange::new(period);
    bars.iter().for_each(|bar| {
        atr.update(bar);
    });

    atr.value().ok_or(insufficient)
}
