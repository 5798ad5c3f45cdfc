use chrono::{DateTime, Utc};
use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Immutable summary of one historical interval of trading.
///
/// Series of bars are always ordered oldest-to-newest, with strictly increasing `open_time`.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, Constructor,
)]
pub struct PriceBar {
    pub open_time: DateTime<Utc>,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

impl PriceBar {
    /// True range of this bar relative to the previous bar's close.
    ///
    /// `max(high − low, |high − prev_close|, |low − prev_close|)`
    pub fn true_range(&self, prev_close: Decimal) -> Decimal {
        (self.high - self.low)
            .max((self.high - prev_close).abs())
            .max((self.low - prev_close).abs())
    }
}

/// Returns the close of every bar, in order.
pub fn closes(bars: &[PriceBar]) -> impl Iterator<Item = Decimal> + '_ {
    bars.iter().map(|bar| bar.close)
}
