#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]

//! # Trendline-TA
//! Technical analysis for the Trendline position controller.
//!
//! Provides the two indicators the controller decides on:
//! * **Trend average**: an exponential moving average seeded by a simple average.
//! * **Volatility**: a Wilder-smoothed Average True Range.
//!
//! Both are pure functions of an ordered [`PriceBar`](bar::PriceBar) series, available either as
//! streaming indicators updated one value at a time, or as slice functions returning only the
//! final value.

/// [`PriceBar`](bar::PriceBar) market data model.
pub mod bar;

/// [`IndicatorError`](error::IndicatorError) returned when an input series is too short.
pub mod error;

/// Streaming and slice forms of the EMA and ATR indicators.
pub mod indicators;

/// [`IndicatorSnapshot`](snapshot::IndicatorSnapshot) of both indicators at one instant.
pub mod snapshot;

#[cfg(test)]
mod test_utils {
    use crate::bar::PriceBar;
    use chrono::{DateTime, Duration, Utc};
    use rust_decimal::Decimal;

    pub fn time_plus_hours(base: DateTime<Utc>, plus: i64) -> DateTime<Utc> {
        base + Duration::hours(plus)
    }

    pub fn bars_from_closes(closes: &[Decimal]) -> Vec<PriceBar> {
        let base = DateTime::<Utc>::MIN_UTC;
        closes
            .iter()
            .enumerate()
            .map(|(index, close)| {
                PriceBar::new(time_plus_hours(base, index as i64 * 4), *close, *close, *close)
            })
            .collect()
    }
}
