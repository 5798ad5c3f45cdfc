use crate::error::EngineError;
use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::future::Future;
use trendline_execution::{client::MarketDataClient, instrument::InstrumentName};
use trendline_ta::{
    bar::PriceBar,
    error::{IndicatorError, IndicatorKind},
    snapshot::{IndicatorConfig, IndicatorSnapshot},
};

/// Which price a decision is evaluated against.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    /// Close of the most recent closed bar.
    LastClosed,
    /// Close of the currently forming bar.
    Live,
}

/// Indicators and prices of one instrument at one observation instant.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
pub struct MarketView {
    /// Computed over closed bars only.
    pub snapshot: IndicatorSnapshot,
    pub closed_price: Decimal,
    pub live_price: Decimal,
}

impl MarketView {
    /// Build a [`MarketView`] from an ordered bar series whose final bar is still forming.
    pub fn from_bars(config: &IndicatorConfig, bars: &[PriceBar]) -> Result<Self, IndicatorError> {
        let Some((forming, closed)) = bars.split_last() else {
            return Err(IndicatorError::InsufficientData {
                indicator: IndicatorKind::ExponentialMovingAverage,
                required: config.required_bars() + 1,
                received: 0,
            });
        };

        let snapshot = IndicatorSnapshot::compute(config, closed)?;
        let closed_price = closed.last().map(|bar| bar.close).unwrap_or(forming.close);

        Ok(Self {
            snapshot,
            closed_price,
            live_price: forming.close,
        })
    }

    pub fn price(&self, source: PriceSource) -> Decimal {
        match source {
            PriceSource::LastClosed => self.closed_price,
            PriceSource::Live => self.live_price,
        }
    }
}

/// Produces a fresh [`MarketView`] of an instrument.
pub trait MarketObserver {
    fn observe(
        &self,
        instrument: &InstrumentName,
    ) -> impl Future<Output = Result<MarketView, EngineError>> + Send;
}

/// [`MarketObserver`] fetching bars from a [`MarketDataClient`] and computing indicators locally.
#[derive(Debug, Clone, Constructor)]
pub struct MarketDataObserver<Client> {
    pub client: Client,
    pub indicators: IndicatorConfig,
    /// Bars fetched per observation, including the forming bar.
    pub bar_count: usize,
}

impl<Client> MarketObserver for MarketDataObserver<Client>
where
    Client: MarketDataClient + Sync,
{
    async fn observe(&self, instrument: &InstrumentName) -> Result<MarketView, EngineError> {
        let bars = self
            .client
            .fetch_bars(instrument, self.bar_count)
            .await
            .map_err(EngineError::MarketData)?;

        MarketView::from_bars(&self.indicators, &bars).map_err(EngineError::from)
    }
}
