use crate::{
    error::ClientError,
    instrument::{Direction, InstrumentName},
};
use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::future::Future;
use trendline_ta::bar::PriceBar;

/// In-memory [`MockExchange`](mock::MockExchange) with scripted market data.
pub mod mock;

/// [`OkxClient`](okx::OkxClient) for OKX USDT margined perpetual swaps.
pub mod okx;

/// Fetches ordered price history for an instrument.
pub trait MarketDataClient {
    /// Fetch the most recent `count` bars, ordered oldest-to-newest.
    ///
    /// The final bar is the currently forming bar. Fails with
    /// [`ClientError::DataUnavailable`] if fewer than `count` bars are available.
    fn fetch_bars(
        &self,
        instrument: &InstrumentName,
        count: usize,
    ) -> impl Future<Output = Result<Vec<PriceBar>, ClientError>> + Send;
}

/// Opens & closes positions, and reports the authoritative exchange position snapshot.
pub trait ExecutionClient {
    /// Open (or add to) a position worth approximately `notional` quote units.
    ///
    /// Sizing and contract lot rounding are the client's responsibility.
    fn open_position(
        &self,
        request: OpenRequest,
    ) -> impl Future<Output = Result<OrderAck, ClientError>> + Send;

    /// Close every open leg of the instrument, returning one [`ClosedLeg`] per closed leg.
    fn close_position(
        &self,
        instrument: &InstrumentName,
    ) -> impl Future<Output = Result<Vec<ClosedLeg>, ClientError>> + Send;

    /// Fetch every open position of the provided instruments.
    fn fetch_positions(
        &self,
        instruments: &[InstrumentName],
    ) -> impl Future<Output = Result<Vec<PositionSnapshot>, ClientError>> + Send;
}

/// Request to open a position in the provided [`Direction`].
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
pub struct OpenRequest {
    pub instrument: InstrumentName,
    pub direction: Direction,
    /// Price used to convert the notional into a contract quantity.
    pub reference_price: Decimal,
    pub notional: Decimal,
}

/// Exchange acknowledgement of an accepted open order.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
pub struct OrderAck {
    pub instrument: InstrumentName,
    pub direction: Direction,
    pub order_id: SmolStr,
    pub quantity: Decimal,
}

/// Position leg closed by [`ExecutionClient::close_position`].
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
pub struct ClosedLeg {
    pub instrument: InstrumentName,
    pub direction: Direction,
    pub order_id: SmolStr,
    pub quantity: Decimal,
    pub average_price: Option<Decimal>,
    pub unrealised_pnl: Decimal,
}

/// Open exchange position, as reported by [`ExecutionClient::fetch_positions`].
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
pub struct PositionSnapshot {
    pub instrument: InstrumentName,
    pub direction: Direction,
    /// Absolute contract quantity.
    pub size: Decimal,
    pub average_price: Option<Decimal>,
    pub unrealised_pnl: Decimal,
}

/// Validate that at least `requested` bars were returned, keeping only the most recent
/// `requested` bars.
pub fn require_bars(
    instrument: &InstrumentName,
    requested: usize,
    mut bars: Vec<PriceBar>,
) -> Result<Vec<PriceBar>, ClientError> {
    if bars.len() < requested {
        return Err(ClientError::DataUnavailable {
            instrument: instrument.clone(),
            requested,
            received: bars.len(),
        });
    }

    bars.drain(..bars.len() - requested);
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use rust_decimal_macros::dec;

    fn bars(count: i64) -> Vec<PriceBar> {
        (0..count)
            .map(|index| {
                PriceBar::new(
                    DateTime::from_timestamp(index * 14_400, 0).unwrap(),
                    dec!(2),
                    dec!(1),
                    Decimal::from(index),
                )
            })
            .collect()
    }

    #[test]
    fn test_require_bars() {
        let instrument = InstrumentName::from("BTC-USDT-SWAP");

        let actual = require_bars(&instrument, 3, bars(5)).unwrap();
        assert_eq!(
            actual.iter().map(|bar| bar.close).collect::<Vec<_>>(),
            vec![dec!(2), dec!(3), dec!(4)]
        );

        let actual = require_bars(&instrument, 6, bars(5));
        assert_eq!(
            actual,
            Err(ClientError::DataUnavailable {
                instrument,
                requested: 6,
                received: 5
            })
        );
    }
}
