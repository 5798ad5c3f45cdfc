use crate::{
    client::okx::http::OkxResponse,
    instrument::{Direction, InstrumentName},
};
use derive_more::Constructor;
use reqwest::Method;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::borrow::Cow;
use trendline_integration::protocol::http::rest::RestRequest;

/// Isolated margin market order on a hedge mode position leg.
///
/// See docs: <https://www.okx.com/docs-v5/en/#order-book-trading-trade-post-place-order>
#[derive(Debug, Clone, Constructor)]
pub struct PlaceOrderRequest(PlaceOrderBody);

impl RestRequest for PlaceOrderRequest {
    type Response = PlaceOrderResponse;
    type QueryParams = ();
    type Body = PlaceOrderBody;

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/api/v5/trade/order")
    }

    fn method() -> Method {
        Method::POST
    }

    fn body(&self) -> Option<&Self::Body> {
        Some(&self.0)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct PlaceOrderBody {
    #[serde(rename = "instId")]
    pub instrument: InstrumentName,
    #[serde(rename = "tdMode")]
    pub trade_mode: &'static str,
    pub side: OrderSide,
    #[serde(rename = "ordType")]
    pub order_type: &'static str,
    #[serde(rename = "sz")]
    pub quantity: Decimal,
    #[serde(rename = "posSide")]
    pub position_side: Direction,
}

impl PlaceOrderBody {
    /// Market order increasing the `direction` leg.
    pub fn open(instrument: InstrumentName, direction: Direction, quantity: Decimal) -> Self {
        Self::market(instrument, OrderSide::opening(direction), quantity, direction)
    }

    /// Market order reducing the `direction` leg.
    pub fn close(instrument: InstrumentName, direction: Direction, quantity: Decimal) -> Self {
        Self::market(
            instrument,
            OrderSide::opening(direction.opposite()),
            quantity,
            direction,
        )
    }

    fn market(
        instrument: InstrumentName,
        side: OrderSide,
        quantity: Decimal,
        position_side: Direction,
    ) -> Self {
        Self {
            instrument,
            trade_mode: "isolated",
            side,
            order_type: "market",
            quantity,
            position_side,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    fn opening(direction: Direction) -> Self {
        match direction {
            Direction::Long => OrderSide::Buy,
            Direction::Short => OrderSide::Sell,
        }
    }
}

pub type PlaceOrderResponse = OkxResponse<PlaceOrderResult>;

#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct PlaceOrderResult {
    #[serde(rename = "ordId", default)]
    pub order_id: SmolStr,
    #[serde(rename = "sCode")]
    pub status_code: String,
    #[serde(rename = "sMsg", default)]
    pub status_message: String,
}
