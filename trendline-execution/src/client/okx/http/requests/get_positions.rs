use crate::{
    client::{PositionSnapshot, okx::http::OkxResponse},
    instrument::{Direction, InstrumentName},
};
use derive_more::Constructor;
use itertools::Itertools;
use reqwest::Method;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, str::FromStr};
use trendline_integration::protocol::http::rest::RestRequest;

/// Open positions of the account, filtered by instrument.
///
/// See docs: <https://www.okx.com/docs-v5/en/#trading-account-rest-api-get-positions>
#[derive(Debug, Clone, Constructor)]
pub struct GetPositionsRequest(GetPositionsParams);

impl RestRequest for GetPositionsRequest {
    type Response = GetPositionsResponse;
    type QueryParams = GetPositionsParams;
    type Body = ();

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/api/v5/account/positions")
    }

    fn method() -> Method {
        Method::GET
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GetPositionsParams {
    #[serde(rename = "instType")]
    pub instrument_type: &'static str,
    /// Comma separated instrument names.
    #[serde(rename = "instId")]
    pub instruments: String,
}

impl GetPositionsParams {
    pub fn new(instruments: &[InstrumentName]) -> Self {
        Self {
            instrument_type: "SWAP",
            instruments: instruments.iter().map(InstrumentName::as_str).join(","),
        }
    }
}

pub type GetPositionsResponse = OkxResponse<OkxPosition>;

#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct OkxPosition {
    #[serde(rename = "instId")]
    pub instrument: InstrumentName,
    /// `long` or `short` in hedge mode, `net` in one-way mode.
    #[serde(rename = "posSide")]
    pub position_side: String,
    /// Signed contract quantity in one-way mode, absolute in hedge mode.
    #[serde(rename = "pos")]
    pub quantity: String,
    #[serde(rename = "avgPx", default)]
    pub average_price: String,
    #[serde(rename = "upl", default)]
    pub unrealised_pnl: String,
}

impl OkxPosition {
    /// Convert into a [`PositionSnapshot`], returning `None` for empty legs or legs with an
    /// unparseable quantity.
    pub fn into_snapshot(self) -> Option<PositionSnapshot> {
        let quantity = Decimal::from_str(&self.quantity).ok()?;
        if quantity.is_zero() {
            return None;
        }

        let direction = match self.position_side.as_str() {
            "long" => Direction::Long,
            "short" => Direction::Short,
            _ if quantity.is_sign_negative() => Direction::Short,
            _ => Direction::Long,
        };

        Some(PositionSnapshot::new(
            self.instrument,
            direction,
            quantity.abs(),
            Decimal::from_str(&self.average_price).ok(),
            Decimal::from_str(&self.unrealised_pnl).unwrap_or_default(),
        ))
    }
}
