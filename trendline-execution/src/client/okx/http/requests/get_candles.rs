use crate::{
    client::okx::http::OkxResponse,
    error::{ApiError, ClientError},
    instrument::InstrumentName,
};
use chrono::DateTime;
use derive_more::Constructor;
use reqwest::Method;
use rust_decimal::Decimal;
use serde::Serialize;
use smol_str::SmolStr;
use std::{borrow::Cow, str::FromStr};
use trendline_integration::protocol::http::rest::RestRequest;
use trendline_ta::bar::PriceBar;

/// Public candlestick history, returned newest first.
///
/// See docs: <https://www.okx.com/docs-v5/en/#public-data-rest-api-get-candlesticks>
#[derive(Debug, Clone, Constructor)]
pub struct GetCandlesRequest(GetCandlesParams);

impl RestRequest for GetCandlesRequest {
    type Response = GetCandlesResponse;
    type QueryParams = GetCandlesParams;
    type Body = ();

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/api/v5/market/candles")
    }

    fn method() -> Method {
        Method::GET
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Constructor)]
pub struct GetCandlesParams {
    #[serde(rename = "instId")]
    pub instrument: InstrumentName,
    /// Bar interval, eg/ `4H`.
    pub bar: SmolStr,
    pub limit: usize,
}

/// Each candle is `[ts, o, h, l, c, vol, volCcy, volCcyQuote, confirm]`.
pub type GetCandlesResponse = OkxResponse<Vec<String>>;

/// Parse a raw OKX candle into a [`PriceBar`].
pub fn parse_candle(candle: &[String]) -> Result<PriceBar, ClientError> {
    let field = |index: usize| {
        candle
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| invalid_candle(format!("missing field {index} in {candle:?}")))
    };
    let decimal = |index: usize| {
        field(index).and_then(|value| {
            Decimal::from_str(value)
                .map_err(|error| invalid_candle(format!("invalid decimal {value}: {error}")))
        })
    };

    let open_time = field(0)?
        .parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .ok_or_else(|| invalid_candle(format!("invalid timestamp in {candle:?}")))?;

    Ok(PriceBar::new(open_time, decimal(2)?, decimal(3)?, decimal(4)?))
}

fn invalid_candle(message: String) -> ClientError {
    ClientError::Api(ApiError::Custom {
        code: "candle".to_owned(),
        message,
    })
}
