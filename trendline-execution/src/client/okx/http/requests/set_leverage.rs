use crate::{
    client::okx::http::OkxResponse,
    instrument::{Direction, InstrumentName},
};
use derive_more::Constructor;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use trendline_integration::protocol::http::rest::RestRequest;

/// Set the isolated margin leverage of one position leg.
///
/// See docs: <https://www.okx.com/docs-v5/en/#trading-account-rest-api-set-leverage>
#[derive(Debug, Clone, Constructor)]
pub struct SetLeverageRequest(SetLeverageBody);

impl RestRequest for SetLeverageRequest {
    type Response = SetLeverageResponse;
    type QueryParams = ();
    type Body = SetLeverageBody;

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/api/v5/account/set-leverage")
    }

    fn method() -> Method {
        Method::POST
    }

    fn body(&self) -> Option<&Self::Body> {
        Some(&self.0)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct SetLeverageBody {
    #[serde(rename = "instId")]
    pub instrument: InstrumentName,
    #[serde(rename = "lever")]
    pub leverage: String,
    #[serde(rename = "mgnMode")]
    pub margin_mode: &'static str,
    #[serde(rename = "posSide")]
    pub position_side: Direction,
}

impl SetLeverageBody {
    pub fn isolated(instrument: InstrumentName, leverage: u32, position_side: Direction) -> Self {
        Self {
            instrument,
            leverage: leverage.to_string(),
            margin_mode: "isolated",
            position_side,
        }
    }
}

pub type SetLeverageResponse = OkxResponse<SetLeverageResult>;

#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct SetLeverageResult {
    #[serde(rename = "instId")]
    pub instrument: InstrumentName,
    #[serde(rename = "lever")]
    pub leverage: String,
}
