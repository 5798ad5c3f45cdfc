use crate::client::okx::http::OkxResponse;
use derive_more::Constructor;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use trendline_integration::protocol::http::rest::RestRequest;

/// Set the account position mode.
///
/// See docs: <https://www.okx.com/docs-v5/en/#trading-account-rest-api-set-position-mode>
#[derive(Debug, Clone, Constructor)]
pub struct SetPositionModeRequest(SetPositionModeBody);

impl RestRequest for SetPositionModeRequest {
    type Response = SetPositionModeResponse;
    type QueryParams = ();
    type Body = SetPositionModeBody;

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/api/v5/account/set-position-mode")
    }

    fn method() -> Method {
        Method::POST
    }

    fn body(&self) -> Option<&Self::Body> {
        Some(&self.0)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub struct SetPositionModeBody {
    #[serde(rename = "posMode")]
    pub position_mode: PositionMode,
}

/// OKX account position mode.
///
/// Orders carrying `posSide` are only accepted in [`PositionMode::LongShort`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum PositionMode {
    #[serde(rename = "long_short_mode")]
    LongShort,
    #[serde(rename = "net_mode")]
    Net,
}

pub type SetPositionModeResponse = OkxResponse<SetPositionModeResult>;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize)]
pub struct SetPositionModeResult {
    #[serde(rename = "posMode")]
    pub position_mode: PositionMode,
}
