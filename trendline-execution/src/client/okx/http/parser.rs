use super::api_error;
use crate::error::{ApiError, ClientError};
use serde::Deserialize;
use trendline_integration::protocol::http::HttpParser;

/// [`HttpParser`] for OKX REST responses.
#[derive(Debug, Copy, Clone)]
pub struct OkxParser;

impl HttpParser for OkxParser {
    type ApiError = OkxApiError;
    type OutputError = ClientError;

    fn parse_api_error(
        &self,
        status: reqwest::StatusCode,
        error: Self::ApiError,
    ) -> Self::OutputError {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return ClientError::Api(ApiError::RateLimit);
        }

        ClientError::Api(api_error(&error.code, error.msg))
    }
}

/// Error body returned by OKX alongside non-success Http statuses.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct OkxApiError {
    pub code: String,
    #[serde(default)]
    pub msg: String,
}
