use crate::error::{ApiError, ClientError};
use serde::Deserialize;

pub mod parser;
pub mod requests;
pub mod signer;

/// Generic response envelope used by every OKX v5 REST endpoint.
///
/// See docs: <https://www.okx.com/docs-v5/en/#overview-rest-authentication>
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct OkxResponse<T> {
    pub code: String,
    #[serde(default)]
    pub msg: String,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

impl<T> OkxResponse<T> {
    /// Success responses carry `code == "0"`.
    pub fn is_success(&self) -> bool {
        self.code == "0"
    }

    /// Returns the response data, or the [`ApiError`] the response code describes.
    pub fn into_data(self) -> Result<Vec<T>, ClientError> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(ClientError::Api(api_error(&self.code, self.msg)))
        }
    }
}

/// Map an OKX error code to an [`ApiError`].
pub fn api_error(code: &str, message: String) -> ApiError {
    match code {
        "50011" | "50061" => ApiError::RateLimit,
        "50100" | "50101" | "50102" | "50103" | "50104" | "50105" | "50111" | "50113" => {
            ApiError::Unauthorised(message)
        }
        "51008" | "51020" => ApiError::BalanceInsufficient(message),
        _ => ApiError::Custom {
            code: code.to_owned(),
            message,
        },
    }
}
