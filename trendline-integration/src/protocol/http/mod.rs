use self::rest::RestRequest;
use crate::error::SocketError;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::error;

/// Defines an abstract [`RestRequest`] that can be executed by a fully
/// configurable [`RestClient`](rest::client::RestClient).
pub mod rest;

/// Defines a configurable [`RequestSigner`](private::RequestSigner) that signs Http
/// [`RestRequest`] using API specific logic.
pub mod private;

/// Defines a default [`BuildStrategy`] that builds a non-authenticated Http
/// [`RestRequest`] with no headers.
pub mod public;

/// [`RestRequest`] build strategy for the API being interacted with.
///
/// An API that requires authenticated [`RestRequest`]s will likely utilise the configurable
/// [`RequestSigner`](private::RequestSigner) to sign the requests before building.
pub trait BuildStrategy {
    /// Use a [`RestRequest`] and [`reqwest::RequestBuilder`] to construct a [`reqwest::Request`]
    /// that is ready for executing.
    fn build<Request>(
        &self,
        request: Request,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Request, SocketError>
    where
        Request: RestRequest;
}

/// Utilised by a [`RestClient`](rest::client::RestClient) to deserialise
/// [`RestRequest::Response`], and upon failure parses API errors returned from the server.
pub trait HttpParser {
    type ApiError: DeserializeOwned;
    type OutputError: From<SocketError>;

    /// Attempt to parse a [`StatusCode`] & bytes payload into a deserialisable `Response`.
    fn parse<Response>(
        &self,
        status: StatusCode,
        payload: &[u8],
    ) -> Result<Response, Self::OutputError>
    where
        Response: DeserializeOwned,
    {
        // Non-success statuses never carry a Response, so go straight to the API error
        let parse_ok_error = if status.is_success() {
            match serde_json::from_slice::<Response>(payload) {
                Ok(response) => return Ok(response),
                Err(serde_error) => Some(serde_error),
            }
        } else {
            None
        };

        let parse_api_error_error = match serde_json::from_slice::<Self::ApiError>(payload) {
            Ok(api_error) => return Err(self.parse_api_error(status, api_error)),
            Err(serde_error) => serde_error,
        };

        error!(
            status_code = ?status,
            ?parse_ok_error,
            ?parse_api_error_error,
            response_body = %String::from_utf8_lossy(payload),
            "error deserializing HTTP response"
        );

        Err(Self::OutputError::from(match parse_ok_error {
            Some(error) => SocketError::DeserialiseBinary {
                error,
                payload: payload.to_vec(),
            },
            None => {
                SocketError::HttpResponse(status, String::from_utf8_lossy(payload).into_owned())
            }
        }))
    }

    /// If [`parse`](Self::parse) fails to deserialise the `Ok(Response)`, this function parses
    /// the API [`Self::ApiError`] associated with the response.
    fn parse_api_error(&self, status: StatusCode, error: Self::ApiError) -> Self::OutputError;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Ticker {
        last: String,
    }

    #[derive(Debug, Deserialize)]
    struct ApiError {
        msg: String,
    }

    #[derive(Debug, PartialEq)]
    enum TestError {
        Api(StatusCode, String),
        Socket(String),
    }

    impl From<SocketError> for TestError {
        fn from(error: SocketError) -> Self {
            TestError::Socket(error.to_string())
        }
    }

    struct TestParser;

    impl HttpParser for TestParser {
        type ApiError = ApiError;
        type OutputError = TestError;

        fn parse_api_error(&self, status: StatusCode, error: Self::ApiError) -> Self::OutputError {
            TestError::Api(status, error.msg)
        }
    }

    #[test]
    fn test_parse_success_response() {
        let actual = TestParser.parse::<Ticker>(StatusCode::OK, br#"{"last":"1.5"}"#);
        assert_eq!(
            actual,
            Ok(Ticker {
                last: "1.5".to_string()
            })
        );
    }

    #[test]
    fn test_parse_api_error_on_failure_status() {
        let actual = TestParser.parse::<Ticker>(StatusCode::UNAUTHORIZED, br#"{"msg":"denied"}"#);
        assert_eq!(
            actual,
            Err(TestError::Api(StatusCode::UNAUTHORIZED, "denied".to_string()))
        );
    }

    #[test]
    fn test_parse_unknown_payload() {
        let actual = TestParser.parse::<Ticker>(StatusCode::OK, b"not json");
        assert!(matches!(actual, Err(TestError::Socket(_))));
    }
}
