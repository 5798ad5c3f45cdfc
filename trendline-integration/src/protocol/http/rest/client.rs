use crate::{
    error::SocketError,
    protocol::http::{BuildStrategy, HttpParser, rest::RestRequest},
};
use bytes::Bytes;
use std::{borrow::Cow, time::Duration};
use tracing::debug;

/// Configurable REST client capable of executing signed [`RestRequest`]s. Each API requires a
/// specific combination of [`BuildStrategy`] (eg/ a
/// [`RequestSigner`](super::super::private::RequestSigner)) and [`HttpParser`].
#[derive(Debug, Clone)]
pub struct RestClient<'a, Strategy, Parser> {
    /// HTTP [`reqwest::Client`] for executing signed [`reqwest::Request`]s.
    pub http_client: reqwest::Client,

    /// Base Url of the API being interacted with.
    pub base_url: Cow<'a, str>,

    /// [`RestRequest`] build strategy for the API being interacted with.
    pub strategy: Strategy,

    /// [`HttpParser`] that deserialises [`RestRequest::Response`]s, and upon failure parses
    /// API errors returned from the server.
    pub parser: Parser,
}

impl<Strategy, Parser> RestClient<'_, Strategy, Parser>
where
    Strategy: BuildStrategy,
    Parser: HttpParser,
{
    /// Execute the provided [`RestRequest`].
    pub async fn execute<Request>(
        &self,
        request: Request,
    ) -> Result<Request::Response, Parser::OutputError>
    where
        Request: RestRequest,
    {
        // Use provided Request to construct a signed reqwest::Request
        let request = self.build(request)?;
        let path = request.url().path().to_owned();

        let (status, payload, latency) = self.measured_execution::<Request>(request).await?;

        debug!(
            method = %Request::method(),
            %path,
            %status,
            latency_ms = latency.as_millis() as u64,
            "executed HTTP request"
        );

        // Attempt to parse API Success or Error response
        self.parser.parse::<Request::Response>(status, &payload)
    }

    /// Use the provided [`RestRequest`] to construct a signed Http [`reqwest::Request`].
    pub fn build<Request>(&self, request: Request) -> Result<reqwest::Request, SocketError>
    where
        Request: RestRequest,
    {
        let url = format!("{}{}", self.base_url, request.path());

        let mut builder = self
            .http_client
            .request(Request::method(), url)
            .timeout(Request::timeout());

        if let Some(query_params) = request.query_params() {
            builder = builder.query(query_params);
        }

        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        // Use RequestBuilder (public or private strategy) to build reqwest::Request
        self.strategy.build(request, builder)
    }

    /// Execute the built [`reqwest::Request`] using the [`reqwest::Client`].
    ///
    /// Measures and returns the Http request round trip duration.
    pub async fn measured_execution<Request>(
        &self,
        request: reqwest::Request,
    ) -> Result<(reqwest::StatusCode, Bytes, Duration), SocketError>
    where
        Request: RestRequest,
    {
        let start = std::time::Instant::now();
        let response = self.http_client.execute(request).await?;
        let latency = start.elapsed();

        let status_code = response.status();
        let payload = response.bytes().await?;

        Ok((status_code, payload, latency))
    }
}

impl<'a, Strategy, Parser> RestClient<'a, Strategy, Parser> {
    /// Construct a new [`Self`] using the provided configuration.
    pub fn new<Url: Into<Cow<'a, str>>>(base_url: Url, strategy: Strategy, parser: Parser) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.into(),
            strategy,
            parser,
        }
    }
}
