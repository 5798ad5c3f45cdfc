use chrono::{SecondsFormat, Utc};
use trendline_integration::{
    error::SocketError,
    protocol::http::{
        private::{RequestSigner, Signer, encoder::Base64Encoder},
        rest::RestRequest,
    },
};

pub type OkxRequestSigner = RequestSigner<OkxSigner, hmac::Hmac<sha2::Sha256>, Base64Encoder>;

/// OKX [`Signer`] producing the `OK-ACCESS-*` authentication headers.
///
/// See docs: <https://www.okx.com/docs-v5/en/#overview-rest-authentication-signature>
#[derive(Clone)]
pub struct OkxSigner {
    pub api_key: String,
    pub passphrase: String,
    /// Route requests to the OKX demo trading environment.
    pub simulated: bool,
}

impl std::fmt::Debug for OkxSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OkxSigner")
            .field("api_key", &self.api_key)
            .field("passphrase", &"<redacted>")
            .field("simulated", &self.simulated)
            .finish()
    }
}

impl OkxSigner {
    pub fn new(api_key: String, passphrase: String, simulated: bool) -> Self {
        Self {
            api_key,
            passphrase,
            simulated,
        }
    }
}

pub struct OkxSignConfig<'a> {
    api_key: &'a str,
    passphrase: &'a str,
    simulated: bool,
    timestamp: String,
    method: reqwest::Method,
    request_path: String,
    body: String,
}

impl Signer for OkxSigner {
    type Config<'a>
        = OkxSignConfig<'a>
    where
        Self: 'a;

    fn config<'a, Request>(
        &'a self,
        request: Request,
        _: &reqwest::RequestBuilder,
    ) -> Result<Self::Config<'a>, SocketError>
    where
        Request: RestRequest,
    {
        let request_path = match request.query_params() {
            Some(params) => format!(
                "{}?{}",
                request.path(),
                serde_urlencoded::to_string(params)?
            ),
            None => request.path().into_owned(),
        };

        let body = match request.body() {
            Some(body) => serde_json::to_string(body)?,
            None => String::new(),
        };

        Ok(OkxSignConfig {
            api_key: self.api_key.as_str(),
            passphrase: self.passphrase.as_str(),
            simulated: self.simulated,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            method: Request::method(),
            request_path,
            body,
        })
    }

    fn add_bytes_to_sign<M>(mac: &mut M, config: &Self::Config<'_>)
    where
        M: hmac::Mac,
    {
        // The message being signed is "{timestamp}{METHOD}{request_path}{body}"
        mac.update(config.timestamp.as_bytes());
        mac.update(config.method.as_str().as_bytes());
        mac.update(config.request_path.as_bytes());
        mac.update(config.body.as_bytes());
    }

    fn build_signed_request(
        config: Self::Config<'_>,
        builder: reqwest::RequestBuilder,
        signature: String,
    ) -> Result<reqwest::Request, SocketError> {
        const KEY_HEADER: &str = "OK-ACCESS-KEY";
        const SIGNATURE_HEADER: &str = "OK-ACCESS-SIGN";
        const TIMESTAMP_HEADER: &str = "OK-ACCESS-TIMESTAMP";
        const PASSPHRASE_HEADER: &str = "OK-ACCESS-PASSPHRASE";
        const SIMULATED_HEADER: &str = "x-simulated-trading";

        let builder = builder
            .header(KEY_HEADER, config.api_key)
            .header(SIGNATURE_HEADER, signature)
            .header(TIMESTAMP_HEADER, config.timestamp)
            .header(PASSPHRASE_HEADER, config.passphrase);

        let builder = if config.simulated {
            builder.header(SIMULATED_HEADER, "1")
        } else {
            builder
        };

        builder.build().map_err(SocketError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        client::okx::http::requests::get_positions::{GetPositionsParams, GetPositionsRequest},
        instrument::InstrumentName,
    };
    use hmac::Mac;
    use trendline_integration::protocol::http::{BuildStrategy, private::encoder::Encoder};

    #[test]
    fn test_signed_request_headers() {
        let mac = hmac::Hmac::<sha2::Sha256>::new_from_slice(b"secret").unwrap();
        let signer = OkxRequestSigner::new(
            OkxSigner::new("key".to_string(), "phrase".to_string(), true),
            mac.clone(),
            Base64Encoder,
        );

        let request = GetPositionsRequest::new(GetPositionsParams::new(&[InstrumentName::from(
            "BTC-USDT-SWAP",
        )]));
        let builder = reqwest::Client::new()
            .get("https://www.okx.com/api/v5/account/positions?instType=SWAP&instId=BTC-USDT-SWAP");
        let signed = signer.build(request, builder).unwrap();

        let headers = signed.headers();
        let timestamp = headers.get("OK-ACCESS-TIMESTAMP").unwrap().to_str().unwrap();
        assert_eq!(headers.get("OK-ACCESS-KEY").unwrap(), "key");
        assert_eq!(headers.get("OK-ACCESS-PASSPHRASE").unwrap(), "phrase");
        assert_eq!(headers.get("x-simulated-trading").unwrap(), "1");

        let mut expected = mac;
        expected.update(
            format!("{timestamp}GET/api/v5/account/positions?instType=SWAP&instId=BTC-USDT-SWAP")
                .as_bytes(),
        );
        let expected = Base64Encoder.encode(expected.finalize().into_bytes());
        assert_eq!(
            headers.get("OK-ACCESS-SIGN").unwrap().to_str().unwrap(),
            expected
        );
    }
}
