use self::http::{
    parser::OkxParser,
    requests::{
        get_candles::{GetCandlesParams, GetCandlesRequest, parse_candle},
        get_positions::{GetPositionsParams, GetPositionsRequest, OkxPosition},
        place_order::{PlaceOrderBody, PlaceOrderRequest, PlaceOrderResult},
        set_leverage::{SetLeverageBody, SetLeverageRequest},
        set_position_mode::{PositionMode, SetPositionModeBody, SetPositionModeRequest},
    },
    signer::{OkxRequestSigner, OkxSigner},
};
use crate::{
    client::{
        ClosedLeg, ExecutionClient, MarketDataClient, OpenRequest, OrderAck, PositionSnapshot,
        require_bars,
    },
    error::{ApiError, ClientError},
    instrument::{ContractSpec, Direction, InstrumentName},
};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::{collections::HashMap, sync::Arc};
use tracing::{info, warn};
use trendline_integration::protocol::http::{
    private::encoder::Base64Encoder, public::PublicNoHeaders, rest::client::RestClient,
};
use trendline_ta::bar::PriceBar;

/// OKX REST [`RestRequest`](trendline_integration::protocol::http::rest::RestRequest)s,
/// [`OkxSigner`] and [`OkxParser`].
pub mod http;

const HTTP_BASE_URL_OKX: &str = "https://www.okx.com";

/// OKX API credentials.
#[derive(Clone, Deserialize, Serialize)]
pub struct OkxCredentials {
    pub key: String,
    pub secret: String,
    pub passphrase: String,
}

impl std::fmt::Debug for OkxCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OkxCredentials")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .field("passphrase", &"<redacted>")
            .finish()
    }
}

/// Configuration of an [`OkxClient`].
#[derive(Debug, Clone)]
pub struct OkxConfig {
    pub base_url: String,
    /// Candle interval, eg/ `4H`.
    pub bar: SmolStr,
    /// Route private requests to the OKX demo trading environment.
    pub simulated: bool,
    /// Private endpoints are unavailable without credentials.
    pub credentials: Option<OkxCredentials>,
    pub contract_specs: HashMap<InstrumentName, ContractSpec>,
}

impl OkxConfig {
    pub fn new(bar: SmolStr, contract_specs: HashMap<InstrumentName, ContractSpec>) -> Self {
        Self {
            base_url: HTTP_BASE_URL_OKX.to_string(),
            bar,
            simulated: false,
            credentials: None,
            contract_specs,
        }
    }

    pub fn with_credentials(self, credentials: OkxCredentials, simulated: bool) -> Self {
        Self {
            credentials: Some(credentials),
            simulated,
            ..self
        }
    }
}

/// [`MarketDataClient`] & [`ExecutionClient`] for OKX USDT margined perpetual swaps, trading
/// isolated margin market orders on hedge mode (long/short) position legs.
#[derive(Debug, Clone)]
pub struct OkxClient {
    bar: SmolStr,
    contract_specs: Arc<HashMap<InstrumentName, ContractSpec>>,
    public: RestClient<'static, PublicNoHeaders, OkxParser>,
    private: Option<RestClient<'static, OkxRequestSigner, OkxParser>>,
}

impl OkxClient {
    pub fn new(config: OkxConfig) -> Result<Self, ClientError> {
        let private = config
            .credentials
            .map(|credentials| {
                let mac = Hmac::new_from_slice(credentials.secret.as_bytes()).map_err(|error| {
                    ClientError::Api(ApiError::Unauthorised(format!(
                        "invalid OKX secret key: {error}"
                    )))
                })?;

                Ok::<_, ClientError>(RestClient::new(
                    config.base_url.clone(),
                    OkxRequestSigner::new(
                        OkxSigner::new(credentials.key, credentials.passphrase, config.simulated),
                        mac,
                        Base64Encoder,
                    ),
                    OkxParser,
                ))
            })
            .transpose()?;

        Ok(Self {
            bar: config.bar,
            contract_specs: Arc::new(config.contract_specs),
            public: RestClient::new(config.base_url, PublicNoHeaders, OkxParser),
            private,
        })
    }

    fn private(&self) -> Result<&RestClient<'static, OkxRequestSigner, OkxParser>, ClientError> {
        self.private.as_ref().ok_or_else(|| {
            ClientError::Api(ApiError::Unauthorised(
                "OKX credentials not configured".to_string(),
            ))
        })
    }

    fn contract_spec(&self, instrument: &InstrumentName) -> Result<&ContractSpec, ClientError> {
        self.contract_specs
            .get(instrument)
            .ok_or_else(|| ClientError::UnknownInstrument(instrument.clone()))
    }

    /// Switch the account to long/short position mode so orders may carry `posSide`.
    pub async fn set_position_mode(&self) -> Result<(), ClientError> {
        let position_mode = PositionMode::LongShort;

        self.private()?
            .execute(SetPositionModeRequest::new(SetPositionModeBody {
                position_mode,
            }))
            .await?
            .into_data()?;

        info!(?position_mode, "OkxClient set position mode");
        Ok(())
    }

    /// Set the isolated margin leverage of both position legs of an instrument.
    pub async fn set_leverage(
        &self,
        instrument: &InstrumentName,
        leverage: u32,
    ) -> Result<(), ClientError> {
        let private = self.private()?;

        for direction in [Direction::Long, Direction::Short] {
            private
                .execute(SetLeverageRequest::new(SetLeverageBody::isolated(
                    instrument.clone(),
                    leverage,
                    direction,
                )))
                .await?
                .into_data()?;
        }

        info!(%instrument, leverage, "OkxClient set isolated leverage");
        Ok(())
    }

    async fn place_order(&self, body: PlaceOrderBody) -> Result<PlaceOrderResult, ClientError> {
        let response = self
            .private()?
            .execute(PlaceOrderRequest::new(body))
            .await?;

        if !response.is_success() {
            let message = match response.data.first() {
                Some(result) => format!("{}: {}", result.status_code, result.status_message),
                None => format!("{}: {}", response.code, response.msg),
            };
            return Err(ClientError::Api(ApiError::OrderRejected(message)));
        }

        response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::Api(ApiError::OrderRejected("empty response".to_string())))
    }
}

impl MarketDataClient for OkxClient {
    async fn fetch_bars(
        &self,
        instrument: &InstrumentName,
        count: usize,
    ) -> Result<Vec<PriceBar>, ClientError> {
        let candles = self
            .public
            .execute(GetCandlesRequest::new(GetCandlesParams::new(
                instrument.clone(),
                self.bar.clone(),
                count,
            )))
            .await?
            .into_data()?;

        // OKX returns candles newest first
        let bars = candles
            .iter()
            .rev()
            .map(|candle| parse_candle(candle))
            .collect::<Result<Vec<_>, _>>()?;

        require_bars(instrument, count, bars)
    }
}

impl ExecutionClient for OkxClient {
    async fn open_position(&self, request: OpenRequest) -> Result<OrderAck, ClientError> {
        let quantity = self
            .contract_spec(&request.instrument)?
            .contracts(request.notional, request.reference_price)?;

        let result = self
            .place_order(PlaceOrderBody::open(
                request.instrument.clone(),
                request.direction,
                quantity,
            ))
            .await?;

        info!(
            instrument = %request.instrument,
            direction = %request.direction,
            %quantity,
            order_id = %result.order_id,
            "OkxClient opened position"
        );

        Ok(OrderAck::new(
            request.instrument,
            request.direction,
            result.order_id,
            quantity,
        ))
    }

    async fn close_position(
        &self,
        instrument: &InstrumentName,
    ) -> Result<Vec<ClosedLeg>, ClientError> {
        let legs = self.fetch_positions(std::slice::from_ref(instrument)).await?;
        if legs.is_empty() {
            warn!(%instrument, "OkxClient found no open position to close");
        }

        let mut closed = Vec::with_capacity(legs.len());
        for leg in legs {
            let result = self
                .place_order(PlaceOrderBody::close(
                    leg.instrument.clone(),
                    leg.direction,
                    leg.size,
                ))
                .await?;

            info!(
                %instrument,
                direction = %leg.direction,
                quantity = %leg.size,
                order_id = %result.order_id,
                "OkxClient closed position leg"
            );

            closed.push(ClosedLeg::new(
                leg.instrument,
                leg.direction,
                result.order_id,
                leg.size,
                leg.average_price,
                leg.unrealised_pnl,
            ));
        }

        Ok(closed)
    }

    async fn fetch_positions(
        &self,
        instruments: &[InstrumentName],
    ) -> Result<Vec<PositionSnapshot>, ClientError> {
        let positions = self
            .private()?
            .execute(GetPositionsRequest::new(GetPositionsParams::new(instruments)))
            .await?
            .into_data()?;

        Ok(positions
            .into_iter()
            .filter_map(OkxPosition::into_snapshot)
            .filter(|position| instruments.contains(&position.instrument))
            .collect())
    }
}
