use crate::engine::{
    EngineConfig,
    command::NotionalBounds,
    signal::{PriceSources, SignalConfig},
    state::InstrumentState,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::{fs, path::Path, time::Duration};
use thiserror::Error;
use trendline_execution::{
    client::okx::OkxCredentials,
    instrument::{ContractSpec, InstrumentName},
};
use trendline_ta::snapshot::IndicatorConfig;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/trendline.json";

const ENV_OKX_API_KEY: &str = "OKX_API_KEY";
const ENV_OKX_SECRET_KEY: &str = "OKX_SECRET_KEY";
const ENV_OKX_PASSPHRASE: &str = "OKX_PASSPHRASE";
const ENV_TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
const ENV_TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";

/// Top-level configuration of a Trendline [`System`](crate::system::System).
///
/// Credentials are never part of the file, see [`Credentials::from_env`].
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct SystemConfig {
    /// Instruments traded by the engine, in evaluation order.
    pub instruments: Vec<InstrumentConfig>,

    #[serde(default)]
    pub indicators: IndicatorConfig,

    #[serde(default)]
    pub signal: SignalConfig,

    #[serde(default)]
    pub prices: PriceSources,

    /// Bars fetched per observation, including the currently forming bar.
    #[serde(default = "default_bar_count")]
    pub bar_count: usize,

    /// Exchange candle interval, eg/ `4H`.
    #[serde(default = "default_bar_interval")]
    pub bar_interval: SmolStr,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub notional_bounds: NotionalBounds,

    /// Fraction of the effective notional sent by the partial add.
    #[serde(default = "default_partial_add_fraction")]
    pub partial_add_fraction: Decimal,

    /// Directory of the monthly trade journal files.
    #[serde(default = "default_journal_dir")]
    pub journal_dir: String,

    pub exchange: ExchangeConfig,
}

/// Configuration of one traded instrument.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct InstrumentConfig {
    /// Exchange instrument identifier, eg/ `BTC-USDT-SWAP`.
    pub name: InstrumentName,

    /// Baseline notional of a full position, in quote units.
    pub notional: Decimal,

    pub contract: ContractSpec,

    #[serde(default)]
    pub long_only: bool,
}

/// Cadence of the decision tick and the reconciliation timer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,

    #[serde(default = "default_reconciliation_interval_secs")]
    pub reconciliation_interval_secs: u64,

    #[serde(default = "default_startup_attempts")]
    pub startup_attempts: u32,

    #[serde(default = "default_startup_retry_delay_secs")]
    pub startup_retry_delay_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
            reconciliation_interval_secs: default_reconciliation_interval_secs(),
            startup_attempts: default_startup_attempts(),
            startup_retry_delay_secs: default_startup_retry_delay_secs(),
        }
    }
}

impl ScheduleConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn reconciliation_interval(&self) -> Duration {
        Duration::from_secs(self.reconciliation_interval_secs)
    }

    pub fn startup_retry_delay(&self) -> Duration {
        Duration::from_secs(self.startup_retry_delay_secs)
    }
}

/// Exchange the system trades on.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExchangeConfig {
    /// OKX perpetual swaps.
    Okx {
        /// Route private requests to the OKX demo trading environment.
        #[serde(default)]
        simulated: bool,
        /// Isolated leverage applied to both position legs at startup.
        #[serde(default)]
        leverage: Option<u32>,
    },
    /// Paper trading: OKX public market data, in-memory execution.
    Mock,
}

fn default_bar_count() -> usize {
    241
}

fn default_bar_interval() -> SmolStr {
    SmolStr::new_static("4H")
}

fn default_partial_add_fraction() -> Decimal {
    Decimal::new(5, 1)
}

fn default_journal_dir() -> String {
    "logs".to_string()
}

fn default_tick_interval_secs() -> u64 {
    15 * 60
}

fn default_reconciliation_interval_secs() -> u64 {
    60 * 60
}

fn default_startup_attempts() -> u32 {
    3
}

fn default_startup_retry_delay_secs() -> u64 {
    5
}

/// All errors generated while loading a [`SystemConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {error}")]
    Read {
        path: String,
        error: std::io::Error,
    },

    #[error("failed to deserialise config: {0}")]
    Deserialise(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),
}

impl SystemConfig {
    /// Load and validate a [`SystemConfig`] from a JSON file.
    pub fn load<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|error| ConfigError::Read {
            path: path.display().to_string(),
            error,
        })?;

        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let config = serde_json::from_str::<Self>(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instruments.is_empty() {
            return Err(invalid("at least one instrument must be configured"));
        }

        for (index, instrument) in self.instruments.iter().enumerate() {
            if self.instruments[..index]
                .iter()
                .any(|other| other.name == instrument.name)
            {
                return Err(invalid(format!("duplicate instrument {}", instrument.name)));
            }
            if instrument.notional <= Decimal::ZERO {
                return Err(invalid(format!("{} notional must be positive", instrument.name)));
            }
            let contract = &instrument.contract;
            if contract.contract_value <= Decimal::ZERO || contract.lot_size <= Decimal::ZERO {
                return Err(invalid(format!(
                    "{} contract value and lot size must be positive",
                    instrument.name
                )));
            }
        }

        let required = self.indicators.required_bars() + 1;
        if self.bar_count < required {
            return Err(invalid(format!(
                "bar_count {} below the {required} bars the indicators require",
                self.bar_count
            )));
        }

        let signal = &self.signal;
        if [
            signal.entry_threshold,
            signal.extended_threshold,
            signal.partial_add_volatility,
        ]
        .iter()
        .any(|threshold| threshold <= &Decimal::ZERO)
        {
            return Err(invalid("signal thresholds must be positive"));
        }

        if self.notional_bounds.min <= Decimal::ZERO
            || self.notional_bounds.min > self.notional_bounds.max
        {
            return Err(invalid("notional bounds must satisfy 0 < min <= max"));
        }

        if self.partial_add_fraction <= Decimal::ZERO {
            return Err(invalid("partial_add_fraction must be positive"));
        }

        if self.schedule.tick_interval_secs == 0
            || self.schedule.reconciliation_interval_secs == 0
        {
            return Err(invalid("schedule intervals must be non-zero"));
        }

        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            signal: self.signal,
            prices: self.prices,
            notional_bounds: self.notional_bounds,
            partial_add_fraction: self.partial_add_fraction,
        }
    }

    /// Initial [`InstrumentState`]s: trading disabled and Flat until startup reconciliation.
    pub fn instrument_states(&self) -> impl Iterator<Item = InstrumentState> + '_ {
        self.instruments.iter().map(|instrument| {
            InstrumentState::new(instrument.name.clone(), instrument.notional)
                .with_long_only(instrument.long_only)
        })
    }

    pub fn contract_specs(&self) -> impl Iterator<Item = (InstrumentName, ContractSpec)> + '_ {
        self.instruments
            .iter()
            .map(|instrument| (instrument.name.clone(), instrument.contract))
    }
}

fn invalid<S>(message: S) -> ConfigError
where
    S: Into<String>,
{
    ConfigError::Invalid(message.into())
}

/// Secrets read from the environment.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub okx: Option<OkxCredentials>,
    pub telegram: Option<TelegramCredentials>,
}

/// Telegram Bot API credentials.
#[derive(Clone)]
pub struct TelegramCredentials {
    pub bot_token: String,
    pub chat_id: String,
}

impl std::fmt::Debug for TelegramCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramCredentials")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

impl Credentials {
    /// Read credentials from the environment. Each group is optional, but a partially
    /// configured group is an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let okx = match (
            lookup(ENV_OKX_API_KEY),
            lookup(ENV_OKX_SECRET_KEY),
            lookup(ENV_OKX_PASSPHRASE),
        ) {
            (None, None, None) => None,
            (Some(key), Some(secret), Some(passphrase)) => Some(OkxCredentials {
                key,
                secret,
                passphrase,
            }),
            (None, _, _) => return Err(ConfigError::MissingEnv(ENV_OKX_API_KEY)),
            (_, None, _) => return Err(ConfigError::MissingEnv(ENV_OKX_SECRET_KEY)),
            (_, _, None) => return Err(ConfigError::MissingEnv(ENV_OKX_PASSPHRASE)),
        };

        let telegram = match (lookup(ENV_TELEGRAM_BOT_TOKEN), lookup(ENV_TELEGRAM_CHAT_ID)) {
            (None, None) => None,
            (Some(bot_token), Some(chat_id)) => Some(TelegramCredentials { bot_token, chat_id }),
            (None, _) => return Err(ConfigError::MissingEnv(ENV_TELEGRAM_BOT_TOKEN)),
            (_, None) => return Err(ConfigError::MissingEnv(ENV_TELEGRAM_CHAT_ID)),
        };

        Ok(Self { okx, telegram })
    }
}
