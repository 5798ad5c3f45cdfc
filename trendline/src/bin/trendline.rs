use clap::Parser;
use std::{path::PathBuf, process::ExitCode};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use trendline::{
    config::{ConfigError, Credentials, DEFAULT_CONFIG_PATH, ExchangeConfig, SystemConfig},
    engine::{Engine, market::MarketDataObserver, state::EngineState},
    error::EngineError,
    journal::FileTradeJournal,
    logging::{init_json_logging, init_logging},
    notify::{LogNotifier, Notifier, TelegramNotifier},
    system::{COMMAND_CHANNEL_CAPACITY, System, spawn_stdin_commands},
};
use trendline_execution::{
    client::{
        ExecutionClient,
        mock::MockExchange,
        okx::{OkxClient, OkxConfig},
    },
    error::ClientError,
};

#[derive(Debug, Error)]
enum SystemError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("exchange client: {0}")]
    Client(#[from] ClientError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Trend following position controller for OKX perpetual swaps"
)]
struct Args {
    /// Path to the JSON system configuration
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if args.json_logs {
        init_json_logging()
    } else {
        init_logging()
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "Trendline terminated");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), SystemError> {
    let config = SystemConfig::load(&args.config)?;
    let credentials = Credentials::from_env()?;
    info!(
        config = %args.config.display(),
        instruments = config.instruments.len(),
        "Trendline loaded config"
    );

    let mut okx_config = OkxConfig::new(
        config.bar_interval.clone(),
        config.contract_specs().collect(),
    );

    let notifier = credentials.telegram.clone();

    match config.exchange {
        ExchangeConfig::Okx {
            simulated,
            leverage,
        } => {
            let okx_credentials = credentials
                .okx
                .ok_or(ConfigError::MissingEnv("OKX_API_KEY"))?;
            okx_config = okx_config.with_credentials(okx_credentials, simulated);
            let client = OkxClient::new(okx_config)?;
            if let Err(error) = client.set_position_mode().await {
                warn!(
                    %error,
                    "OkxClient failed to set position mode, continuing with account setting"
                );
            }

            if let Some(leverage) = leverage {
                for instrument in &config.instruments {
                    client.set_leverage(&instrument.name, leverage).await?;
                }
            }

            run_with_notifier(config, client.clone(), client, notifier).await
        }
        ExchangeConfig::Mock => {
            info!("Trendline paper trading: OKX market data, in-memory execution");
            let client = OkxClient::new(okx_config)?;
            let execution = MockExchange::new().with_contract_specs(config.contract_specs());
            run_with_notifier(config, client, execution, notifier).await
        }
    }
}

async fn run_with_notifier<Execution>(
    config: SystemConfig,
    market: OkxClient,
    execution: Execution,
    telegram: Option<trendline::config::TelegramCredentials>,
) -> Result<(), SystemError>
where
    Execution: ExecutionClient + Send + Sync + 'static,
{
    match telegram {
        Some(telegram) => {
            let notifier = TelegramNotifier::new(&telegram.bot_token, telegram.chat_id);
            run_system(config, market, execution, notifier).await
        }
        None => run_system(config, market, execution, LogNotifier).await,
    }
}

async fn run_system<Execution, Notify>(
    config: SystemConfig,
    market: OkxClient,
    execution: Execution,
    notifier: Notify,
) -> Result<(), SystemError>
where
    Execution: ExecutionClient + Send + Sync + 'static,
    Notify: Notifier + Send + Sync + 'static,
{
    let engine = Engine::new(
        config.engine_config(),
        EngineState::new(config.instrument_states()),
        MarketDataObserver::new(market, config.indicators, config.bar_count),
        execution,
        FileTradeJournal::new(&config.journal_dir),
    );

    let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    spawn_stdin_commands(command_tx);

    let shutdown = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            error!(%error, "Failed to listen for ctrl-c, shutting down");
        }
    };

    System::new(engine, notifier, config.schedule)
        .run(command_rx, shutdown)
        .await
        .map_err(SystemError::from)
}
