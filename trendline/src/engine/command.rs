use crate::{
    engine::{
        Engine,
        market::MarketObserver,
        state::{EngineState, InstrumentState, PositionSide, trading::TradingState},
    },
    journal::TradeJournal,
};
use itertools::Itertools;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use tokio::sync::MutexGuard;
use tracing::info;
use trendline_execution::{client::ExecutionClient, instrument::InstrumentName};

/// Operator help text listing every [`Command`].
pub const HELP: &str = "\
enable [<instrument>|all]         arm trading and evaluate immediately
disable [<instrument>|all]        disarm trading (open positions keep their exit rules)
longonly <instrument> on|off      never hold a short on the instrument
suppress [<instrument>|all] on|off  block or allow new short entries
size <instrument> <notional>      override the position notional
size <instrument> reset           restore the configured notional
status                            show every instrument
help                              show this message";

/// Instruments a [`Command`] applies to.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub enum CommandTarget {
    All,
    One(InstrumentName),
}

/// Notional override update.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub enum SizeUpdate {
    Set(Decimal),
    Reset,
}

/// Parsed operator command.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub enum Command {
    Enable(CommandTarget),
    Disable(CommandTarget),
    LongOnly(InstrumentName, bool),
    SuppressShort(CommandTarget, bool),
    Size(InstrumentName, SizeUpdate),
    Status,
    Help,
}

/// Inclusive bounds of an operator notional override.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct NotionalBounds {
    pub min: Decimal,
    pub max: Decimal,
}

impl Default for NotionalBounds {
    fn default() -> Self {
        Self {
            min: Decimal::TEN,
            max: Decimal::new(100_000, 0),
        }
    }
}

impl NotionalBounds {
    pub fn contains(&self, notional: Decimal) -> bool {
        notional >= self.min && notional <= self.max
    }
}

/// Unknown or malformed operator command. No state is mutated.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum CommandError {
    #[error("empty command, send `help` for the command list")]
    Empty,

    #[error("unknown command `{0}`, send `help` for the command list")]
    Unknown(String),

    #[error("`{command}` expects {expected}")]
    Usage {
        command: &'static str,
        expected: &'static str,
    },

    #[error("unknown instrument `{0}`")]
    UnknownInstrument(String),

    #[error("invalid notional `{0}`, expected a positive number or `reset`")]
    InvalidNotional(String),

    #[error("notional {value} outside allowed range [{min}, {max}]")]
    NotionalOutOfBounds {
        value: Decimal,
        min: Decimal,
        max: Decimal,
    },
}

impl Command {
    /// Parse operator text. Case-insensitive, an optional leading `/` is ignored, and
    /// instruments are accepted by full name or base asset.
    pub fn parse(text: &str, state: &EngineState) -> Result<Self, CommandError> {
        let lowercase = text.trim().trim_start_matches('/').to_lowercase();
        let tokens = lowercase.split_whitespace().collect::<Vec<_>>();

        let Some((&name, args)) = tokens.split_first() else {
            return Err(CommandError::Empty);
        };

        match name {
            "enable" => {
                parse_target(args, state, "enable", "[<instrument>|all]").map(Command::Enable)
            }
            "disable" => {
                parse_target(args, state, "disable", "[<instrument>|all]").map(Command::Disable)
            }
            "longonly" => match args {
                [instrument, toggle] => Ok(Command::LongOnly(
                    resolve(instrument, state)?,
                    parse_toggle(toggle, "longonly", "<instrument> on|off")?,
                )),
                _ => Err(usage("longonly", "<instrument> on|off")),
            },
            "suppress" => match args {
                [toggle] => Ok(Command::SuppressShort(
                    CommandTarget::All,
                    parse_toggle(toggle, "suppress", "[<instrument>|all] on|off")?,
                )),
                [target, toggle] => Ok(Command::SuppressShort(
                    parse_target(&[*target], state, "suppress", "[<instrument>|all] on|off")?,
                    parse_toggle(toggle, "suppress", "[<instrument>|all] on|off")?,
                )),
                _ => Err(usage("suppress", "[<instrument>|all] on|off")),
            },
            "size" => match args {
                [instrument, "reset"] => {
                    Ok(Command::Size(resolve(instrument, state)?, SizeUpdate::Reset))
                }
                [instrument, notional] => {
                    let instrument = resolve(instrument, state)?;
                    let notional = Decimal::from_str(notional)
                        .ok()
                        .filter(|notional| notional > &Decimal::ZERO)
                        .ok_or_else(|| CommandError::InvalidNotional((*notional).to_owned()))?;
                    Ok(Command::Size(instrument, SizeUpdate::Set(notional)))
                }
                _ => Err(usage("size", "<instrument> <notional>|reset")),
            },
            "status" if args.is_empty() => Ok(Command::Status),
            "status" => Err(usage("status", "no arguments")),
            "help" | "start" => Ok(Command::Help),
            unknown => Err(CommandError::Unknown(unknown.to_owned())),
        }
    }
}

fn usage(command: &'static str, expected: &'static str) -> CommandError {
    CommandError::Usage { command, expected }
}

fn resolve(alias: &str, state: &EngineState) -> Result<InstrumentName, CommandError> {
    state
        .resolve(alias)
        .cloned()
        .ok_or_else(|| CommandError::UnknownInstrument(alias.to_owned()))
}

fn parse_target(
    args: &[&str],
    state: &EngineState,
    command: &'static str,
    expected: &'static str,
) -> Result<CommandTarget, CommandError> {
    match args {
        [] | ["all"] => Ok(CommandTarget::All),
        [instrument] => resolve(instrument, state).map(CommandTarget::One),
        _ => Err(usage(command, expected)),
    }
}

fn parse_toggle(
    toggle: &str,
    command: &'static str,
    expected: &'static str,
) -> Result<bool, CommandError> {
    match toggle {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(usage(command, expected)),
    }
}

/// Render one status line per instrument.
pub fn format_status(states: &[InstrumentState]) -> String {
    states
        .iter()
        .map(|state| {
            let notional = match state.notional_override {
                Some(notional) => format!("{notional} (override)"),
                None => state.notional.to_string(),
            };
            let entry = state
                .entry_price
                .map(|price| price.to_string())
                .unwrap_or_else(|| "-".to_owned());

            format!(
                "{} | side={} | trading={:?} | long_only={} | suppress_short={} | entry={} | partial_added={} | notional={}",
                state.instrument,
                state.side,
                state.trading,
                state.long_only,
                state.suppress_short,
                entry,
                state.added_partial_once,
                notional
            )
        })
        .join("\n")
}

impl<Observer, Execution, Journal> Engine<Observer, Execution, Journal>
where
    Observer: MarketObserver + Sync,
    Execution: ExecutionClient + Sync,
    Journal: TradeJournal + Sync,
{
    /// Parse and execute operator text, returning the reply for the operator.
    ///
    /// Malformed commands return a [`CommandError`] and mutate nothing.
    pub async fn execute_command(&self, text: &str) -> Result<String, CommandError> {
        let command = Command::parse(text, &self.state)?;
        info!(?command, "Engine executing operator command");
        self.execute(command).await
    }

    /// Execute a parsed [`Command`]. Each mutation happens under the instrument lock.
    pub async fn execute(&self, command: Command) -> Result<String, CommandError> {
        match command {
            Command::Enable(target) => {
                let mut lines = Vec::new();
                for instrument in self.targets(&target) {
                    let mut state = self.lock(&instrument).await?;
                    let audit = state.trading.update(&instrument, TradingState::Enabled);
                    let report = self.process(&mut state).await;
                    let change = if audit.transitioned_to_enabled() {
                        "enabled"
                    } else {
                        "already enabled"
                    };
                    lines.push(format!("{instrument} trading {change}\n  {report}"));
                }
                Ok(lines.join("\n"))
            }
            Command::Disable(target) => {
                let mut lines = Vec::new();
                for instrument in self.targets(&target) {
                    let mut state = self.lock(&instrument).await?;
                    let audit = state.trading.update(&instrument, TradingState::Disabled);
                    let change = if audit.prev == TradingState::Disabled {
                        "already disabled"
                    } else {
                        "disabled"
                    };
                    lines.push(format!("{instrument} trading {change}"));
                }
                Ok(lines.join("\n"))
            }
            Command::LongOnly(instrument, long_only) => {
                let mut state = self.lock(&instrument).await?;
                state.long_only = long_only;
                info!(%instrument, long_only, "InstrumentState set long-only");

                let reply = format!("{instrument} long-only {}", on_off(long_only));
                if long_only && state.side == PositionSide::Short {
                    let report = self.process(&mut state).await;
                    Ok(format!("{reply}\n  {report}"))
                } else {
                    Ok(reply)
                }
            }
            Command::SuppressShort(target, suppress) => {
                let mut lines = Vec::new();
                for instrument in self.targets(&target) {
                    let mut state = self.lock(&instrument).await?;
                    state.suppress_short = suppress;
                    info!(%instrument, suppress, "InstrumentState set suppress-short");
                    lines.push(format!("{instrument} suppress-short {}", on_off(suppress)));
                }
                Ok(lines.join("\n"))
            }
            Command::Size(instrument, update) => {
                let notional_override = match update {
                    SizeUpdate::Set(notional) => {
                        let bounds = self.config.notional_bounds;
                        if !bounds.contains(notional) {
                            return Err(CommandError::NotionalOutOfBounds {
                                value: notional,
                                min: bounds.min,
                                max: bounds.max,
                            });
                        }
                        Some(notional)
                    }
                    SizeUpdate::Reset => None,
                };

                let mut state = self.lock(&instrument).await?;
                state.notional_override = notional_override;
                info!(%instrument, ?notional_override, "InstrumentState set notional override");
                Ok(format!(
                    "{instrument} notional {}",
                    state.effective_notional()
                ))
            }
            Command::Status => Ok(format_status(&self.state.snapshot().await)),
            Command::Help => Ok(HELP.to_owned()),
        }
    }

    fn targets(&self, target: &CommandTarget) -> Vec<InstrumentName> {
        match target {
            CommandTarget::All => self.state.instruments().cloned().collect(),
            CommandTarget::One(instrument) => vec![instrument.clone()],
        }
    }

    async fn lock(
        &self,
        instrument: &InstrumentName,
    ) -> Result<MutexGuard<'_, InstrumentState>, CommandError> {
        match self.state.instrument(instrument) {
            Ok(state) => Ok(state.lock().await),
            Err(_) => Err(CommandError::UnknownInstrument(instrument.to_string())),
        }
    }
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}
