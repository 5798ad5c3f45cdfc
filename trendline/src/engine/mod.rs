use crate::{
    engine::{
        command::NotionalBounds,
        market::MarketObserver,
        report::{InstrumentReport, TickReport},
        signal::{PriceSources, SignalConfig, SignalEvaluator},
        state::EngineState,
    },
    error::EngineError,
    journal::TradeJournal,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use trendline_execution::{client::ExecutionClient, instrument::InstrumentName};

/// Operator [`Command`](command::Command) parsing and execution.
pub mod command;

/// Position state machine transitions of one instrument.
pub mod machine;

/// [`MarketView`](market::MarketView) of an instrument and the
/// [`MarketObserver`](market::MarketObserver) producing it.
pub mod market;

/// Alignment of local position belief with the exchange position snapshot.
pub mod reconcile;

/// Structured tick, instrument and reconciliation reports.
pub mod report;

/// [`SignalEvaluator`](signal::SignalEvaluator) and its configuration.
pub mod signal;

/// Per instrument [`InstrumentState`](state::InstrumentState) table.
pub mod state;

/// Decision policy configuration of the [`Engine`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct EngineConfig {
    pub signal: SignalConfig,
    pub prices: PriceSources,
    pub notional_bounds: NotionalBounds,
    /// Fraction of the effective notional sent by the partial add.
    pub partial_add_fraction: Decimal,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            signal: SignalConfig::default(),
            prices: PriceSources::default(),
            notional_bounds: NotionalBounds::default(),
            partial_add_fraction: Decimal::new(5, 1),
        }
    }
}

/// Position controller driving every configured instrument through the position state machine.
///
/// All mutation of an [`InstrumentState`](state::InstrumentState) happens while its lock is held,
/// including the collaborator calls of a transition.
#[derive(Debug)]
pub struct Engine<Observer, Execution, Journal> {
    pub config: EngineConfig,
    pub state: EngineState,
    pub observer: Observer,
    pub execution: Execution,
    pub journal: Journal,
    evaluator: SignalEvaluator,
}

impl<Observer, Execution, Journal> Engine<Observer, Execution, Journal>
where
    Observer: MarketObserver + Sync,
    Execution: ExecutionClient + Sync,
    Journal: TradeJournal + Sync,
{
    pub fn new(
        config: EngineConfig,
        state: EngineState,
        observer: Observer,
        execution: Execution,
        journal: Journal,
    ) -> Self {
        Self {
            evaluator: SignalEvaluator::new(config.signal),
            config,
            state,
            observer,
            execution,
            journal,
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Run one decision tick, processing every instrument sequentially in configuration order.
    ///
    /// Per instrument errors are captured in the [`TickReport`] and never abort the tick.
    pub async fn run_tick(&self) -> TickReport {
        let time = Utc::now();
        let mut instruments = Vec::with_capacity(self.state.instruments().count());

        for instrument in self.state.instruments() {
            match self.evaluate(instrument).await {
                Ok(report) => instruments.push(report),
                Err(error) => {
                    let mut report =
                        InstrumentReport::new(instrument.clone(), Default::default());
                    report.error = Some(error);
                    instruments.push(report);
                }
            }
        }

        let report = TickReport { time, instruments };
        info!(
            instruments = report.instruments.len(),
            errors = report.errors().count(),
            "Engine completed tick"
        );
        report
    }

    /// Evaluate one instrument out-of-cycle, holding its lock for the whole transition.
    pub async fn evaluate(
        &self,
        instrument: &InstrumentName,
    ) -> Result<InstrumentReport, EngineError> {
        let mut state = self.state.instrument(instrument)?.lock().await;
        Ok(self.process(&mut state).await)
    }
}
