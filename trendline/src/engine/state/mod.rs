use self::trading::TradingState;
use crate::error::EngineError;
use derive_more::Display;
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use trendline_execution::instrument::{Direction, InstrumentName};

/// [`TradingState`] of an instrument, gating new exposure.
pub mod trading;

/// Local belief about the position held on an instrument.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Default,
    Deserialize,
    Serialize,
    Display,
)]
pub enum PositionSide {
    #[default]
    Flat,
    Long,
    Short,
}

impl From<Option<Direction>> for PositionSide {
    fn from(value: Option<Direction>) -> Self {
        match value {
            None => PositionSide::Flat,
            Some(Direction::Long) => PositionSide::Long,
            Some(Direction::Short) => PositionSide::Short,
        }
    }
}

impl From<Direction> for PositionSide {
    fn from(value: Direction) -> Self {
        Self::from(Some(value))
    }
}

/// Position belief and operator overrides of one configured instrument.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct InstrumentState {
    pub instrument: InstrumentName,
    pub side: PositionSide,
    pub trading: TradingState,
    /// Blocks new short entries after a short take-profit, until price recovers above the trend
    /// average or an operator clears it.
    pub suppress_short: bool,
    /// Never hold a short: short entries are blocked and open shorts are force closed.
    pub long_only: bool,
    /// Price a Long was opened at by this engine.
    pub entry_price: Option<Decimal>,
    /// Guards the single partial add of a Long lifecycle.
    pub added_partial_once: bool,
    /// Configured baseline notional of a full position.
    pub notional: Decimal,
    pub notional_override: Option<Decimal>,
}

impl InstrumentState {
    /// Construct a new Flat, trading disabled [`InstrumentState`].
    pub fn new(instrument: InstrumentName, notional: Decimal) -> Self {
        Self {
            instrument,
            side: PositionSide::Flat,
            trading: TradingState::Disabled,
            suppress_short: false,
            long_only: false,
            entry_price: None,
            added_partial_once: false,
            notional,
            notional_override: None,
        }
    }

    pub fn with_long_only(self, long_only: bool) -> Self {
        Self { long_only, ..self }
    }

    /// Notional of a full position: the operator override if set, otherwise the baseline.
    pub fn effective_notional(&self) -> Decimal {
        self.notional_override.unwrap_or(self.notional)
    }

    /// Commit an opened position.
    pub fn commit_open(&mut self, direction: Direction, price: Decimal) {
        self.side = PositionSide::from(direction);
        self.added_partial_once = false;
        self.entry_price = match direction {
            Direction::Long => Some(price),
            Direction::Short => None,
        };
    }

    /// Commit a closed position. Leaves `suppress_short` untouched.
    pub fn commit_close(&mut self) {
        self.side = PositionSide::Flat;
        self.entry_price = None;
        self.added_partial_once = false;
    }
}

/// Table of [`InstrumentState`]s addressed by [`InstrumentName`], each behind its own lock.
///
/// Iteration follows configuration order. Only full reconciliation holds more than one lock,
/// always acquired in that order.
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    instruments: IndexMap<InstrumentName, Arc<Mutex<InstrumentState>>>,
}

impl EngineState {
    pub fn new<States>(states: States) -> Self
    where
        States: IntoIterator<Item = InstrumentState>,
    {
        Self {
            instruments: states
                .into_iter()
                .map(|state| (state.instrument.clone(), Arc::new(Mutex::new(state))))
                .collect(),
        }
    }

    /// Configured instruments, in configuration order.
    pub fn instruments(&self) -> impl Iterator<Item = &InstrumentName> {
        self.instruments.keys()
    }

    pub fn contains(&self, instrument: &InstrumentName) -> bool {
        self.instruments.contains_key(instrument)
    }

    /// Lookup the lock guarding an instrument's state.
    pub fn instrument(
        &self,
        instrument: &InstrumentName,
    ) -> Result<&Arc<Mutex<InstrumentState>>, EngineError> {
        self.instruments
            .get(instrument)
            .ok_or_else(|| EngineError::UnknownInstrument(instrument.clone()))
    }

    /// Resolve an operator alias (full name or base asset, any case) to a configured instrument.
    pub fn resolve(&self, alias: &str) -> Option<&InstrumentName> {
        self.instruments
            .keys()
            .find(|instrument| instrument.matches_alias(alias))
    }

    /// Acquire every instrument lock, in configuration order.
    pub async fn lock_all(&self) -> Vec<OwnedMutexGuard<InstrumentState>> {
        let mut guards = Vec::with_capacity(self.instruments.len());
        for state in self.instruments.values() {
            guards.push(Arc::clone(state).lock_owned().await);
        }
        guards
    }

    /// Copy of every [`InstrumentState`], taking each lock in turn.
    pub async fn snapshot(&self) -> Vec<InstrumentState> {
        let mut states = Vec::with_capacity(self.instruments.len());
        for state in self.instruments.values() {
            states.push(state.lock().await.clone());
        }
        states
    }
}
