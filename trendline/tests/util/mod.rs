#![allow(dead_code)]

use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use trendline::{
    engine::{
        Engine, EngineConfig,
        market::{MarketObserver, MarketView},
        state::{EngineState, InstrumentState, trading::TradingState},
    },
    error::EngineError,
    journal::InMemoryTradeJournal,
    notify::Notifier,
};
use trendline_execution::{
    client::{
        ClosedLeg, ExecutionClient, OpenRequest, OrderAck, PositionSnapshot, mock::MockExchange,
    },
    error::{ClientError, ConnectivityError},
    instrument::InstrumentName,
};
use trendline_ta::snapshot::IndicatorSnapshot;

pub type TestEngine = Engine<ScriptedObserver, MockExchange, InMemoryTradeJournal>;

pub const BTC: &str = "BTC-USDT-SWAP";
pub const ETH: &str = "ETH-USDT-SWAP";

pub fn instrument(name: &str) -> InstrumentName {
    InstrumentName::from(name)
}

/// [`MarketView`] with a closed bar price and a live (forming bar) price.
pub fn view(
    trend_average: Decimal,
    volatility: Decimal,
    closed: Decimal,
    live: Decimal,
) -> MarketView {
    MarketView::new(IndicatorSnapshot::new(trend_average, volatility), closed, live)
}

/// [`MarketObserver`] replaying scripted [`MarketView`]s per instrument. The final scripted view
/// of an instrument is repeated once every earlier view has been consumed.
#[derive(Debug, Clone, Default)]
pub struct ScriptedObserver {
    views: Arc<Mutex<HashMap<InstrumentName, VecDeque<MarketView>>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedObserver {
    pub fn push(&self, name: &str, view: MarketView) {
        self.views
            .lock()
            .entry(instrument(name))
            .or_default()
            .push_back(view);
    }

    pub fn replace(&self, name: &str, view: MarketView) {
        self.views
            .lock()
            .insert(instrument(name), VecDeque::from([view]));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MarketObserver for ScriptedObserver {
    async fn observe(&self, instrument: &InstrumentName) -> Result<MarketView, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut views = self.views.lock();
        let script = views.get_mut(instrument).ok_or_else(|| {
            EngineError::MarketData(ClientError::DataUnavailable {
                instrument: instrument.clone(),
                requested: 1,
                received: 0,
            })
        })?;

        match script.len() {
            0 => Err(EngineError::MarketData(ClientError::DataUnavailable {
                instrument: instrument.clone(),
                requested: 1,
                received: 0,
            })),
            1 => Ok(script[0]),
            _ => Ok(script.pop_front().unwrap()),
        }
    }
}

pub fn engine(states: impl IntoIterator<Item = InstrumentState>) -> TestEngine {
    Engine::new(
        EngineConfig::default(),
        EngineState::new(states),
        ScriptedObserver::default(),
        MockExchange::new(),
        InMemoryTradeJournal::default(),
    )
}

/// Flat [`InstrumentState`] with trading enabled and a 7500 notional.
pub fn enabled(name: &str) -> InstrumentState {
    let mut state = InstrumentState::new(instrument(name), Decimal::new(7500, 0));
    state.trading = TradingState::Enabled;
    state
}

pub async fn state(engine: &TestEngine, name: &str) -> InstrumentState {
    engine
        .state()
        .instrument(&instrument(name))
        .unwrap()
        .lock()
        .await
        .clone()
}

pub async fn modify<F>(engine: &TestEngine, name: &str, modify: F)
where
    F: FnOnce(&mut InstrumentState),
{
    let mut state = engine
        .state()
        .instrument(&instrument(name))
        .unwrap()
        .lock()
        .await;
    modify(&mut *state)
}

/// [`ExecutionClient`] whose every request fails with a timeout.
#[derive(Debug, Clone, Default)]
pub struct UnavailableExchange {
    pub requests: Arc<AtomicUsize>,
}

impl UnavailableExchange {
    fn fail<T>(&self) -> Result<T, ClientError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Err(ClientError::Connectivity(ConnectivityError::Timeout))
    }
}

impl ExecutionClient for UnavailableExchange {
    async fn open_position(&self, _: OpenRequest) -> Result<OrderAck, ClientError> {
        self.fail()
    }

    async fn close_position(&self, _: &InstrumentName) -> Result<Vec<ClosedLeg>, ClientError> {
        self.fail()
    }

    async fn fetch_positions(
        &self,
        _: &[InstrumentName],
    ) -> Result<Vec<PositionSnapshot>, ClientError> {
        self.fail()
    }
}

/// [`Notifier`] recording every message.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    pub messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str) {
        self.messages.lock().push(message.to_owned())
    }
}
