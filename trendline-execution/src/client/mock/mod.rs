use crate::{
    client::{
        ClosedLeg, ExecutionClient, MarketDataClient, OpenRequest, OrderAck, PositionSnapshot,
        require_bars,
    },
    error::ClientError,
    instrument::{ContractSpec, Direction, InstrumentName},
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::format_smolstr;
use std::{collections::HashMap, sync::Arc};
use tracing::debug;
use trendline_ta::bar::PriceBar;

/// Operation of the [`MockExchange`] that a fault can be injected into.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum MockOperation {
    FetchBars,
    Open,
    Close,
    FetchPositions,
}

/// Order the [`MockExchange`] accepted.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct MockOrder {
    pub kind: MockOrderKind,
    pub instrument: InstrumentName,
    pub direction: Direction,
    pub quantity: Decimal,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub enum MockOrderKind {
    Open,
    Close,
}

#[derive(Debug, Clone)]
struct Fault {
    error: ClientError,
    applied: bool,
}

#[derive(Debug, Default)]
struct MockExchangeState {
    contract_specs: HashMap<InstrumentName, ContractSpec>,
    bars: HashMap<InstrumentName, Vec<PriceBar>>,
    positions: Vec<PositionSnapshot>,
    orders: Vec<MockOrder>,
    faults: HashMap<MockOperation, Fault>,
    fetch_bars_calls: usize,
    sequence: u64,
}

/// In-memory exchange with scripted market data, hedge mode positions and one-shot fault
/// injection.
///
/// Cheaply cloneable, all clones share the same exchange state.
#[derive(Debug, Clone, Default)]
pub struct MockExchange {
    state: Arc<Mutex<MockExchangeState>>,
}

impl MockExchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size orders with the provided [`ContractSpec`]s. Instruments without a spec are sized in
    /// base asset units.
    pub fn with_contract_specs<Specs>(self, specs: Specs) -> Self
    where
        Specs: IntoIterator<Item = (InstrumentName, ContractSpec)>,
    {
        self.state.lock().contract_specs.extend(specs);
        self
    }

    /// Replace the bar history of an instrument.
    pub fn set_bars(&self, instrument: &InstrumentName, bars: Vec<PriceBar>) {
        self.state.lock().bars.insert(instrument.clone(), bars);
    }

    /// Replace the close of the most recent (forming) bar of an instrument.
    pub fn set_live_price(&self, instrument: &InstrumentName, price: Decimal) {
        if let Some(bar) = self
            .state
            .lock()
            .bars
            .get_mut(instrument)
            .and_then(|bars| bars.last_mut())
        {
            bar.close = price;
            bar.high = bar.high.max(price);
            bar.low = bar.low.min(price);
        }
    }

    /// Set an open position leg directly, replacing any existing leg in the same direction.
    pub fn set_position(&self, position: PositionSnapshot) {
        let mut state = self.state.lock();
        state.positions.retain(|leg| {
            !(leg.instrument == position.instrument && leg.direction == position.direction)
        });
        state.positions.push(position);
    }

    /// Fail the next call of `operation` without applying it.
    pub fn fail_next(&self, operation: MockOperation, error: ClientError) {
        self.state.lock().faults.insert(
            operation,
            Fault {
                error,
                applied: false,
            },
        );
    }

    /// Apply the next call of `operation` on the exchange, but report it as failed.
    pub fn fail_next_after_applying(&self, operation: MockOperation, error: ClientError) {
        self.state.lock().faults.insert(
            operation,
            Fault {
                error,
                applied: true,
            },
        );
    }

    /// Every order accepted so far, oldest first.
    pub fn orders(&self) -> Vec<MockOrder> {
        self.state.lock().orders.clone()
    }

    /// Every open position leg.
    pub fn positions(&self) -> Vec<PositionSnapshot> {
        self.state.lock().positions.clone()
    }

    /// Number of [`MarketDataClient::fetch_bars`] calls received.
    pub fn fetch_bars_calls(&self) -> usize {
        self.state.lock().fetch_bars_calls
    }
}

impl MockExchangeState {
    fn take_fault(&mut self, operation: MockOperation) -> Option<Fault> {
        self.faults.remove(&operation)
    }

    fn next_order_id(&mut self) -> smol_str::SmolStr {
        self.sequence += 1;
        format_smolstr!("mock-{}", self.sequence)
    }

    fn last_price(&self, instrument: &InstrumentName) -> Option<Decimal> {
        self.bars
            .get(instrument)
            .and_then(|bars| bars.last())
            .map(|bar| bar.close)
    }

    fn open(&mut self, request: &OpenRequest) -> Result<OrderAck, ClientError> {
        let quantity = match self.contract_specs.get(&request.instrument) {
            Some(spec) => spec.contracts(request.notional, request.reference_price)?,
            None => request
                .notional
                .checked_div(request.reference_price)
                .filter(|quantity| quantity > &Decimal::ZERO)
                .ok_or_else(|| {
                    ClientError::Sizing(format!(
                        "cannot size {} at reference price {}",
                        request.notional, request.reference_price
                    ))
                })?
                .round_dp(8),
        };

        match self.positions.iter_mut().find(|leg| {
            leg.instrument == request.instrument && leg.direction == request.direction
        }) {
            Some(leg) => {
                let previous_price = leg.average_price.unwrap_or(request.reference_price);
                let total = leg.size + quantity;
                leg.average_price = Some(
                    (previous_price * leg.size + request.reference_price * quantity) / total,
                );
                leg.size = total;
            }
            None => self.positions.push(PositionSnapshot::new(
                request.instrument.clone(),
                request.direction,
                quantity,
                Some(request.reference_price),
                Decimal::ZERO,
            )),
        }

        self.orders.push(MockOrder {
            kind: MockOrderKind::Open,
            instrument: request.instrument.clone(),
            direction: request.direction,
            quantity,
        });

        Ok(OrderAck::new(
            request.instrument.clone(),
            request.direction,
            self.next_order_id(),
            quantity,
        ))
    }

    fn close(&mut self, instrument: &InstrumentName) -> Vec<ClosedLeg> {
        let exit_price = self.last_price(instrument);
        let (closing, remaining) = std::mem::take(&mut self.positions)
            .into_iter()
            .partition::<Vec<_>, _>(|leg| &leg.instrument == instrument && !leg.size.is_zero());
        self.positions = remaining;

        closing
            .into_iter()
            .map(|leg| {
                self.orders.push(MockOrder {
                    kind: MockOrderKind::Close,
                    instrument: leg.instrument.clone(),
                    direction: leg.direction,
                    quantity: leg.size,
                });

                let unrealised_pnl = match (leg.average_price, exit_price) {
                    (Some(entry), Some(exit)) => match leg.direction {
                        Direction::Long => (exit - entry) * leg.size,
                        Direction::Short => (entry - exit) * leg.size,
                    },
                    _ => leg.unrealised_pnl,
                };

                ClosedLeg::new(
                    leg.instrument,
                    leg.direction,
                    self.next_order_id(),
                    leg.size,
                    leg.average_price,
                    unrealised_pnl,
                )
            })
            .collect()
    }
}

impl MarketDataClient for MockExchange {
    async fn fetch_bars(
        &self,
        instrument: &InstrumentName,
        count: usize,
    ) -> Result<Vec<PriceBar>, ClientError> {
        let mut state = self.state.lock();
        state.fetch_bars_calls += 1;

        if let Some(fault) = state.take_fault(MockOperation::FetchBars) {
            return Err(fault.error);
        }

        let bars = state
            .bars
            .get(instrument)
            .cloned()
            .ok_or_else(|| ClientError::UnknownInstrument(instrument.clone()))?;

        require_bars(instrument, count, bars)
    }
}

impl ExecutionClient for MockExchange {
    async fn open_position(&self, request: OpenRequest) -> Result<OrderAck, ClientError> {
        let mut state = self.state.lock();

        match state.take_fault(MockOperation::Open) {
            Some(Fault {
                error,
                applied: true,
            }) => {
                state.open(&request)?;
                Err(error)
            }
            Some(Fault { error, .. }) => Err(error),
            None => {
                let ack = state.open(&request)?;
                debug!(
                    instrument = %ack.instrument,
                    direction = %ack.direction,
                    quantity = %ack.quantity,
                    "MockExchange opened position"
                );
                Ok(ack)
            }
        }
    }

    async fn close_position(
        &self,
        instrument: &InstrumentName,
    ) -> Result<Vec<ClosedLeg>, ClientError> {
        let mut state = self.state.lock();

        match state.take_fault(MockOperation::Close) {
            Some(Fault {
                error,
                applied: true,
            }) => {
                state.close(instrument);
                Err(error)
            }
            Some(Fault { error, .. }) => Err(error),
            None => {
                let closed = state.close(instrument);
                debug!(%instrument, legs = closed.len(), "MockExchange closed position");
                Ok(closed)
            }
        }
    }

    async fn fetch_positions(
        &self,
        instruments: &[InstrumentName],
    ) -> Result<Vec<PositionSnapshot>, ClientError> {
        let mut state = self.state.lock();

        if let Some(fault) = state.take_fault(MockOperation::FetchPositions) {
            return Err(fault.error);
        }

        Ok(state
            .positions
            .iter()
            .filter(|leg| instruments.contains(&leg.instrument))
            .cloned()
            .collect())
    }
}
