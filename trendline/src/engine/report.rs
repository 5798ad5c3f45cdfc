use crate::{
    engine::{signal::ExitReason, state::PositionSide},
    error::EngineError,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use trendline_execution::instrument::{Direction, InstrumentName};
use trendline_ta::snapshot::IndicatorSnapshot;

/// Side effect or policy outcome of one instrument evaluation.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub enum TransitionAction {
    Opened {
        direction: Direction,
        price: Decimal,
        quantity: Decimal,
        notional: Decimal,
    },
    PartialAdded {
        price: Decimal,
        quantity: Decimal,
        notional: Decimal,
    },
    Closed {
        side: PositionSide,
        reason: ExitReason,
        price: Decimal,
        quantity: Decimal,
        pnl: Decimal,
    },
    SuppressShortCleared,
    /// Entry (or partial add) signalled but blocked by an override.
    Blocked {
        direction: Direction,
        reason: BlockReason,
    },
}

/// Operator override that blocked new exposure.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum BlockReason {
    TradingDisabled,
    LongOnly,
    SuppressShort,
}

/// Outcome of aligning one instrument with the exchange snapshot.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct SideChange {
    pub previous: PositionSide,
    pub current: PositionSide,
}

impl SideChange {
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// Outcome of one instrument evaluation: every action taken plus any error.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct InstrumentReport {
    pub instrument: InstrumentName,
    pub side_before: PositionSide,
    pub side_after: PositionSide,
    pub snapshot: Option<IndicatorSnapshot>,
    pub price: Option<Decimal>,
    pub distance: Option<Decimal>,
    pub actions: Vec<TransitionAction>,
    /// Distance at the fresh price of the single re-evaluation after a close.
    pub reevaluation_distance: Option<Decimal>,
    /// Single instrument reconciliation after a failed order side effect.
    pub resync: Option<Result<SideChange, EngineError>>,
    pub error: Option<EngineError>,
}

impl InstrumentReport {
    pub fn new(instrument: InstrumentName, side: PositionSide) -> Self {
        Self {
            instrument,
            side_before: side,
            side_after: side,
            snapshot: None,
            price: None,
            distance: None,
            actions: Vec::new(),
            reevaluation_distance: None,
            resync: None,
            error: None,
        }
    }

    /// Number of orders sent to the exchange (opens, partial adds & closes).
    pub fn orders(&self) -> usize {
        self.actions
            .iter()
            .filter(|action| {
                matches!(
                    action,
                    TransitionAction::Opened { .. }
                        | TransitionAction::PartialAdded { .. }
                        | TransitionAction::Closed { .. }
                )
            })
            .count()
    }
}

/// Aggregated outcome of one decision tick.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct TickReport {
    pub time: DateTime<Utc>,
    pub instruments: Vec<InstrumentReport>,
}

impl TickReport {
    pub fn errors(&self) -> impl Iterator<Item = (&InstrumentName, &EngineError)> {
        self.instruments
            .iter()
            .filter_map(|report| report.error.as_ref().map(|error| (&report.instrument, error)))
    }
}

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct ReconciliationReport {
    pub time: DateTime<Utc>,
    pub instruments: Vec<(InstrumentName, Result<SideChange, EngineError>)>,
}

impl Display for InstrumentReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.instrument, self.side_after)?;

        if let (Some(price), Some(snapshot), Some(distance)) =
            (self.price, self.snapshot, self.distance)
        {
            write!(
                f,
                " | price={price} ema={:.4} atr={:.4} distance={distance:.2}",
                snapshot.trend_average, snapshot.volatility
            )?;
        }

        for action in &self.actions {
            match action {
                TransitionAction::Opened {
                    direction,
                    price,
                    quantity,
                    ..
                } => write!(f, " | opened {direction} {quantity} @ {price}")?,
                TransitionAction::PartialAdded {
                    price, quantity, ..
                } => write!(f, " | partial add {quantity} @ {price}")?,
                TransitionAction::Closed {
                    side,
                    reason,
                    price,
                    pnl,
                    ..
                } => write!(f, " | closed {side} @ {price} ({reason}) pnl={pnl:.2}")?,
                TransitionAction::SuppressShortCleared => write!(f, " | suppress-short cleared")?,
                TransitionAction::Blocked { direction, reason } => {
                    write!(f, " | {direction} entry blocked: {reason:?}")?
                }
            }
        }

        if let Some(error) = &self.error {
            write!(f, " | error: {error}")?;
        }

        Ok(())
    }
}

impl Display for TickReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tick {}", self.time.format("%Y-%m-%d %H:%M UTC"))?;
        for report in &self.instruments {
            write!(f, "\n{report}")?;
        }
        Ok(())
    }
}

impl Display for ReconciliationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Reconciliation {}", self.time.format("%Y-%m-%d %H:%M UTC"))?;
        for (instrument, outcome) in &self.instruments {
            match outcome {
                Ok(change) if change.changed() => write!(
                    f,
                    "\n{instrument} {} -> {}",
                    change.previous, change.current
                )?,
                Ok(change) => write!(f, "\n{instrument} {}", change.current)?,
                Err(error) => write!(f, "\n{instrument} error: {error}")?,
            }
        }
        Ok(())
    }
}
