use crate::{
    engine::{
        Engine,
        market::MarketObserver,
        report::{ReconciliationReport, SideChange},
        state::{InstrumentState, PositionSide},
    },
    error::{EngineError, ReconciliationError},
    journal::TradeJournal,
};
use chrono::Utc;
use itertools::Itertools;
use std::time::Duration;
use tracing::{error, info, warn};
use trendline_execution::{
    client::{ExecutionClient, PositionSnapshot},
    instrument::{Direction, InstrumentName},
};

/// Overwrite the position belief of one instrument with the exchange position snapshot.
///
/// Zero size legs are ignored. A Flat or Short result clears `entry_price` and
/// `added_partial_once`. A Long that was already believed Long keeps both; a newly discovered
/// Long has no known entry price, so its partial add can not fire until the engine itself
/// reopens the position.
pub fn apply_snapshot(
    state: &mut InstrumentState,
    positions: &[PositionSnapshot],
) -> Result<SideChange, ReconciliationError> {
    let current = match reported_directions(&state.instrument, positions).as_slice() {
        [] => PositionSide::Flat,
        [direction] => PositionSide::from(*direction),
        _ => {
            return Err(ReconciliationError::ConflictingDirections(
                state.instrument.clone(),
            ));
        }
    };

    let change = SideChange {
        previous: state.side,
        current,
    };

    match current {
        PositionSide::Long if change.previous == PositionSide::Long => {}
        PositionSide::Long => {
            state.entry_price = None;
            state.added_partial_once = false;
            warn!(
                instrument = %state.instrument,
                previous = %change.previous,
                "Reconciliation discovered Long position with unknown entry price, partial add disabled until reopened"
            );
        }
        PositionSide::Flat | PositionSide::Short => {
            state.entry_price = None;
            state.added_partial_once = false;
        }
    }
    state.side = current;

    if change.changed() {
        info!(
            instrument = %state.instrument,
            previous = %change.previous,
            current = %change.current,
            "Reconciliation corrected position belief"
        );
    }

    Ok(change)
}

impl<Observer, Execution, Journal> Engine<Observer, Execution, Journal>
where
    Observer: MarketObserver + Sync,
    Execution: ExecutionClient + Sync,
    Journal: TradeJournal + Sync,
{
    /// Align every instrument with the exchange position snapshot.
    ///
    /// Every instrument lock is held, acquired in configuration order, from before the snapshot
    /// fetch until every belief is overwritten. If the snapshot is unavailable the previous
    /// belief is kept.
    pub async fn reconcile(&self) -> Result<ReconciliationReport, EngineError> {
        self.reconcile_all().await.map_err(EngineError::from)
    }

    /// Startup reconciliation, retried with a fixed delay. Exhausting every attempt is
    /// unrecoverable, there is no safe default position belief to start from.
    pub async fn startup_reconcile(
        &self,
        attempts: u32,
        delay: Duration,
    ) -> Result<ReconciliationReport, EngineError> {
        let attempts = attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.reconcile_all().await {
                Ok(report) => return Ok(report),
                Err(error) if attempt < attempts => {
                    warn!(
                        attempt,
                        attempts,
                        %error,
                        ?delay,
                        "Startup reconciliation failed, retrying"
                    );
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                }
                Err(error) => {
                    error!(attempts, %error, "Startup reconciliation failed, giving up");
                    return Err(EngineError::StartupReconciliation { attempts, error });
                }
            }
        }
    }

    async fn reconcile_all(&self) -> Result<ReconciliationReport, ReconciliationError> {
        let mut guards = self.state.lock_all().await;
        let instruments = guards
            .iter()
            .map(|state| state.instrument.clone())
            .collect::<Vec<InstrumentName>>();

        let positions = self
            .execution
            .fetch_positions(&instruments)
            .await
            .map_err(ReconciliationError::SnapshotUnavailable)?;

        let instruments = guards
            .iter_mut()
            .map(|state| {
                let result = apply_snapshot(state, &positions).map_err(EngineError::from);
                if let Err(error) = &result {
                    warn!(
                        instrument = %state.instrument,
                        %error,
                        "Reconciliation kept previous belief"
                    );
                }
                (state.instrument.clone(), result)
            })
            .collect::<Vec<_>>();

        info!(
            instruments = instruments.len(),
            positions = positions.len(),
            "Reconciliation completed"
        );

        Ok(ReconciliationReport {
            time: Utc::now(),
            instruments,
        })
    }

    /// Resynchronise a single instrument whose lock is already held by the caller.
    pub(crate) async fn resync(
        &self,
        state: &mut InstrumentState,
    ) -> Result<SideChange, EngineError> {
        let positions = self
            .execution
            .fetch_positions(std::slice::from_ref(&state.instrument))
            .await
            .map_err(ReconciliationError::SnapshotUnavailable)?;

        apply_snapshot(state, &positions).map_err(EngineError::from)
    }
}

/// Distinct directions of the non-zero legs reported for an instrument.
pub fn reported_directions(
    instrument: &InstrumentName,
    positions: &[PositionSnapshot],
) -> Vec<Direction> {
    positions
        .iter()
        .filter(|position| &position.instrument == instrument && !position.size.is_zero())
        .map(|position| position.direction)
        .unique()
        .collect()
}
