use serde::{Deserialize, Serialize};
use tracing::info;
use trendline_execution::instrument::InstrumentName;

/// Whether an instrument may take on new exposure (entries and partial adds).
///
/// Exits are never gated, so disabling trading can not strand an open position.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Default, Deserialize, Serialize,
)]
pub enum TradingState {
    Enabled,
    #[default]
    Disabled,
}

impl TradingState {
    pub fn is_enabled(&self) -> bool {
        matches!(self, TradingState::Enabled)
    }

    pub fn update(
        &mut self,
        instrument: &InstrumentName,
        update: TradingState,
    ) -> TradingStateUpdateAudit {
        let prev = *self;
        match (prev, update) {
            (TradingState::Disabled, TradingState::Enabled) => {
                info!(%instrument, "InstrumentState setting TradingState::Enabled")
            }
            (TradingState::Enabled, TradingState::Disabled) => {
                info!(%instrument, "InstrumentState setting TradingState::Disabled")
            }
            (_, update) => info!(
                %instrument,
                ?update,
                "InstrumentState set TradingState, although it was already in that state"
            ),
        }

        *self = update;

        TradingStateUpdateAudit {
            prev,
            current: update,
        }
    }
}

/// Audit record of a [`TradingState`] update, containing the previous and current state.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct TradingStateUpdateAudit {
    pub prev: TradingState,
    pub current: TradingState,
}

impl TradingStateUpdateAudit {
    /// Returns true only if the previous state was not `Enabled`, and the new state is.
    pub fn transitioned_to_enabled(&self) -> bool {
        self.current == TradingState::Enabled && self.prev != TradingState::Enabled
    }
}
