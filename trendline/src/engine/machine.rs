use crate::{
    engine::{
        Engine,
        market::MarketObserver,
        report::{BlockReason, InstrumentReport, TransitionAction},
        signal::{ExitReason, SignalAction, SignalDecision, SignalEvaluator},
        state::{InstrumentState, PositionSide},
    },
    error::EngineError,
    journal::{CloseSummary, TradeJournal, TradeKind, TradeRecord},
};
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{error, info, warn};
use trendline_execution::{
    client::{ExecutionClient, OpenRequest},
    error::ClientError,
    instrument::Direction,
};

impl<Observer, Execution, Journal> Engine<Observer, Execution, Journal>
where
    Observer: MarketObserver + Sync,
    Execution: ExecutionClient + Sync,
    Journal: TradeJournal + Sync,
{
    /// Process one instrument through the position state machine.
    ///
    /// At most one order-placing and one order-closing side effect are issued, except the
    /// close-then-reconsider sequence which re-evaluates exactly once.
    pub(crate) async fn process(&self, state: &mut InstrumentState) -> InstrumentReport {
        let mut report = InstrumentReport::new(state.instrument.clone(), state.side);

        if let Err(error) = self.transition(state, &mut report).await {
            warn!(
                instrument = %state.instrument,
                side = %state.side,
                %error,
                "Engine failed to process instrument"
            );
            report.error = Some(error);
        }

        report.side_after = state.side;
        report
    }

    async fn transition(
        &self,
        state: &mut InstrumentState,
        report: &mut InstrumentReport,
    ) -> Result<(), EngineError> {
        let view = self.observer.observe(&state.instrument).await?;
        let snapshot = view.snapshot;
        let price = view.price(self.config.prices.decision);

        report.snapshot = Some(snapshot);
        report.price = Some(price);
        report.distance = Some(SignalEvaluator::distance(&snapshot, price));

        if state.suppress_short && price > snapshot.trend_average {
            info!(instrument = %state.instrument, %price, "Engine clearing suppress-short");
            state.suppress_short = false;
            report.actions.push(TransitionAction::SuppressShortCleared);
        }

        match state.side {
            PositionSide::Flat => {
                let decision = self.evaluator.entry(&snapshot, price);
                match decision.action {
                    SignalAction::Enter(direction) => {
                        self.try_enter(state, direction, &decision, report).await
                    }
                    _ => Ok(()),
                }
            }
            PositionSide::Long => {
                let exit = self.evaluator.long_exit(&snapshot, price);
                if let SignalAction::Exit(reason) = exit.action {
                    self.exit(state, reason, price, report).await?;
                    return self.reevaluate(state, Direction::Short, report).await;
                }

                let decision = self.evaluator.partial_add(
                    &snapshot,
                    view.price(self.config.prices.partial_add),
                    state.entry_price,
                    state.added_partial_once,
                );
                match decision.action {
                    SignalAction::PartialAdd => self.partial_add(state, &decision, report).await,
                    _ => Ok(()),
                }
            }
            PositionSide::Short => {
                let reason = if state.long_only {
                    Some(ExitReason::LongOnly)
                } else {
                    match self.evaluator.short_exit(&snapshot, price).action {
                        SignalAction::Exit(reason) => Some(reason),
                        _ => None,
                    }
                };

                match reason {
                    Some(reason) => {
                        self.exit(state, reason, price, report).await?;
                        self.reevaluate(state, Direction::Long, report).await
                    }
                    None => Ok(()),
                }
            }
        }
    }

    /// Single bounded re-evaluation after a close: fetch fresh data and consider entering the
    /// provided direction only. Never recurses.
    async fn reevaluate(
        &self,
        state: &mut InstrumentState,
        direction: Direction,
        report: &mut InstrumentReport,
    ) -> Result<(), EngineError> {
        let view = self.observer.observe(&state.instrument).await?;
        let price = view.price(self.config.prices.reevaluation);
        let decision = self.evaluator.entry(&view.snapshot, price);
        report.reevaluation_distance = Some(decision.distance);

        match decision.action {
            SignalAction::Enter(signalled) if signalled == direction => {
                self.try_enter(state, direction, &decision, report).await
            }
            _ => Ok(()),
        }
    }

    /// Apply the entry overrides, then open the position if none blocks it.
    async fn try_enter(
        &self,
        state: &mut InstrumentState,
        direction: Direction,
        decision: &SignalDecision,
        report: &mut InstrumentReport,
    ) -> Result<(), EngineError> {
        let blocked = if !state.trading.is_enabled() {
            Some(BlockReason::TradingDisabled)
        } else if direction == Direction::Short && state.long_only {
            Some(BlockReason::LongOnly)
        } else if direction == Direction::Short && state.suppress_short {
            Some(BlockReason::SuppressShort)
        } else {
            None
        };

        if let Some(reason) = blocked {
            info!(
                instrument = %state.instrument,
                %direction,
                ?reason,
                distance = %decision.distance,
                "Engine entry signal blocked"
            );
            report
                .actions
                .push(TransitionAction::Blocked { direction, reason });
            return Ok(());
        }

        let notional = state.effective_notional();
        let request = OpenRequest::new(
            state.instrument.clone(),
            direction,
            decision.price,
            notional,
        );

        match self.execution.open_position(request).await {
            Ok(ack) => {
                state.commit_open(direction, decision.price);
                info!(
                    instrument = %state.instrument,
                    %direction,
                    price = %decision.price,
                    quantity = %ack.quantity,
                    order_id = %ack.order_id,
                    "Engine opened position"
                );
                self.journal.record_trade(&TradeRecord::new(
                    Utc::now(),
                    state.instrument.clone(),
                    TradeKind::open(direction),
                    decision.price,
                    decision.rationale.clone(),
                ));
                report.actions.push(TransitionAction::Opened {
                    direction,
                    price: decision.price,
                    quantity: ack.quantity,
                    notional,
                });
                Ok(())
            }
            Err(error) => self.order_failed(state, error, report).await,
        }
    }

    /// Add to an open Long once per lifecycle, at a fraction of the effective notional.
    async fn partial_add(
        &self,
        state: &mut InstrumentState,
        decision: &SignalDecision,
        report: &mut InstrumentReport,
    ) -> Result<(), EngineError> {
        if !state.trading.is_enabled() {
            report.actions.push(TransitionAction::Blocked {
                direction: Direction::Long,
                reason: BlockReason::TradingDisabled,
            });
            return Ok(());
        }

        let notional = state.effective_notional() * self.config.partial_add_fraction;
        let request = OpenRequest::new(
            state.instrument.clone(),
            Direction::Long,
            decision.price,
            notional,
        );

        match self.execution.open_position(request).await {
            Ok(ack) => {
                state.added_partial_once = true;
                info!(
                    instrument = %state.instrument,
                    price = %decision.price,
                    quantity = %ack.quantity,
                    "Engine added to long position"
                );
                self.journal.record_trade(&TradeRecord::new(
                    Utc::now(),
                    state.instrument.clone(),
                    TradeKind::AddLong,
                    decision.price,
                    decision.rationale.clone(),
                ));
                report.actions.push(TransitionAction::PartialAdded {
                    price: decision.price,
                    quantity: ack.quantity,
                    notional,
                });
                Ok(())
            }
            Err(error) => self.order_failed(state, error, report).await,
        }
    }

    /// Close every leg of the instrument. Only a take-profit sets suppress-short.
    async fn exit(
        &self,
        state: &mut InstrumentState,
        reason: ExitReason,
        price: Decimal,
        report: &mut InstrumentReport,
    ) -> Result<(), EngineError> {
        let side = state.side;
        let legs = match self.execution.close_position(&state.instrument).await {
            Ok(legs) => legs,
            Err(error) => return self.order_failed(state, error, report).await,
        };

        let time = Utc::now();
        let (quantity, pnl) = legs
            .iter()
            .fold((Decimal::ZERO, Decimal::ZERO), |(quantity, pnl), leg| {
                (quantity + leg.quantity, pnl + leg.unrealised_pnl)
            });

        for leg in &legs {
            self.journal.record_trade(&TradeRecord::new(
                time,
                state.instrument.clone(),
                TradeKind::close(leg.direction),
                price,
                reason.to_string(),
            ));
            self.journal.record_close(&CloseSummary::new(
                time,
                state.instrument.clone(),
                leg.direction,
                leg.average_price.or(state.entry_price),
                price,
                leg.quantity,
                leg.unrealised_pnl,
                reason.to_string(),
            ));
        }

        state.commit_close();
        if reason == ExitReason::TakeProfit {
            state.suppress_short = true;
        }

        info!(
            instrument = %state.instrument,
            %side,
            %reason,
            %price,
            %quantity,
            %pnl,
            suppress_short = state.suppress_short,
            "Engine closed position"
        );
        report.actions.push(TransitionAction::Closed {
            side,
            reason,
            price,
            quantity,
            pnl,
        });
        Ok(())
    }

    /// Failed order side effect: nothing is committed and the instrument is resynchronised
    /// against the exchange under the held lock.
    async fn order_failed(
        &self,
        state: &mut InstrumentState,
        error: ClientError,
        report: &mut InstrumentReport,
    ) -> Result<(), EngineError> {
        error!(
            instrument = %state.instrument,
            side = %state.side,
            %error,
            "Engine order side effect failed, resynchronising instrument"
        );
        report.resync = Some(self.resync(state).await);
        Err(EngineError::Order(error))
    }
}
