use rust_decimal_macros::dec;
use trendline::{
    engine::{
        report::{BlockReason, SideChange, TransitionAction},
        signal::ExitReason,
        state::{PositionSide, trading::TradingState},
    },
    error::EngineError,
    journal::TradeKind,
};
use trendline_execution::{
    client::{
        PositionSnapshot,
        mock::{MockOperation, MockOrderKind},
    },
    error::{ApiError, ClientError, ConnectivityError},
    instrument::Direction,
};
use util::{BTC, ETH, engine, enabled, instrument, modify, state, view};

mod util;

fn position(direction: Direction) -> PositionSnapshot {
    PositionSnapshot::new(instrument(BTC), direction, dec!(1), Some(dec!(100)), dec!(0))
}

#[tokio::test]
async fn test_entry_band_is_strict() {
    let engine = engine([enabled(BTC)]);

    // distance exactly -1.5 does not enter
    engine.observer.replace(BTC, view(dec!(100), dec!(2), dec!(97), dec!(97)));
    let report = engine.run_tick().await;

    assert_eq!(report.instruments[0].distance, Some(dec!(-1.5)));
    assert!(report.instruments[0].actions.is_empty());
    assert!(engine.execution.orders().is_empty());
    assert_eq!(state(&engine, BTC).await.side, PositionSide::Flat);

    // just beyond the band enters short
    engine.observer.replace(BTC, view(dec!(100), dec!(2), dec!(96.9), dec!(96.9)));
    let report = engine.run_tick().await;

    assert!(matches!(
        report.instruments[0].actions.as_slice(),
        [TransitionAction::Opened {
            direction: Direction::Short,
            ..
        }]
    ));
    let btc = state(&engine, BTC).await;
    assert_eq!(btc.side, PositionSide::Short);
    assert_eq!(btc.entry_price, None);
}

#[tokio::test]
async fn test_flat_to_long_uses_last_closed_price() {
    let engine = engine([enabled(BTC)]);
    engine.observer.replace(BTC, view(dec!(100), dec!(2), dec!(104), dec!(106)));

    let report = engine.run_tick().await;

    assert_eq!(
        report.instruments[0].actions,
        vec![TransitionAction::Opened {
            direction: Direction::Long,
            price: dec!(104),
            quantity: engine.execution.orders()[0].quantity,
            notional: dec!(7500),
        }]
    );
    assert_eq!(report.instruments[0].side_before, PositionSide::Flat);
    assert_eq!(report.instruments[0].side_after, PositionSide::Long);

    let btc = state(&engine, BTC).await;
    assert_eq!(btc.side, PositionSide::Long);
    assert_eq!(btc.entry_price, Some(dec!(104)));
    assert!(!btc.added_partial_once);

    let trades = engine.journal.trades();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].kind, TradeKind::OpenLong);
    assert_eq!(trades[0].price, dec!(104));
}

#[tokio::test]
async fn test_entry_uses_notional_override() {
    let engine = engine([enabled(BTC)]);
    modify(&engine, BTC, |state| state.notional_override = Some(dec!(1000))).await;
    engine.observer.replace(BTC, view(dec!(100), dec!(2), dec!(104), dec!(104)));

    let report = engine.run_tick().await;

    assert!(matches!(
        report.instruments[0].actions.as_slice(),
        [TransitionAction::Opened { notional, .. }] if *notional == dec!(1000)
    ));
}

#[tokio::test]
async fn test_entry_overrides_block_new_exposure() {
    struct TestCase {
        trading: TradingState,
        long_only: bool,
        suppress_short: bool,
        closed: rust_decimal::Decimal,
        expected: TransitionAction,
    }

    let tests = vec![
        TestCase {
            // TC0: trading disabled blocks long entry
            trading: TradingState::Disabled,
            long_only: false,
            suppress_short: false,
            closed: dec!(104),
            expected: TransitionAction::Blocked {
                direction: Direction::Long,
                reason: BlockReason::TradingDisabled,
            },
        },
        TestCase {
            // TC1: long-only blocks short entry
            trading: TradingState::Enabled,
            long_only: true,
            suppress_short: false,
            closed: dec!(96),
            expected: TransitionAction::Blocked {
                direction: Direction::Short,
                reason: BlockReason::LongOnly,
            },
        },
        TestCase {
            // TC2: suppress-short blocks short entry
            trading: TradingState::Enabled,
            long_only: false,
            suppress_short: true,
            closed: dec!(96),
            expected: TransitionAction::Blocked {
                direction: Direction::Short,
                reason: BlockReason::SuppressShort,
            },
        },
    ];

    for (index, test) in tests.into_iter().enumerate() {
        let engine = engine([enabled(BTC)]);
        modify(&engine, BTC, |state| {
            state.trading = test.trading;
            state.long_only = test.long_only;
            state.suppress_short = test.suppress_short;
        })
        .await;
        engine.observer.replace(BTC, view(dec!(100), dec!(2), test.closed, test.closed));

        let report = engine.run_tick().await;

        assert_eq!(report.instruments[0].actions, vec![test.expected], "TC{index} failed");
        assert!(engine.execution.orders().is_empty(), "TC{index} failed");
        assert_eq!(state(&engine, BTC).await.side, PositionSide::Flat, "TC{index} failed");
    }
}

#[tokio::test]
async fn test_partial_add_triggers_exactly_once() {
    let engine = engine([enabled(BTC)]);
    modify(&engine, BTC, |state| state.commit_open(Direction::Long, dec!(100))).await;
    engine.execution.set_position(position(Direction::Long));

    // entry 100 + 5 × volatility 2 = 110, live price 111 triggers
    engine.observer.replace(BTC, view(dec!(100), dec!(2), dec!(105), dec!(111)));
    let report = engine.run_tick().await;

    assert!(matches!(
        report.instruments[0].actions.as_slice(),
        [TransitionAction::PartialAdded { price, notional, .. }]
            if *price == dec!(111) && *notional == dec!(3750)
    ));
    let btc = state(&engine, BTC).await;
    assert!(btc.added_partial_once);
    assert_eq!(btc.side, PositionSide::Long);
    assert_eq!(btc.entry_price, Some(dec!(100)));

    // already added, live price 120 must not re-trigger
    engine.observer.replace(BTC, view(dec!(100), dec!(2), dec!(105), dec!(120)));
    let report = engine.run_tick().await;

    assert!(report.instruments[0].actions.is_empty());
    assert_eq!(engine.execution.orders().len(), 1);
    assert_eq!(engine.journal.trades()[0].kind, TradeKind::AddLong);
}

#[tokio::test]
async fn test_partial_add_requires_trading_enabled() {
    let engine = engine([enabled(BTC)]);
    modify(&engine, BTC, |state| {
        state.commit_open(Direction::Long, dec!(100));
        state.trading = TradingState::Disabled;
    })
    .await;
    engine.observer.replace(BTC, view(dec!(100), dec!(2), dec!(105), dec!(111)));

    let report = engine.run_tick().await;

    assert_eq!(
        report.instruments[0].actions,
        vec![TransitionAction::Blocked {
            direction: Direction::Long,
            reason: BlockReason::TradingDisabled,
        }]
    );
    assert!(!state(&engine, BTC).await.added_partial_once);
}

#[tokio::test]
async fn test_short_take_profit_then_no_short_reentry() {
    let engine = engine([enabled(BTC)]);
    modify(&engine, BTC, |state| state.commit_open(Direction::Short, dec!(110))).await;
    engine.execution.set_position(position(Direction::Short));

    // previous close 94 → distance -6, fresh price 101 for the re-evaluation
    engine.observer.push(BTC, view(dec!(100), dec!(1), dec!(94), dec!(94)));
    engine.observer.push(BTC, view(dec!(100), dec!(1), dec!(101), dec!(101)));
    let report = engine.run_tick().await;

    let btc_report = &report.instruments[0];
    assert_eq!(btc_report.distance, Some(dec!(-6)));
    assert_eq!(btc_report.reevaluation_distance, Some(dec!(1)));
    assert!(matches!(
        btc_report.actions.as_slice(),
        [TransitionAction::Closed {
            side: PositionSide::Short,
            reason: ExitReason::TakeProfit,
            ..
        }]
    ));
    assert_eq!(engine.observer.calls(), 2);

    let btc = state(&engine, BTC).await;
    assert_eq!(btc.side, PositionSide::Flat);
    assert!(btc.suppress_short);

    let closes = engine.journal.closes();
    assert_eq!(closes.len(), 1);
    assert_eq!(closes[0].direction, Direction::Short);
    assert_eq!(closes[0].reason, ExitReason::TakeProfit.to_string());

    // still below the trend average: short signal blocked by suppress-short
    engine.observer.replace(BTC, view(dec!(100), dec!(1), dec!(97), dec!(97)));
    let report = engine.run_tick().await;
    assert_eq!(
        report.instruments[0].actions,
        vec![TransitionAction::Blocked {
            direction: Direction::Short,
            reason: BlockReason::SuppressShort,
        }]
    );

    // recovery above the trend average clears suppress-short at tick start
    engine.observer.replace(BTC, view(dec!(100), dec!(1), dec!(101), dec!(101)));
    let report = engine.run_tick().await;
    assert_eq!(
        report.instruments[0].actions,
        vec![TransitionAction::SuppressShortCleared]
    );
    assert!(!state(&engine, BTC).await.suppress_short);
    assert_eq!(engine.execution.orders().len(), 1);
}

#[tokio::test]
async fn test_short_take_profit_reevaluation_permits_long_entry() {
    let engine = engine([enabled(BTC)]);
    modify(&engine, BTC, |state| state.commit_open(Direction::Short, dec!(110))).await;
    engine.execution.set_position(position(Direction::Short));

    engine.observer.push(BTC, view(dec!(100), dec!(1), dec!(94), dec!(94)));
    engine.observer.push(BTC, view(dec!(100), dec!(1), dec!(101), dec!(102)));
    let report = engine.run_tick().await;

    assert!(matches!(
        report.instruments[0].actions.as_slice(),
        [
            TransitionAction::Closed {
                reason: ExitReason::TakeProfit,
                ..
            },
            TransitionAction::Opened {
                direction: Direction::Long,
                ..
            }
        ]
    ));

    let btc = state(&engine, BTC).await;
    assert_eq!(btc.side, PositionSide::Long);
    assert_eq!(btc.entry_price, Some(dec!(102)));
    assert!(btc.suppress_short);

    let kinds = engine
        .execution
        .orders()
        .into_iter()
        .map(|order| (order.kind, order.direction))
        .collect::<Vec<_>>();
    assert_eq!(
        kinds,
        vec![
            (MockOrderKind::Close, Direction::Short),
            (MockOrderKind::Open, Direction::Long)
        ]
    );
}

#[tokio::test]
async fn test_only_take_profit_sets_suppress_short() {
    struct TestCase {
        side: Direction,
        long_only: bool,
        suppress_short: bool,
        closed: rust_decimal::Decimal,
        expected_reason: ExitReason,
    }

    let tests = vec![
        TestCase {
            // TC0: long-only override keeps suppress-short set
            side: Direction::Short,
            long_only: true,
            suppress_short: true,
            closed: dec!(99),
            expected_reason: ExitReason::LongOnly,
        },
        TestCase {
            // TC1: trend reversal leaves suppress-short unset
            side: Direction::Short,
            long_only: false,
            suppress_short: false,
            closed: dec!(101),
            expected_reason: ExitReason::TrendReversal,
        },
        TestCase {
            // TC2: long trend break keeps suppress-short set
            side: Direction::Long,
            long_only: false,
            suppress_short: true,
            closed: dec!(99),
            expected_reason: ExitReason::TrendBreak,
        },
    ];

    for (index, test) in tests.into_iter().enumerate() {
        let engine = engine([enabled(BTC)]);
        modify(&engine, BTC, |state| {
            state.commit_open(test.side, dec!(100));
            state.long_only = test.long_only;
            state.suppress_short = test.suppress_short;
        })
        .await;
        engine.execution.set_position(position(test.side));
        engine.observer.replace(BTC, view(dec!(100), dec!(2), test.closed, test.closed));

        let report = engine.run_tick().await;

        assert!(
            matches!(
                report.instruments[0].actions.first(),
                Some(TransitionAction::Closed { reason, .. }) if *reason == test.expected_reason
            ),
            "TC{index} failed"
        );
        let btc = state(&engine, BTC).await;
        assert_eq!(btc.side, PositionSide::Flat, "TC{index} failed");
        assert_eq!(btc.suppress_short, test.suppress_short, "TC{index} failed");
    }
}

#[tokio::test]
async fn test_long_trend_break_reverses_once_using_fresh_price() {
    let engine = engine([enabled(BTC)]);
    modify(&engine, BTC, |state| state.commit_open(Direction::Long, dec!(105))).await;
    engine.execution.set_position(position(Direction::Long));

    engine.observer.push(BTC, view(dec!(100), dec!(1), dec!(99), dec!(99)));
    engine.observer.push(BTC, view(dec!(100), dec!(1), dec!(98), dec!(97)));
    let report = engine.run_tick().await;

    assert_eq!(report.instruments[0].reevaluation_distance, Some(dec!(-3)));
    assert_eq!(report.instruments[0].orders(), 2);
    assert_eq!(engine.observer.calls(), 2);

    let btc = state(&engine, BTC).await;
    assert_eq!(btc.side, PositionSide::Short);
    assert_eq!(btc.entry_price, None);

    // the new short holds: no further orders on the next tick
    let report = engine.run_tick().await;
    assert!(report.instruments[0].actions.is_empty());
    assert_eq!(engine.execution.orders().len(), 2);
}

#[tokio::test]
async fn test_exit_is_not_gated_by_trading_state() {
    let engine = engine([enabled(BTC)]);
    modify(&engine, BTC, |state| {
        state.commit_open(Direction::Long, dec!(105));
        state.trading = TradingState::Disabled;
    })
    .await;
    engine.execution.set_position(position(Direction::Long));

    engine.observer.push(BTC, view(dec!(100), dec!(1), dec!(99), dec!(99)));
    engine.observer.push(BTC, view(dec!(100), dec!(1), dec!(97), dec!(97)));
    let report = engine.run_tick().await;

    assert!(matches!(
        report.instruments[0].actions.as_slice(),
        [
            TransitionAction::Closed {
                reason: ExitReason::TrendBreak,
                ..
            },
            TransitionAction::Blocked {
                direction: Direction::Short,
                reason: BlockReason::TradingDisabled,
            }
        ]
    ));
    assert_eq!(state(&engine, BTC).await.side, PositionSide::Flat);
    assert!(engine.execution.positions().is_empty());
}

#[tokio::test]
async fn test_run_tick_twice_is_idempotent() {
    let engine = engine([enabled(BTC)]);
    engine.observer.replace(BTC, view(dec!(100), dec!(2), dec!(104), dec!(104)));

    engine.run_tick().await;
    let committed = state(&engine, BTC).await;

    let report = engine.run_tick().await;

    assert!(report.instruments[0].actions.is_empty());
    assert_eq!(state(&engine, BTC).await, committed);
    assert_eq!(engine.execution.orders().len(), 1);
}

#[tokio::test]
async fn test_entry_price_defined_iff_long() {
    let engine = engine([enabled(BTC)]);
    let closes = [
        dec!(104),
        dec!(99),
        dec!(96),
        dec!(101),
        dec!(100),
        dec!(104),
        dec!(112),
        dec!(96),
    ];

    for (index, closed) in closes.into_iter().enumerate() {
        engine.observer.replace(BTC, view(dec!(100), dec!(2), closed, closed));
        engine.run_tick().await;

        let btc = state(&engine, BTC).await;
        assert_eq!(
            btc.entry_price.is_some(),
            btc.side == PositionSide::Long,
            "TC{index} failed"
        );
    }
}

#[tokio::test]
async fn test_failed_open_commits_nothing_and_resyncs() {
    let engine = engine([enabled(BTC)]);
    engine.observer.replace(BTC, view(dec!(100), dec!(2), dec!(104), dec!(104)));
    engine.execution.fail_next(
        MockOperation::Open,
        ClientError::Api(ApiError::OrderRejected("rejected".to_string())),
    );

    let report = engine.run_tick().await;

    let btc_report = &report.instruments[0];
    assert!(matches!(btc_report.error, Some(EngineError::Order(_))));
    assert_eq!(
        btc_report.resync,
        Some(Ok(SideChange {
            previous: PositionSide::Flat,
            current: PositionSide::Flat
        }))
    );
    assert!(btc_report.actions.is_empty());

    let btc = state(&engine, BTC).await;
    assert_eq!(btc.side, PositionSide::Flat);
    assert_eq!(btc.entry_price, None);
    assert!(engine.journal.trades().is_empty());
}

#[tokio::test]
async fn test_partially_applied_open_is_corrected_by_resync() {
    let engine = engine([enabled(BTC)]);
    engine.observer.replace(BTC, view(dec!(100), dec!(2), dec!(104), dec!(104)));
    engine.execution.fail_next_after_applying(
        MockOperation::Open,
        ClientError::Connectivity(ConnectivityError::Timeout),
    );

    let report = engine.run_tick().await;

    assert_eq!(report.instruments[0].side_after, PositionSide::Long);
    assert_eq!(
        report.instruments[0].resync,
        Some(Ok(SideChange {
            previous: PositionSide::Flat,
            current: PositionSide::Long
        }))
    );

    // exchange truth restored, entry price is unknown for a discovered position
    let btc = state(&engine, BTC).await;
    assert_eq!(btc.side, PositionSide::Long);
    assert_eq!(btc.entry_price, None);
}

#[tokio::test]
async fn test_failed_close_keeps_position_and_skips_reevaluation() {
    let engine = engine([enabled(BTC)]);
    modify(&engine, BTC, |state| state.commit_open(Direction::Long, dec!(105))).await;
    engine.execution.set_position(position(Direction::Long));
    engine.observer.replace(BTC, view(dec!(100), dec!(1), dec!(97), dec!(97)));
    engine.execution.fail_next(
        MockOperation::Close,
        ClientError::Connectivity(ConnectivityError::Timeout),
    );

    let report = engine.run_tick().await;

    assert!(matches!(report.instruments[0].error, Some(EngineError::Order(_))));
    assert_eq!(engine.observer.calls(), 1);

    let btc = state(&engine, BTC).await;
    assert_eq!(btc.side, PositionSide::Long);
    assert_eq!(btc.entry_price, Some(dec!(105)));
}

#[tokio::test]
async fn test_instrument_failure_does_not_abort_tick() {
    let engine = engine([enabled(BTC), enabled(ETH)]);
    engine.observer.replace(ETH, view(dec!(100), dec!(2), dec!(104), dec!(104)));

    let report = engine.run_tick().await;

    let errors = report.errors().collect::<Vec<_>>();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, &instrument(BTC));
    assert!(matches!(errors[0].1, EngineError::MarketData(_)));

    assert_eq!(report.instruments[1].side_after, PositionSide::Long);
    assert_eq!(state(&engine, BTC).await.side, PositionSide::Flat);
}
