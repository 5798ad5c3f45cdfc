use chrono::DateTime;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::{num::NonZeroUsize, time::Duration};
use tokio::sync::mpsc;
use trendline::{
    config::ScheduleConfig,
    engine::{Engine, EngineConfig, market::MarketDataObserver, state::EngineState},
    error::EngineError,
    journal::InMemoryTradeJournal,
    system::System,
};
use trendline_execution::client::mock::MockExchange;
use trendline_ta::{bar::PriceBar, snapshot::IndicatorConfig};
use util::{BTC, RecordingNotifier, ScriptedObserver, UnavailableExchange, enabled, instrument};

mod util;

fn schedule() -> ScheduleConfig {
    ScheduleConfig {
        tick_interval_secs: 3600,
        reconciliation_interval_secs: 3600,
        startup_attempts: 2,
        startup_retry_delay_secs: 0,
    }
}

fn bars(closes: &[Decimal]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(index, close)| {
            PriceBar::new(
                DateTime::from_timestamp(index as i64 * 14_400, 0).unwrap(),
                *close + dec!(1),
                *close - dec!(1),
                *close,
            )
        })
        .collect()
}

#[tokio::test]
async fn test_system_runs_tick_and_commands_until_shutdown() {
    let exchange = MockExchange::new();
    exchange.set_bars(
        &instrument(BTC),
        bars(&[dec!(100), dec!(100), dec!(100), dec!(100), dec!(100)]),
    );

    let indicators = IndicatorConfig::new(
        NonZeroUsize::new(3).unwrap(),
        NonZeroUsize::new(2).unwrap(),
    );
    let engine = Engine::new(
        EngineConfig::default(),
        EngineState::new([enabled(BTC)]),
        MarketDataObserver::new(exchange.clone(), indicators, 5),
        exchange.clone(),
        InMemoryTradeJournal::default(),
    );

    let notifier = RecordingNotifier::default();
    let (command_tx, command_rx) = mpsc::channel(8);
    command_tx.send("status".to_string()).await.unwrap();

    System::new(engine, notifier.clone(), schedule())
        .run(command_rx, tokio::time::sleep(Duration::from_millis(300)))
        .await
        .unwrap();

    let messages = notifier.messages();
    assert!(messages[0].starts_with("Trendline started"));
    assert!(messages.iter().any(|message| message.starts_with("Tick")));
    assert!(
        messages
            .iter()
            .any(|message| message.starts_with("BTC-USDT-SWAP | side=Flat"))
    );
    assert_eq!(messages.last().map(String::as_str), Some("Trendline stopped"));
    assert_eq!(exchange.fetch_bars_calls(), 1);
    assert!(exchange.orders().is_empty());
}

#[tokio::test]
async fn test_system_startup_fails_when_positions_unavailable() {
    let engine = Engine::new(
        EngineConfig::default(),
        EngineState::new([enabled(BTC)]),
        ScriptedObserver::default(),
        UnavailableExchange::default(),
        InMemoryTradeJournal::default(),
    );
    let notifier = RecordingNotifier::default();
    let (_command_tx, command_rx) = mpsc::channel(8);

    let actual = System::new(engine, notifier.clone(), schedule())
        .run(command_rx, std::future::pending())
        .await;

    assert!(matches!(
        actual,
        Err(EngineError::StartupReconciliation { attempts: 2, .. })
    ));
    assert!(notifier.messages().is_empty());
}
