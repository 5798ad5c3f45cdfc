use crate::{
    config::ScheduleConfig,
    engine::{Engine, market::MarketObserver, report::ReconciliationReport},
    error::EngineError,
    journal::TradeJournal,
    notify::Notifier,
};
use std::{future::Future, sync::Arc, time::Duration};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tracing::{error, info, warn};
use trendline_execution::client::ExecutionClient;

/// Capacity of the operator command channel.
pub const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Runs an [`Engine`] as three concurrent tokio tasks: the decision tick, the reconciliation
/// timer and the operator command loop.
#[derive(Debug)]
pub struct System<Observer, Execution, Journal, Notify> {
    pub engine: Arc<Engine<Observer, Execution, Journal>>,
    pub notifier: Arc<Notify>,
    pub schedule: ScheduleConfig,
}

impl<Observer, Execution, Journal, Notify> System<Observer, Execution, Journal, Notify>
where
    Observer: MarketObserver + Send + Sync + 'static,
    Execution: ExecutionClient + Send + Sync + 'static,
    Journal: TradeJournal + Send + Sync + 'static,
    Notify: Notifier + Send + Sync + 'static,
{
    pub fn new(
        engine: Engine<Observer, Execution, Journal>,
        notifier: Notify,
        schedule: ScheduleConfig,
    ) -> Self {
        Self {
            engine: Arc::new(engine),
            notifier: Arc::new(notifier),
            schedule,
        }
    }

    /// Resolve the initial position belief of every instrument. Fails if every attempt fails.
    pub async fn start(&self) -> Result<ReconciliationReport, EngineError> {
        let report = self
            .engine
            .startup_reconcile(
                self.schedule.startup_attempts,
                self.schedule.startup_retry_delay(),
            )
            .await?;

        info!(%report, "System startup reconciliation complete");
        self.notifier
            .notify(&format!("Trendline started\n{report}"))
            .await;

        Ok(report)
    }

    /// Run startup reconciliation, then every task until `shutdown` resolves.
    pub async fn run<Shutdown>(
        self,
        commands: mpsc::Receiver<String>,
        shutdown: Shutdown,
    ) -> Result<(), EngineError>
    where
        Shutdown: Future<Output = ()>,
    {
        self.start().await?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handles = [
            self.spawn_tick_loop(shutdown_rx.clone()),
            self.spawn_reconciliation_loop(shutdown_rx.clone()),
            self.spawn_command_loop(commands, shutdown_rx),
        ];

        shutdown.await;
        info!("System shutting down");
        let _ = shutdown_tx.send(true);

        for handle in handles {
            if let Err(error) = handle.await {
                error!(%error, "System task panicked");
            }
        }

        self.notifier.notify("Trendline stopped").await;
        Ok(())
    }

    fn spawn_tick_loop(&self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let engine = Arc::clone(&self.engine);
        let notifier = Arc::clone(&self.notifier);
        let interval = self.schedule.tick_interval();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = engine.run_tick().await;
                        for (instrument, error) in report.errors() {
                            warn!(%instrument, %error, "Tick failed for instrument");
                        }
                        notifier.notify(&report.to_string()).await;
                    }
                    _ = shutdown.changed() => break,
                }
            }
        })
    }

    fn spawn_reconciliation_loop(&self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let engine = Arc::clone(&self.engine);
        let notifier = Arc::clone(&self.notifier);
        let interval = self.schedule.reconciliation_interval();

        tokio::spawn(async move {
            // Startup reconciliation already ran
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => match engine.reconcile().await {
                        Ok(report) => {
                            if report.instruments.iter().any(|(_, outcome)| {
                                outcome.as_ref().map_or(true, |change| change.changed())
                            }) {
                                notifier.notify(&report.to_string()).await;
                            }
                        }
                        Err(error) => {
                            warn!(
                                %error,
                                "Reconciliation failed, keeping previous position belief"
                            );
                            notifier.notify(&format!("Reconciliation failed: {error}")).await;
                        }
                    },
                    _ = shutdown.changed() => break,
                }
            }
        })
    }

    fn spawn_command_loop(
        &self,
        mut commands: mpsc::Receiver<String>,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let engine = Arc::clone(&self.engine);
        let notifier = Arc::clone(&self.notifier);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    command = commands.recv() => {
                        let Some(command) = command else {
                            info!("Command channel closed");
                            break;
                        };
                        let reply = match engine.execute_command(&command).await {
                            Ok(reply) => reply,
                            Err(error) => error.to_string(),
                        };
                        notifier.notify(&reply).await;
                    }
                    _ = shutdown.changed() => break,
                }
            }
        })
    }
}

/// Forward every non-empty stdin line to the command channel until stdin closes.
pub fn spawn_stdin_commands(commands: mpsc::Sender<String>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => {
                    if commands.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(error) => {
                    warn!(%error, "Failed to read command from stdin");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    })
}
