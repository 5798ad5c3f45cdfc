use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use derive_more::{Constructor, Display};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::warn;
use trendline_execution::instrument::{Direction, InstrumentName};

/// Kind of trade recorded in the [`TradeJournal`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize, Display)]
pub enum TradeKind {
    #[display("OPEN_LONG")]
    OpenLong,
    #[display("OPEN_SHORT")]
    OpenShort,
    #[display("ADD_LONG")]
    AddLong,
    #[display("CLOSE_LONG")]
    CloseLong,
    #[display("CLOSE_SHORT")]
    CloseShort,
}

impl TradeKind {
    pub fn open(direction: Direction) -> Self {
        match direction {
            Direction::Long => TradeKind::OpenLong,
            Direction::Short => TradeKind::OpenShort,
        }
    }

    pub fn close(direction: Direction) -> Self {
        match direction {
            Direction::Long => TradeKind::CloseLong,
            Direction::Short => TradeKind::CloseShort,
        }
    }
}

/// Human-auditable record of one committed trade.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
pub struct TradeRecord {
    pub time: DateTime<Utc>,
    pub instrument: InstrumentName,
    pub kind: TradeKind,
    pub price: Decimal,
    pub reason: String,
}

impl Display for TradeRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} - {} {} @ {} USDT - {}",
            self.time.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.instrument,
            self.kind,
            self.price,
            self.reason
        )
    }
}

/// Summary of one closed position leg.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
pub struct CloseSummary {
    pub time: DateTime<Utc>,
    pub instrument: InstrumentName,
    pub direction: Direction,
    pub entry_price: Option<Decimal>,
    pub exit_price: Decimal,
    pub quantity: Decimal,
    pub pnl: Decimal,
    pub reason: String,
}

impl Display for CloseSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} - {} {} | entry=",
            self.time.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.instrument,
            self.direction
        )?;
        match self.entry_price {
            Some(entry) => write!(f, "{entry:.4}")?,
            None => write!(f, "n/a")?,
        }
        write!(
            f,
            " | exit={:.4} | qty={} | pnl={:.2} USDT | {}",
            self.exit_price, self.quantity, self.pnl, self.reason
        )
    }
}

/// Best-effort persistence of trade records. Failures are logged and never escalated.
pub trait TradeJournal {
    fn record_trade(&self, record: &TradeRecord);

    fn record_close(&self, summary: &CloseSummary);
}

/// [`TradeJournal`] appending to monthly text files:
/// * `trades_<instrument>_<YYYY>_<M>.txt` for every trade.
/// * `trades_summary_<YYYY>_<M>.txt` for every closed leg.
#[derive(Debug, Clone)]
pub struct FileTradeJournal {
    directory: PathBuf,
}

impl FileTradeJournal {
    pub fn new<P>(directory: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self {
            directory: directory.into(),
        }
    }

    pub fn trade_path(&self, instrument: &InstrumentName, time: DateTime<Utc>) -> PathBuf {
        self.directory.join(format!(
            "trades_{instrument}_{}_{}.txt",
            time.year(),
            time.month()
        ))
    }

    pub fn summary_path(&self, time: DateTime<Utc>) -> PathBuf {
        self.directory
            .join(format!("trades_summary_{}_{}.txt", time.year(), time.month()))
    }

    // Blocking write on the runtime thread, records are a single short line per order.
    fn append(&self, path: &Path, line: &str) {
        let result = std::fs::create_dir_all(&self.directory).and_then(|_| {
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            writeln!(file, "{line}")
        });

        if let Err(error) = result {
            warn!(path = %path.display(), %error, "FileTradeJournal failed to append record");
        }
    }
}

impl TradeJournal for FileTradeJournal {
    fn record_trade(&self, record: &TradeRecord) {
        self.append(
            &self.trade_path(&record.instrument, record.time),
            &record.to_string(),
        )
    }

    fn record_close(&self, summary: &CloseSummary) {
        self.append(&self.summary_path(summary.time), &summary.to_string())
    }
}

/// [`TradeJournal`] keeping records in memory, useful for tests and paper runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTradeJournal {
    trades: Arc<Mutex<Vec<TradeRecord>>>,
    closes: Arc<Mutex<Vec<CloseSummary>>>,
}

impl InMemoryTradeJournal {
    pub fn trades(&self) -> Vec<TradeRecord> {
        self.trades.lock().clone()
    }

    pub fn closes(&self) -> Vec<CloseSummary> {
        self.closes.lock().clone()
    }
}

impl TradeJournal for InMemoryTradeJournal {
    fn record_trade(&self, record: &TradeRecord) {
        self.trades.lock().push(record.clone())
    }

    fn record_close(&self, summary: &CloseSummary) {
        self.closes.lock().push(summary.clone())
    }
}
