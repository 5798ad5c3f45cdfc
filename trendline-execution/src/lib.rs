#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]

//! # Trendline-Execution
//! Exchange facing collaborators of the Trendline position controller.
//!
//! The controller only ever talks to the outside world through two traits:
//! * [`MarketDataClient`](client::MarketDataClient) fetching ordered
//!   [`PriceBar`](trendline_ta::bar::PriceBar) history.
//! * [`ExecutionClient`](client::ExecutionClient) opening and closing positions, and reporting
//!   the authoritative exchange position snapshot.
//!
//! Two implementations are provided:
//! * [`OkxClient`](client::okx::OkxClient) for OKX USDT margined perpetual swaps.
//! * [`MockExchange`](client::mock::MockExchange), an in-memory exchange with scripted market
//!   data and failure injection, used for tests and paper runs.

/// All [`Error`](std::error::Error)s generated in Trendline-Execution.
pub mod error;

/// [`InstrumentName`](instrument::InstrumentName), position [`Direction`](instrument::Direction)
/// and contract sizing.
pub mod instrument;

/// [`MarketDataClient`](client::MarketDataClient) & [`ExecutionClient`](client::ExecutionClient)
/// collaborator interfaces and their implementations.
pub mod client;
