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
#![allow(clippy::type_complexity)]

//! # Trendline
//! Trend following position controller for leveraged crypto perpetual swaps.
//!
//! On a fixed cadence the [`Engine`](engine::Engine) pulls recent price history for each
//! configured instrument, derives a trend average and volatility measure, and decides whether to
//! open, hold, reverse, or close a position. Local position belief is kept truthful against the
//! exchange by explicit reconciliation.
//!
//! ## Overview
//! * **Signal Evaluator**: normalises the distance between price and trend average in volatility
//!   units and recommends an action.
//! * **Position State Machine**: per instrument Flat / Long / Short transitions, gated by the
//!   operator overrides (trading enabled, long-only, suppress-short) and the partial add rule.
//! * **Reconciliation**: overwrites local position belief with the exchange position snapshot,
//!   at startup, on a timer, and after every failed order side effect.
//! * **Commands**: operator text commands mutating the per-instrument overrides.
//! * **System**: tokio tasks driving the decision tick, reconciliation timer and command loop.

/// [`SystemConfig`](config::SystemConfig) loaded from JSON, and credentials from the environment.
pub mod config;

/// Position controller [`Engine`](engine::Engine): state table, signal evaluation, position
/// state machine, reconciliation and command interpretation.
pub mod engine;

/// Top level [`EngineError`](error::EngineError).
pub mod error;

/// Best-effort human-auditable [`TradeJournal`](journal::TradeJournal).
pub mod journal;

/// Provides default Trendline Tracing logging initialisers.
pub mod logging;

/// Best-effort [`Notifier`](notify::Notifier) sinks for reports and command responses.
pub mod notify;

/// Tokio [`System`](system::System) runner driving the engine.
pub mod system;
