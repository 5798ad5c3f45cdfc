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

//! # Trendline-Integration
//! Low-level framework for the signed HTTP communication Trendline needs with exchanges.
//!
//! ## Core abstractions:
//! - **RestRequest** describing a single Http resource, its query parameters and body.
//! - **RestClient** executing [`RestRequest`](protocol::http::rest::RestRequest)s with a
//!   configurable build strategy (public, or signed via a
//!   [`RequestSigner`](protocol::http::private::RequestSigner)) and an API specific
//!   [`HttpParser`](protocol::http::HttpParser).

/// All [`Error`](std::error::Error)s generated in Trendline-Integration.
pub mod error;

/// Http protocol: [`RestRequest`](protocol::http::rest::RestRequest), the
/// [`RestClient`](protocol::http::rest::client::RestClient), and request signing.
pub mod protocol;

/// Determines if something is considered "unrecoverable", such as an unrecoverable error.
///
/// Note that the meaning of [`Unrecoverable`] may vary depending on the context.
pub trait Unrecoverable {
    fn is_unrecoverable(&self) -> bool;
}
