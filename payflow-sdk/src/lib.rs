//! SDK for the payment processor API consumed by payflow.
//!
//! * [`objects`] — request/response bodies for invoices, transfers, events,
//!   public keys and webhook subscriptions.
//! * [`signature`] — ECDSA (secp256k1 / SHA-256) signing and verification
//!   used for request authentication and the `Digital-Signature` header.
//! * `client` (feature `client`) — a typed HTTP client.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(unsafe_code)]

#[cfg(feature = "client")]
pub mod client;
pub mod objects;
pub mod signature;
