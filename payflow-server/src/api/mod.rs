//! HTTP handlers.
//!
//! - `POST /webhook` – accept a processor callback and queue it
//! - `GET  /health`  – liveness and host resources
//! - `GET  /`        – status dashboard

pub mod dashboard;
pub mod health;
pub mod webhook;
