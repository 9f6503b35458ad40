//! HTTP request handlers.
//!
//! - [`validation`]: recipe JSON validation (`POST /validate-json`)
//! - [`traces`]: generation trace logging (`POST /log-trace`)
//! - [`health`]: telemetry backend readiness (`GET /health`)
//!
//! Handlers return [`crate::errors::Error`], which converts to the
//! appropriate status code and a plain-text message.

pub mod health;
pub mod traces;
pub mod validation;
