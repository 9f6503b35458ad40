//! API request and response data models.
//!
//! These structures define the public API contract. They are distinct from
//! the internal validation and aggregation types so the wire format can
//! evolve independently, and all are annotated with `utoipa` for the
//! generated API docs.

pub mod health;
pub mod traces;
pub mod validation;
