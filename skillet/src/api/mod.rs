//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for the three endpoints
//! - **[`models`]**: Request/response data structures
//!
//! All endpoints carry OpenAPI annotations via `utoipa`; the rendered docs
//! are served at `/docs`.

pub mod handlers;
pub mod models;
