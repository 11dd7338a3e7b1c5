//! HTTP API layer for Sentinel Gateway.
//!
//! Provides REST endpoints for prompt evaluation, rule management and
//! module administration.

pub mod handlers;
mod routes;
mod types;

pub use routes::build_router;
