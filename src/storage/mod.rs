//! Storage layer for Sentinel Gateway.
//!
//! Provides the rule store, module catalog and prompt history via SQLx with
//! SQLite.

mod models;
mod repository;

pub use repository::GatewayRepository;
