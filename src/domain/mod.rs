//! Domain types for Sentinel Gateway.
//!
//! This module contains the core business entities and value objects.

mod evaluation;
mod module;
mod prompt;
mod rule;

pub use evaluation::*;
pub use module::*;
pub use prompt::*;
pub use rule::*;
