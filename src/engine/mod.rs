//! Evaluation engine for Sentinel Gateway.
//!
//! This module contains the policy evaluation pipeline:
//! - Status Resolver: Finds which modules are up, locally or remotely
//! - Enablement Gate: Administrator on/off switch per module
//! - Rule Matcher: Applies stored pattern rules
//! - Classifier Client: Calls remote classification modules
//! - Decision Aggregator: Folds verdicts into one decision
//! - Policy Orchestrator: Runs all of the above per prompt

mod aggregator;
mod classifier;
mod gate;
mod matcher;
mod orchestrator;
mod status;
mod supervisor;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregator::*;
pub use classifier::*;
pub use gate::*;
pub use matcher::*;
pub use orchestrator::*;
pub use status::*;
pub use supervisor::*;
pub use transport::*;
