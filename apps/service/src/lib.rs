//! Vigil monitoring engine.
//!
//! Probes HTTP endpoints on their own schedules, tracks consecutive failures
//! and notifies Discord/Slack webhooks when a monitor goes down or recovers.

pub mod config;
pub mod database;
pub mod monitoring;
pub mod notifications;
pub mod orchestrator;
pub mod pool;
pub mod validation;

#[cfg(test)]
mod test_support;
