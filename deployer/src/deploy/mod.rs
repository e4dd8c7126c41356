//! Deployment job lifecycle

pub mod channel;
pub mod classify;
pub mod job;
pub mod orchestrator;
pub mod poller;
