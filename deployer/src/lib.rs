//! DateBuddy Deployment Orchestrator
//!
//! Core modules for tracking a remote build-and-deploy job from
//! submission to a terminal result.

pub mod cache;
pub mod config;
pub mod deploy;
pub mod errors;
pub mod http;
pub mod logs;
pub mod mapping;
pub mod models;
pub mod notify;
pub mod services;
