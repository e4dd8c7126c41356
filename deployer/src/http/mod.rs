//! HTTP transport for the remote deployment service

pub mod client;
pub mod deploy_api;
