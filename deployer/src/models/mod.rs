//! Data models

pub mod card;
pub mod status;
