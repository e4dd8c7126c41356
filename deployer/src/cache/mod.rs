//! Session-scoped caches

pub mod status;
