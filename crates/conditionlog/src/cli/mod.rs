//! Command handlers.

pub mod config;
pub mod ingest;
pub mod inspect;
