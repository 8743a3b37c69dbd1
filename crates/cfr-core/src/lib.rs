//! # cfr-core
//! Shared types, campaign constants and collaborator traits for the
//! Cosmos fundraiser tool.

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;
