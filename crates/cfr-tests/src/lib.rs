//! Integration tests for the Cosmos fundraiser tool.
//!
//! The tests in `tests/` drive the offline commands, the interactive
//! contribution flow and the wallet lifecycle against real wallet files
//! and the in-memory collaborators in [`helpers`].

pub mod helpers;
