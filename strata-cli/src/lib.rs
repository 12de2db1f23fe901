//! Strata CLI library.
//!
//! The binary in `main.rs` is a thin wrapper around these modules so the
//! command implementations stay testable.

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;
