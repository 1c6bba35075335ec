//! Lead intake for a loan brokerage.
//!
//! The crate exposes the static product catalog, the application intake pipeline (validation,
//! document uploads, persistence, admin review), and adapters for the managed backend that
//! stores application rows and uploaded documents.

pub mod backend;
pub mod catalog;
pub mod config;
pub mod error;
pub mod intake;
pub mod telemetry;
