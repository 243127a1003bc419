//! pricewatch — scheduled marketplace price estimation
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod cli;
pub mod config;
pub mod types;
pub mod estimator;
pub mod sources;
pub mod engine;
pub mod storage;
