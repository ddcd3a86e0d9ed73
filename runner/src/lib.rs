//! Command-line runner for futsim.
//!
//! Reads a TOML config and CSV input tables, simulates every configured
//! portfolio, appends the daily records to JSONL stores, and evaluates
//! the stored NAV series.

pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod run;
