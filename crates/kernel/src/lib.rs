//! Ledgerline Kernel Library
//!
//! Filtered, sorted and paginated listings over relational data, rebuilt
//! into nested JSON aggregates from a single joined query.
//! The main entry point for running the server is the `ledgerline` binary.

pub mod config;
pub mod db;
pub mod denorm;
pub mod error;
pub mod query;
pub mod resources;
pub mod response;
pub mod routes;
pub mod state;
pub mod update;
