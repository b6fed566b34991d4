//! # Rollcall Server Library
//!
//! Dependency injection wiring and the periodic keyspace monitor loop
//! behind the `rollcall-server` binary.

pub mod app;
pub mod di;
pub mod startup;
