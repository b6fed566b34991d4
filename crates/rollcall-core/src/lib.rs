//! # Rollcall Core
//!
//! Core error definitions, result aliases and telemetry setup shared by
//! every Rollcall crate.

pub mod error;
pub mod result;
pub mod telemetry;

pub use error::*;
pub use result::*;

// Re-export shaku for dependency injection
pub use shaku::{module, HasComponent, Interface};
