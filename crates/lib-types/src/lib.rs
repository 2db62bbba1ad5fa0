//! # lib-types
//!
//! Core type definitions for FMI co-simulation.
//!
//! This crate provides the value types shared across the workspace:
//! - Status codes returned by slave calls
//! - Variable metadata and value references
//! - The model description attribute tree and its validated view
//! - History entries captured by the schedulers

pub mod error;
pub mod status;
pub mod variable;
pub mod description;
pub mod history;

pub use error::{TypeError, TypeResult};
pub use status::*;
pub use variable::*;
pub use description::*;
pub use history::*;
