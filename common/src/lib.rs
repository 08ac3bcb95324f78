//! Shared types for swanwatch.
//!
//! Everything that crosses a crate boundary lives here: the loaded [`config::Config`],
//! the tunnel data model and the error taxonomy.

pub mod config;
pub mod error;
pub mod tunnel;
