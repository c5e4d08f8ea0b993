//! procdeck - a terminal menu that supervises workers running in their own
//! processes.
//!
//! The binary plays two roles: started plainly it shows the menu and
//! supervises workers; started as `procdeck worker <entry>` it hosts one
//! worker entry point for a supervising parent.

pub mod cli;
pub mod factory;
pub mod logging;
pub mod tui;
pub mod workers;

pub use procdeck_core::*;
