//! procdeck core - platform-independent worker supervision
//!
//! This crate provides the channel, stop signal, supervisor, registry and
//! cooperative scheduler shared by every frontend, plus the launcher traits
//! that platform crates implement to start workers in their own processes.

mod channel;
mod config;
mod display;
mod error;
mod local;
mod process;
mod registry;
mod scheduler;
mod stop;
mod supervisor;
pub mod wire;
mod worker;

pub use channel::*;
pub use config::*;
pub use display::*;
pub use error::*;
pub use local::*;
pub use process::*;
pub use registry::*;
pub use scheduler::*;
pub use stop::*;
pub use supervisor::*;
pub use worker::*;
