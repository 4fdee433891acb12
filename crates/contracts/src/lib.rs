//! # Contracts
//!
//! Frozen interface contracts shared by every messaging crate.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Priority model
//! - `MsgPriority::Urgent` (ordinal 0) is the most urgent level
//! - `MsgPriority::SLOWEST` is the least urgent level
//! - a dispatcher owns one FIFO queue per level

mod config;
mod error;
mod message;
mod sink;
mod stats;

pub use config::*;
pub use error::*;
pub use message::*;
pub use sink::*;
pub use stats::*;
