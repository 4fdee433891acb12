//! Sink implementations
//!
//! Contains LogSink, FileSink, NetworkSink, and NopSink.

mod file;
mod log;
mod network;
mod nop;

pub use self::file::{FileSink, FileSinkConfig};
pub use self::log::LogSink;
pub use self::network::{NetworkFormat, NetworkSink, NetworkSinkConfig};
pub use self::nop::NopSink;
