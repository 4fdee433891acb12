//! Service orchestration module.

mod input;
mod orchestrator;
mod stats;

pub use orchestrator::{MessageSource, Pipeline, PipelineConfig};
pub use stats::{PipelineStats, StopReason};
