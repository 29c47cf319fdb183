//! Pipeline orchestration module.

mod input;
mod orchestrator;
mod stats;

pub use input::{decode_base64, InputRecord};
pub use orchestrator::{Pipeline, PipelineConfig};
pub use stats::PipelineStats;
