//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the sink runtime.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Data model
//! - [`Record`]: immutable key/value unit handed over by the broker collaborator
//! - [`FieldTree`]: decoded view of a record half, addressed by schema field number
//! - [`Sink`]: the two extension points (`prepare` / `execute`) every backend implements
//! - [`Instrumentation`]: narrow telemetry reporting capability

mod config;
mod error;
mod field;
mod instrumentation;
mod mode;
mod record;
mod schema;
mod sink;

pub use config::*;
pub use error::*;
pub use field::{FieldTree, FieldValue};
pub use instrumentation::Instrumentation;
pub use mode::ResolutionMode;
pub use record::Record;
pub use schema::SchemaProvider;
pub use sink::Sink;
