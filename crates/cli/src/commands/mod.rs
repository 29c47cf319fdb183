//! Command implementations.

mod resolve;
mod run;
mod validate;

pub use resolve::run_resolve;
pub use run::run_pipeline;
pub use validate::run_validate;
