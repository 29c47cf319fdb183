//! # Resolver
//!
//! Field-template resolution for templated sink destinations.
//!
//! A template is a printf-style literal followed by one schema field number
//! per directive:
//!
//! ```text
//! http://dummyurl.com/%s/%.2f,1,16
//! ```
//!
//! Directives pair with indices positionally; each index addresses a field
//! by its schema number in the decoded key or value of a record.
//!
//! # Example
//!
//! ```ignore
//! use resolver::FieldTemplateResolver;
//!
//! let resolver = FieldTemplateResolver::new(schema, "sink.test.TestMessage");
//! let url = resolver.resolve(&record, "http://dummyurl.com/%s,1", ResolutionMode::Message)?;
//! ```

mod error;
mod format;
mod resolver;
mod template;

pub use error::ResolveError;
pub use format::{Conversion, Flags, FormatSpec, TypeClass};
pub use resolver::FieldTemplateResolver;
pub use template::Template;
