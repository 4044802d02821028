//! Shared types for the Garnet compiler: byte-offset spans, line lookup, and
//! the diagnostic record handed from the front end to its consumers.

pub mod error;
pub mod span;

pub use error::{Diagnostic, Severity};
pub use span::{LineIndex, Span};
