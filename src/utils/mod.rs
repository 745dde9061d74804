//! Utility module

mod error;
mod span;

pub use error::{CompilerError, ErrorCategory, Result};
pub use span::Span;
