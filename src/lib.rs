//! Ember semantic front end
//!
//! Assigns a type to every expression of an Ember program, folds compile-time
//! constants exactly and rejects ill-typed code with precise diagnostics. The
//! parser supplies the tree, an earlier phase fills the [`Environment`], and the
//! target supplies a [`MemoryLayout`].

pub mod feedback;
pub mod frontend;
pub mod types;
pub mod utils;

pub use frontend::ast::{BinOp, Expr, Ident, TypeExpr, UnOp};
pub use frontend::environment::{Environment, ScopeId, Symbol};
pub use frontend::semantic::{CheckerOptions, ExprChecker};
pub use types::{MemoryLayout, Type};
pub use utils::{CompilerError, ErrorCategory, Result, Span};

/// Check one expression from the environment's current scope
pub fn check_expression(env: &Environment, layout: &dyn MemoryLayout, expr: &Expr) -> Result<Type> {
    ExprChecker::new(env, layout).check(expr)
}
