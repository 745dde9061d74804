//! Frontend module - Syntax tree, Environment, Semantic Analysis

pub mod ast;
pub mod declarations;
pub mod environment;
pub mod semantic;
