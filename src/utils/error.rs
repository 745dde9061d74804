//! Error handling for the Ember front end
//!
//! Every diagnostic names the rendered type(s), operator or identifier at
//! fault and carries the span of the offending node. A single error aborts
//! the enclosing check.

use crate::utils::Span;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, CompilerError>;

/// Broad classification of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Incompatible operands, conversion or assignment
    TypeMismatch,
    /// A compile-time constant outside its target's exact range
    Overflow,
    /// Unknown identifier, member or nominal type
    UnresolvedReference,
    /// Wrong argument or template-parameter count
    ArityMismatch,
    /// Generic symbol used without the application it requires
    GenericMisuse,
    /// A resource limit of the checker itself
    Limit,
}

/// Compiler error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompilerError {
    // ==================== Type Mismatch ====================

    #[error("binary operator `{op}` cannot be applied to operands of types `{left}` and `{right}`")]
    InvalidBinaryOperands {
        op: String,
        left: String,
        right: String,
        span: Span,
    },

    #[error("binary operator `{op}` cannot be applied to two boolean operands of types `{left}` and `{right}`")]
    InvalidBooleanOperands {
        op: String,
        left: String,
        right: String,
        span: Span,
    },

    #[error("unary operator `{op}` cannot be applied to an operand of type `{operand}`")]
    InvalidUnaryOperand {
        op: String,
        operand: String,
        span: Span,
    },

    #[error("cannot assign value of type `{from}` to type `{to}`")]
    IncompatibleAssignment { from: String, to: String, span: Span },

    #[error("cannot convert value of type `{from}` to type `{to}`")]
    InvalidCast { from: String, to: String, span: Span },

    #[error("cannot extract `{to}` from union type `{union}`")]
    InvalidUnionCast { union: String, to: String, span: Span },

    #[error("inappropriate use of a function type `{ty}` as a value; take the function's address instead")]
    FunctionAsValue { ty: String, span: Span },

    #[error("cannot assign to a value of immutable type `{ty}`")]
    AssignToImmutable { ty: String, span: Span },

    #[error("expression of type `{ty}` is not assignable")]
    NotAssignable { ty: String, span: Span },

    #[error("cannot take the address of an expression of type `{ty}`")]
    NotAddressable { ty: String, span: Span },

    #[error("cannot call value of non-function type `{ty}`")]
    NotCallable { ty: String, span: Span },

    #[error("cannot subscript a value of type `{receiver}` with an argument of type `{index}`")]
    NotSubscriptable {
        receiver: String,
        index: String,
        span: Span,
    },

    #[error("type `{ty}` is not a struct and cannot be initialized with named members")]
    NotAStruct { ty: String, span: Span },

    #[error("member `{member}` of `{ty}` is initialized more than once")]
    DuplicateInitializer {
        ty: String,
        member: String,
        span: Span,
    },

    #[error("`{ty}` names a type, not a value")]
    TypeUsedAsValue { ty: String, span: Span },

    #[error("array literal of type `{ty}` expects {expected} elements, got {got}")]
    ArrayLiteralCount {
        ty: String,
        expected: usize,
        got: usize,
        span: Span,
    },

    // ==================== Overflow ====================

    #[error("integer constant `{value}` overflows when stored into `{target}`")]
    ConstantOutOfRange {
        value: i64,
        target: String,
        span: Span,
    },

    #[error("constant expression `{left} {op} {right}` overflows")]
    ConstantFoldOverflow {
        op: String,
        left: i64,
        right: i64,
        span: Span,
    },

    #[error("constant expression `{left} {op} {right}` divides by zero")]
    DivisionByZero {
        op: String,
        left: i64,
        right: i64,
        span: Span,
    },

    #[error("array index `{index}` is always out of bounds for `{ty}`")]
    IndexOutOfBounds { index: i64, ty: String, span: Span },

    // ==================== Unresolved Reference ====================

    #[error("use of unresolved identifier: `{name}`")]
    UnresolvedIdentifier { name: String, span: Span },

    #[error("use of undeclared type `{name}`")]
    UnresolvedType { name: String, span: Span },

    #[error("value of type `{ty}` has no member `{member}`")]
    NoSuchMember {
        ty: String,
        member: String,
        span: Span,
    },

    #[error("`{name}` is already defined in this scope")]
    DuplicateDefinition { name: String, span: Span },

    // ==================== Arity Mismatch ====================

    #[error("incorrect number of arguments in call to `{callee}`: expected {expected}, got {got}")]
    ArgumentCountMismatch {
        callee: String,
        expected: usize,
        got: usize,
        span: Span,
    },

    #[error("incorrect number of type arguments in `{application}`: expected {expected}, got {got}")]
    TemplateArityMismatch {
        application: String,
        expected: usize,
        got: usize,
        span: Span,
    },

    // ==================== Generic Misuse ====================

    #[error("cannot instantiate generic `{name}` without type arguments")]
    GenericNotApplied { name: String, span: Span },

    #[error("unable to infer type argument `{param}` of generic function `{name}`")]
    CannotInferTypeArgument {
        name: String,
        param: String,
        span: Span,
    },

    #[error("`{ty}` is not generic and cannot be applied to type arguments")]
    NotGeneric { ty: String, span: Span },

    #[error("`{application}` contains itself and cannot be instantiated")]
    RecursiveInstantiation { application: String, span: Span },

    // ==================== Limits ====================

    #[error("expression nesting exceeds the maximum depth of {limit}")]
    NestingTooDeep { limit: usize, span: Span },
}

impl CompilerError {
    /// Get the span associated with this error
    pub fn span(&self) -> Span {
        match self {
            Self::InvalidBinaryOperands { span, .. }
            | Self::InvalidBooleanOperands { span, .. }
            | Self::InvalidUnaryOperand { span, .. }
            | Self::IncompatibleAssignment { span, .. }
            | Self::InvalidCast { span, .. }
            | Self::InvalidUnionCast { span, .. }
            | Self::FunctionAsValue { span, .. }
            | Self::AssignToImmutable { span, .. }
            | Self::NotAssignable { span, .. }
            | Self::NotAddressable { span, .. }
            | Self::NotCallable { span, .. }
            | Self::NotSubscriptable { span, .. }
            | Self::NotAStruct { span, .. }
            | Self::DuplicateInitializer { span, .. }
            | Self::TypeUsedAsValue { span, .. }
            | Self::ArrayLiteralCount { span, .. }
            | Self::ConstantOutOfRange { span, .. }
            | Self::ConstantFoldOverflow { span, .. }
            | Self::DivisionByZero { span, .. }
            | Self::IndexOutOfBounds { span, .. }
            | Self::UnresolvedIdentifier { span, .. }
            | Self::UnresolvedType { span, .. }
            | Self::NoSuchMember { span, .. }
            | Self::DuplicateDefinition { span, .. }
            | Self::ArgumentCountMismatch { span, .. }
            | Self::TemplateArityMismatch { span, .. }
            | Self::GenericNotApplied { span, .. }
            | Self::CannotInferTypeArgument { span, .. }
            | Self::NotGeneric { span, .. }
            | Self::RecursiveInstantiation { span, .. }
            | Self::NestingTooDeep { span, .. } => *span,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidBinaryOperands { .. }
            | Self::InvalidBooleanOperands { .. }
            | Self::InvalidUnaryOperand { .. }
            | Self::IncompatibleAssignment { .. }
            | Self::InvalidCast { .. }
            | Self::InvalidUnionCast { .. }
            | Self::FunctionAsValue { .. }
            | Self::AssignToImmutable { .. }
            | Self::NotAssignable { .. }
            | Self::NotAddressable { .. }
            | Self::NotCallable { .. }
            | Self::NotSubscriptable { .. }
            | Self::NotAStruct { .. }
            | Self::DuplicateInitializer { .. }
            | Self::TypeUsedAsValue { .. }
            | Self::ArrayLiteralCount { .. } => ErrorCategory::TypeMismatch,
            Self::ConstantOutOfRange { .. }
            | Self::ConstantFoldOverflow { .. }
            | Self::DivisionByZero { .. }
            | Self::IndexOutOfBounds { .. } => ErrorCategory::Overflow,
            Self::UnresolvedIdentifier { .. }
            | Self::UnresolvedType { .. }
            | Self::NoSuchMember { .. }
            | Self::DuplicateDefinition { .. } => ErrorCategory::UnresolvedReference,
            Self::ArgumentCountMismatch { .. } | Self::TemplateArityMismatch { .. } => {
                ErrorCategory::ArityMismatch
            }
            Self::GenericNotApplied { .. }
            | Self::CannotInferTypeArgument { .. }
            | Self::NotGeneric { .. }
            | Self::RecursiveInstantiation { .. } => ErrorCategory::GenericMisuse,
            Self::NestingTooDeep { .. } => ErrorCategory::Limit,
        }
    }
}
