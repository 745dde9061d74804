//! Abstract Syntax Tree definitions for Ember
//!
//! The parser produces these nodes; the checker only reads them. Only the
//! expression and declaration shapes the type checker consumes are modelled.

use std::fmt;

use crate::utils::Span;

/// Identifier
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: &str, span: Span) -> Self {
        Self {
            name: name.to_string(),
            span,
        }
    }
}

// ==================== Declarations ====================

/// Struct definition, generic when `type_params` is non-empty
#[derive(Debug, Clone, PartialEq)]
pub struct StructDecl {
    pub name: Ident,
    pub type_params: Vec<Ident>,
    pub fields: Vec<Field>,
    pub span: Span,
}

/// Struct field
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: Ident,
    pub ty: TypeExpr,
    pub span: Span,
}

/// Function signature; bodies are checked statement by statement elsewhere
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Ident,
    pub type_params: Vec<Ident>,
    pub params: Vec<Param>,
    pub ret_type: Option<TypeExpr>,
    pub span: Span,
}

/// Function parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Ident,
    pub ty: TypeExpr,
    pub span: Span,
}

/// Trait definition
#[derive(Debug, Clone, PartialEq)]
pub struct TraitDecl {
    pub name: Ident,
    pub type_params: Vec<Ident>,
    pub methods: Vec<FunctionDecl>,
    pub span: Span,
}

// ==================== Type Expressions ====================

/// Type as written in source
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// Named type (u8, bool, void, MyStruct, T)
    Named(String, Span),
    /// const T
    Const(Box<TypeExpr>, Span),
    /// *T
    Pointer(Box<TypeExpr>, Span),
    /// [N]T, or [_]T when the count is inferred
    Array {
        elem: Box<TypeExpr>,
        count: Option<usize>,
        span: Span,
    },
    /// []T
    DynamicArray(Box<TypeExpr>, Span),
    /// A | B | ...
    Union(Vec<TypeExpr>, Span),
    /// func(A, B) -> R
    Function {
        params: Vec<TypeExpr>,
        ret: Box<TypeExpr>,
        span: Span,
    },
    /// Name@[T1, .., Tn]
    Apply {
        name: Ident,
        args: Vec<TypeExpr>,
        span: Span,
    },
}

impl TypeExpr {
    pub fn named(name: &str) -> Self {
        Self::Named(name.to_string(), Span::dummy())
    }

    pub fn span(&self) -> Span {
        match self {
            Self::Named(_, s) => *s,
            Self::Const(_, s) => *s,
            Self::Pointer(_, s) => *s,
            Self::Array { span, .. } => *span,
            Self::DynamicArray(_, s) => *s,
            Self::Union(_, s) => *s,
            Self::Function { span, .. } => *span,
            Self::Apply { span, .. } => *span,
        }
    }
}

// ==================== Expressions ====================

/// Expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    IntLit(i64, Span),
    BoolLit(bool, Span),
    /// String literal, typed as a fixed array of `const u8`
    StringLit(String, Span),
    /// [N]T{a, b, c} or [_]T{a, b, c}
    ArrayLit {
        elem_type: TypeExpr,
        count: Option<usize>,
        elements: Vec<Expr>,
        span: Span,
    },
    Ident(Ident),
    Unary {
        op: UnOp,
        expr: Box<Expr>,
        span: Span,
    },
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
        span: Span,
    },
    /// target = value
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
        span: Span,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },
    /// expr.member
    Member {
        expr: Box<Expr>,
        member: Ident,
        span: Span,
    },
    /// expr[index]
    Index {
        expr: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },
    /// Name { .field = expr, ... }
    StructInit {
        ty: TypeExpr,
        fields: Vec<(Ident, Expr)>,
        span: Span,
    },
    /// begin..limit
    Range {
        begin: Box<Expr>,
        limit: Box<Expr>,
        span: Span,
    },
    /// expr as T
    Cast {
        expr: Box<Expr>,
        ty: TypeExpr,
        span: Span,
    },
    /// bitcast(T, expr)
    Bitcast {
        expr: Box<Expr>,
        ty: TypeExpr,
        span: Span,
    },
    /// expr is T
    Is {
        expr: Box<Expr>,
        ty: TypeExpr,
        span: Span,
    },
    SizeOf {
        operand: SizeOfOperand,
        span: Span,
    },
    /// Name@[T1, .., Tn] in value position
    GenericApply {
        name: Ident,
        args: Vec<TypeExpr>,
        span: Span,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SizeOfOperand {
    Type(TypeExpr),
    Expr(Box<Expr>),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Self::IntLit(_, s) | Self::BoolLit(_, s) | Self::StringLit(_, s) => *s,
            Self::Ident(ident) => ident.span,
            Self::ArrayLit { span, .. }
            | Self::Unary { span, .. }
            | Self::Binary { span, .. }
            | Self::Assign { span, .. }
            | Self::Call { span, .. }
            | Self::Member { span, .. }
            | Self::Index { span, .. }
            | Self::StructInit { span, .. }
            | Self::Range { span, .. }
            | Self::Cast { span, .. }
            | Self::Bitcast { span, .. }
            | Self::Is { span, .. }
            | Self::SizeOf { span, .. }
            | Self::GenericApply { span, .. } => *span,
        }
    }

    /// Whether the expression denotes a storage location
    pub fn is_place(&self) -> bool {
        matches!(self, Self::Ident(_) | Self::Index { .. } | Self::Member { .. })
    }

    // Convenience constructors for synthesized nodes

    pub fn int(value: i64) -> Self {
        Self::IntLit(value, Span::dummy())
    }

    pub fn boolean(value: bool) -> Self {
        Self::BoolLit(value, Span::dummy())
    }

    pub fn ident(name: &str) -> Self {
        Self::Ident(Ident::new(name, Span::dummy()))
    }

    pub fn unary(op: UnOp, expr: Expr) -> Self {
        Self::Unary {
            op,
            expr: Box::new(expr),
            span: Span::dummy(),
        }
    }

    pub fn binary(left: Expr, op: BinOp, right: Expr) -> Self {
        Self::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
            span: Span::dummy(),
        }
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Self::Assign {
            target: Box::new(target),
            value: Box::new(value),
            span: Span::dummy(),
        }
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
        Self::Call {
            callee: Box::new(callee),
            args,
            span: Span::dummy(),
        }
    }

    pub fn member(expr: Expr, member: &str) -> Self {
        Self::Member {
            expr: Box::new(expr),
            member: Ident::new(member, Span::dummy()),
            span: Span::dummy(),
        }
    }

    pub fn index(expr: Expr, index: Expr) -> Self {
        Self::Index {
            expr: Box::new(expr),
            index: Box::new(index),
            span: Span::dummy(),
        }
    }

    pub fn range(begin: Expr, limit: Expr) -> Self {
        Self::Range {
            begin: Box::new(begin),
            limit: Box::new(limit),
            span: Span::dummy(),
        }
    }

    pub fn cast(expr: Expr, ty: TypeExpr) -> Self {
        Self::Cast {
            expr: Box::new(expr),
            ty,
            span: Span::dummy(),
        }
    }

    pub fn is(expr: Expr, ty: TypeExpr) -> Self {
        Self::Is {
            expr: Box::new(expr),
            ty,
            span: Span::dummy(),
        }
    }
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    // Equality
    Eq,
    Ne,
    // Ordering
    Lt,
    Le,
    Gt,
    Ge,
    // Logical
    And,
    Or,
}

impl BinOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    /// Negation (-)
    Neg,
    /// Bitwise not (~)
    BitNot,
    /// Logical not (!)
    Not,
    /// Address-of (&)
    AddressOf,
}

impl UnOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::BitNot => "~",
            Self::Not => "!",
            Self::AddressOf => "&",
        }
    }
}

impl fmt::Display for UnOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
