//! Operator result types and constant folding.
//!
//! Given the operand types of an operator, decides the result type and, when
//! every operand is a compile-time constant, the exact folded value. Folding
//! uses checked 64-bit host arithmetic; width checks are deferred to the
//! point where a constant is stored or cast.

use crate::frontend::ast::{BinOp, UnOp};
use crate::types::{ArithmeticKind, BooleanKind, IntWidth, Type};
use crate::utils::{CompilerError, Result, Span};

/// Family of binary operators sharing one promotion rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorClass {
    /// `+ - * / % & | ^ << >>`
    Arithmetic,
    /// `== !=`
    Equality,
    /// `< > <= >=`
    Ordering,
    /// `&& ||`
    Logical,
}

impl OperatorClass {
    pub fn of(op: BinOp) -> Self {
        match op {
            BinOp::Add
            | BinOp::Sub
            | BinOp::Mul
            | BinOp::Div
            | BinOp::Mod
            | BinOp::BitAnd
            | BinOp::BitOr
            | BinOp::BitXor
            | BinOp::Shl
            | BinOp::Shr => Self::Arithmetic,
            BinOp::Eq | BinOp::Ne => Self::Equality,
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => Self::Ordering,
            BinOp::And | BinOp::Or => Self::Logical,
        }
    }
}

/// Result type of `left op right`
pub fn promote_binary(op: BinOp, left: &Type, right: &Type, span: Span) -> Result<Type> {
    let class = OperatorClass::of(op);
    match (left, right) {
        (Type::Arithmetic(l), Type::Arithmetic(r)) => match class {
            OperatorClass::Arithmetic => {
                arithmetic_result(op, *l, *r, left, right, span).map(Type::Arithmetic)
            }
            OperatorClass::Equality | OperatorClass::Ordering => {
                if let (Some(a), Some(b)) = (l.constant(), r.constant()) {
                    return Ok(Type::comptime_bool(compare(op, a, b)));
                }
                // Operands must still agree on a width
                sized_result(*l, *r, left, right, op, span)?;
                Ok(Type::BOOL)
            }
            OperatorClass::Logical => Err(invalid_operands(op, left, right, span)),
        },
        (Type::Boolean(l), Type::Boolean(r)) => match class {
            OperatorClass::Arithmetic | OperatorClass::Ordering => {
                Err(CompilerError::InvalidBooleanOperands {
                    op: op.to_string(),
                    left: left.to_string(),
                    right: right.to_string(),
                    span,
                })
            }
            OperatorClass::Equality => match (l.constant(), r.constant()) {
                (Some(a), Some(b)) => {
                    let equal = a == b;
                    Ok(Type::comptime_bool(if op == BinOp::Eq { equal } else { !equal }))
                }
                _ => Ok(Type::BOOL),
            },
            OperatorClass::Logical => Ok(Type::BOOL),
        },
        _ => Err(invalid_operands(op, left, right, span)),
    }
}

/// Result type of a prefix operator applied to `operand`
pub fn promote_unary(op: UnOp, operand: &Type, span: Span) -> Result<Type> {
    match (op, operand) {
        (UnOp::Neg, Type::Arithmetic(ArithmeticKind::CompileTimeInt(v))) => v
            .checked_neg()
            .map(Type::comptime_int)
            .ok_or_else(|| CompilerError::ConstantFoldOverflow {
                op: op.to_string(),
                left: 0,
                right: *v,
                span,
            }),
        (UnOp::BitNot, Type::Arithmetic(ArithmeticKind::CompileTimeInt(v))) => {
            Ok(Type::comptime_int(!v))
        }
        (UnOp::Neg | UnOp::BitNot, Type::Arithmetic(_)) => Ok(operand.clone()),
        (UnOp::Not, Type::Boolean(BooleanKind::CompileTimeBool(b))) => Ok(Type::comptime_bool(!b)),
        (UnOp::Not, Type::Boolean(_)) => Ok(Type::BOOL),
        (UnOp::AddressOf, _) => Ok(Type::pointer(operand.clone())),
        _ => Err(CompilerError::InvalidUnaryOperand {
            op: op.to_string(),
            operand: operand.to_string(),
            span,
        }),
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn invalid_operands(op: BinOp, left: &Type, right: &Type, span: Span) -> CompilerError {
    CompilerError::InvalidBinaryOperands {
        op: op.to_string(),
        left: left.to_string(),
        right: right.to_string(),
        span,
    }
}

fn arithmetic_result(
    op: BinOp,
    l: ArithmeticKind,
    r: ArithmeticKind,
    left: &Type,
    right: &Type,
    span: Span,
) -> Result<ArithmeticKind> {
    if let (Some(a), Some(b)) = (l.constant(), r.constant()) {
        return fold(op, a, b, span).map(ArithmeticKind::CompileTimeInt);
    }
    sized_result(l, r, left, right, op, span).map(ArithmeticKind::MutableInt)
}

/// Width of an operation where at least one operand is sized
fn sized_result(
    l: ArithmeticKind,
    r: ArithmeticKind,
    left: &Type,
    right: &Type,
    op: BinOp,
    span: Span,
) -> Result<IntWidth> {
    match (l.width(), r.width()) {
        (Some(a), Some(b)) => Ok(a.wider(b)),
        (Some(w), None) | (None, Some(w)) => {
            let value = l.constant().or(r.constant()).unwrap_or_default();
            if w.contains(value) {
                Ok(w)
            } else if IntWidth::U16.contains(value) {
                Ok(IntWidth::U16)
            } else {
                Err(invalid_operands(op, left, right, span))
            }
        }
        (None, None) => Err(invalid_operands(op, left, right, span)),
    }
}

fn compare(op: BinOp, a: i64, b: i64) -> bool {
    match op {
        BinOp::Eq => a == b,
        BinOp::Ne => a != b,
        BinOp::Lt => a < b,
        BinOp::Le => a <= b,
        BinOp::Gt => a > b,
        BinOp::Ge => a >= b,
        _ => false,
    }
}

/// Exact value of `a op b` for two integer constants
fn fold(op: BinOp, a: i64, b: i64, span: Span) -> Result<i64> {
    let overflow = || CompilerError::ConstantFoldOverflow {
        op: op.to_string(),
        left: a,
        right: b,
        span,
    };
    let by_zero = || CompilerError::DivisionByZero {
        op: op.to_string(),
        left: a,
        right: b,
        span,
    };
    match op {
        BinOp::Add => a.checked_add(b).ok_or_else(overflow),
        BinOp::Sub => a.checked_sub(b).ok_or_else(overflow),
        BinOp::Mul => a.checked_mul(b).ok_or_else(overflow),
        BinOp::Div if b == 0 => Err(by_zero()),
        BinOp::Div => a.checked_div(b).ok_or_else(overflow),
        BinOp::Mod if b == 0 => Err(by_zero()),
        BinOp::Mod => a.checked_rem(b).ok_or_else(overflow),
        BinOp::BitAnd => Ok(a & b),
        BinOp::BitOr => Ok(a | b),
        BinOp::BitXor => Ok(a ^ b),
        BinOp::Shl | BinOp::Shr => {
            let shift = u32::try_from(b)
                .ok()
                .filter(|s| *s < i64::BITS)
                .ok_or_else(overflow)?;
            Ok(if op == BinOp::Shl { a << shift } else { a >> shift })
        }
        _ => Err(overflow()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ErrorCategory;
    use pretty_assertions::assert_eq;

    fn binary(op: BinOp, l: &Type, r: &Type) -> Result<Type> {
        promote_binary(op, l, r, Span::dummy())
    }

    #[test]
    fn test_constants_fold_exactly() {
        let cases = [
            (BinOp::Add, 7, 5, 12),
            (BinOp::Sub, 7, 9, -2),
            (BinOp::Mul, 300, 300, 90000),
            (BinOp::Div, 7, 2, 3),
            (BinOp::Mod, 7, 5, 2),
            (BinOp::BitAnd, 12, 10, 8),
            (BinOp::BitOr, 12, 10, 14),
            (BinOp::BitXor, 12, 10, 6),
            (BinOp::Shl, 1, 12, 4096),
            (BinOp::Shr, 4096, 3, 512),
        ];
        for (op, a, b, expected) in cases {
            let result = binary(op, &Type::comptime_int(a), &Type::comptime_int(b)).unwrap();
            assert_eq!(result, Type::comptime_int(expected), "{} {} {}", a, op, b);
        }
    }

    #[test]
    fn test_fold_errors_instead_of_panicking() {
        let err = binary(BinOp::Div, &Type::comptime_int(1), &Type::comptime_int(0)).unwrap_err();
        assert!(matches!(err, CompilerError::DivisionByZero { .. }));
        let err = binary(BinOp::Add, &Type::comptime_int(i64::MAX), &Type::comptime_int(1))
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Overflow);
        let err = binary(BinOp::Shl, &Type::comptime_int(1), &Type::comptime_int(64)).unwrap_err();
        assert!(matches!(err, CompilerError::ConstantFoldOverflow { .. }));
    }

    #[test]
    fn test_constant_with_sized_operand() {
        let result = binary(BinOp::Add, &Type::comptime_int(100), &Type::U8).unwrap();
        assert_eq!(result, Type::U8);
        let result = binary(BinOp::Add, &Type::comptime_int(1000), &Type::U8).unwrap();
        assert_eq!(result, Type::U16);
        let err = binary(BinOp::Add, &Type::comptime_int(70000), &Type::U8).unwrap_err();
        assert!(err.to_string().contains("integer constant 70000"));
        assert!(binary(BinOp::Add, &Type::comptime_int(-1), &Type::U8).is_err());
    }

    #[test]
    fn test_sized_operands_widen_symmetrically() {
        let ops = [BinOp::Add, BinOp::Sub, BinOp::Mul, BinOp::Div, BinOp::Mod, BinOp::Shl];
        for op in ops {
            assert_eq!(binary(op, &Type::U8, &Type::U16).unwrap(), Type::U16);
            assert_eq!(binary(op, &Type::U16, &Type::U8).unwrap(), Type::U16);
        }
        let immutable = Type::const_int(IntWidth::I8);
        assert_eq!(binary(BinOp::Add, &immutable, &immutable).unwrap(), Type::I8);
    }

    #[test]
    fn test_boolean_operands_rejected_by_arithmetic() {
        let err = binary(BinOp::Add, &Type::BOOL, &Type::BOOL).unwrap_err();
        assert!(matches!(err, CompilerError::InvalidBooleanOperands { .. }));
        let err = binary(BinOp::Add, &Type::U8, &Type::BOOL).unwrap_err();
        assert!(matches!(err, CompilerError::InvalidBinaryOperands { .. }));
        assert_eq!(
            err.to_string(),
            "binary operator `+` cannot be applied to operands of types `u8` and `bool`"
        );
    }

    #[test]
    fn test_equality_and_ordering() {
        assert_eq!(
            binary(BinOp::Eq, &Type::comptime_int(3), &Type::comptime_int(3)).unwrap(),
            Type::comptime_bool(true)
        );
        assert_eq!(
            binary(BinOp::Lt, &Type::comptime_int(3), &Type::comptime_int(2)).unwrap(),
            Type::comptime_bool(false)
        );
        assert_eq!(binary(BinOp::Ne, &Type::U8, &Type::comptime_int(3)).unwrap(), Type::BOOL);
        assert_eq!(
            binary(BinOp::Ne, &Type::comptime_bool(true), &Type::comptime_bool(false)).unwrap(),
            Type::comptime_bool(true)
        );
        assert_eq!(binary(BinOp::Eq, &Type::BOOL, &Type::comptime_bool(true)).unwrap(), Type::BOOL);

        let err = binary(BinOp::Lt, &Type::BOOL, &Type::BOOL).unwrap_err();
        assert!(matches!(err, CompilerError::InvalidBooleanOperands { .. }));
        let err = binary(BinOp::Eq, &Type::U8, &Type::BOOL).unwrap_err();
        assert!(matches!(err, CompilerError::InvalidBinaryOperands { .. }));
    }

    #[test]
    fn test_logical_operators() {
        assert_eq!(
            binary(BinOp::And, &Type::comptime_bool(true), &Type::comptime_bool(true)).unwrap(),
            Type::BOOL
        );
        assert!(binary(BinOp::Or, &Type::U8, &Type::BOOL).is_err());
        assert!(binary(BinOp::Or, &Type::BOOL, &Type::comptime_int(1)).is_err());
    }

    #[test]
    fn test_unary_operators() {
        let neg = promote_unary(UnOp::Neg, &Type::comptime_int(5), Span::dummy()).unwrap();
        assert_eq!(neg, Type::comptime_int(-5));
        let not = promote_unary(UnOp::BitNot, &Type::comptime_int(0), Span::dummy()).unwrap();
        assert_eq!(not, Type::comptime_int(-1));
        let kept = promote_unary(UnOp::Neg, &Type::const_int(IntWidth::I16), Span::dummy()).unwrap();
        assert_eq!(kept, Type::const_int(IntWidth::I16));
        assert!(promote_unary(UnOp::Neg, &Type::BOOL, Span::dummy()).is_err());

        let flipped =
            promote_unary(UnOp::Not, &Type::comptime_bool(true), Span::dummy()).unwrap();
        assert_eq!(flipped, Type::comptime_bool(false));
        let runtime =
            promote_unary(UnOp::Not, &Type::Boolean(BooleanKind::ImmutableBool), Span::dummy())
                .unwrap();
        assert_eq!(runtime, Type::BOOL);
        assert!(promote_unary(UnOp::Not, &Type::U8, Span::dummy()).is_err());
    }
}
