//! Implicit and explicit conversions.
//!
//! Assignment conversions apply wherever a value flows into a typed location:
//! `=`, call arguments, struct initializer arguments and `return`. Explicit
//! `as` casts accept a superset. Bitcasts are unchecked and never reach here.

use crate::types::{ArithmeticKind, BooleanKind, IntWidth, Type};
use crate::utils::{CompilerError, Result, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionMode {
    /// Implicit conversion into a typed location
    Assignment,
    /// Explicit `as`
    Cast,
}

/// Convert a value of type `source` to `target`, returning the resulting type
pub fn convert(target: &Type, source: &Type, mode: ConversionMode, span: Span) -> Result<Type> {
    if let Some(name) = source.template_name().or_else(|| target.template_name()) {
        return Err(CompilerError::GenericNotApplied {
            name: name.to_string(),
            span,
        });
    }
    if let Type::Function(_) = source {
        if !matches!(target, Type::Pointer(_)) {
            return Err(CompilerError::FunctionAsValue {
                ty: source.to_string(),
                span,
            });
        }
    }
    if let Type::Function(_) = target {
        return Err(CompilerError::FunctionAsValue {
            ty: target.to_string(),
            span,
        });
    }
    if matches!(source, Type::Void) || matches!(target, Type::Void) {
        return Err(mismatch(target, source, mode, span));
    }
    let constant_target = matches!(
        target,
        Type::Arithmetic(ArithmeticKind::CompileTimeInt(_))
            | Type::Boolean(BooleanKind::CompileTimeBool(_))
    );
    if source.same_as(target) && !constant_target {
        return Ok(target.clone());
    }
    // Extraction wins over every other rule, pointer members included
    if mode == ConversionMode::Cast && source.union_member_index(target).is_some() {
        return Ok(target.clone());
    }

    match (target, source) {
        (Type::Arithmetic(t), Type::Arithmetic(s)) => {
            convert_arithmetic(*t, *s, target, source, mode, span)?;
            Ok(target.clone())
        }
        (Type::Boolean(BooleanKind::CompileTimeBool(_)), _) => {
            Err(mismatch(target, source, mode, span))
        }
        (Type::Boolean(_), Type::Boolean(_)) => Ok(target.clone()),
        (
            Type::Array { count, element },
            Type::Array {
                count: source_count,
                element: source_element,
            },
        ) => {
            if count.is_some() && count != source_count {
                return Err(mismatch(target, source, mode, span));
            }
            let element = convert(element, source_element, mode, span)
                .map_err(|_| mismatch(target, source, mode, span))?;
            Ok(Type::array(*source_count, element))
        }
        (Type::DynamicArray(element), Type::Array { element: source_element, .. })
        | (Type::DynamicArray(element), Type::DynamicArray(source_element)) => {
            if element.same_as(source_element) {
                Ok(target.clone())
            } else {
                Err(mismatch(target, source, mode, span))
            }
        }
        (Type::Pointer(pointee), _) => convert_to_pointer(pointee, target, source, mode, span),
        (Type::Union(_), _) => convert_to_union(target, source, mode, span),
        (_, Type::Union(_)) if mode == ConversionMode::Cast => Err(CompilerError::InvalidUnionCast {
            union: source.to_string(),
            to: target.to_string(),
            span,
        }),
        _ => Err(mismatch(target, source, mode, span)),
    }
}

/// Type bound by a mutable storage location initialized with `ty`
///
/// Integer constants take the narrowest width holding their value, boolean
/// constants become `bool`, and immutable qualifiers are dropped.
pub fn storage_type(ty: &Type, span: Span) -> Result<Type> {
    match ty {
        Type::Arithmetic(ArithmeticKind::CompileTimeInt(value)) => IntWidth::narrowest_for(*value)
            .map(Type::int)
            .ok_or_else(|| CompilerError::ConstantOutOfRange {
                value: *value,
                target: if *value < 0 { IntWidth::I16 } else { IntWidth::U16 }.to_string(),
                span,
            }),
        Type::Boolean(_) | Type::Arithmetic(_) => Ok(ty.unqualified()),
        Type::Function(_) => Err(CompilerError::FunctionAsValue {
            ty: ty.to_string(),
            span,
        }),
        other => match other.template_name() {
            Some(name) => Err(CompilerError::GenericNotApplied {
                name: name.to_string(),
                span,
            }),
            None => Ok(other.clone()),
        },
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn mismatch(target: &Type, source: &Type, mode: ConversionMode, span: Span) -> CompilerError {
    match mode {
        ConversionMode::Assignment => CompilerError::IncompatibleAssignment {
            from: source.to_string(),
            to: target.to_string(),
            span,
        },
        ConversionMode::Cast => CompilerError::InvalidCast {
            from: source.to_string(),
            to: target.to_string(),
            span,
        },
    }
}

fn convert_arithmetic(
    t: ArithmeticKind,
    s: ArithmeticKind,
    target: &Type,
    source: &Type,
    mode: ConversionMode,
    span: Span,
) -> Result<()> {
    let Some(target_width) = t.width() else {
        return Err(mismatch(target, source, mode, span));
    };
    match s {
        ArithmeticKind::CompileTimeInt(value) => {
            if target_width.contains(value) {
                Ok(())
            } else {
                Err(CompilerError::ConstantOutOfRange {
                    value,
                    target: target_width.to_string(),
                    span,
                })
            }
        }
        ArithmeticKind::MutableInt(source_width) | ArithmeticKind::ImmutableInt(source_width) => {
            let widening = source_width.is_signed() == target_width.is_signed()
                && source_width.bits() <= target_width.bits();
            if widening || mode == ConversionMode::Cast {
                Ok(())
            } else {
                Err(mismatch(target, source, mode, span))
            }
        }
    }
}

/// Pointer destinations accept equal pointers and take the address of
/// values whose type matches the pointee
fn convert_to_pointer(
    pointee: &Type,
    target: &Type,
    source: &Type,
    mode: ConversionMode,
    span: Span,
) -> Result<Type> {
    if pointee.same_as(source) {
        return Ok(target.clone());
    }
    if let (Type::Struct(object), Type::Trait(trait_type)) = (pointee, source) {
        if object.name == trait_type.trait_object_name {
            return Ok(target.clone());
        }
    }
    Err(mismatch(target, source, mode, span))
}

fn convert_to_union(target: &Type, source: &Type, mode: ConversionMode, span: Span) -> Result<Type> {
    let Type::Union(members) = target else {
        return Err(mismatch(target, source, mode, span));
    };
    // Every member of a narrower union must already be a member
    if let Type::Union(source_members) = source {
        if source_members
            .iter()
            .all(|m| target.union_member_index(m).is_some())
        {
            return Ok(target.clone());
        }
        return Err(mismatch(target, source, mode, span));
    }
    if members
        .iter()
        .any(|member| convert(member, source, mode, span).is_ok())
    {
        Ok(target.clone())
    } else {
        Err(mismatch(target, source, mode, span))
    }
}
