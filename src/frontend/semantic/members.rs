//! Member access, subscripting, struct initializers and ranges

use rustc_hash::FxHashSet;

use crate::frontend::ast::{Expr, Ident, TypeExpr};
use crate::types::{convert, ArithmeticKind, ConversionMode, Type};
use crate::utils::{CompilerError, Result, Span};

use super::ExprChecker;

/// Name of the built-in struct produced by `begin..limit`
pub const RANGE_TYPE: &str = "Range";

impl<'a> ExprChecker<'a> {
    pub(super) fn check_member(&mut self, receiver: &Expr, member: &Ident, span: Span) -> Result<Type> {
        let ty = self.check_expr(receiver)?;
        let found = match &ty {
            Type::Struct(_) | Type::Trait(_) => field_type(&self.complete(&ty), &member.name),
            Type::Pointer(pointee) => {
                let pointee = self.complete(pointee);
                field_type(&pointee, &member.name).or_else(|| (member.name == "pointee").then(|| pointee))
            }
            Type::Array { .. } | Type::DynamicArray(_) if member.name == "count" => Some(Type::U16),
            _ => None,
        };
        found.ok_or_else(|| CompilerError::NoSuchMember {
            ty: ty.to_string(),
            member: member.name.clone(),
            span,
        })
    }

    pub(super) fn check_index(&mut self, receiver: &Expr, index: &Expr, span: Span) -> Result<Type> {
        let receiver_ty = self.check_expr(receiver)?;
        let index_ty = self.check_expr(index)?;
        let not_subscriptable = || CompilerError::NotSubscriptable {
            receiver: receiver_ty.to_string(),
            index: index_ty.to_string(),
            span,
        };

        let (count, element) = match &receiver_ty {
            Type::Array { count, element } => (*count, element.as_ref()),
            Type::DynamicArray(element) => (None, element.as_ref()),
            _ => return Err(not_subscriptable()),
        };

        match &index_ty {
            Type::Arithmetic(kind) => {
                if let ArithmeticKind::CompileTimeInt(value) = kind {
                    let past_end = count.map_or(false, |n| *value >= n as i64);
                    if *value < 0 || past_end || *value > u16::MAX as i64 {
                        return Err(CompilerError::IndexOutOfBounds {
                            index: *value,
                            ty: receiver_ty.to_string(),
                            span: index.span(),
                        });
                    }
                }
                Ok(element.clone())
            }
            Type::Struct(_) if self.is_range(&index_ty) => Ok(Type::dynamic_array(element.clone())),
            _ => Err(not_subscriptable()),
        }
    }

    pub(super) fn check_struct_init(
        &mut self,
        ty: &TypeExpr,
        fields: &[(Ident, Expr)],
        span: Span,
    ) -> Result<Type> {
        let struct_ty = self.resolve_type(ty)?;
        let Type::Struct(definition) = &struct_ty else {
            return Err(CompilerError::NotAStruct {
                ty: struct_ty.to_string(),
                span,
            });
        };

        let mut seen = FxHashSet::default();
        for (name, value) in fields {
            if !seen.insert(name.name.as_str()) {
                return Err(CompilerError::DuplicateInitializer {
                    ty: struct_ty.to_string(),
                    member: name.name.clone(),
                    span: name.span,
                });
            }
            let member = definition
                .member(&name.name)
                .ok_or_else(|| CompilerError::NoSuchMember {
                    ty: struct_ty.to_string(),
                    member: name.name.clone(),
                    span: name.span,
                })?;
            let value_ty = self.check_expr(value)?;
            convert(&member.ty, &value_ty, ConversionMode::Assignment, value.span())?;
        }
        Ok(struct_ty)
    }

    pub(super) fn check_range(&mut self, begin: &Expr, limit: &Expr, span: Span) -> Result<Type> {
        let range = self.range_type(span)?;
        for bound in [begin, limit] {
            let ty = self.check_expr(bound)?;
            convert(&Type::U16, &ty, ConversionMode::Assignment, bound.span())?;
        }
        Ok(range)
    }

    fn range_type(&self, span: Span) -> Result<Type> {
        self.env
            .lookup_type_from(self.scope, RANGE_TYPE)
            .cloned()
            .ok_or_else(|| CompilerError::UnresolvedType {
                name: RANGE_TYPE.to_string(),
                span,
            })
    }

    /// Full definition of a struct reached through one of its own fields
    fn complete(&self, ty: &Type) -> Type {
        if let Type::Struct(s) = ty {
            if s.members.is_empty() {
                let definition = self
                    .env
                    .cache()
                    .get(&s.mangled_name)
                    .or_else(|| self.env.lookup_type_from(self.scope, &s.name).cloned());
                if let Some(definition) = definition.filter(|d| d == ty) {
                    return definition;
                }
            }
        }
        ty.clone()
    }

    fn is_range(&self, ty: &Type) -> bool {
        self.env
            .lookup_type_from(self.scope, RANGE_TYPE)
            .map_or(false, |range| range == ty)
    }
}

/// Declared type of a struct field or trait method
fn field_type(ty: &Type, name: &str) -> Option<Type> {
    match ty {
        Type::Struct(s) => s.member(name).map(|m| m.ty.clone()),
        Type::Trait(t) => t.member(name).map(|m| m.ty.clone()),
        _ => None,
    }
}
