//! Semantic Analysis for Ember expressions
//!
//! Performs:
//! - Type assignment for every expression kind
//! - Constant folding through the promotion engine
//! - Assignment, call and cast conversion checks
//! - Generic instantiation and inference
//!
//! The checker walks a tree depth-first, left to right, and stops at the
//! first error. It reads the environment and writes only to its type cache.

mod generics;
mod members;
mod resolve;

use std::rc::Rc;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::frontend::ast::{Expr, SizeOfOperand, TypeExpr, UnOp};
use crate::frontend::environment::{Environment, ScopeId};
use crate::types::{
    convert, promote_binary, promote_unary, storage_type, ArithmeticKind, BooleanKind,
    ConversionMode, FunctionTemplate, FunctionType, IntWidth, MemoryLayout, Type,
};
use crate::utils::{CompilerError, Result, Span};

pub use members::RANGE_TYPE;
pub use resolve::{SubstitutionMap, TypeResolver};

// ==================== Options ====================

/// Tunables for a check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerOptions {
    /// Deepest expression nesting (and generic nesting) accepted
    pub max_depth: usize,
}

impl Default for CheckerOptions {
    fn default() -> Self {
        Self { max_depth: 256 }
    }
}

impl CheckerOptions {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ==================== Expression Checker ====================

/// Assigns types to expressions
pub struct ExprChecker<'a> {
    env: &'a Environment,
    layout: &'a dyn MemoryLayout,
    resolver: TypeResolver<'a>,
    scope: ScopeId,
    options: CheckerOptions,
    depth: usize,
}

impl<'a> ExprChecker<'a> {
    /// Checker resolving names from the environment's current scope
    pub fn new(env: &'a Environment, layout: &'a dyn MemoryLayout) -> Self {
        Self::with_options(env, layout, CheckerOptions::default())
    }

    pub fn with_options(
        env: &'a Environment,
        layout: &'a dyn MemoryLayout,
        options: CheckerOptions,
    ) -> Self {
        Self {
            env,
            layout,
            resolver: TypeResolver::new(env, layout, options.max_depth),
            scope: env.current(),
            options,
            depth: 0,
        }
    }

    /// Resolve names starting from `scope` instead of the current scope
    pub fn in_scope(mut self, scope: ScopeId) -> Self {
        self.scope = scope;
        self
    }

    /// Type of `expr`
    pub fn check(&mut self, expr: &Expr) -> Result<Type> {
        debug!("checking expression at {}..{}", expr.span().start, expr.span().end);
        self.depth = 0;
        self.check_expr(expr)
    }

    /// Type bound by a declaration initialized with `expr`
    ///
    /// With a declared type the initializer must convert to it; without one the
    /// initializer's type is concretized. `immutable` qualifies the result.
    pub fn check_binding(
        &mut self,
        expr: &Expr,
        declared: Option<&TypeExpr>,
        immutable: bool,
    ) -> Result<Type> {
        let value = self.check(expr)?;
        let ty = match declared {
            Some(declared) => {
                let target = self.resolve_type(declared)?;
                convert(&target, &value, ConversionMode::Assignment, expr.span())?;
                target
            }
            None => storage_type(&value, expr.span())?,
        };
        Ok(match ty {
            Type::Arithmetic(ArithmeticKind::MutableInt(w)) if immutable => Type::const_int(w),
            Type::Boolean(BooleanKind::MutableBool) if immutable => {
                Type::Boolean(BooleanKind::ImmutableBool)
            }
            other => other,
        })
    }

    /// Resolve a type expression from the checker's scope
    pub fn resolve_type(&self, ty: &TypeExpr) -> Result<Type> {
        self.resolver.resolve(ty, self.scope)
    }

    fn check_expr(&mut self, expr: &Expr) -> Result<Type> {
        if self.depth >= self.options.max_depth {
            return Err(CompilerError::NestingTooDeep {
                limit: self.options.max_depth,
                span: expr.span(),
            });
        }
        self.depth += 1;
        let result = self.check_node(expr);
        self.depth -= 1;
        if let Ok(ty) = &result {
            trace!("{:?} => {}", expr.span(), ty);
        }
        result
    }

    fn check_node(&mut self, expr: &Expr) -> Result<Type> {
        match expr {
            Expr::IntLit(value, _) => Ok(Type::comptime_int(*value)),
            Expr::BoolLit(value, _) => Ok(Type::comptime_bool(*value)),
            Expr::StringLit(value, _) => Ok(Type::array(
                Some(value.len()),
                Type::const_int(IntWidth::U8),
            )),

            Expr::ArrayLit {
                elem_type,
                count,
                elements,
                span,
            } => {
                let element = self.resolve_type(elem_type)?;
                if let Some(expected) = count {
                    if *expected != elements.len() {
                        return Err(CompilerError::ArrayLiteralCount {
                            ty: Type::array(*count, element).to_string(),
                            expected: *expected,
                            got: elements.len(),
                            span: *span,
                        });
                    }
                }
                for value in elements {
                    let ty = self.check_expr(value)?;
                    convert(&element, &ty, ConversionMode::Assignment, value.span())?;
                }
                Ok(Type::array(Some(elements.len()), element))
            }

            Expr::Ident(ident) => match self.env.lookup_from(self.scope, &ident.name) {
                Some(symbol) => match symbol.ty.template_name() {
                    Some(name) => Err(CompilerError::GenericNotApplied {
                        name: name.to_string(),
                        span: ident.span,
                    }),
                    None => Ok(symbol.ty.clone()),
                },
                None => match self.env.lookup_type_from(self.scope, &ident.name) {
                    Some(ty) => Err(CompilerError::TypeUsedAsValue {
                        ty: ty.to_string(),
                        span: ident.span,
                    }),
                    None => Err(CompilerError::UnresolvedIdentifier {
                        name: ident.name.clone(),
                        span: ident.span,
                    }),
                },
            },

            Expr::Unary { op, expr: operand, span } => {
                let ty = self.check_expr(operand)?;
                if *op == UnOp::AddressOf && !operand.is_place() {
                    return Err(CompilerError::NotAddressable {
                        ty: ty.to_string(),
                        span: *span,
                    });
                }
                promote_unary(*op, &ty, *span)
            }

            Expr::Binary { left, op, right, span } => {
                let left = self.check_expr(left)?;
                let right = self.check_expr(right)?;
                promote_binary(*op, &left, &right, *span)
            }

            Expr::Assign { target, value, span } => self.check_assign(target, value, *span),

            Expr::Call { callee, args, span } => self.check_call(callee, args, *span),

            Expr::Member { expr, member, span } => self.check_member(expr, member, *span),

            Expr::Index { expr, index, span } => self.check_index(expr, index, *span),

            Expr::StructInit { ty, fields, span } => self.check_struct_init(ty, fields, *span),

            Expr::Range { begin, limit, span } => self.check_range(begin, limit, *span),

            Expr::Cast { expr, ty, span } => {
                let target = self.resolve_type(ty)?;
                let source = self.check_expr(expr)?;
                convert(&target, &source, ConversionMode::Cast, *span)
            }

            Expr::Bitcast { expr, ty, span } => {
                let target = self.resolve_type(ty)?;
                let source = self.check_expr(expr)?;
                if let Some(name) = source.template_name() {
                    return Err(CompilerError::GenericNotApplied {
                        name: name.to_string(),
                        span: *span,
                    });
                }
                Ok(target)
            }

            Expr::Is { expr, ty, span } => {
                let test = self.resolve_type(ty)?;
                let operand = self.check_expr(expr)?;
                // a literal tests as the type a binding of it would get
                let operand = match operand {
                    Type::Arithmetic(ArithmeticKind::CompileTimeInt(_))
                    | Type::Boolean(BooleanKind::CompileTimeBool(_)) => {
                        storage_type(&operand, *span)?
                    }
                    other => other,
                };
                Ok(match &operand {
                    _ if operand.same_as(&test) => Type::comptime_bool(true),
                    Type::Union(_) if operand.union_member_index(&test).is_some() => Type::BOOL,
                    _ => Type::comptime_bool(false),
                })
            }

            Expr::SizeOf { operand, span } => {
                let ty = match operand {
                    SizeOfOperand::Type(ty) => self.resolve_type(ty)?,
                    SizeOfOperand::Expr(expr) => {
                        let ty = self.check_expr(expr)?;
                        storage_type(&ty, *span)?
                    }
                };
                Ok(Type::comptime_int(self.layout.size_of(&ty) as i64))
            }

            Expr::GenericApply { name, args, span } => {
                let args = args
                    .iter()
                    .map(|a| self.resolve_type(a))
                    .collect::<Result<Vec<_>>>()?;
                if let Some(symbol) = self.env.lookup_from(self.scope, &name.name) {
                    return self.resolver.apply(&symbol.ty, args, *span);
                }
                match self.env.lookup_type_from(self.scope, &name.name) {
                    Some(template) => {
                        let ty = self.resolver.apply(template, args, *span)?;
                        Err(CompilerError::TypeUsedAsValue {
                            ty: ty.to_string(),
                            span: *span,
                        })
                    }
                    None => Err(CompilerError::UnresolvedIdentifier {
                        name: name.name.clone(),
                        span: name.span,
                    }),
                }
            }
        }
    }

    // ==================== Assignment ====================

    fn check_assign(&mut self, target: &Expr, value: &Expr, span: Span) -> Result<Type> {
        let destination = self.check_expr(target)?;
        if !target.is_place() {
            return Err(CompilerError::NotAssignable {
                ty: destination.to_string(),
                span: target.span(),
            });
        }
        if destination.is_immutable() {
            return Err(CompilerError::AssignToImmutable {
                ty: destination.to_string(),
                span,
            });
        }
        let source = self.check_expr(value)?;
        let ty = convert(&destination, &source, ConversionMode::Assignment, span)?;
        storage_type(&ty, span)
    }

    // ==================== Calls ====================

    fn check_call(&mut self, callee: &Expr, args: &[Expr], span: Span) -> Result<Type> {
        if let Expr::Ident(ident) = callee {
            let generic = self
                .env
                .lookup_from(self.scope, &ident.name)
                .and_then(|symbol| match &symbol.ty {
                    Type::GenericFunction(template) => Some(template.clone()),
                    _ => None,
                });
            if let Some(template) = generic {
                return self.check_inferred_call(&template, args, span);
            }
        }

        let callee_ty = self.check_expr(callee)?;
        let signature = match &callee_ty {
            Type::Function(f) => f.clone(),
            Type::Pointer(pointee) => match pointee.as_ref() {
                Type::Function(f) => f.clone(),
                _ => {
                    return Err(CompilerError::NotCallable {
                        ty: callee_ty.to_string(),
                        span,
                    })
                }
            },
            _ => {
                return Err(CompilerError::NotCallable {
                    ty: callee_ty.to_string(),
                    span,
                })
            }
        };
        let arg_types = args
            .iter()
            .map(|a| self.check_expr(a))
            .collect::<Result<Vec<_>>>()?;
        self.check_arguments(&callee_ty.to_string(), &signature, args, &arg_types, span)
    }

    /// Call of a generic function without explicit type arguments
    fn check_inferred_call(
        &mut self,
        template: &Rc<FunctionTemplate>,
        args: &[Expr],
        span: Span,
    ) -> Result<Type> {
        let declared = &template.decl.params;
        if declared.len() != args.len() {
            return Err(CompilerError::ArgumentCountMismatch {
                callee: template.name.clone(),
                expected: declared.len(),
                got: args.len(),
                span,
            });
        }
        let arg_types = args
            .iter()
            .map(|a| self.check_expr(a))
            .collect::<Result<Vec<_>>>()?;

        let mut bindings = SubstitutionMap::default();
        let ordered = arg_types
            .iter()
            .zip(declared)
            .zip(args)
            .filter(|((ty, _), _)| !generics::is_constant(ty))
            .chain(
                arg_types
                    .iter()
                    .zip(declared)
                    .zip(args)
                    .filter(|((ty, _), _)| generics::is_constant(ty)),
            );
        for ((ty, param), arg) in ordered {
            generics::bind_params(&param.ty, ty, &template.params, &mut bindings, arg.span())?;
        }

        let type_args = template
            .params
            .iter()
            .map(|param| {
                bindings
                    .get(param)
                    .cloned()
                    .ok_or_else(|| CompilerError::CannotInferTypeArgument {
                        name: template.name.clone(),
                        param: param.clone(),
                        span,
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        debug!("inferred type arguments for {}", template.name);

        let callee = self
            .resolver
            .apply(&Type::GenericFunction(template.clone()), type_args, span)?;
        let Type::Function(signature) = &callee else {
            return Err(CompilerError::NotCallable {
                ty: callee.to_string(),
                span,
            });
        };
        self.check_arguments(&callee.to_string(), signature, args, &arg_types, span)
    }

    fn check_arguments(
        &self,
        callee: &str,
        signature: &FunctionType,
        args: &[Expr],
        arg_types: &[Type],
        span: Span,
    ) -> Result<Type> {
        if signature.params.len() != args.len() {
            return Err(CompilerError::ArgumentCountMismatch {
                callee: callee.to_string(),
                expected: signature.params.len(),
                got: args.len(),
                span,
            });
        }
        for ((param, arg), ty) in signature.params.iter().zip(args).zip(arg_types) {
            convert(param, ty, ConversionMode::Assignment, arg.span())?;
        }
        Ok(signature.return_type.clone())
    }
}
