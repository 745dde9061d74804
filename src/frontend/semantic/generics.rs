//! Generic instantiation
//!
//! Applying a template to concrete arguments substitutes every parameter in
//! its members or signature and yields an ordinary concrete type. Results are
//! cached by mangled name in the environment's type cache, which is consulted
//! before anything is built, so `Foo@[u16]` is the same type wherever it is
//! written.

use std::rc::Rc;

use log::debug;

use crate::frontend::ast::TypeExpr;
use crate::types::{
    mangle_application, render_application, storage_type, ArithmeticKind, BooleanKind, Template,
    Type,
};
use crate::utils::{CompilerError, Result, Span};

use super::resolve::{SubstitutionMap, TypeResolver};

impl<'a> TypeResolver<'a> {
    /// Instantiate `template@[args]`
    pub fn apply(&self, template: &Type, args: Vec<Type>, span: Span) -> Result<Type> {
        match template {
            Type::GenericStruct(t) => self.instantiate(t, args, span, |subst, name, mangled| {
                let built = self.build_struct(&t.decl, t.scope, subst, name, mangled)?;
                Ok(Type::Struct(Rc::new(built)))
            }),
            Type::GenericFunction(t) => self.instantiate(t, args, span, |subst, name, mangled| {
                let built = self.build_function(&t.decl, t.scope, subst, &name, mangled)?;
                Ok(Type::Function(Rc::new(built)))
            }),
            Type::GenericTrait(t) => self.instantiate(t, args, span, |subst, name, mangled| {
                let (trait_type, object) = self.build_trait(&t.decl, t.scope, subst, name, mangled)?;
                let object_name = object.mangled_name.clone();
                self.env.cache().insert(object_name, Type::Struct(Rc::new(object)));
                Ok(Type::Trait(Rc::new(trait_type)))
            }),
            other => Err(CompilerError::NotGeneric {
                ty: other.to_string(),
                span,
            }),
        }
    }

    fn instantiate<D, F>(&self, template: &Template<D>, args: Vec<Type>, span: Span, build: F) -> Result<Type>
    where
        F: FnOnce(&SubstitutionMap, String, String) -> Result<Type>,
    {
        let application = render_application(&template.name, &args);
        if args.len() != template.params.len() {
            return Err(CompilerError::TemplateArityMismatch {
                application,
                expected: template.params.len(),
                got: args.len(),
                span,
            });
        }
        if let Some(arg) = args.iter().find(|a| a.is_generic()) {
            return Err(CompilerError::GenericNotApplied {
                name: arg.to_string(),
                span,
            });
        }

        let mangled = mangle_application(&template.name, &args);
        if let Some(ty) = self.env.cache().get(&mangled) {
            debug!("reusing instantiation {}", application);
            return Ok(ty);
        }

        if let Some(shell) = self.shell(&mangled, span) {
            return shell;
        }
        if self.in_progress.borrow().contains(&mangled) {
            return Err(CompilerError::RecursiveInstantiation { application, span });
        }
        if self.in_progress.borrow().len() >= self.max_depth {
            return Err(CompilerError::NestingTooDeep {
                limit: self.max_depth,
                span,
            });
        }

        let subst: SubstitutionMap = template.params.iter().cloned().zip(args).collect();

        self.in_progress.borrow_mut().insert(mangled.clone());
        let built = build(&subst, application.clone(), mangled.clone());
        self.in_progress.borrow_mut().remove(&mangled);

        let ty = built?;
        debug!("instantiated {} as {}", application, mangled);
        self.env.cache().insert(mangled, ty.clone());
        Ok(ty)
    }
}

// ==================== Inference ====================

/// Bind template parameters by matching a parameter's declared type against
/// an argument's type. Earlier bindings win; constants are concretized.
pub(super) fn bind_params(
    declared: &TypeExpr,
    actual: &Type,
    params: &[String],
    bindings: &mut SubstitutionMap,
    span: Span,
) -> Result<()> {
    match (declared, actual) {
        (TypeExpr::Named(name, _), _) if params.contains(name) => {
            if !bindings.contains_key(name) {
                bindings.insert(name.clone(), storage_type(actual, span)?);
            }
            Ok(())
        }
        (TypeExpr::Const(inner, _), _) => bind_params(inner, actual, params, bindings, span),
        (TypeExpr::Pointer(inner, _), Type::Pointer(pointee)) => {
            bind_params(inner, pointee, params, bindings, span)
        }
        (TypeExpr::Array { elem, .. }, Type::Array { element, .. })
        | (TypeExpr::DynamicArray(elem, _), Type::Array { element, .. })
        | (TypeExpr::DynamicArray(elem, _), Type::DynamicArray(element)) => {
            bind_params(elem, element, params, bindings, span)
        }
        (TypeExpr::Function { params: declared_params, ret, .. }, Type::Function(func)) => {
            for (d, a) in declared_params.iter().zip(&func.params) {
                bind_params(d, a, params, bindings, span)?;
            }
            bind_params(ret, &func.return_type, params, bindings, span)
        }
        _ => Ok(()),
    }
}

/// Compile-time constant arguments bind after sized ones so that a sized
/// argument decides the width
pub(super) fn is_constant(ty: &Type) -> bool {
    matches!(
        ty,
        Type::Arithmetic(ArithmeticKind::CompileTimeInt(_))
            | Type::Boolean(BooleanKind::CompileTimeBool(_))
    )
}
