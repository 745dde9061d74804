//! Type expression resolution
//!
//! Turns source type expressions into resolved `Type`s. Named types are looked
//! up from a given scope outward, with template parameters taken from a
//! substitution map first. The same resolver builds the field tables of
//! structs and traits, so declared and instantiated types share one layout.
//!
//! While a struct is being laid out its name resolves to a member-less shell
//! of the same nominal type. The shell may only appear behind a pointer,
//! slice or function type; a struct that contains itself by value is rejected.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::frontend::ast::{FunctionDecl, StructDecl, TraitDecl, TypeExpr};
use crate::frontend::environment::{Environment, ScopeId};
use crate::types::{
    ArithmeticKind, BooleanKind, FunctionType, MemoryLayout, Member, StorageClass, StructType,
    TraitType, Type,
};
use crate::utils::{CompilerError, Result, Span};

/// Template parameter name → concrete argument
pub type SubstitutionMap = FxHashMap<String, Type>;

/// Resolves type expressions against an environment
pub struct TypeResolver<'a> {
    pub(super) env: &'a Environment,
    pub(super) layout: &'a dyn MemoryLayout,
    /// Instantiations currently being built, by mangled name
    pub(super) in_progress: RefCell<FxHashSet<String>>,
    /// Structs being laid out, by mangled name
    shells: RefCell<FxHashMap<String, Type>>,
    /// Pointer, slice and function types enclosing the current position
    /// within the innermost struct being laid out
    indirection: Cell<usize>,
    pub(super) max_depth: usize,
}

impl<'a> TypeResolver<'a> {
    pub fn new(env: &'a Environment, layout: &'a dyn MemoryLayout, max_depth: usize) -> Self {
        Self {
            env,
            layout,
            in_progress: RefCell::new(FxHashSet::default()),
            shells: RefCell::new(FxHashMap::default()),
            indirection: Cell::new(0),
            max_depth,
        }
    }

    pub fn resolve(&self, ty: &TypeExpr, scope: ScopeId) -> Result<Type> {
        self.resolve_with(ty, scope, &SubstitutionMap::default())
    }

    pub fn resolve_with(&self, ty: &TypeExpr, scope: ScopeId, subst: &SubstitutionMap) -> Result<Type> {
        match ty {
            TypeExpr::Named(name, span) => self.resolve_named(name, scope, subst, *span),
            TypeExpr::Const(inner, _) => {
                let inner = self.resolve_with(inner, scope, subst)?;
                Ok(match inner {
                    Type::Arithmetic(ArithmeticKind::MutableInt(w)) => Type::const_int(w),
                    Type::Boolean(BooleanKind::MutableBool) => {
                        Type::Boolean(BooleanKind::ImmutableBool)
                    }
                    // const has no effect on compound types
                    other => other,
                })
            }
            TypeExpr::Pointer(inner, _) => {
                let pointee = self.indirect(|| self.resolve_with(inner, scope, subst))?;
                Ok(Type::pointer(pointee))
            }
            TypeExpr::Array { elem, count, .. } => {
                Ok(Type::array(*count, self.resolve_with(elem, scope, subst)?))
            }
            TypeExpr::DynamicArray(elem, _) => {
                let element = self.indirect(|| self.resolve_with(elem, scope, subst))?;
                Ok(Type::dynamic_array(element))
            }
            TypeExpr::Union(members, _) => {
                let members = members
                    .iter()
                    .map(|m| self.resolve_with(m, scope, subst))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Type::union_of(members))
            }
            TypeExpr::Function { params, ret, .. } => self.indirect(|| {
                let params = params
                    .iter()
                    .map(|p| self.resolve_with(p, scope, subst))
                    .collect::<Result<Vec<_>>>()?;
                let ret = self.resolve_with(ret, scope, subst)?;
                Ok(Type::Function(Rc::new(FunctionType::new(params, ret))))
            }),
            TypeExpr::Apply { name, args, span } => {
                let template = self
                    .env
                    .lookup_type_from(scope, &name.name)
                    .cloned()
                    .ok_or_else(|| CompilerError::UnresolvedType {
                        name: name.name.clone(),
                        span: name.span,
                    })?;
                let args = args
                    .iter()
                    .map(|a| self.resolve_with(a, scope, subst))
                    .collect::<Result<Vec<_>>>()?;
                self.apply(&template, args, *span)
            }
        }
    }

    fn resolve_named(&self, name: &str, scope: ScopeId, subst: &SubstitutionMap, span: Span) -> Result<Type> {
        if let Some(ty) = subst.get(name) {
            return self.check_shell(ty.clone(), span);
        }
        match name {
            "u8" => return Ok(Type::U8),
            "i8" => return Ok(Type::I8),
            "u16" => return Ok(Type::U16),
            "i16" => return Ok(Type::I16),
            "bool" => return Ok(Type::BOOL),
            "void" => return Ok(Type::Void),
            _ => {}
        }
        let shell = self.shells.borrow().get(name).cloned();
        if let Some(shell) = shell {
            return self.check_shell(shell, span);
        }
        match self.env.lookup_type_from(scope, name) {
            Some(ty) if ty.is_generic() => Err(CompilerError::GenericNotApplied {
                name: name.to_string(),
                span,
            }),
            Some(ty) => Ok(ty.clone()),
            None => Err(CompilerError::UnresolvedType {
                name: name.to_string(),
                span,
            }),
        }
    }

    /// Resolve with one more level of indirection around the result
    fn indirect<T>(&self, resolve: impl FnOnce() -> Result<T>) -> Result<T> {
        self.indirection.set(self.indirection.get() + 1);
        let result = resolve();
        self.indirection.set(self.indirection.get() - 1);
        result
    }

    /// The shell of a struct under construction, unless it is used by value
    pub(super) fn shell(&self, mangled_name: &str, span: Span) -> Option<Result<Type>> {
        let shell = self.shells.borrow().get(mangled_name).cloned()?;
        Some(self.check_shell(shell, span))
    }

    fn check_shell(&self, ty: Type, span: Span) -> Result<Type> {
        match &ty {
            Type::Struct(s)
                if self.indirection.get() == 0 && self.shells.borrow().contains_key(&s.mangled_name) =>
            {
                Err(CompilerError::RecursiveInstantiation {
                    application: s.name.clone(),
                    span,
                })
            }
            _ => Ok(ty),
        }
    }

    // ==================== Nominal Types ====================

    /// Lay out a struct's fields in declaration order
    pub fn build_struct(
        &self,
        decl: &StructDecl,
        scope: ScopeId,
        subst: &SubstitutionMap,
        name: String,
        mangled_name: String,
    ) -> Result<StructType> {
        let shell = StructType {
            name: name.clone(),
            mangled_name: mangled_name.clone(),
            members: Vec::new(),
        };
        self.shells
            .borrow_mut()
            .insert(mangled_name.clone(), Type::Struct(Rc::new(shell)));
        let enclosing = self.indirection.replace(0);
        let members = self.layout_fields(decl, scope, subst);
        self.indirection.set(enclosing);
        self.shells.borrow_mut().remove(&mangled_name);

        Ok(StructType {
            name,
            mangled_name,
            members: members?,
        })
    }

    fn layout_fields(&self, decl: &StructDecl, scope: ScopeId, subst: &SubstitutionMap) -> Result<Vec<Member>> {
        let mut members = Vec::with_capacity(decl.fields.len());
        let mut offset = 0;
        for field in &decl.fields {
            if members.iter().any(|m: &Member| m.name == field.name.name) {
                return Err(CompilerError::DuplicateDefinition {
                    name: field.name.name.clone(),
                    span: field.span,
                });
            }
            let ty = self.resolve_with(&field.ty, scope, subst)?;
            let size = self.layout.size_of(&ty);
            members.push(Member {
                name: field.name.name.clone(),
                ty,
                offset,
                storage: StorageClass::Automatic,
            });
            offset += size;
        }
        Ok(members)
    }

    pub fn build_function(
        &self,
        decl: &FunctionDecl,
        scope: ScopeId,
        subst: &SubstitutionMap,
        name: &str,
        mangled_name: String,
    ) -> Result<FunctionType> {
        let (params, return_type) = self.indirect(|| {
            let params = decl
                .params
                .iter()
                .map(|p| self.resolve_with(&p.ty, scope, subst))
                .collect::<Result<Vec<_>>>()?;
            let return_type = match &decl.ret_type {
                Some(ret) => self.resolve_with(ret, scope, subst)?,
                None => Type::Void,
            };
            Ok((params, return_type))
        })?;
        let mut func = FunctionType::named(name, params, return_type);
        func.mangled_name = Some(mangled_name);
        Ok(func)
    }

    /// Build a trait's method table together with its trait-object struct
    pub fn build_trait(
        &self,
        decl: &TraitDecl,
        scope: ScopeId,
        subst: &SubstitutionMap,
        name: String,
        mangled_name: String,
    ) -> Result<(TraitType, StructType)> {
        let object_name = format!("__{}_object", mangled_name.trim_start_matches("__"));

        let receiver = Type::pointer(Type::Void);
        let mut methods = Vec::with_capacity(decl.methods.len());
        let mut slots = vec![Member {
            name: "object".to_string(),
            offset: 0,
            storage: StorageClass::Automatic,
            ty: receiver.clone(),
        }];
        let mut offset = self.layout.size_of(&receiver);

        for method in &decl.methods {
            if methods.iter().any(|m: &Member| m.name == method.name.name) {
                return Err(CompilerError::DuplicateDefinition {
                    name: method.name.name.clone(),
                    span: method.span,
                });
            }
            let mangled = format!("{}_{}", mangled_name, method.name.name);
            let signature = Type::Function(Rc::new(self.build_function(
                method,
                scope,
                subst,
                &method.name.name,
                mangled,
            )?));
            let slot = Type::pointer(signature.clone());
            methods.push(Member {
                name: method.name.name.clone(),
                ty: signature,
                offset,
                storage: StorageClass::Automatic,
            });
            let size = self.layout.size_of(&slot);
            slots.push(Member {
                name: method.name.name.clone(),
                ty: slot,
                offset,
                storage: StorageClass::Automatic,
            });
            offset += size;
        }

        let object = StructType {
            name: object_name.clone(),
            mangled_name: object_name.clone(),
            members: slots,
        };
        let trait_type = TraitType {
            name,
            mangled_name,
            members: methods,
            trait_object_name: object_name,
        };
        Ok((trait_type, object))
    }
}
