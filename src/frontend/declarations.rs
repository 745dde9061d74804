//! Declaration helpers
//!
//! Used by the phase that populates the environment before any expression is
//! checked. Each helper resolves a declaration from the current scope and
//! records the result there; generic declarations are stored as templates.

use std::rc::Rc;

use log::debug;

use crate::frontend::ast::{FunctionDecl, Ident, StructDecl, TraitDecl, TypeExpr};
use crate::frontend::environment::{Environment, Symbol};
use crate::frontend::semantic::{CheckerOptions, SubstitutionMap, TypeResolver, RANGE_TYPE};
use crate::types::{MemoryLayout, Member, StorageClass, StructType, Template, Type, Visibility};
use crate::utils::{Result, Span};

fn resolver<'a>(env: &'a Environment, layout: &'a dyn MemoryLayout) -> TypeResolver<'a> {
    TypeResolver::new(env, layout, CheckerOptions::default().max_depth)
}

fn type_params(params: &[Ident]) -> Vec<String> {
    params.iter().map(|p| p.name.clone()).collect()
}

/// Register the built-in `Range { begin: u16, limit: u16 }`
pub fn declare_builtins(env: &mut Environment, layout: &dyn MemoryLayout) -> Result<()> {
    let members = ["begin", "limit"]
        .iter()
        .enumerate()
        .map(|(i, name)| Member {
            name: name.to_string(),
            ty: Type::U16,
            offset: i * layout.size_of(&Type::U16),
            storage: StorageClass::Automatic,
        })
        .collect();
    let range = StructType {
        name: RANGE_TYPE.to_string(),
        mangled_name: RANGE_TYPE.to_string(),
        members,
    };
    env.define_type(RANGE_TYPE, Type::Struct(Rc::new(range)), Span::dummy())
}

pub fn declare_variable(
    env: &mut Environment,
    name: &Ident,
    ty: Type,
    storage: StorageClass,
    offset: usize,
) -> Result<()> {
    let mut symbol = Symbol::new(ty).with_storage(storage, offset);
    symbol.span = name.span;
    env.define(&name.name, symbol)
}

pub fn declare_struct(
    env: &mut Environment,
    layout: &dyn MemoryLayout,
    decl: &StructDecl,
) -> Result<Type> {
    let name = &decl.name.name;
    let ty = if decl.type_params.is_empty() {
        let built = resolver(env, layout).build_struct(
            decl,
            env.current(),
            &SubstitutionMap::default(),
            name.clone(),
            name.clone(),
        )?;
        Type::Struct(Rc::new(built))
    } else {
        Type::GenericStruct(Rc::new(Template {
            name: name.clone(),
            params: type_params(&decl.type_params),
            decl: decl.clone(),
            scope: env.current(),
        }))
    };
    debug!("declared struct {}", name);
    env.define_type(name, ty.clone(), decl.span)?;
    Ok(ty)
}

/// `typealias Name = T`, the way unions are named
pub fn declare_type_alias(
    env: &mut Environment,
    layout: &dyn MemoryLayout,
    name: &Ident,
    ty: &TypeExpr,
) -> Result<Type> {
    let resolved = resolver(env, layout).resolve(ty, env.current())?;
    env.define_type(&name.name, resolved.clone(), name.span)?;
    Ok(resolved)
}

/// Declare a trait and its trait-object struct
pub fn declare_trait(
    env: &mut Environment,
    layout: &dyn MemoryLayout,
    decl: &TraitDecl,
) -> Result<Type> {
    let name = &decl.name.name;
    if !decl.type_params.is_empty() {
        let ty = Type::GenericTrait(Rc::new(Template {
            name: name.clone(),
            params: type_params(&decl.type_params),
            decl: decl.clone(),
            scope: env.current(),
        }));
        env.define_type(name, ty.clone(), decl.span)?;
        return Ok(ty);
    }

    let (trait_type, object) = resolver(env, layout).build_trait(
        decl,
        env.current(),
        &SubstitutionMap::default(),
        name.clone(),
        name.clone(),
    )?;
    debug!("declared trait {} with object {}", name, object.name);
    let object_name = object.name.clone();
    env.define_type(&object_name, Type::Struct(Rc::new(object)), decl.span)?;
    let ty = Type::Trait(Rc::new(trait_type));
    env.define_type(name, ty.clone(), decl.span)?;
    Ok(ty)
}

pub fn declare_function(
    env: &mut Environment,
    layout: &dyn MemoryLayout,
    decl: &FunctionDecl,
    visibility: Visibility,
) -> Result<Type> {
    let name = &decl.name.name;
    let ty = if decl.type_params.is_empty() {
        let built = resolver(env, layout).build_function(
            decl,
            env.current(),
            &SubstitutionMap::default(),
            name,
            name.clone(),
        )?;
        Type::Function(Rc::new(built))
    } else {
        Type::GenericFunction(Rc::new(Template {
            name: name.clone(),
            params: type_params(&decl.type_params),
            decl: decl.clone(),
            scope: env.current(),
        }))
    };
    let mut symbol = Symbol::new(ty.clone()).with_visibility(visibility);
    symbol.span = decl.span;
    env.define(name, symbol)?;
    Ok(ty)
}
