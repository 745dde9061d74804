//! Symbol environment
//!
//! A chain of scopes, each owning a name → symbol map and a name → type map.
//! Lookup walks outward from a starting scope through explicit parent links.
//! An earlier phase populates the environment; the expression checker only
//! reads it, apart from recording generic instantiations in the type cache.

use std::cell::RefCell;

use rustc_hash::FxHashMap;

use crate::types::{StorageClass, Type, Visibility};
use crate::utils::{CompilerError, Result, Span};

// ==================== Symbols ====================

/// Unique identifier for a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

/// A named storage location or function
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub ty: Type,
    pub storage: StorageClass,
    pub visibility: Visibility,
    /// Byte offset: absolute for static storage, frame-relative for automatic
    pub offset: usize,
    pub span: Span,
}

impl Symbol {
    /// Private static symbol at offset zero
    pub fn new(ty: Type) -> Self {
        Self {
            ty,
            storage: StorageClass::Static,
            visibility: Visibility::Private,
            offset: 0,
            span: Span::dummy(),
        }
    }

    pub fn with_storage(mut self, storage: StorageClass, offset: usize) -> Self {
        self.storage = storage;
        self.offset = offset;
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }
}

/// A scope containing symbols and nominal types
#[derive(Debug, Default)]
struct Scope {
    parent: Option<ScopeId>,
    symbols: FxHashMap<String, Symbol>,
    types: FxHashMap<String, Type>,
}

// ==================== Type Cache ====================

/// Concrete types produced by generic instantiation, keyed by mangled name
#[derive(Debug, Default)]
pub struct TypeCache {
    instances: RefCell<FxHashMap<String, Type>>,
}

impl TypeCache {
    pub fn get(&self, mangled_name: &str) -> Option<Type> {
        self.instances.borrow().get(mangled_name).cloned()
    }

    pub fn insert(&self, mangled_name: String, ty: Type) {
        self.instances.borrow_mut().insert(mangled_name, ty);
    }

    pub fn contains(&self, mangled_name: &str) -> bool {
        self.instances.borrow().contains_key(mangled_name)
    }

    pub fn len(&self) -> usize {
        self.instances.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.borrow().is_empty()
    }
}

// ==================== Environment ====================

/// Nested scopes plus the instantiation cache
#[derive(Debug)]
pub struct Environment {
    scopes: Vec<Scope>,
    current: ScopeId,
    cache: TypeCache,
}

impl Environment {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
            current: ScopeId(0),
            cache: TypeCache::default(),
        }
    }

    pub fn global(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn current(&self) -> ScopeId {
        self.current
    }

    /// Enter a new scope nested in the current one
    pub fn enter_scope(&mut self) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            parent: Some(self.current),
            ..Scope::default()
        });
        self.current = id;
        id
    }

    /// Return to the parent of the current scope
    pub fn exit_scope(&mut self) {
        if let Some(parent) = self.scopes.get(self.current.0).and_then(|s| s.parent) {
            self.current = parent;
        }
    }

    /// Define a symbol in the current scope
    pub fn define(&mut self, name: &str, symbol: Symbol) -> Result<()> {
        let scope = &mut self.scopes[self.current.0];
        if scope.symbols.contains_key(name) {
            return Err(CompilerError::DuplicateDefinition {
                name: name.to_string(),
                span: symbol.span,
            });
        }
        scope.symbols.insert(name.to_string(), symbol);
        Ok(())
    }

    /// Define a nominal type in the current scope
    pub fn define_type(&mut self, name: &str, ty: Type, span: Span) -> Result<()> {
        let scope = &mut self.scopes[self.current.0];
        if scope.types.contains_key(name) {
            return Err(CompilerError::DuplicateDefinition {
                name: name.to_string(),
                span,
            });
        }
        scope.types.insert(name.to_string(), ty);
        Ok(())
    }

    /// Look up a symbol, searching from the current scope outward
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.lookup_from(self.current, name)
    }

    /// Look up a symbol, searching from `scope` outward
    pub fn lookup_from(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        self.ancestors(scope).find_map(|s| s.symbols.get(name))
    }

    /// Look up a nominal type, searching from `scope` outward
    pub fn lookup_type_from(&self, scope: ScopeId, name: &str) -> Option<&Type> {
        self.ancestors(scope).find_map(|s| s.types.get(name))
    }

    pub fn lookup_type(&self, name: &str) -> Option<&Type> {
        self.lookup_type_from(self.current, name)
    }

    pub fn cache(&self) -> &TypeCache {
        &self.cache
    }

    /// `start` and its parents; empty for a scope this environment never created
    fn ancestors(&self, start: ScopeId) -> impl Iterator<Item = &Scope> + '_ {
        std::iter::successors(self.scopes.get(start.0), move |scope| {
            scope.parent.and_then(|id| self.scopes.get(id.0))
        })
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
