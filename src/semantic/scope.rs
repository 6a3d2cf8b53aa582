//! Scope management

use crate::parser::TypeHint;
use std::collections::HashMap;

/// What a name is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Function,
    Class,
    /// Name bound by an import, explicit or automatic
    ModuleAlias,
}

/// Symbol information
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub type_hint: Option<TypeHint>,
    /// Scope depth at which this symbol was defined (0 = global)
    pub depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Function,
    Class,
    Comprehension,
}

/// One symbol table
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    kind: ScopeKind,
    symbols: HashMap<String, Symbol>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new(ScopeKind::Global)
    }
}

impl Scope {
    pub fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            symbols: HashMap::new(),
        }
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    /// Bind `name`. Rebinding keeps the strongest kind: a function stays a
    /// function when assigned to later in the same scope.
    pub fn define(&mut self, name: &str, kind: SymbolKind, type_hint: Option<TypeHint>, depth: usize) {
        match self.symbols.get_mut(name) {
            Some(existing) => {
                if type_hint.is_some() {
                    existing.type_hint = type_hint;
                }
                if existing.kind == SymbolKind::Variable {
                    existing.kind = kind;
                }
            }
            None => {
                self.symbols.insert(
                    name.to_string(),
                    Symbol {
                        name: name.to_string(),
                        kind,
                        type_hint,
                        depth,
                    },
                );
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Bound names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.symbols.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Chain of scopes, global first
#[derive(Debug, Clone)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::with_global(Scope::new(ScopeKind::Global))
    }

    pub fn with_global(global: Scope) -> Self {
        Self {
            scopes: vec![global],
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len() - 1
    }

    pub fn push(&mut self, kind: ScopeKind) {
        self.scopes.push(Scope::new(kind));
    }

    pub fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Define in the innermost scope
    pub fn define(&mut self, name: &str, kind: SymbolKind, type_hint: Option<TypeHint>) {
        let depth = self.depth();
        if let Some(scope) = self.scopes.last_mut() {
            scope.define(name, kind, type_hint, depth);
        }
    }

    /// Define in the global scope regardless of nesting
    pub fn define_global(&mut self, name: &str, kind: SymbolKind) {
        self.scopes[0].define(name, kind, None, 0);
    }

    /// Walk outward. Class scopes are only visible from directly inside the
    /// class body, never from functions nested in it.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        let innermost = self.scopes.len() - 1;
        self.scopes
            .iter()
            .enumerate()
            .rev()
            .filter(|(i, scope)| scope.kind() != ScopeKind::Class || *i == innermost)
            .find_map(|(_, scope)| scope.lookup(name))
    }

    pub fn current_kind(&self) -> ScopeKind {
        self.scopes[self.scopes.len() - 1].kind()
    }

    /// Every name visible from the innermost scope, sorted and deduplicated
    pub fn visible_names(&self) -> Vec<String> {
        let innermost = self.scopes.len() - 1;
        let mut names: Vec<String> = self
            .scopes
            .iter()
            .enumerate()
            .filter(|(i, scope)| scope.kind() != ScopeKind::Class || *i == innermost)
            .flat_map(|(_, scope)| scope.names())
            .map(str::to_string)
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Consume the stack, returning the global scope
    pub fn into_global(mut self) -> Scope {
        self.scopes.truncate(1);
        self.scopes.remove(0)
    }
}
