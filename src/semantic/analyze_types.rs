//! Type hint validation
//!
//! Hints are checked against a small vocabulary and rewritten to the Python
//! spelling. No inference happens here; a hint only has to name something
//! Python will accept.

use super::*;

/// Number of type parameters a container accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arity {
    /// `list` or `list[T]`
    OneOrNone,
    /// `optional[T]`
    One,
    /// `dict` or `dict[K, V]`
    NoneOrTwo,
    Any,
}

impl Arity {
    fn accepts(self, count: usize) -> bool {
        match self {
            Arity::OneOrNone => count <= 1,
            Arity::One => count == 1,
            Arity::NoneOrTwo => count == 0 || count == 2,
            Arity::Any => true,
        }
    }
}

/// Primitive spelling -> Python name
fn primitive(name: &str) -> Option<&'static str> {
    let canonical = match name {
        "int" | "integer" | "whole number" => "int",
        "float" | "decimal" | "number" | "decimal number" => "float",
        "str" | "string" | "text" => "str",
        "bool" | "boolean" => "bool",
        "bytes" => "bytes",
        "none" | "nothing" => "None",
        "any" => "Any",
        _ => return None,
    };
    Some(canonical)
}

/// Container spelling -> Python name and arity
fn container(name: &str) -> Option<(&'static str, Arity)> {
    let entry = match name {
        "list" => ("list", Arity::OneOrNone),
        "set" => ("set", Arity::OneOrNone),
        "frozenset" => ("frozenset", Arity::OneOrNone),
        "tuple" => ("tuple", Arity::Any),
        "dict" | "dictionary" | "map" => ("dict", Arity::NoneOrTwo),
        "optional" => ("Optional", Arity::One),
        "union" => ("Union", Arity::Any),
        "iterable" => ("typing.Iterable", Arity::OneOrNone),
        "iterator" => ("typing.Iterator", Arity::OneOrNone),
        "generator" => ("typing.Generator", Arity::Any),
        _ => return None,
    };
    Some(entry)
}

impl Analyzer {
    /// Validate and canonicalise a hint, recording any import it needs
    pub(super) fn check_hint(&mut self, hint: TypeHint) -> Result<TypeHint> {
        let invalid = |hint: &TypeHint| CompileError::TypeHint {
            hint: hint.to_string(),
            loc: hint.loc.clone(),
        };
        let lower = hint.name.to_ascii_lowercase();

        if let Some(canonical) = primitive(&lower) {
            if !hint.params.is_empty() {
                return Err(invalid(&hint));
            }
            if canonical == "Any" {
                self.require_name("Any");
            }
            return Ok(TypeHint::simple(canonical, hint.loc));
        }

        if let Some((canonical, arity)) = container(&lower) {
            if !arity.accepts(hint.params.len()) {
                return Err(invalid(&hint));
            }
            if canonical.starts_with("typing.") {
                self.require_name("typing");
            } else if canonical.starts_with(char::is_uppercase) {
                self.require_name(canonical);
            }
            let params = hint
                .params
                .into_iter()
                .map(|p| self.check_hint(p))
                .collect::<Result<Vec<_>>>()?;
            return Ok(TypeHint {
                name: canonical.to_string(),
                params,
                loc: hint.loc,
            });
        }

        if hint.params.is_empty() && self.is_class_name(&hint.name) {
            return Ok(hint);
        }
        Err(invalid(&hint))
    }

    /// A user class, an imported name, or a builtin exception
    fn is_class_name(&mut self, name: &str) -> bool {
        if let Some(symbol) = self.scopes.lookup(name) {
            return matches!(symbol.kind, SymbolKind::Class | SymbolKind::ModuleAlias);
        }
        if builtins::is_builtin_class(name) {
            return true;
        }
        match import_table::lookup(name) {
            Some(res) if res.bound_name == name => {
                self.record_import(&res);
                true
            }
            _ => false,
        }
    }

    /// Record the imports that bind `name`, if the table knows it
    pub(super) fn require_name(&mut self, name: &str) {
        if let Some(res) = import_table::lookup(name) {
            self.record_import(&res);
        }
    }
}
