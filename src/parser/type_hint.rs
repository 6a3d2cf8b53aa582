//! Type hint sub-parser
//!
//! The main parser collects the words of a hint and hands the text to this
//! pest grammar, which accepts both English and bracket forms. Names are kept
//! as written; the semantic analyzer validates and canonicalises them.

use super::ast::TypeHint;
use crate::error::{CompileError, Result};
use crate::location::SourceLocation;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "parser/type_hint.pest"]
struct TypeHintGrammar;

/// Parse hint text such as `list of int` or `dict[str, int]`
pub fn parse_type_hint(text: &str, loc: SourceLocation) -> Result<TypeHint> {
    let invalid = || CompileError::TypeHint {
        hint: text.to_string(),
        loc: loc.clone(),
    };

    let mut pairs = TypeHintGrammar::parse(Rule::type_hint, text).map_err(|_| invalid())?;
    let root = pairs
        .next()
        .and_then(|p| p.into_inner().find(|p| p.as_rule() != Rule::EOI))
        .ok_or_else(invalid)?;

    Ok(build_hint(root, &loc))
}

fn build_hint(pair: Pair<Rule>, loc: &SourceLocation) -> TypeHint {
    let rule = pair.as_rule();
    let mut words = Vec::new();
    let mut params = Vec::new();

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::name => words.push(inner.as_str().to_string()),
            Rule::of_kw | Rule::to_kw | Rule::optional_kw => {}
            _ => params.push(build_hint(inner, loc)),
        }
    }

    let name = if rule == Rule::optional {
        "optional".to_string()
    } else {
        words.join(" ")
    };

    TypeHint {
        name,
        params,
        loc: loc.clone(),
    }
}
