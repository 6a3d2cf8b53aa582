//! Grammar Resolver
//!
//! Phrase rules are written as small pattern strings and compiled once into
//! [`RuleTable`]s. A table matches a window of tokens against every rule and
//! returns the most specific match: the rule that consumes the most tokens,
//! with ties going to whichever rule was registered first. Resolution never
//! depends on anything but the rule list and the tokens, so the same input
//! always resolves to the same production.
//!
//! Pattern syntax, one element per space-separated item:
//!
//! * `word`        a required word (case-insensitive)
//! * `(a|b)`       one of several required words
//! * `[a]`, `[a|b]` an optional word
//! * `==`, `**`    punctuation

pub mod rules;

pub use rules::{Infix, Prefix, StmtRule, INFIX_RULES, PREFIX_RULES, STATEMENT_RULES};

use crate::lexer::Token;
use crate::suggest;

/// One position in a phrase pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub options: Vec<&'static str>,
    pub optional: bool,
}

impl Element {
    fn accepts(&self, token: &Token) -> bool {
        self.options.iter().any(|option| {
            if option.starts_with(|c: char| c.is_ascii_alphabetic()) {
                token.is_word(option)
            } else {
                token.is_punct(option)
            }
        })
    }
}

/// Compile a pattern string into elements
pub fn compile_pattern(pattern: &'static str) -> Vec<Element> {
    pattern
        .split_whitespace()
        .map(|item| {
            if let Some(inner) = item.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                Element {
                    options: inner.split('|').collect(),
                    optional: true,
                }
            } else if let Some(inner) = item
                .strip_prefix('(')
                .and_then(|s| s.strip_suffix(')'))
                .filter(|s| !s.is_empty())
            {
                Element {
                    options: inner.split('|').collect(),
                    optional: false,
                }
            } else {
                Element {
                    options: vec![item],
                    optional: false,
                }
            }
        })
        .collect()
}

/// A registered phrase and the production it maps to
#[derive(Debug, Clone)]
pub struct Rule<P> {
    pub phrase: &'static str,
    pub elements: Vec<Element>,
    pub production: P,
}

/// Result of resolving a token window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleMatch<P> {
    pub production: P,
    /// Number of tokens the phrase covers
    pub consumed: usize,
    /// Registration index of the winning rule
    pub index: usize,
    pub phrase: &'static str,
}

/// Ordered list of phrase rules
#[derive(Debug, Clone)]
pub struct RuleTable<P> {
    rules: Vec<Rule<P>>,
}

impl<P: Copy> RuleTable<P> {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Build a table from `(pattern, production)` pairs in registration order
    pub fn from_specs(specs: &[(&'static str, P)]) -> Self {
        let mut table = Self::new();
        for (phrase, production) in specs {
            table.register(*phrase, *production);
        }
        table
    }

    pub fn register(&mut self, phrase: &'static str, production: P) -> &mut Self {
        self.rules.push(Rule {
            phrase,
            elements: compile_pattern(phrase),
            production,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[Rule<P>] {
        &self.rules
    }

    /// Most specific rule matching the start of `window`
    pub fn resolve(&self, window: &[Token]) -> Option<RuleMatch<P>> {
        let mut best: Option<RuleMatch<P>> = None;

        for (index, rule) in self.rules.iter().enumerate() {
            let Some(consumed) = match_elements(&rule.elements, window) else {
                continue;
            };
            if consumed == 0 {
                continue;
            }
            // Strictly longer wins, so earlier rules keep ties
            if best.map_or(true, |b| consumed > b.consumed) {
                best = Some(RuleMatch {
                    production: rule.production,
                    consumed,
                    index,
                    phrase: rule.phrase,
                });
            }
        }

        best
    }

    /// Phrase whose leading word is closest to `word`, for error hints
    pub fn nearest_phrase(&self, word: &str) -> Option<String> {
        let leading = self
            .rules
            .iter()
            .filter_map(|rule| rule.elements.iter().find(|e| !e.optional))
            .flat_map(|e| e.options.iter().copied());
        let closest = suggest::closest(word, leading)?;

        let rule = self.rules.iter().find(|rule| {
            rule.elements
                .iter()
                .find(|e| !e.optional)
                .is_some_and(|e| e.options.contains(&closest))
        })?;

        // Optional words other than articles are left out of the rendering
        let words: Vec<&str> = rule
            .elements
            .iter()
            .filter(|e| !e.optional || matches!(e.options[0], "a" | "an" | "the"))
            .map(|e| {
                if e.options.contains(&closest) {
                    closest
                } else {
                    e.options[0]
                }
            })
            .collect();
        Some(words.join(" "))
    }
}

impl<P: Copy> Default for RuleTable<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Number of tokens matched by `elements`, trying optional words both ways
fn match_elements(elements: &[Element], tokens: &[Token]) -> Option<usize> {
    let Some((first, rest)) = elements.split_first() else {
        return Some(0);
    };

    let head = tokens.first().filter(|tok| first.accepts(tok));
    if let Some(n) = head.and_then(|_| match_elements(rest, &tokens[1..])) {
        return Some(n + 1);
    }
    if first.optional {
        return match_elements(rest, tokens);
    }
    None
}
