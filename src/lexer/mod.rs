//! Lexer module - Tokenization
//!
//! Turns Plain source into a lazy stream of tokens. Leading whitespace is
//! folded into `Indent`/`Dedent` tokens against an indent stack so the parser
//! can recover block structure. Words are emitted one by one; deciding where a
//! multi-word phrase starts and ends is left to the grammar resolver.

mod token;

pub use token::*;

use crate::error::{CompileError, Result};
use crate::location::SourceLocation;
use std::collections::VecDeque;

/// Prefixes allowed directly in front of a string literal
const STRING_PREFIXES: &[&str] = &["f", "r", "b", "rb", "br", "fr", "rf", "u"];

/// Words that may take a `'t` contraction (`doesn't`)
const CONTRACTIONS: &[&str] = &["doesn", "don", "isn", "aren", "can", "won"];

/// Lazy, restartable tokenizer
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    indent_stack: Vec<usize>,
    /// Indentation character fixed by the first indented line
    indent_char: Option<char>,
    pending: VecDeque<Token>,
    at_line_start: bool,
    bracket_depth: usize,
    last_kind: Option<TokenKind>,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            indent_stack: vec![0],
            indent_char: None,
            pending: VecDeque::new(),
            at_line_start: true,
            bracket_depth: 0,
            last_kind: None,
            finished: false,
        }
    }

    /// Rewind to the beginning of the source
    pub fn restart(&mut self) {
        *self = Lexer::new(self.source);
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn here(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }

    fn emit(&mut self, kind: TokenKind, text: impl Into<String>, loc: SourceLocation) -> Token {
        self.last_kind = Some(kind.clone());
        Token::new(kind, text, loc)
    }

    /// Produce the next token, `Ok(None)` once `Eof` has been handed out
    pub fn next_token(&mut self) -> Result<Option<Token>> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                self.last_kind = Some(token.kind.clone());
                return Ok(Some(token));
            }
            if self.finished {
                return Ok(None);
            }

            if self.at_line_start && self.bracket_depth == 0 {
                self.at_line_start = false;
                match self.read_indentation()? {
                    Some(width) => self.handle_indent(width)?,
                    None => self.finish(),
                }
                continue;
            }

            while matches!(self.peek(), Some(' ') | Some('\t') | Some('\r')) {
                self.advance();
            }

            let loc = self.here();
            let Some(c) = self.peek() else {
                self.finish();
                continue;
            };

            match c {
                '\n' => {
                    self.advance();
                    if self.bracket_depth > 0 {
                        continue;
                    }
                    self.at_line_start = true;
                    return Ok(Some(self.emit(TokenKind::Newline, "\n", loc)));
                }
                '#' => {
                    self.skip_to_line_end();
                }
                '"' | '\'' => {
                    let text = self.read_string(String::new(), loc.clone())?;
                    return Ok(Some(self.emit(TokenKind::Str, text, loc)));
                }
                c if c.is_ascii_digit() => {
                    let text = self.read_number();
                    return Ok(Some(self.emit(TokenKind::Number, text, loc)));
                }
                c if c.is_alphabetic() || c == '_' => {
                    let word = self.read_word();
                    if matches!(self.peek(), Some('"') | Some('\''))
                        && STRING_PREFIXES.contains(&word.to_ascii_lowercase().as_str())
                    {
                        let text = self.read_string(word, loc.clone())?;
                        return Ok(Some(self.emit(TokenKind::Str, text, loc)));
                    }
                    return Ok(Some(self.emit(TokenKind::Word, word, loc)));
                }
                _ => {
                    let text = self.read_punct(loc.clone())?;
                    return Ok(Some(self.emit(TokenKind::Punct, text, loc)));
                }
            }
        }
    }

    /// Measure the indentation of the next non-blank, non-comment line.
    /// Returns `None` at end of input.
    fn read_indentation(&mut self) -> Result<Option<usize>> {
        loop {
            let line_loc = self.here();
            let mut indent = String::new();
            while let Some(c @ (' ' | '\t')) = self.peek() {
                indent.push(c);
                self.advance();
            }

            match self.peek() {
                None => return Ok(None),
                Some('\n') | Some('\r') => {
                    self.skip_to_line_end();
                    self.advance();
                    continue;
                }
                Some('#') => {
                    self.skip_to_line_end();
                    self.advance();
                    continue;
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    self.skip_to_line_end();
                    self.advance();
                    continue;
                }
                Some(_) => {}
            }

            if indent.contains(' ') && indent.contains('\t') {
                return Err(CompileError::lex(
                    "indentation mixes tabs and spaces",
                    line_loc,
                ));
            }
            if let Some(first) = indent.chars().next() {
                match self.indent_char {
                    None => self.indent_char = Some(first),
                    Some(expected) if expected != first => {
                        return Err(CompileError::lex(
                            "inconsistent use of tabs and spaces in indentation",
                            line_loc,
                        ));
                    }
                    Some(_) => {}
                }
            }
            return Ok(Some(indent.chars().count()));
        }
    }

    fn handle_indent(&mut self, width: usize) -> Result<()> {
        let current = self.indent_stack.last().copied().unwrap_or(0);
        let loc = self.here();
        if width > current {
            self.indent_stack.push(width);
            self.pending.push_back(Token::new(TokenKind::Indent, "", loc));
        } else if width < current {
            while let Some(&top) = self.indent_stack.last() {
                if top > width {
                    self.indent_stack.pop();
                    self.pending.push_back(Token::new(TokenKind::Dedent, "", loc.clone()));
                } else {
                    break;
                }
            }
            if self.indent_stack.last().copied().unwrap_or(0) != width {
                return Err(CompileError::lex(
                    format!("dedent to {width} columns does not match any outer block"),
                    loc,
                ));
            }
        }
        Ok(())
    }

    /// Queue the closing layout tokens at end of input
    fn finish(&mut self) {
        let loc = self.here();
        if matches!(
            self.last_kind,
            Some(TokenKind::Word) | Some(TokenKind::Number) | Some(TokenKind::Str) | Some(TokenKind::Punct)
        ) {
            self.pending.push_back(Token::new(TokenKind::Newline, "\n", loc.clone()));
        }
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.pending.push_back(Token::new(TokenKind::Dedent, "", loc.clone()));
        }
        self.pending.push_back(Token::new(TokenKind::Eof, "", loc));
        self.finished = true;
    }

    fn skip_to_line_end(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }
        // doesn't, isn't, ...
        if self.peek() == Some('\'')
            && matches!(self.peek_at(1), Some('t') | Some('T'))
            && !self.peek_at(2).is_some_and(|c| c.is_alphanumeric() || c == '_')
            && CONTRACTIONS.contains(&word.to_ascii_lowercase().as_str())
        {
            self.advance();
            let t = self.advance().unwrap_or('t');
            word.push('\'');
            word.push(t);
        }
        word
    }

    fn read_number(&mut self) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '_' {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            text.push('.');
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() || c == '_' {
                    text.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }
        text
    }

    /// Read a quoted literal; the raw text (prefix and quotes included) is kept
    fn read_string(&mut self, prefix: String, start: SourceLocation) -> Result<String> {
        let mut text = prefix;
        let Some(quote) = self.advance() else {
            return Err(CompileError::lex("unterminated string literal", start));
        };
        text.push(quote);
        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Err(CompileError::lex("unterminated string literal", start));
                }
                Some('\\') => {
                    text.push('\\');
                    self.advance();
                    match self.peek() {
                        None | Some('\n') => {
                            return Err(CompileError::lex("unterminated string literal", start));
                        }
                        Some(escaped) => {
                            text.push(escaped);
                            self.advance();
                        }
                    }
                }
                Some(c) if c == quote => {
                    text.push(c);
                    self.advance();
                    return Ok(text);
                }
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
            }
        }
    }

    fn read_punct(&mut self, loc: SourceLocation) -> Result<String> {
        if let (Some(a), Some(b)) = (self.peek(), self.peek_at(1)) {
            let pair: String = [a, b].iter().collect();
            if MULTI_PUNCT.contains(&pair.as_str()) {
                self.advance();
                self.advance();
                return Ok(pair);
            }
        }
        let c = self.peek().unwrap_or('\0');
        if !SINGLE_PUNCT.contains(c) {
            return Err(CompileError::lex(format!("unexpected character '{c}'"), loc));
        }
        self.advance();
        match c {
            '(' | '[' | '{' => self.bracket_depth += 1,
            ')' | ']' | '}' => self.bracket_depth = self.bracket_depth.saturating_sub(1),
            _ => {}
        }
        Ok(c.to_string())
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_token() {
            Ok(Some(token)) => Some(Ok(token)),
            Ok(None) => None,
            Err(err) => {
                // A lex error ends the stream
                self.finished = true;
                self.pending.clear();
                Some(Err(err))
            }
        }
    }
}

/// Tokenize Plain source code into a finished token vector
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    Lexer::new(source).collect()
}
