//! Parser module - phrase-driven recursive descent parser
//!
//! Statements start with a phrase resolved through the grammar tables; the
//! parser then reads the operands the phrase calls for. Block structure comes
//! only from `Indent`/`Dedent` tokens. Parsing is all or nothing: the first
//! problem aborts the unit with a `SyntaxError`.

pub mod ast;
mod expr;
mod type_hint;

pub use ast::*;
pub use type_hint::parse_type_hint;

use expr::ADDITIVE_PRECEDENCE;

use crate::error::{CompileError, Result};
use crate::grammar::{Prefix, StmtRule, STATEMENT_RULES};
use crate::import_table::{self, LibraryEntry};
use crate::lexer::{tokenize, Token, TokenKind};
use crate::location::SourceLocation;

/// Python keywords, never valid as names
const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

/// Plain words that structure a phrase and never name a value
const RESERVED_WORDS: &[&str] = &[
    "then", "otherwise", "do", "be", "to", "called", "named", "takes", "returning", "each",
    "where", "than",
];

/// Words that may introduce a block or inline body after a header
const CLAUSE_LEADERS: &[&str] = &["then", "do", ":", ","];

/// Name bound by `connect to the database`
const DB_CONNECTION: &str = "db_connection";

/// Punctuation that turns a one-word phrase back into plain Python
const PYTHON_CONTINUATIONS: &[&str] = &["=", "+=", "-=", "*=", "/=", ".", "["];

/// Parse Plain source code into an AST
pub fn parse(source: &str) -> Result<Program> {
    let tokens = tokenize(source)?;
    parse_tokens(tokens)
}

/// Parse an already lexed token vector
pub fn parse_tokens(tokens: Vec<Token>) -> Result<Program> {
    Parser::new(tokens).parse_program()
}

pub(crate) fn is_valid_name(word: &str) -> bool {
    !PYTHON_KEYWORDS.contains(&word)
        && !RESERVED_WORDS.iter().any(|r| r.eq_ignore_ascii_case(word))
}

/// Recursive descent parser over a finished token vector
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Decorators from `apply decorator`, taken by the next definition
    pending_decorators: Vec<Expr>,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map_or(true, |t| t.kind != TokenKind::Eof) {
            let loc = tokens.last().map(|t| t.loc.clone()).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, "", loc));
        }
        Self {
            tokens,
            pos: 0,
            pending_decorators: Vec::new(),
        }
    }

    pub fn parse_program(&mut self) -> Result<Program> {
        self.skip_newlines();
        if self.check_kind(TokenKind::Eof) {
            return Err(self.error("empty input: nothing to compile"));
        }

        let mut statements = Vec::new();
        while !self.check_kind(TokenKind::Eof) {
            match self.peek().kind {
                TokenKind::Indent => return Err(self.error("unexpected indent")),
                TokenKind::Dedent => {
                    self.advance();
                }
                _ => {
                    if let Some(stmt) = self.parse_statement()? {
                        statements.push(stmt);
                    }
                }
            }
            self.skip_newlines();
        }

        self.check_dangling_decorators()?;
        Ok(Program { statements })
    }

    // ---------------------------------------------------------------
    // Token cursor
    // ---------------------------------------------------------------

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + offset).min(last)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn window(&self) -> &[Token] {
        &self.tokens[self.pos..]
    }

    fn check_kind(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn check_word(&self, word: &str) -> bool {
        self.peek().is_word(word)
    }

    fn check_punct(&self, punct: &str) -> bool {
        self.peek().is_punct(punct)
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.check_word(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_punct(&mut self, punct: &str) -> bool {
        if self.check_punct(punct) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Word or punctuation, depending on what `item` looks like
    fn check_item(&self, item: &str) -> bool {
        if item.starts_with(|c: char| c.is_ascii_alphabetic()) {
            self.check_word(item)
        } else {
            self.check_punct(item)
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<Token> {
        if self.check_word(word) {
            return Ok(self.advance());
        }
        Err(self.error(format!("expected '{}', found {}", word, self.peek())))
    }

    fn expect_punct(&mut self, punct: &str) -> Result<Token> {
        if self.check_punct(punct) {
            return Ok(self.advance());
        }
        Err(self.error(format!("expected '{}', found {}", punct, self.peek())))
    }

    fn expect_identifier(&mut self) -> Result<String> {
        let token = self.peek();
        if token.kind == TokenKind::Word && is_valid_name(&token.text) {
            return Ok(self.advance().text);
        }
        Err(self.error(format!("expected a name, found {}", token)))
    }

    fn eat_article(&mut self) {
        let next_is_word = self.peek_at(1).kind == TokenKind::Word;
        if next_is_word && (self.check_word("the") || self.check_word("a") || self.check_word("an")) {
            self.advance();
        }
    }

    fn at_line_end(&self) -> bool {
        self.peek().ends_line()
    }

    fn skip_newlines(&mut self) {
        while self.check_kind(TokenKind::Newline) || self.check_punct(";") {
            self.advance();
        }
    }

    fn here(&self) -> SourceLocation {
        self.peek().loc.clone()
    }

    /// Text of the tokens from `from` to the end of that line
    fn line_window(&self, from: usize) -> String {
        self.tokens[from.min(self.tokens.len() - 1)..]
            .iter()
            .take_while(|t| !t.ends_line())
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::syntax(message, self.here(), self.line_window(self.pos))
    }

    fn error_at(&self, message: impl Into<String>, loc: SourceLocation, from: usize) -> CompileError {
        CompileError::syntax(message, loc, self.line_window(from))
    }

    fn check_dangling_decorators(&self) -> Result<()> {
        match self.pending_decorators.first() {
            Some(decorator) => Err(CompileError::syntax(
                "decorator is not followed by a function or class definition",
                decorator.loc.clone(),
                String::new(),
            )),
            None => Ok(()),
        }
    }

    // ---------------------------------------------------------------
    // Statements and blocks
    // ---------------------------------------------------------------

    /// One statement plus its line ending
    fn parse_statement(&mut self) -> Result<Option<Stmt>> {
        let had_decorators = !self.pending_decorators.is_empty();
        let stmt = self.parse_statement_kind()?;

        if let Some(stmt) = &stmt {
            let is_definition = matches!(stmt.kind, StmtKind::FuncDef(_) | StmtKind::ClassDef { .. });
            if had_decorators && !is_definition {
                return Err(CompileError::syntax(
                    "decorator must be followed by a function or class definition",
                    stmt.loc.clone(),
                    String::new(),
                ));
            }
        }

        self.end_statement()?;
        Ok(stmt)
    }

    fn end_statement(&mut self) -> Result<()> {
        match self.peek().kind {
            TokenKind::Newline => {
                self.advance();
                Ok(())
            }
            TokenKind::Eof | TokenKind::Dedent => Ok(()),
            _ if self.check_punct(";") => {
                self.advance();
                Ok(())
            }
            // A compound statement already consumed its block
            _ if self.pos > 0
                && matches!(
                    self.tokens[self.pos - 1].kind,
                    TokenKind::Newline | TokenKind::Dedent
                ) =>
            {
                Ok(())
            }
            _ => Err(self.error(format!("unexpected {}", self.peek()))),
        }
    }

    /// Indented block following a header line; no indent means an empty body
    fn parse_block(&mut self) -> Result<Vec<Stmt>> {
        if self.check_kind(TokenKind::Newline) {
            self.advance();
        }
        if !self.check_kind(TokenKind::Indent) {
            return Ok(Vec::new());
        }
        self.advance();

        let mut body = Vec::new();
        loop {
            self.skip_newlines();
            match self.peek().kind {
                TokenKind::Dedent => {
                    self.advance();
                    break;
                }
                TokenKind::Eof => break,
                TokenKind::Indent => return Err(self.error("unexpected indent")),
                _ => {
                    if let Some(stmt) = self.parse_statement()? {
                        body.push(stmt);
                    }
                }
            }
        }

        self.check_dangling_decorators()?;
        Ok(body)
    }

    fn eat_clause_leaders(&mut self) {
        loop {
            let is_do_nothing = self.check_word("do") && self.peek_at(1).is_word("nothing");
            if is_do_nothing || !CLAUSE_LEADERS.iter().any(|l| self.check_item(l)) {
                break;
            }
            self.advance();
        }
    }

    /// Body after a header: an indented block, or one statement on the same line
    fn parse_clause_body(&mut self) -> Result<Vec<Stmt>> {
        self.eat_clause_leaders();
        if self.at_line_end() {
            return self.parse_block();
        }
        Ok(self.parse_statement_kind()?.into_iter().collect())
    }

    /// Consume a continuation phrase (`otherwise`, `catch`, ...) on this or the next line
    fn continuation(&mut self, allowed: &[StmtRule]) -> Option<StmtRule> {
        let mut start = self.pos;
        if self.tokens[start].kind == TokenKind::Newline {
            start += 1;
        }
        let m = STATEMENT_RULES.resolve(&self.tokens[start..])?;
        if !allowed.contains(&m.production) {
            return None;
        }
        self.pos = start + m.consumed;
        Some(m.production)
    }

    fn parse_statement_kind(&mut self) -> Result<Option<Stmt>> {
        let start = self.pos;
        let loc = self.here();

        let Some(m) = STATEMENT_RULES.resolve(self.window()) else {
            return self.parse_expression_statement().map(Some);
        };

        let next = self.peek_at(m.consumed);
        let python_call = (self.check_word("print") || m.production == StmtRule::Run)
            && next.is_punct("(");
        let python_stmt =
            m.consumed == 1 && PYTHON_CONTINUATIONS.iter().any(|p| next.is_punct(p));
        if python_call || python_stmt {
            return self.parse_expression_statement().map(Some);
        }

        if m.production.is_continuation() {
            return Err(self.error(format!(
                "'{}' does not follow a matching statement",
                self.line_window(start)
            )));
        }

        self.pos += m.consumed;
        let kind = match m.production {
            StmtRule::Let => self.parse_let()?,
            StmtRule::Set => self.parse_set()?,
            StmtRule::CreateVariable => self.parse_create_variable()?,
            StmtRule::CreateList => self.parse_create_list()?,
            StmtRule::CreateDict => self.parse_create_dict()?,
            StmtRule::Increase => self.parse_step(BinOp::Add)?,
            StmtRule::Decrease => self.parse_step(BinOp::Sub)?,
            StmtRule::Say => self.parse_say(&loc)?,
            StmtRule::PrintNumbers => self.parse_print_numbers(&loc)?,
            StmtRule::Log => {
                let level = self.tokens[start + 1].lower();
                self.parse_log(&level, &loc)?
            }
            StmtRule::If => self.parse_if()?,
            StmtRule::While => {
                let condition = self.parse_expression()?;
                let body = self.parse_clause_body()?;
                StmtKind::While { condition, body }
            }
            StmtRule::ForEach => self.parse_for_each()?,
            StmtRule::RepeatTimes => self.parse_repeat_times(&loc)?,
            StmtRule::RepeatUntil => {
                let condition = self.parse_expression()?;
                let body = self.parse_clause_body()?;
                let cond_loc = condition.loc.clone();
                StmtKind::While {
                    condition: Expr::new(
                        ExprKind::UnaryOp {
                            op: UnaryOp::Not,
                            operand: Box::new(condition),
                        },
                        cond_loc,
                    ),
                    body,
                }
            }
            StmtRule::RepeatWhile => {
                let condition = self.parse_expression()?;
                let body = self.parse_clause_body()?;
                StmtKind::While { condition, body }
            }
            StmtRule::RepeatForever => {
                let body = self.parse_clause_body()?;
                StmtKind::While {
                    condition: Expr::new(ExprKind::Bool(true), loc.clone()),
                    body,
                }
            }
            StmtRule::Break => StmtKind::Break,
            StmtRule::Continue => StmtKind::Continue,
            StmtRule::Pass => StmtKind::Pass,
            StmtRule::DefineFunction | StmtRule::DefineGenerator => self.parse_function(false, None)?,
            StmtRule::DefineAsyncFunction => self.parse_function(true, None)?,
            StmtRule::DefineMethod => self.parse_function(false, Some(MethodKind::Instance))?,
            StmtRule::DefineStaticMethod => self.parse_function(false, Some(MethodKind::Static))?,
            StmtRule::DefineClassMethod => self.parse_function(false, Some(MethodKind::Class))?,
            StmtRule::DefineProperty => self.parse_function(false, Some(MethodKind::Property))?,
            StmtRule::DefineClass => self.parse_class()?,
            StmtRule::Decorate => self.parse_decorate(&loc)?,
            StmtRule::ApplyDecorator => {
                let decorator = self.parse_expression()?;
                self.pending_decorators.push(decorator);
                return Ok(None);
            }
            StmtRule::Try => self.parse_try()?,
            StmtRule::Raise => {
                let value = if self.at_line_end() {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                StmtKind::Raise(value)
            }
            StmtRule::RaiseError => {
                self.eat_word("message");
                let message = self.parse_expression()?;
                let exception = Expr::name("Exception", loc.clone());
                StmtKind::Raise(Some(Expr::call(exception, vec![message], loc.clone())))
            }
            StmtRule::Assert => self.parse_assert()?,
            StmtRule::Using => self.parse_using()?,
            StmtRule::WaitFor => self.parse_wait_for(&loc)?,
            StmtRule::Sleep => {
                self.eat_word("for");
                let duration = self.parse_expression()?;
                self.parse_sleep_duration(duration)?
            }
            StmtRule::ApiEndpoint => self.parse_endpoint(false)?,
            StmtRule::AsyncApiEndpoint => self.parse_endpoint(true)?,
            StmtRule::ConnectDatabase => {
                let target = self.parse_expression()?;
                let connect = Expr::attribute(Expr::name("sqlite3", loc.clone()), "connect", loc.clone());
                StmtKind::Assign {
                    target: Expr::name(DB_CONNECTION, loc.clone()),
                    type_hint: None,
                    value: Expr::call(connect, vec![target], loc.clone()),
                }
            }
            StmtRule::QueryDatabase => StmtKind::Assign {
                target: Expr::name("result", loc.clone()),
                type_hint: None,
                value: self.database_execute(&loc)?,
            },
            StmtRule::InsertDatabase => {
                self.eat_word("with");
                StmtKind::Expr(self.database_execute(&loc)?)
            }
            StmtRule::Run => StmtKind::Expr(self.apply_prefix(Prefix::Call, loc.clone())?),
            StmtRule::Import => self.parse_import()?,
            StmtRule::FromImport => self.parse_from_import()?,
            StmtRule::UseLibrary => self.parse_use_library()?,
            StmtRule::Append => self.parse_collection_op(&loc, "to", "append")?,
            StmtRule::Remove => self.parse_collection_op(&loc, "from", "remove")?,
            StmtRule::Prepend => self.parse_prepend(&loc)?,
            StmtRule::Pop => {
                self.eat_article();
                self.parse_list_method(&loc, "pop")?
            }
            StmtRule::Delete => self.parse_delete(&loc)?,
            StmtRule::Sort => self.parse_sort(&loc)?,
            StmtRule::Reverse => self.parse_list_method(&loc, "reverse")?,
            StmtRule::Clear => self.parse_list_method(&loc, "clear")?,
            StmtRule::Exit => {
                self.eat_word("with");
                self.eat_word("code");
                let code = if self.at_line_end() {
                    Expr::new(ExprKind::Number("0".to_string()), loc.clone())
                } else {
                    self.parse_expression()?
                };
                Self::sys_exit(code, &loc)
            }
            StmtRule::StopProgram => {
                Self::sys_exit(Expr::new(ExprKind::Number("0".to_string()), loc.clone()), &loc)
            }
            StmtRule::Return => {
                let value = if self.at_line_end() || self.check_word("otherwise") {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                StmtKind::Return(value)
            }
            StmtRule::Yield => {
                let value = self.parse_expression()?;
                StmtKind::Expr(Expr::new(ExprKind::Yield(Some(Box::new(value))), loc.clone()))
            }
            StmtRule::ElseIf | StmtRule::Else | StmtRule::Catch | StmtRule::Finally => {
                return Err(self.error_at("unexpected continuation", loc, start));
            }
        };

        Ok(Some(Stmt::new(kind, loc)))
    }

    /// Fallback: a Python-style expression, assignment or augmented assignment
    fn parse_expression_statement(&mut self) -> Result<Stmt> {
        let start = self.pos;
        let loc = self.here();

        let target = self.parse_expression().map_err(|err| {
            let word = self.tokens[start].text.clone();
            err.with_hint(STATEMENT_RULES.nearest_phrase(&word).map(|p| format!("'{p}'")))
        })?;

        let aug_op = [
            ("+=", BinOp::Add),
            ("-=", BinOp::Sub),
            ("*=", BinOp::Mul),
            ("/=", BinOp::Div),
        ]
        .into_iter()
        .find(|(p, _)| self.check_punct(p))
        .map(|(_, op)| op);

        if self.check_punct("=") || self.check_punct(":") || aug_op.is_some() {
            if !target.is_assignable() {
                return Err(self.error_at("cannot assign to this expression", loc, start));
            }
        }

        let kind = if let Some(op) = aug_op {
            self.advance();
            let value = self.parse_expression()?;
            StmtKind::AugAssign { target, op, value }
        } else if self.eat_punct(":") {
            let type_hint = self.parse_hint_until(&["="])?;
            self.expect_punct("=")?;
            let value = self.parse_expression()?;
            StmtKind::Assign {
                target,
                type_hint: Some(type_hint),
                value,
            }
        } else if self.eat_punct("=") {
            let value = self.parse_expression()?;
            StmtKind::Assign {
                target,
                type_hint: None,
                value,
            }
        } else {
            StmtKind::Expr(target)
        };

        if !self.at_line_end() && !self.check_punct(";") && !self.check_word("otherwise") {
            let word = self.tokens[start].text.clone();
            let hint = STATEMENT_RULES.nearest_phrase(&word).map(|p| format!("'{p}'"));
            return Err(self
                .error_at("no phrase matches this statement", loc, start)
                .with_hint(hint));
        }

        Ok(Stmt::new(kind, loc))
    }

    // ---------------------------------------------------------------
    // Declarations
    // ---------------------------------------------------------------

    /// Assignment target: `x`, `my x`, `point.x`, `items[0]`
    fn parse_target(&mut self) -> Result<Expr> {
        let loc = self.here();
        let mut target = if self.eat_word("my") {
            let name = self.expect_identifier()?;
            Expr::attribute(Expr::name("self", loc.clone()), name, loc.clone())
        } else {
            self.eat_article();
            Expr::name(self.expect_identifier()?, loc.clone())
        };

        loop {
            if self.check_punct(".") && self.peek_at(1).kind == TokenKind::Word {
                self.advance();
                let attr = self.expect_identifier()?;
                target = Expr::attribute(target, attr, loc.clone());
            } else if self.check_punct("[") {
                target = self.parse_index(target)?;
            } else {
                break;
            }
        }
        Ok(target)
    }

    /// `of type T` or `: T`, read up to one of `terminators`
    fn parse_type_annotation(&mut self, terminators: &[&str]) -> Result<Option<TypeHint>> {
        if self.check_word("of") && self.peek_at(1).is_word("type") {
            self.pos += 2;
        } else if self.check_punct(":") && !self.peek_at(1).ends_line() {
            self.advance();
        } else {
            return Ok(None);
        }
        self.parse_hint_until(terminators).map(Some)
    }

    fn parse_hint_until(&mut self, terminators: &[&str]) -> Result<TypeHint> {
        let loc = self.here();
        let mut words: Vec<String> = Vec::new();
        let mut depth = 0usize;

        while !self.at_line_end() {
            if depth == 0 && terminators.iter().any(|t| self.check_item(t)) {
                break;
            }
            if self.check_punct("[") {
                depth += 1;
            } else if self.check_punct("]") {
                depth = depth.saturating_sub(1);
            }
            words.push(self.advance().text);
        }

        if matches!(words.first().map(|w| w.to_ascii_lowercase()).as_deref(), Some("a" | "an")) {
            words.remove(0);
        }
        if words.is_empty() {
            return Err(self.error("expected a type"));
        }
        parse_type_hint(&words.join(" "), loc)
    }

    fn parse_let(&mut self) -> Result<StmtKind> {
        let target = self.parse_target()?;
        let type_hint = self.parse_type_annotation(&["be", "="])?;
        if !self.eat_punct("=") {
            self.expect_word("be")?;
        }
        let value = self.parse_expression()?;
        Ok(StmtKind::Assign {
            target,
            type_hint,
            value,
        })
    }

    fn parse_set(&mut self) -> Result<StmtKind> {
        let target = self.parse_target()?;
        if !self.eat_punct("=") {
            self.expect_word("to")?;
        }
        let value = self.parse_expression()?;
        Ok(StmtKind::Assign {
            target,
            type_hint: None,
            value,
        })
    }

    /// `with value E`, `with E`, `set to E`, `equal to E`, `= E`
    fn parse_initial_value(&mut self) -> Result<Option<Expr>> {
        if self.eat_word("with") {
            self.eat_word("value");
        } else if (self.check_word("set") || self.check_word("equal"))
            && self.peek_at(1).is_word("to")
        {
            self.pos += 2;
        } else if !(self.eat_punct("=") || self.eat_word("be")) {
            return Ok(None);
        }
        self.parse_expression().map(Some)
    }

    fn parse_create_variable(&mut self) -> Result<StmtKind> {
        let loc = self.here();
        let target = Expr::name(self.expect_identifier()?, loc.clone());
        let type_hint = self.parse_type_annotation(&["with", "set", "equal", "=", "be"])?;
        let value = self
            .parse_initial_value()?
            .unwrap_or_else(|| Expr::new(ExprKind::NoneLit, loc));
        Ok(StmtKind::Assign {
            target,
            type_hint,
            value,
        })
    }

    fn parse_create_list(&mut self) -> Result<StmtKind> {
        let loc = self.here();
        let target = Expr::name(self.expect_identifier()?, loc.clone());
        let value = if self.eat_word("with") || self.eat_word("containing") {
            let mut items = self.parse_item_list()?;
            match items.as_slice() {
                [Expr {
                    kind: ExprKind::List(_),
                    ..
                }] => items.remove(0),
                _ => Expr::new(ExprKind::List(items), loc),
            }
        } else {
            Expr::new(ExprKind::List(Vec::new()), loc)
        };
        Ok(StmtKind::Assign {
            target,
            type_hint: None,
            value,
        })
    }

    fn parse_create_dict(&mut self) -> Result<StmtKind> {
        let loc = self.here();
        let target = Expr::name(self.expect_identifier()?, loc.clone());
        let value = match self.parse_initial_value()? {
            Some(value) => value,
            None => Expr::new(ExprKind::Dict(Vec::new()), loc),
        };
        Ok(StmtKind::Assign {
            target,
            type_hint: None,
            value,
        })
    }

    /// `increase X [by E]`
    fn parse_step(&mut self, op: BinOp) -> Result<StmtKind> {
        let target = self.parse_target()?;
        let value = if self.eat_word("by") {
            self.parse_expression()?
        } else {
            Expr::new(ExprKind::Number("1".to_string()), target.loc.clone())
        };
        Ok(StmtKind::AugAssign { target, op, value })
    }

    // ---------------------------------------------------------------
    // Output
    // ---------------------------------------------------------------

    fn parse_say(&mut self, loc: &SourceLocation) -> Result<StmtKind> {
        let mut args = Vec::new();
        if !self.at_line_end() && !self.check_word("otherwise") {
            args.push(self.parse_expression()?);
            while self.eat_punct(",") {
                args.push(self.parse_expression()?);
            }
        }
        let print = Expr::name("print", loc.clone());
        Ok(StmtKind::Expr(Expr::call(print, args, loc.clone())))
    }

    /// `print numbers from A to B`: one `print` per number, both ends included
    fn parse_print_numbers(&mut self, loc: &SourceLocation) -> Result<StmtKind> {
        let low = self.parse_expr_prec(ADDITIVE_PRECEDENCE)?;
        self.expect_word("to")?;
        let high = self.parse_expr_prec(ADDITIVE_PRECEDENCE)?;
        let number = Expr::name("number", loc.clone());
        let print = Expr::call(Expr::name("print", loc.clone()), vec![number], loc.clone());
        Ok(StmtKind::For {
            targets: vec!["number".to_string()],
            iter: self.inclusive_range(low, high, loc.clone()),
            body: vec![Stmt::expr(print)],
        })
    }

    fn parse_log(&mut self, level: &str, loc: &SourceLocation) -> Result<StmtKind> {
        let message = self.parse_expression()?;
        let logging = Expr::name("logging", loc.clone());
        Ok(StmtKind::Expr(Expr::method_call(
            logging,
            level,
            vec![message],
            loc.clone(),
        )))
    }

    // ---------------------------------------------------------------
    // Control flow
    // ---------------------------------------------------------------

    fn parse_if(&mut self) -> Result<StmtKind> {
        let condition = self.parse_expression()?;
        let then_body = self.parse_clause_body()?;

        let mut elif_clauses = Vec::new();
        let mut else_body = None;
        while let Some(rule) = self.continuation(&[StmtRule::ElseIf, StmtRule::Else]) {
            if rule == StmtRule::ElseIf {
                let condition = self.parse_expression()?;
                let body = self.parse_clause_body()?;
                elif_clauses.push((condition, body));
            } else {
                else_body = Some(self.parse_clause_body()?);
                break;
            }
        }

        Ok(StmtKind::If {
            condition,
            then_body,
            elif_clauses,
            else_body,
        })
    }

    /// Loop variables separated by commas or `and`
    fn parse_name_list(&mut self, stop: &[&str]) -> Result<Vec<String>> {
        let mut names = vec![self.expect_identifier()?];
        loop {
            let at_stop = stop.iter().any(|s| self.peek_at(1).is_word(s));
            if self.check_punct(",") || (self.check_word("and") && !at_stop) {
                self.advance();
                names.push(self.expect_identifier()?);
            } else {
                break;
            }
        }
        Ok(names)
    }

    fn parse_for_each(&mut self) -> Result<StmtKind> {
        let targets = self.parse_name_list(&[])?;
        let iter = if self.eat_word("from") {
            let loc = self.here();
            let low = self.parse_expr_prec(6)?;
            self.expect_word("to")?;
            let high = self.parse_expr_prec(6)?;
            self.inclusive_range(low, high, loc)
        } else {
            self.expect_word("in")?;
            self.parse_expression()?
        };
        let body = self.parse_clause_body()?;
        Ok(StmtKind::For {
            targets,
            iter,
            body,
        })
    }

    fn parse_repeat_times(&mut self, loc: &SourceLocation) -> Result<StmtKind> {
        let count = self.parse_unary()?;
        if !self.eat_word("times") {
            self.expect_word("time")?;
        }
        let body = self.parse_clause_body()?;
        let range = Expr::call(Expr::name("range", loc.clone()), vec![count], loc.clone());
        Ok(StmtKind::For {
            targets: vec!["_".to_string()],
            iter: range,
            body,
        })
    }

    // ---------------------------------------------------------------
    // Functions and classes
    // ---------------------------------------------------------------

    fn parse_function(&mut self, is_async: bool, method: Option<MethodKind>) -> Result<StmtKind> {
        let decorators = std::mem::take(&mut self.pending_decorators);
        let name = self.expect_identifier()?;

        let mut params = Vec::new();
        if self.check_punct("(") {
            params = self.parse_paren_params()?;
        } else if (self.check_word("that") || self.check_word("which"))
            && self.peek_at(1).is_word("takes")
        {
            self.pos += 2;
            params = self.parse_params()?;
        } else if self.eat_word("taking") {
            params = self.parse_params()?;
        }

        let return_type = if self.eat_word("returning") || self.eat_punct("->") {
            Some(self.parse_hint_until(&["and", "do", ":", "then", "that"])?)
        } else {
            None
        };

        let loc = self.here();
        let has_and = self.check_word("and") || self.check_word("that");
        let verb = if has_and { self.peek_at(1) } else { self.peek() }.lower();
        let skip = if has_and { 2 } else { 1 };
        let body = match verb.as_str() {
            "returns" | "return" => {
                self.pos += skip;
                vec![Stmt::new(StmtKind::Return(Some(self.parse_expression()?)), loc)]
            }
            "yields" | "yield" => {
                self.pos += skip;
                let value = self.parse_expression()?;
                vec![Stmt::expr(Expr::new(
                    ExprKind::Yield(Some(Box::new(value))),
                    loc,
                ))]
            }
            "does" | "do" if has_and || verb == "does" => {
                self.pos += skip;
                self.parse_statement_kind()?.into_iter().collect()
            }
            _ => self.parse_clause_body()?,
        };

        Ok(StmtKind::FuncDef(FunctionDef {
            name,
            params,
            return_type,
            body,
            decorators,
            is_async,
            method,
            is_generator: false,
        }))
    }

    /// One parameter: `name [of type T | : T] [defaulting to E | = E]`
    fn parse_param(&mut self, terminators: &[&str]) -> Result<Param> {
        let name = self.expect_identifier()?;
        let type_hint = self.parse_type_annotation(terminators)?;
        let default = if self.eat_word("defaulting") || self.eat_punct("=") {
            self.eat_word("to");
            Some(self.parse_expr_prec(crate::grammar::rules::NOT_PRECEDENCE)?)
        } else {
            None
        };
        Ok(Param {
            name,
            type_hint,
            default,
        })
    }

    /// English parameter list, ends before `and returns|does|yields`
    fn parse_params(&mut self) -> Result<Vec<Param>> {
        const ENDERS: &[&str] = &["returns", "return", "does", "do", "yields", "yield"];
        const HINT_END: &[&str] = &[",", "and", "defaulting", "=", "returning", "do", ":", "that"];

        if self.eat_word("nothing") {
            return Ok(Vec::new());
        }

        let mut params = vec![self.parse_param(HINT_END)?];
        loop {
            let next_ends = ENDERS.iter().any(|e| self.peek_at(1).is_word(e));
            if self.eat_punct(",") {
                self.eat_word("and");
            } else if self.check_word("and") && !next_ends {
                self.advance();
            } else {
                break;
            }
            params.push(self.parse_param(HINT_END)?);
        }
        Ok(params)
    }

    fn parse_paren_params(&mut self) -> Result<Vec<Param>> {
        self.expect_punct("(")?;
        let mut params = Vec::new();
        while !self.check_punct(")") {
            params.push(self.parse_param(&[",", "=", ")"])?);
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(")")?;
        Ok(params)
    }

    fn parse_class(&mut self) -> Result<StmtKind> {
        let decorators = std::mem::take(&mut self.pending_decorators);
        let name = self.expect_identifier()?;

        let mut bases = Vec::new();
        if self.eat_punct("(") {
            while !self.check_punct(")") {
                bases.push(self.parse_dotted_name()?);
                if !self.eat_punct(",") {
                    break;
                }
            }
            self.expect_punct(")")?;
        } else if self.eat_word("that") || self.eat_word("which") {
            if !self.eat_word("extends") {
                self.expect_word("inherits")?;
                self.expect_word("from")?;
            }
            bases.push(self.parse_dotted_name()?);
            while self.eat_punct(",") || self.eat_word("and") {
                bases.push(self.parse_dotted_name()?);
            }
        }

        let body = self.parse_clause_body()?;
        Ok(StmtKind::ClassDef {
            name,
            bases,
            decorators,
            body,
        })
    }

    /// `a.b.c` as a name or attribute chain
    fn parse_dotted_name(&mut self) -> Result<Expr> {
        let loc = self.here();
        let mut expr = Expr::name(self.expect_identifier()?, loc.clone());
        while self.check_punct(".") && self.peek_at(1).kind == TokenKind::Word {
            self.advance();
            expr = Expr::attribute(expr, self.expect_identifier()?, loc.clone());
        }
        Ok(expr)
    }

    /// `decorate F with D` rebinds `F` to `D(F)`
    fn parse_decorate(&mut self, loc: &SourceLocation) -> Result<StmtKind> {
        let target = self.parse_target()?;
        self.expect_word("with")?;
        let decorator = self.parse_expression()?;
        let value = Expr::call(decorator, vec![target.clone()], loc.clone());
        Ok(StmtKind::Assign {
            target,
            type_hint: None,
            value,
        })
    }

    // ---------------------------------------------------------------
    // Exceptions
    // ---------------------------------------------------------------

    fn parse_try(&mut self) -> Result<StmtKind> {
        let try_loc = self.tokens[self.pos.saturating_sub(1)].loc.clone();
        let body = self.parse_clause_body()?;

        let mut handlers = Vec::new();
        let mut finally_body = None;
        loop {
            let loc = self.peek_at(usize::from(self.check_kind(TokenKind::Newline))).loc.clone();
            match self.continuation(&[StmtRule::Catch, StmtRule::Finally]) {
                Some(StmtRule::Catch) => handlers.push(self.parse_handler(loc)?),
                Some(_) => {
                    finally_body = Some(self.parse_clause_body()?);
                    break;
                }
                None => break,
            }
        }

        if handlers.is_empty() && finally_body.is_none() {
            return Err(CompileError::syntax(
                "'try' needs an 'if something goes wrong' or 'finally' block",
                try_loc,
                String::new(),
            ));
        }

        Ok(StmtKind::Try {
            body,
            handlers,
            finally_body,
        })
    }

    fn parse_handler(&mut self, loc: SourceLocation) -> Result<Handler> {
        let mut exception = None;
        self.eat_article();
        let generic = ["error", "errors", "exception", "anything"];
        if generic.iter().any(|g| self.check_word(g)) {
            self.advance();
        } else if self.peek().kind == TokenKind::Word && !self.check_word("as") && is_valid_name(&self.peek().text) {
            exception = Some(self.parse_dotted_name()?);
        }

        let binding = if self.eat_word("as") {
            Some(self.expect_identifier()?)
        } else {
            None
        };
        if binding.is_some() && exception.is_none() {
            exception = Some(Expr::name("Exception", loc.clone()));
        }

        let body = self.parse_clause_body()?;
        Ok(Handler {
            exception,
            binding,
            body,
            loc,
        })
    }

    /// `make sure C [otherwise [say] M]`
    fn parse_assert(&mut self) -> Result<StmtKind> {
        let test = self.parse_expression()?;
        let msg = if self.eat_word("otherwise") || self.eat_punct(",") {
            for verb in ["say", "print", "show"] {
                if self.eat_word(verb) {
                    break;
                }
            }
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(StmtKind::Assert { test, msg })
    }

    // ---------------------------------------------------------------
    // Resources and concurrency
    // ---------------------------------------------------------------

    fn parse_using(&mut self) -> Result<StmtKind> {
        let resource = self.parse_expression()?;
        let binding = if self.eat_word("as") {
            Some(self.expect_identifier()?)
        } else {
            None
        };
        let body = self.parse_clause_body()?;
        Ok(StmtKind::Using {
            resource,
            binding,
            body,
        })
    }

    /// `wait for E` awaits; `wait for 2 seconds` sleeps
    fn parse_wait_for(&mut self, loc: &SourceLocation) -> Result<StmtKind> {
        let value = self.parse_expression()?;
        if Self::duration_unit(self.peek()).is_some() {
            return self.parse_sleep_duration(value);
        }
        Ok(StmtKind::Expr(Expr::new(
            ExprKind::WaitFor(Box::new(value)),
            loc.clone(),
        )))
    }

    fn duration_unit(token: &Token) -> Option<Option<(BinOp, &'static str)>> {
        match token.lower().as_str() {
            "second" | "seconds" | "sec" | "secs" => Some(None),
            "minute" | "minutes" | "min" | "mins" => Some(Some((BinOp::Mul, "60"))),
            "hour" | "hours" => Some(Some((BinOp::Mul, "3600"))),
            "millisecond" | "milliseconds" | "ms" => Some(Some((BinOp::Div, "1000"))),
            _ => None,
        }
    }

    /// Duration in seconds, scaled by an optional unit word
    fn parse_sleep_duration(&mut self, duration: Expr) -> Result<StmtKind> {
        let seconds = match Self::duration_unit(self.peek()) {
            Some(scale) => {
                self.advance();
                match scale {
                    Some((op, factor)) => {
                        let loc = duration.loc.clone();
                        Expr::new(
                            ExprKind::BinOp {
                                left: Box::new(duration),
                                op,
                                right: Box::new(Expr::new(
                                    ExprKind::Number(factor.to_string()),
                                    loc.clone(),
                                )),
                            },
                            loc,
                        )
                    }
                    None => duration,
                }
            }
            None => duration,
        };
        Ok(StmtKind::Sleep { seconds })
    }

    // ---------------------------------------------------------------
    // Web endpoints and databases
    // ---------------------------------------------------------------

    /// `create an api endpoint at "/users/<id>" that gets and returns E`
    fn parse_endpoint(&mut self, is_async: bool) -> Result<StmtKind> {
        let token = self.peek().clone();
        let route = match token.kind {
            TokenKind::Str => unquote(&token.text),
            _ => None,
        }
        .ok_or_else(|| self.error(format!("expected a quoted route, found {}", token)))?
        .to_string();
        self.advance();

        self.eat_word("that");
        let method = http_method(&self.peek().lower()).ok_or_else(|| {
            self.error(format!("expected 'gets', 'posts', 'puts', 'deletes' or 'patches', found {}", self.peek()))
        })?;
        self.advance();

        let loc = self.here();
        let mut body = if self.check_word("and") && self.peek_at(1).is_word("returns") {
            self.pos += 2;
            vec![Stmt::new(StmtKind::Return(Some(self.parse_expression()?)), loc.clone())]
        } else {
            if self.check_word("and") && self.peek_at(1).is_word("does") {
                self.pos += 2;
            }
            self.parse_clause_body()?
        };
        if body.is_empty() {
            let empty = Expr::new(ExprKind::Str("\"\"".to_string()), loc.clone());
            body.push(Stmt::new(StmtKind::Return(Some(empty)), loc));
        }

        Ok(StmtKind::Endpoint {
            route,
            method: method.to_string(),
            body,
            is_async,
        })
    }

    /// `db_connection.execute(E)`
    fn database_execute(&mut self, loc: &SourceLocation) -> Result<Expr> {
        let statement = self.parse_expression()?;
        let connection = Expr::name(DB_CONNECTION, loc.clone());
        Ok(Expr::method_call(connection, "execute", vec![statement], loc.clone()))
    }

    // ---------------------------------------------------------------
    // Modules
    // ---------------------------------------------------------------

    fn parse_module_path(&mut self) -> Result<String> {
        let mut path = self.expect_identifier()?;
        while self.check_punct(".") && self.peek_at(1).kind == TokenKind::Word {
            self.advance();
            path.push('.');
            path.push_str(&self.expect_identifier()?);
        }
        Ok(path)
    }

    fn parse_alias(&mut self) -> Result<Option<String>> {
        if self.eat_word("as") {
            Ok(Some(self.expect_identifier()?))
        } else {
            Ok(None)
        }
    }

    fn parse_import(&mut self) -> Result<StmtKind> {
        let module = self.parse_module_path()?;
        let alias = self.parse_alias()?;
        Ok(StmtKind::Import {
            module,
            alias,
            names: None,
        })
    }

    fn parse_from_import(&mut self) -> Result<StmtKind> {
        let module = self.parse_module_path()?;
        self.expect_word("import")?;
        let names = self.parse_name_list(&[])?;
        Ok(StmtKind::Import {
            module,
            alias: None,
            names: Some(names),
        })
    }

    /// `use [the] M [library|module|package] [as A]`; known libraries get their usual alias
    fn parse_use_library(&mut self) -> Result<StmtKind> {
        let module = self.parse_module_path()?;
        for noun in ["library", "module", "package"] {
            if self.eat_word(noun) {
                break;
            }
        }
        let alias = self.parse_alias()?;
        if alias.is_none() {
            if let Some((path, binding)) = import_table::library(&module).and_then(LibraryEntry::aliased_import) {
                return Ok(StmtKind::Import {
                    module: path.to_string(),
                    alias: Some(binding.to_string()),
                    names: None,
                });
            }
        }
        Ok(StmtKind::Import {
            module,
            alias,
            names: None,
        })
    }

    // ---------------------------------------------------------------
    // Collections and program exit
    // ---------------------------------------------------------------

    /// Skip the noun in `sort the list xs`
    fn eat_collection_noun(&mut self) {
        let nouns = ["list", "dictionary", "set", "collection"];
        let next_is_name = self.peek_at(1).kind == TokenKind::Word;
        if next_is_name && nouns.iter().any(|n| self.check_word(n)) {
            self.advance();
        }
    }

    /// `add E to L` / `remove E from L`
    fn parse_collection_op(&mut self, loc: &SourceLocation, joiner: &str, method: &str) -> Result<StmtKind> {
        let item = self.parse_expression()?;
        self.expect_word(joiner)?;
        self.eat_article();
        self.eat_collection_noun();
        let collection = self.parse_target()?;
        Ok(StmtKind::Expr(Expr::method_call(
            collection,
            method,
            vec![item],
            loc.clone(),
        )))
    }

    /// `prepend E to L` inserts at the front
    fn parse_prepend(&mut self, loc: &SourceLocation) -> Result<StmtKind> {
        let item = self.parse_expression()?;
        self.expect_word("to")?;
        self.eat_article();
        self.eat_collection_noun();
        let collection = self.parse_target()?;
        let front = Expr::new(ExprKind::Number("0".to_string()), loc.clone());
        Ok(StmtKind::Expr(Expr::method_call(
            collection,
            "insert",
            vec![front, item],
            loc.clone(),
        )))
    }

    fn parse_delete(&mut self, loc: &SourceLocation) -> Result<StmtKind> {
        let target = self.parse_expression()?;
        if self.eat_word("from") {
            self.eat_article();
            self.eat_collection_noun();
            let collection = self.parse_target()?;
            return Ok(StmtKind::Expr(Expr::method_call(
                collection,
                "remove",
                vec![target],
                loc.clone(),
            )));
        }
        if !target.is_assignable() {
            return Err(self.error("only names, attributes and items can be deleted"));
        }
        Ok(StmtKind::Delete(vec![target]))
    }

    fn parse_sort(&mut self, loc: &SourceLocation) -> Result<StmtKind> {
        self.eat_collection_noun();
        let collection = self.parse_target()?;
        let descending = if self.eat_word("descending") {
            true
        } else if self.check_word("in") && self.peek_at(1).is_word("reverse") {
            self.pos += 2;
            self.eat_word("order");
            true
        } else {
            self.eat_word("ascending");
            false
        };

        let func = Expr::attribute(collection, "sort", loc.clone());
        let kwargs = if descending {
            vec![("reverse".to_string(), Expr::new(ExprKind::Bool(true), loc.clone()))]
        } else {
            Vec::new()
        };
        Ok(StmtKind::Expr(Expr::new(
            ExprKind::Call {
                func: Box::new(func),
                args: Vec::new(),
                kwargs,
            },
            loc.clone(),
        )))
    }

    fn parse_list_method(&mut self, loc: &SourceLocation, method: &str) -> Result<StmtKind> {
        self.eat_collection_noun();
        let collection = self.parse_target()?;
        Ok(StmtKind::Expr(Expr::method_call(
            collection,
            method,
            Vec::new(),
            loc.clone(),
        )))
    }

    fn sys_exit(code: Expr, loc: &SourceLocation) -> StmtKind {
        let sys = Expr::name("sys", loc.clone());
        StmtKind::Expr(Expr::method_call(sys, "exit", vec![code], loc.clone()))
    }
}

/// Contents of a plain quoted string literal
fn unquote(raw: &str) -> Option<&str> {
    let quote = raw.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    raw.strip_prefix(quote)?.strip_suffix(quote)
}

/// HTTP method for the verb of an endpoint phrase
fn http_method(verb: &str) -> Option<&'static str> {
    match verb {
        "get" | "gets" => Some("GET"),
        "post" | "posts" => Some("POST"),
        "put" | "puts" => Some("PUT"),
        "delete" | "deletes" => Some("DELETE"),
        "patch" | "patches" => Some("PATCH"),
        _ => None,
    }
}

#[cfg(test)]
mod tests;
