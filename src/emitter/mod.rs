//! Emitter module - Python code generation
//!
//! Walks an analysed program and renders Python text line by line. Every
//! line that comes from a statement is recorded in the [`LineMap`].
//! Expressions are parenthesised from a precedence table, never from the
//! shape of the Plain source.

pub mod line_map;

pub use line_map::{LineMap, LineMapping};

use crate::error::{CompileError, Result};
use crate::location::SourceLocation;
use crate::parser::*;

pub const DEFAULT_INDENT_WIDTH: usize = 4;

// Binding strength, loosest first
const PREC_YIELD: u8 = 0;
const PREC_LAMBDA: u8 = 1;
const PREC_IFEXP: u8 = 2;
const PREC_OR: u8 = 3;
const PREC_AND: u8 = 4;
const PREC_NOT: u8 = 5;
const PREC_COMPARE: u8 = 6;
const PREC_ADD: u8 = 7;
const PREC_MUL: u8 = 8;
const PREC_UNARY: u8 = 9;
const PREC_POW: u8 = 10;
const PREC_AWAIT: u8 = 11;
const PREC_PRIMARY: u8 = 12;
const PREC_ATOM: u8 = 13;

/// Emit a program with the default indentation
pub fn emit(program: &Program, imports: &[String]) -> Result<(String, LineMap)> {
    PythonEmitter::new(DEFAULT_INDENT_WIDTH).emit_unit(program, imports)
}

/// Python code emitter
pub struct PythonEmitter {
    indent: usize,
    indent_width: usize,
    lines: Vec<String>,
    line_map: LineMap,
}

impl PythonEmitter {
    pub fn new(indent_width: usize) -> Self {
        Self {
            indent: 0,
            indent_width: indent_width.max(1),
            lines: Vec::new(),
            line_map: LineMap::new(),
        }
    }

    /// Imports, a blank line, then the program; always ends with a newline
    pub fn emit_unit(mut self, program: &Program, imports: &[String]) -> Result<(String, LineMap)> {
        for import in imports {
            self.lines.push(import.clone());
        }
        if !imports.is_empty() && !program.statements.is_empty() {
            self.lines.push(String::new());
        }

        self.emit_stmts(&program.statements)?;

        let mut python = self.lines.join("\n");
        python.push('\n');
        Ok((python, self.line_map))
    }

    fn line(&mut self, text: String, loc: &SourceLocation) {
        let indent = " ".repeat(self.indent * self.indent_width);
        self.lines.push(format!("{indent}{text}"));
        self.line_map.record(self.lines.len(), loc.line);
    }

    fn emit_stmts(&mut self, stmts: &[Stmt]) -> Result<()> {
        for stmt in stmts {
            self.emit_stmt(stmt)?;
        }
        Ok(())
    }

    /// Indented block; an empty body becomes `pass` on the header's line
    fn emit_block(&mut self, body: &[Stmt], header: &SourceLocation) -> Result<()> {
        self.indent += 1;
        let result = if body.is_empty() {
            self.line("pass".to_string(), header);
            Ok(())
        } else {
            self.emit_stmts(body)
        };
        self.indent -= 1;
        result
    }

    fn emit_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        let loc = &stmt.loc;
        if let Some(wait) = stmt_leftover(stmt) {
            return Err(CompileError::internal(
                "'wait for' expression reached the generator",
                wait.clone(),
            ));
        }

        match &stmt.kind {
            StmtKind::Assign {
                target,
                type_hint,
                value,
            } => {
                let target = self.expr(target, PREC_PRIMARY);
                let value = self.expr(value, PREC_YIELD);
                let text = match type_hint {
                    Some(hint) => format!("{target}: {hint} = {value}"),
                    None => format!("{target} = {value}"),
                };
                self.line(text, loc);
            }
            StmtKind::AugAssign { target, op, value } => {
                let text = format!(
                    "{} {}= {}",
                    self.expr(target, PREC_PRIMARY),
                    binop_symbol(*op),
                    self.expr(value, PREC_YIELD)
                );
                self.line(text, loc);
            }
            StmtKind::If {
                condition,
                then_body,
                elif_clauses,
                else_body,
            } => {
                let text = format!("if {}:", self.expr(condition, PREC_IFEXP));
                self.line(text, loc);
                self.emit_block(then_body, loc)?;
                for (cond, body) in elif_clauses {
                    let header = &cond.loc;
                    let text = format!("elif {}:", self.expr(cond, PREC_IFEXP));
                    self.line(text, header);
                    self.emit_block(body, header)?;
                }
                if let Some(body) = else_body {
                    let header = body.first().map_or(loc, |s| &s.loc);
                    self.line("else:".to_string(), header);
                    self.emit_block(body, header)?;
                }
            }
            StmtKind::While { condition, body } => {
                let text = format!("while {}:", self.expr(condition, PREC_IFEXP));
                self.line(text, loc);
                self.emit_block(body, loc)?;
            }
            StmtKind::For {
                targets,
                iter,
                body,
            } => {
                let text = format!("for {} in {}:", targets.join(", "), self.expr(iter, PREC_IFEXP));
                self.line(text, loc);
                self.emit_block(body, loc)?;
            }
            StmtKind::FuncDef(def) => self.emit_function(def, loc)?,
            StmtKind::ClassDef {
                name,
                bases,
                decorators,
                body,
            } => {
                self.emit_decorators(decorators, loc);
                let text = if bases.is_empty() {
                    format!("class {name}:")
                } else {
                    format!("class {name}({}):", self.expr_list(bases))
                };
                self.line(text, loc);
                self.emit_block(body, loc)?;
            }
            StmtKind::Try {
                body,
                handlers,
                finally_body,
            } => {
                self.line("try:".to_string(), loc);
                self.emit_block(body, loc)?;
                for handler in handlers {
                    let mut text = "except".to_string();
                    if let Some(exception) = &handler.exception {
                        text.push(' ');
                        text.push_str(&self.expr(exception, PREC_IFEXP));
                    }
                    if let Some(binding) = &handler.binding {
                        text.push_str(" as ");
                        text.push_str(binding);
                    }
                    text.push(':');
                    self.line(text, &handler.loc);
                    self.emit_block(&handler.body, &handler.loc)?;
                }
                if let Some(body) = finally_body {
                    let header = body.first().map_or(loc, |s| &s.loc);
                    self.line("finally:".to_string(), header);
                    self.emit_block(body, header)?;
                }
            }
            StmtKind::With {
                resource,
                binding,
                body,
                is_async,
            } => {
                let keyword = if *is_async { "async with" } else { "with" };
                let mut text = format!("{keyword} {}", self.expr(resource, PREC_IFEXP));
                if let Some(binding) = binding {
                    text.push_str(" as ");
                    text.push_str(binding);
                }
                text.push(':');
                self.line(text, loc);
                self.emit_block(body, loc)?;
            }
            StmtKind::Import {
                module,
                alias,
                names,
            } => {
                let text = match (names, alias) {
                    (Some(names), _) => format!("from {module} import {}", names.join(", ")),
                    (None, Some(alias)) => format!("import {module} as {alias}"),
                    (None, None) => format!("import {module}"),
                };
                self.line(text, loc);
            }
            StmtKind::Return(value) => {
                let text = match value {
                    Some(v) => format!("return {}", self.expr(v, PREC_LAMBDA)),
                    None => "return".to_string(),
                };
                self.line(text, loc);
            }
            StmtKind::Raise(value) => {
                let text = match value {
                    Some(v) => format!("raise {}", self.expr(v, PREC_IFEXP)),
                    None => "raise".to_string(),
                };
                self.line(text, loc);
            }
            StmtKind::Assert { test, msg } => {
                let mut text = format!("assert {}", self.expr(test, PREC_IFEXP));
                if let Some(msg) = msg {
                    text.push_str(", ");
                    text.push_str(&self.expr(msg, PREC_IFEXP));
                }
                self.line(text, loc);
            }
            StmtKind::Delete(targets) => {
                let text = format!("del {}", self.expr_list(targets));
                self.line(text, loc);
            }
            StmtKind::Break => self.line("break".to_string(), loc),
            StmtKind::Continue => self.line("continue".to_string(), loc),
            StmtKind::Pass => self.line("pass".to_string(), loc),
            StmtKind::Expr(expr) => {
                let text = self.expr(expr, PREC_YIELD);
                self.line(text, loc);
            }
            StmtKind::Using { .. } => {
                return Err(CompileError::internal("'using' block reached the generator", loc.clone()));
            }
            StmtKind::Sleep { .. } => {
                return Err(CompileError::internal("'wait' statement reached the generator", loc.clone()));
            }
            StmtKind::Endpoint { .. } => {
                return Err(CompileError::internal("api endpoint reached the generator", loc.clone()));
            }
        }
        Ok(())
    }

    fn emit_decorators(&mut self, decorators: &[Expr], loc: &SourceLocation) {
        for decorator in decorators {
            let text = format!("@{}", self.expr(decorator, PREC_PRIMARY));
            self.line(text, loc);
        }
    }

    fn emit_function(&mut self, def: &FunctionDef, loc: &SourceLocation) -> Result<()> {
        self.emit_decorators(&def.decorators, loc);

        let params: Vec<String> = def.params.iter().map(|p| self.param(p)).collect();
        let keyword = if def.is_async { "async def" } else { "def" };
        let mut text = format!("{keyword} {}({})", def.name, params.join(", "));
        if let Some(ret) = &def.return_type {
            text.push_str(&format!(" -> {ret}"));
        }
        text.push(':');
        self.line(text, loc);
        self.emit_block(&def.body, loc)
    }

    fn param(&self, param: &Param) -> String {
        match (&param.type_hint, &param.default) {
            (Some(hint), Some(default)) => {
                format!("{}: {} = {}", param.name, hint, self.expr(default, PREC_LAMBDA))
            }
            (Some(hint), None) => format!("{}: {}", param.name, hint),
            (None, Some(default)) => format!("{}={}", param.name, self.expr(default, PREC_LAMBDA)),
            (None, None) => param.name.clone(),
        }
    }

    // ---------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------

    fn expr_list(&self, exprs: &[Expr]) -> String {
        exprs
            .iter()
            .map(|e| self.expr(e, PREC_LAMBDA))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Render `expr`, parenthesised when it binds looser than `min`
    fn expr(&self, expr: &Expr, min: u8) -> String {
        let text = self.render(expr);
        if precedence(expr) < min {
            format!("({text})")
        } else {
            text
        }
    }

    fn render(&self, expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Number(raw) | ExprKind::Str(raw) => raw.clone(),
            ExprKind::Bool(true) => "True".to_string(),
            ExprKind::Bool(false) => "False".to_string(),
            ExprKind::NoneLit => "None".to_string(),
            ExprKind::Name(name) => name.clone(),
            ExprKind::BinOp { left, op, right } => {
                let p = binop_precedence(*op);
                let (left_min, right_min) = match op {
                    BinOp::Pow => (p + 1, PREC_UNARY),
                    _ if op.is_comparison() => (p + 1, p + 1),
                    _ => (p, p + 1),
                };
                format!(
                    "{} {} {}",
                    self.expr(left, left_min),
                    binop_symbol(*op),
                    self.expr(right, right_min)
                )
            }
            ExprKind::UnaryOp { op, operand } => match op {
                UnaryOp::Not => format!("not {}", self.expr(operand, PREC_NOT)),
                UnaryOp::Neg => format!("-{}", self.expr(operand, PREC_UNARY)),
            },
            ExprKind::Between { value, low, high } => format!(
                "{} <= {} <= {}",
                self.expr(low, PREC_COMPARE + 1),
                self.expr(value, PREC_COMPARE + 1),
                self.expr(high, PREC_COMPARE + 1)
            ),
            ExprKind::Call { func, args, kwargs } => {
                let mut parts: Vec<String> = args.iter().map(|a| self.expr(a, PREC_LAMBDA)).collect();
                parts.extend(
                    kwargs
                        .iter()
                        .map(|(name, value)| format!("{name}={}", self.expr(value, PREC_LAMBDA))),
                );
                format!("{}({})", self.expr(func, PREC_PRIMARY), parts.join(", "))
            }
            ExprKind::Attribute { value, attr } => {
                let base = self.expr(value, PREC_PRIMARY);
                // `1.real` would lex as a float
                if matches!(value.kind, ExprKind::Number(_)) {
                    format!("({base}).{attr}")
                } else {
                    format!("{base}.{attr}")
                }
            }
            ExprKind::Index { value, index } => {
                format!("{}[{}]", self.expr(value, PREC_PRIMARY), self.expr(index, PREC_LAMBDA))
            }
            ExprKind::Slice { lower, upper } => {
                let bound = |b: &Option<Box<Expr>>| {
                    b.as_ref().map(|e| self.expr(e, PREC_LAMBDA)).unwrap_or_default()
                };
                format!("{}:{}", bound(lower), bound(upper))
            }
            ExprKind::List(items) => format!("[{}]", self.expr_list(items)),
            ExprKind::Tuple(items) => match items.as_slice() {
                [single] => format!("({},)", self.expr(single, PREC_LAMBDA)),
                _ => format!("({})", self.expr_list(items)),
            },
            ExprKind::Dict(entries) => {
                let parts: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", self.expr(k, PREC_LAMBDA), self.expr(v, PREC_LAMBDA)))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            ExprKind::Comprehension {
                elt,
                targets,
                iter,
                condition,
            } => {
                let mut text = format!(
                    "[{} for {} in {}",
                    self.expr(elt, PREC_LAMBDA),
                    targets.join(", "),
                    self.expr(iter, PREC_OR)
                );
                if let Some(cond) = condition {
                    text.push_str(" if ");
                    text.push_str(&self.expr(cond, PREC_OR));
                }
                text.push(']');
                text
            }
            ExprKind::Lambda { params, body } => {
                if params.is_empty() {
                    format!("lambda: {}", self.expr(body, PREC_LAMBDA))
                } else {
                    format!("lambda {}: {}", params.join(", "), self.expr(body, PREC_LAMBDA))
                }
            }
            ExprKind::IfExp { test, body, orelse } => format!(
                "{} if {} else {}",
                self.expr(body, PREC_OR),
                self.expr(test, PREC_OR),
                self.expr(orelse, PREC_IFEXP)
            ),
            ExprKind::Await(inner) => format!("await {}", self.expr(inner, PREC_PRIMARY)),
            ExprKind::Yield(value) => match value {
                Some(v) => format!("yield {}", self.expr(v, PREC_LAMBDA)),
                None => "yield".to_string(),
            },
            // Rejected by `stmt_leftover` before rendering
            ExprKind::WaitFor(inner) => self.render(inner),
        }
    }
}

fn binop_symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::FloorDiv => "//",
        BinOp::Mod => "%",
        BinOp::Pow => "**",
        BinOp::Eq => "==",
        BinOp::NotEq => "!=",
        BinOp::Lt => "<",
        BinOp::Gt => ">",
        BinOp::LtEq => "<=",
        BinOp::GtEq => ">=",
        BinOp::In => "in",
        BinOp::NotIn => "not in",
        BinOp::Is => "is",
        BinOp::IsNot => "is not",
        BinOp::And => "and",
        BinOp::Or => "or",
    }
}

fn binop_precedence(op: BinOp) -> u8 {
    match op {
        BinOp::Or => PREC_OR,
        BinOp::And => PREC_AND,
        BinOp::Add | BinOp::Sub => PREC_ADD,
        BinOp::Mul | BinOp::Div | BinOp::FloorDiv | BinOp::Mod => PREC_MUL,
        BinOp::Pow => PREC_POW,
        _ => PREC_COMPARE,
    }
}

fn precedence(expr: &Expr) -> u8 {
    match &expr.kind {
        ExprKind::Yield(_) => PREC_YIELD,
        ExprKind::Lambda { .. } => PREC_LAMBDA,
        ExprKind::IfExp { .. } => PREC_IFEXP,
        ExprKind::BinOp { op, .. } => binop_precedence(*op),
        ExprKind::UnaryOp { op: UnaryOp::Not, .. } => PREC_NOT,
        ExprKind::UnaryOp { op: UnaryOp::Neg, .. } => PREC_UNARY,
        ExprKind::Between { .. } => PREC_COMPARE,
        ExprKind::Await(_) => PREC_AWAIT,
        ExprKind::Call { .. } | ExprKind::Attribute { .. } | ExprKind::Index { .. } => PREC_PRIMARY,
        _ => PREC_ATOM,
    }
}

/// Location of a `WaitFor` left anywhere in the statement's own expressions
fn stmt_leftover(stmt: &Stmt) -> Option<&SourceLocation> {
    let exprs: Vec<&Expr> = match &stmt.kind {
        StmtKind::Assign { target, value, .. } | StmtKind::AugAssign { target, value, .. } => {
            vec![target, value]
        }
        StmtKind::If {
            condition,
            elif_clauses,
            ..
        } => std::iter::once(condition)
            .chain(elif_clauses.iter().map(|(c, _)| c))
            .collect(),
        StmtKind::While { condition, .. } => vec![condition],
        StmtKind::For { iter, .. } => vec![iter],
        StmtKind::With { resource, .. } => vec![resource],
        StmtKind::Return(Some(e)) | StmtKind::Raise(Some(e)) => vec![e],
        StmtKind::Assert { test, msg } => std::iter::once(test).chain(msg.iter()).collect(),
        StmtKind::Delete(targets) => targets.iter().collect(),
        StmtKind::Expr(e) => vec![e],
        _ => Vec::new(),
    };
    exprs.into_iter().find_map(find_wait_for)
}

fn find_wait_for(expr: &Expr) -> Option<&SourceLocation> {
    let children: Vec<&Expr> = match &expr.kind {
        ExprKind::WaitFor(_) => return Some(&expr.loc),
        ExprKind::Number(_)
        | ExprKind::Str(_)
        | ExprKind::Bool(_)
        | ExprKind::NoneLit
        | ExprKind::Name(_) => Vec::new(),
        ExprKind::BinOp { left, right, .. } => vec![&**left, &**right],
        ExprKind::UnaryOp { operand, .. } => vec![&**operand],
        ExprKind::Between { value, low, high } => vec![&**value, &**low, &**high],
        ExprKind::Call { func, args, kwargs } => std::iter::once(&**func)
            .chain(args.iter())
            .chain(kwargs.iter().map(|(_, v)| v))
            .collect(),
        ExprKind::Attribute { value, .. } => vec![&**value],
        ExprKind::Index { value, index } => vec![&**value, &**index],
        ExprKind::Slice { lower, upper } => lower.iter().chain(upper.iter()).map(|b| &**b).collect(),
        ExprKind::List(items) | ExprKind::Tuple(items) => items.iter().collect(),
        ExprKind::Dict(entries) => entries.iter().flat_map(|(k, v)| [k, v]).collect(),
        ExprKind::Comprehension {
            elt, iter, condition, ..
        } => [&**elt, &**iter]
            .into_iter()
            .chain(condition.iter().map(|c| &**c))
            .collect(),
        ExprKind::Lambda { body, .. } => vec![&**body],
        ExprKind::IfExp { test, body, orelse } => vec![&**test, &**body, &**orelse],
        ExprKind::Await(inner) => vec![&**inner],
        ExprKind::Yield(value) => value.iter().map(|v| &**v).collect(),
    };
    children.into_iter().find_map(find_wait_for)
}

#[cfg(test)]
mod tests;
