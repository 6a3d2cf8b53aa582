//! Expression parsing
//!
//! Precedence climbing over the infix phrase table. Prefix phrases such as
//! `the length of` take a single operand, so `the length of xs plus 1` reads
//! as `len(xs) + 1`.

use super::{is_valid_name, Parser};
use crate::error::Result;
use crate::grammar::rules::{NOT_PRECEDENCE, UNARY_PRECEDENCE};
use crate::grammar::{Infix, Prefix, INFIX_RULES, PREFIX_RULES};
use crate::lexer::TokenKind;
use crate::location::SourceLocation;
use crate::parser::ast::*;

/// Precedence of `or`, the loosest level inside a comprehension or condition
const OR_PRECEDENCE: u8 = 2;
/// Precedence of `+`/`-`, used for range bounds
pub(super) const ADDITIVE_PRECEDENCE: u8 = 6;

const NUMBER_WORDS: &[(&str, &str)] = &[
    ("zero", "0"),
    ("one", "1"),
    ("two", "2"),
    ("three", "3"),
    ("four", "4"),
    ("five", "5"),
    ("six", "6"),
    ("seven", "7"),
    ("eight", "8"),
    ("nine", "9"),
    ("ten", "10"),
];

impl Parser {
    pub(super) fn parse_expression(&mut self) -> Result<Expr> {
        self.parse_expr_prec(1)
    }

    pub(super) fn parse_expr_prec(&mut self, min_prec: u8) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;

        while let Some(m) = INFIX_RULES.resolve(self.window()) {
            let prec = m.production.precedence();
            if prec < min_prec {
                break;
            }
            let loc = self.here();
            self.pos += m.consumed;
            lhs = self.apply_infix(lhs, m.production, prec, loc)?;
        }

        Ok(lhs)
    }

    fn apply_infix(&mut self, lhs: Expr, infix: Infix, prec: u8, loc: SourceLocation) -> Result<Expr> {
        let binary = |left: Expr, op: BinOp, right: Expr, loc: SourceLocation| {
            Expr::new(
                ExprKind::BinOp {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                loc,
            )
        };

        let expr = match infix {
            Infix::Or => binary(lhs, BinOp::Or, self.parse_expr_prec(prec + 1)?, loc),
            Infix::And => binary(lhs, BinOp::And, self.parse_expr_prec(prec + 1)?, loc),
            Infix::Compare(op) => {
                let rhs = self.parse_expr_prec(prec + 1)?;
                // `x is nothing` compares identity
                let op = match (op, &rhs.kind) {
                    (BinOp::Eq, ExprKind::NoneLit) => BinOp::Is,
                    (BinOp::NotEq, ExprKind::NoneLit) => BinOp::IsNot,
                    (op, _) => op,
                };
                binary(lhs, op, rhs, loc)
            }
            Infix::Contains => binary(self.parse_expr_prec(prec + 1)?, BinOp::In, lhs, loc),
            Infix::NotContains => binary(self.parse_expr_prec(prec + 1)?, BinOp::NotIn, lhs, loc),
            Infix::Between => {
                let low = self.parse_expr_prec(prec + 1)?;
                self.expect_word("and")?;
                let high = self.parse_expr_prec(prec + 1)?;
                Expr::new(
                    ExprKind::Between {
                        value: Box::new(lhs),
                        low: Box::new(low),
                        high: Box::new(high),
                    },
                    loc,
                )
            }
            Infix::StartsWith => {
                let prefix = self.parse_expr_prec(prec + 1)?;
                Expr::method_call(lhs, "startswith", vec![prefix], loc)
            }
            Infix::EndsWith => {
                let suffix = self.parse_expr_prec(prec + 1)?;
                Expr::method_call(lhs, "endswith", vec![suffix], loc)
            }
            Infix::IsEmpty | Infix::IsNotEmpty => {
                let len = Expr::call(Expr::name("len", loc.clone()), vec![lhs], loc.clone());
                let zero = Expr::new(ExprKind::Number("0".to_string()), loc.clone());
                let op = if infix == Infix::IsEmpty {
                    BinOp::Eq
                } else {
                    BinOp::NotEq
                };
                binary(len, op, zero, loc)
            }
            Infix::Arith(op) => {
                let next = if infix.is_right_assoc() { prec } else { prec + 1 };
                binary(lhs, op, self.parse_expr_prec(next)?, loc)
            }
            Infix::Convert(func) => Expr::call(Expr::name(func, loc.clone()), vec![lhs], loc),
            Infix::Conditional => {
                let test = self.parse_expr_prec(OR_PRECEDENCE)?;
                if !self.eat_word("otherwise") {
                    self.expect_word("else")?;
                }
                let orelse = self.parse_expr_prec(prec)?;
                Expr::new(
                    ExprKind::IfExp {
                        test: Box::new(test),
                        body: Box::new(lhs),
                        orelse: Box::new(orelse),
                    },
                    loc,
                )
            }
        };
        Ok(expr)
    }

    pub(super) fn parse_unary(&mut self) -> Result<Expr> {
        match PREFIX_RULES.resolve(self.window()) {
            Some(m) => {
                let loc = self.here();
                self.pos += m.consumed;
                self.apply_prefix(m.production, loc)
            }
            None => {
                let primary = self.parse_primary()?;
                self.parse_postfix_ops(primary)
            }
        }
    }

    fn builtin_call(func: &str, arg: Expr, loc: &SourceLocation) -> Expr {
        Expr::call(Expr::name(func, loc.clone()), vec![arg], loc.clone())
    }

    pub(super) fn apply_prefix(&mut self, prefix: Prefix, loc: SourceLocation) -> Result<Expr> {
        let expr = match prefix {
            Prefix::LengthOf => Self::builtin_call("len", self.parse_unary()?, &loc),
            Prefix::SumOf => Self::builtin_call("sum", self.parse_unary()?, &loc),
            Prefix::MaxOf => Self::builtin_call("max", self.parse_unary()?, &loc),
            Prefix::MinOf => Self::builtin_call("min", self.parse_unary()?, &loc),
            Prefix::AbsOf => Self::builtin_call("abs", self.parse_unary()?, &loc),
            Prefix::AverageOf => {
                let values = self.parse_unary()?;
                let total = Self::builtin_call("sum", values.clone(), &loc);
                let count = Self::builtin_call("len", values, &loc);
                Expr::new(
                    ExprKind::BinOp {
                        left: Box::new(total),
                        op: BinOp::Div,
                        right: Box::new(count),
                    },
                    loc,
                )
            }
            Prefix::Uppercase => Expr::method_call(self.parse_unary()?, "upper", vec![], loc),
            Prefix::Lowercase => Expr::method_call(self.parse_unary()?, "lower", vec![], loc),
            Prefix::Ask => {
                let args = if self.at_line_end() || self.check_punct(")") {
                    vec![]
                } else {
                    vec![self.parse_unary()?]
                };
                Expr::call(Expr::name("input", loc.clone()), args, loc)
            }
            Prefix::Call | Prefix::New => {
                let callee = self.parse_callee()?;
                if self.check_punct("(") {
                    let call = self.parse_call_args(callee)?;
                    return self.parse_postfix_ops(call);
                }
                let args = if self.eat_word("with") {
                    self.parse_item_list()?
                } else {
                    vec![]
                };
                Expr::call(callee, args, loc)
            }
            Prefix::ListOf => self.parse_list_phrase(loc)?,
            Prefix::EmptyList => Expr::new(ExprKind::List(vec![]), loc),
            Prefix::EmptyDict => Expr::new(ExprKind::Dict(vec![]), loc),
            Prefix::My => {
                let name = self.expect_identifier()?;
                let attr = Expr::attribute(Expr::name("self", loc.clone()), name, loc);
                return self.parse_postfix_ops(attr);
            }
            Prefix::WaitFor => Expr::new(ExprKind::WaitFor(Box::new(self.parse_unary()?)), loc),
            Prefix::RandomBetween => {
                let low = self.parse_expr_prec(ADDITIVE_PRECEDENCE)?;
                self.expect_word("and")?;
                let high = self.parse_expr_prec(ADDITIVE_PRECEDENCE)?;
                let randint = Expr::attribute(Expr::name("random", loc.clone()), "randint", loc.clone());
                Expr::call(randint, vec![low, high], loc)
            }
            Prefix::NumbersFrom => {
                let low = self.parse_expr_prec(ADDITIVE_PRECEDENCE)?;
                self.expect_word("to")?;
                let high = self.parse_expr_prec(ADDITIVE_PRECEDENCE)?;
                self.inclusive_range(low, high, loc)
            }
            Prefix::Lambda => self.parse_lambda(loc)?,
            Prefix::OpenFile => {
                let path = self.parse_unary()?;
                let mode = if self.eat_word("for") {
                    let mode = match self.peek().lower().as_str() {
                        "reading" => "\"r\"",
                        "writing" => "\"w\"",
                        "appending" => "\"a\"",
                        _ => return Err(self.error(format!("unknown file mode {}", self.peek()))),
                    };
                    self.advance();
                    mode
                } else {
                    "\"r\""
                };
                let mode = Expr::new(ExprKind::Str(mode.to_string()), loc.clone());
                Expr::call(Expr::name("open", loc.clone()), vec![path, mode], loc)
            }
            Prefix::Not => Expr::new(
                ExprKind::UnaryOp {
                    op: UnaryOp::Not,
                    operand: Box::new(self.parse_expr_prec(NOT_PRECEDENCE)?),
                },
                loc,
            ),
            Prefix::Negative => Expr::new(
                ExprKind::UnaryOp {
                    op: UnaryOp::Neg,
                    operand: Box::new(self.parse_expr_prec(UNARY_PRECEDENCE)?),
                },
                loc,
            ),
        };
        Ok(expr)
    }

    /// `range(low, high + 1)`
    pub(super) fn inclusive_range(&self, low: Expr, high: Expr, loc: SourceLocation) -> Expr {
        let one = Expr::new(ExprKind::Number("1".to_string()), loc.clone());
        let upper = Expr::new(
            ExprKind::BinOp {
                left: Box::new(high),
                op: BinOp::Add,
                right: Box::new(one),
            },
            loc.clone(),
        );
        Expr::call(Expr::name("range", loc.clone()), vec![low, upper], loc)
    }

    /// Items separated by commas and `and`: `1, 2 and 3`
    pub(super) fn parse_item_list(&mut self) -> Result<Vec<Expr>> {
        let mut items = vec![self.parse_expr_prec(NOT_PRECEDENCE)?];
        while self.eat_punct(",") || self.eat_word("and") {
            self.eat_word("and");
            items.push(self.parse_expr_prec(NOT_PRECEDENCE)?);
        }
        Ok(items)
    }

    /// `a list of A, B and C` or `a list of E for each X in L [where C]`
    fn parse_list_phrase(&mut self, loc: SourceLocation) -> Result<Expr> {
        let first = self.parse_expr_prec(NOT_PRECEDENCE)?;
        if self.check_word("for") {
            return self.parse_comprehension(first, loc);
        }

        let mut items = vec![first];
        while self.eat_punct(",") || self.eat_word("and") {
            self.eat_word("and");
            items.push(self.parse_expr_prec(NOT_PRECEDENCE)?);
        }
        Ok(Expr::new(ExprKind::List(items), loc))
    }

    /// Tail of a comprehension, starting at `for`
    fn parse_comprehension(&mut self, elt: Expr, loc: SourceLocation) -> Result<Expr> {
        self.expect_word("for")?;
        if !self.eat_word("each") {
            self.eat_word("every");
        }
        let targets = self.parse_name_list(&[])?;
        self.expect_word("in")?;
        let iter = self.parse_expr_prec(OR_PRECEDENCE)?;
        let condition = if self.eat_word("where") || self.eat_word("if") {
            Some(Box::new(self.parse_expr_prec(OR_PRECEDENCE)?))
        } else {
            None
        };
        Ok(Expr::new(
            ExprKind::Comprehension {
                elt: Box::new(elt),
                targets,
                iter: Box::new(iter),
                condition,
            },
            loc,
        ))
    }

    /// `a function that takes x and y and returns E`
    fn parse_lambda(&mut self, loc: SourceLocation) -> Result<Expr> {
        let mut params = Vec::new();
        if !self.eat_word("nothing") {
            params = self.parse_name_list(&["returns", "return"])?;
        }
        self.eat_word("and");
        if !self.eat_word("returns") {
            self.expect_word("return")?;
        }
        let body = self.parse_expression()?;
        Ok(Expr::new(
            ExprKind::Lambda {
                params,
                body: Box::new(body),
            },
            loc,
        ))
    }

    /// Function named after `call` or `a new`: a name with optional attributes
    fn parse_callee(&mut self) -> Result<Expr> {
        let loc = self.here();
        let mut callee = if self.eat_word("my") {
            Expr::attribute(Expr::name("self", loc.clone()), self.expect_identifier()?, loc.clone())
        } else {
            Expr::name(self.expect_identifier()?, loc.clone())
        };
        while self.check_punct(".") && self.peek_at(1).kind == TokenKind::Word {
            self.advance();
            callee = Expr::attribute(callee, self.expect_identifier()?, loc.clone());
        }
        Ok(callee)
    }

    /// Calls, attribute access and indexing after a primary
    fn parse_postfix_ops(&mut self, mut expr: Expr) -> Result<Expr> {
        loop {
            if self.check_punct("(") {
                expr = self.parse_call_args(expr)?;
            } else if self.check_punct(".") && self.peek_at(1).kind == TokenKind::Word {
                let loc = self.advance().loc;
                let attr = self.expect_identifier()?;
                expr = Expr::attribute(expr, attr, loc);
            } else if self.check_punct("[") {
                expr = self.parse_index(expr)?;
            } else {
                return Ok(expr);
            }
        }
    }

    /// `(a, b, key=value)` after a callee
    fn parse_call_args(&mut self, func: Expr) -> Result<Expr> {
        let loc = self.expect_punct("(")?.loc;
        let mut args = Vec::new();
        let mut kwargs = Vec::new();

        while !self.check_punct(")") {
            let is_keyword = self.peek().kind == TokenKind::Word && self.peek_at(1).is_punct("=");
            if is_keyword {
                let name = self.expect_identifier()?;
                self.advance();
                kwargs.push((name, self.parse_expression()?));
            } else if !kwargs.is_empty() {
                return Err(self.error("positional argument follows keyword argument"));
            } else {
                args.push(self.parse_expression()?);
            }
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(")")?;

        Ok(Expr::new(
            ExprKind::Call {
                func: Box::new(func),
                args,
                kwargs,
            },
            loc,
        ))
    }

    /// `[index]` or `[lower:upper]`
    pub(super) fn parse_index(&mut self, value: Expr) -> Result<Expr> {
        let loc = self.expect_punct("[")?.loc;

        let lower = if self.check_punct(":") {
            None
        } else {
            Some(self.parse_expression()?)
        };

        let index = if self.eat_punct(":") {
            let upper = if self.check_punct("]") {
                None
            } else {
                Some(Box::new(self.parse_expression()?))
            };
            Expr::new(
                ExprKind::Slice {
                    lower: lower.map(Box::new),
                    upper,
                },
                loc.clone(),
            )
        } else {
            match lower {
                Some(index) => index,
                None => return Err(self.error("expected an index")),
            }
        };
        self.expect_punct("]")?;

        Ok(Expr::new(
            ExprKind::Index {
                value: Box::new(value),
                index: Box::new(index),
            },
            loc,
        ))
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.peek().clone();
        let loc = token.loc.clone();

        match token.kind {
            TokenKind::Number => {
                self.advance();
                Ok(Expr::new(ExprKind::Number(token.text), loc))
            }
            TokenKind::Str => {
                self.advance();
                Ok(Expr::new(ExprKind::Str(token.text), loc))
            }
            TokenKind::Punct if token.text == "(" => self.parse_parenthesized(),
            TokenKind::Punct if token.text == "[" => self.parse_bracket_list(),
            TokenKind::Punct if token.text == "{" => self.parse_dict_literal(),
            TokenKind::Word => {
                let lower = token.lower();
                let kind = match lower.as_str() {
                    "true" => ExprKind::Bool(true),
                    "false" => ExprKind::Bool(false),
                    "none" | "nothing" | "null" => ExprKind::NoneLit,
                    "the" if self.peek_at(1).kind == TokenKind::Word => {
                        self.advance();
                        return self.parse_primary();
                    }
                    word => match NUMBER_WORDS.iter().find(|(w, _)| *w == word) {
                        Some((_, digits)) => ExprKind::Number(digits.to_string()),
                        None if is_valid_name(&token.text) => ExprKind::Name(token.text),
                        None => {
                            return Err(self.error(format!("expected an expression, found {}", token)))
                        }
                    },
                };
                self.advance();
                Ok(Expr::new(kind, loc))
            }
            _ => Err(self.error(format!("expected an expression, found {}", token))),
        }
    }

    /// `( expr )` or a tuple
    fn parse_parenthesized(&mut self) -> Result<Expr> {
        let loc = self.expect_punct("(")?.loc;
        if self.eat_punct(")") {
            return Ok(Expr::new(ExprKind::Tuple(vec![]), loc));
        }

        let first = self.parse_expression()?;
        if !self.check_punct(",") {
            self.expect_punct(")")?;
            return Ok(first);
        }

        let mut items = vec![first];
        while self.eat_punct(",") {
            if self.check_punct(")") {
                break;
            }
            items.push(self.parse_expression()?);
        }
        self.expect_punct(")")?;
        Ok(Expr::new(ExprKind::Tuple(items), loc))
    }

    /// `[a, b]` or `[e for x in xs if c]`
    fn parse_bracket_list(&mut self) -> Result<Expr> {
        let loc = self.expect_punct("[")?.loc;
        if self.eat_punct("]") {
            return Ok(Expr::new(ExprKind::List(vec![]), loc));
        }

        let first = self.parse_expression()?;
        if self.check_word("for") {
            let comprehension = self.parse_comprehension(first, loc)?;
            self.expect_punct("]")?;
            return Ok(comprehension);
        }

        let mut items = vec![first];
        while self.eat_punct(",") {
            if self.check_punct("]") {
                break;
            }
            items.push(self.parse_expression()?);
        }
        self.expect_punct("]")?;
        Ok(Expr::new(ExprKind::List(items), loc))
    }

    fn parse_dict_literal(&mut self) -> Result<Expr> {
        let loc = self.expect_punct("{")?.loc;
        let mut entries = Vec::new();

        while !self.check_punct("}") {
            let key = self.parse_expression()?;
            self.expect_punct(":")?;
            let value = self.parse_expression()?;
            entries.push((key, value));
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct("}")?;
        Ok(Expr::new(ExprKind::Dict(entries), loc))
    }
}
