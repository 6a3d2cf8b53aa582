//! Expression analysis for the semantic analyzer

use super::*;
use crate::suggest;

impl Analyzer {
    pub(super) fn analyze_expr(&mut self, expr: Expr) -> Result<Expr> {
        let Expr { kind, loc } = expr;

        let kind = match kind {
            ExprKind::Name(name) => ExprKind::Name(self.resolve_name(name, &loc)?),
            ExprKind::Number(_) | ExprKind::Str(_) | ExprKind::Bool(_) | ExprKind::NoneLit => kind,
            ExprKind::BinOp { left, op, right } => ExprKind::BinOp {
                left: self.analyze_boxed(left)?,
                op,
                right: self.analyze_boxed(right)?,
            },
            ExprKind::UnaryOp { op, operand } => ExprKind::UnaryOp {
                op,
                operand: self.analyze_boxed(operand)?,
            },
            ExprKind::Between { value, low, high } => ExprKind::Between {
                value: self.analyze_boxed(value)?,
                low: self.analyze_boxed(low)?,
                high: self.analyze_boxed(high)?,
            },
            ExprKind::Call { func, args, kwargs } => {
                let func = self.analyze_boxed(func)?;
                let args = self.analyze_all(args)?;
                let mut analyzed = Vec::with_capacity(kwargs.len());
                for (name, value) in kwargs {
                    analyzed.push((name, self.analyze_expr(value)?));
                }
                ExprKind::Call {
                    func,
                    args,
                    kwargs: analyzed,
                }
            }
            ExprKind::Attribute { value, attr } => ExprKind::Attribute {
                value: self.analyze_boxed(value)?,
                attr,
            },
            ExprKind::Index { value, index } => ExprKind::Index {
                value: self.analyze_boxed(value)?,
                index: self.analyze_boxed(index)?,
            },
            ExprKind::Slice { lower, upper } => ExprKind::Slice {
                lower: lower.map(|e| self.analyze_boxed(e)).transpose()?,
                upper: upper.map(|e| self.analyze_boxed(e)).transpose()?,
            },
            ExprKind::List(items) => ExprKind::List(self.analyze_all(items)?),
            ExprKind::Tuple(items) => ExprKind::Tuple(self.analyze_all(items)?),
            ExprKind::Dict(entries) => {
                let mut analyzed = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    analyzed.push((self.analyze_expr(key)?, self.analyze_expr(value)?));
                }
                ExprKind::Dict(analyzed)
            }
            ExprKind::Comprehension {
                elt,
                targets,
                iter,
                condition,
            } => {
                // The iterable is evaluated in the enclosing scope
                let iter = self.analyze_boxed(iter)?;
                self.scopes.push(ScopeKind::Comprehension);
                for target in &targets {
                    self.scopes.define(target, SymbolKind::Variable, None);
                }
                let elt = self.analyze_boxed(elt);
                let condition = condition.map(|c| self.analyze_boxed(c)).transpose();
                self.scopes.pop();
                ExprKind::Comprehension {
                    elt: elt?,
                    targets,
                    iter,
                    condition: condition?,
                }
            }
            ExprKind::Lambda { params, body } => {
                self.scopes.push(ScopeKind::Function);
                for param in &params {
                    self.scopes.define(param, SymbolKind::Variable, None);
                }
                let body = self.analyze_boxed(body);
                self.scopes.pop();
                ExprKind::Lambda { params, body: body? }
            }
            ExprKind::IfExp { test, body, orelse } => ExprKind::IfExp {
                test: self.analyze_boxed(test)?,
                body: self.analyze_boxed(body)?,
                orelse: self.analyze_boxed(orelse)?,
            },
            ExprKind::WaitFor(inner) => {
                let desugared = desugar::wait_for(*inner, self.in_async(), loc);
                return self.analyze_expr(desugared);
            }
            ExprKind::Await(inner) => ExprKind::Await(self.analyze_boxed(inner)?),
            ExprKind::Yield(value) => {
                match self.functions.last_mut() {
                    Some(function) => function.saw_yield = true,
                    None => {
                        return Err(CompileError::syntax("'yield' outside a function", loc, "yield"));
                    }
                }
                ExprKind::Yield(value.map(|v| self.analyze_boxed(v)).transpose()?)
            }
        };

        Ok(Expr::new(kind, loc))
    }

    fn analyze_boxed(&mut self, expr: Box<Expr>) -> Result<Box<Expr>> {
        self.analyze_expr(*expr).map(Box::new)
    }

    fn analyze_all(&mut self, exprs: Vec<Expr>) -> Result<Vec<Expr>> {
        exprs.into_iter().map(|e| self.analyze_expr(e)).collect()
    }

    /// Name as the generated code must spell it
    fn resolve_name(&mut self, name: String, loc: &SourceLocation) -> Result<String> {
        if self.scopes.lookup(&name).is_some() || builtins::is_builtin(&name) {
            return Ok(name);
        }

        if let Some(res) = import_table::lookup(&name) {
            self.record_import(&res);
            return Ok(res.bound_name);
        }

        let mut candidates = self.scopes.visible_names();
        candidates.extend(BUILTIN_NAMES.iter().map(|b| b.to_string()));
        let hint = suggest::closest(&name, candidates.iter().map(String::as_str)).map(|c| format!("'{c}'"));

        Err(CompileError::UnboundName {
            name,
            loc: loc.clone(),
            hint,
        })
    }
}
