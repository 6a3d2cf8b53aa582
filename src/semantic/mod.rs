//! Semantic analysis module
//!
//! Resolves every name against the scope chain, the builtins and finally the
//! auto-import table, validates type hints, and rewrites the Plain-only AST
//! shapes (`Using`, `Sleep`, `WaitFor`, `Endpoint`, method markers) into
//! Python-shaped nodes. The generator only ever sees the output of this pass.
//!
//! Analysis never touches the caller's [`GlobalState`]: it works on a copy and
//! hands the updated copy back, so a failed unit leaves nothing behind.

mod analyze_expressions;
mod analyze_types;
mod builtins;
mod desugar;
mod scope;

pub use builtins::{is_builtin, BUILTIN_NAMES};
pub use scope::*;

use crate::error::{CompileError, Result};
use crate::import_table::{self, RequiredImports, Resolution};
use crate::location::SourceLocation;
use crate::parser::*;

/// Bindings that outlive one compilation unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalState {
    pub scope: Scope,
    pub imports: RequiredImports,
}

/// Result of analysing one unit
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Python-shaped program
    pub program: Program,
    /// Import lines this unit required for the first time
    pub new_imports: Vec<String>,
    /// Globals with this unit's bindings merged in
    pub globals: GlobalState,
}

/// Analyze a standalone program
pub fn analyze(program: Program) -> Result<Analysis> {
    analyze_with(program, &GlobalState::default())
}

/// Analyze against bindings left by earlier units
pub fn analyze_with(program: Program, globals: &GlobalState) -> Result<Analysis> {
    let statements = desugar::endpoints(program.statements, &globals.scope)?;
    let mut analyzer = Analyzer::new(globals.clone());
    let statements = analyzer.analyze_block(statements)?;
    let new_imports = analyzer.imports.since(&globals.imports);
    Ok(Analysis {
        program: Program { statements },
        new_imports,
        globals: analyzer.into_globals(),
    })
}

#[derive(Debug, Clone, Copy)]
struct FunctionContext {
    is_async: bool,
    saw_yield: bool,
}

/// Semantic analyzer
pub struct Analyzer {
    scopes: ScopeStack,
    imports: RequiredImports,
    /// Enclosing function definitions, innermost last
    functions: Vec<FunctionContext>,
    loop_depth: usize,
    in_class_body: bool,
}

impl Analyzer {
    pub fn new(globals: GlobalState) -> Self {
        Self {
            scopes: ScopeStack::with_global(globals.scope),
            imports: globals.imports,
            functions: Vec::new(),
            loop_depth: 0,
            in_class_body: false,
        }
    }

    pub fn into_globals(self) -> GlobalState {
        GlobalState {
            scope: self.scopes.into_global(),
            imports: self.imports,
        }
    }

    fn in_async(&self) -> bool {
        self.functions.last().is_some_and(|f| f.is_async)
    }

    fn record_import(&mut self, res: &Resolution) {
        self.imports.require(res.imports.iter().cloned());
        self.scopes.define_global(&res.bound_name, SymbolKind::ModuleAlias);
    }

    /// Functions and classes are visible to the whole block they are declared in
    fn preregister(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            match &stmt.kind {
                StmtKind::FuncDef(def) => self.scopes.define(&def.name, SymbolKind::Function, None),
                StmtKind::ClassDef { name, .. } => self.scopes.define(name, SymbolKind::Class, None),
                _ => {}
            }
        }
    }

    fn analyze_block(&mut self, stmts: Vec<Stmt>) -> Result<Vec<Stmt>> {
        self.preregister(&stmts);

        let mut out = Vec::with_capacity(stmts.len());
        let mut deferred = Vec::new();
        for Stmt { kind, loc } in stmts {
            match kind {
                StmtKind::FuncDef(def) => {
                    let def = self.analyze_function_header(def, &loc)?;
                    deferred.push(out.len());
                    out.push(Stmt::new(StmtKind::FuncDef(def), loc));
                }
                kind => {
                    if matches!(kind, StmtKind::ClassDef { .. }) {
                        deferred.push(out.len());
                    }
                    out.push(self.analyze_stmt(Stmt::new(kind, loc))?);
                }
            }
        }

        // Bodies run after the rest of the block, so they see every name it
        // binds. Methods wait for the block that encloses their class.
        if !self.in_class_body {
            for index in deferred {
                self.analyze_pending_bodies(std::slice::from_mut(&mut out[index]))?;
            }
        }
        Ok(out)
    }

    /// Function bodies left pending in `stmts`, including those nested in class bodies
    fn analyze_pending_bodies(&mut self, stmts: &mut [Stmt]) -> Result<()> {
        for stmt in stmts {
            match &mut stmt.kind {
                StmtKind::FuncDef(def) => self.analyze_function_body(def)?,
                StmtKind::ClassDef { body, .. }
                | StmtKind::While { body, .. }
                | StmtKind::For { body, .. }
                | StmtKind::With { body, .. } => self.analyze_pending_bodies(body)?,
                StmtKind::If {
                    then_body,
                    elif_clauses,
                    else_body,
                    ..
                } => {
                    self.analyze_pending_bodies(then_body)?;
                    for (_, body) in elif_clauses {
                        self.analyze_pending_bodies(body)?;
                    }
                    if let Some(body) = else_body {
                        self.analyze_pending_bodies(body)?;
                    }
                }
                StmtKind::Try {
                    body,
                    handlers,
                    finally_body,
                } => {
                    self.analyze_pending_bodies(body)?;
                    for handler in handlers {
                        self.analyze_pending_bodies(&mut handler.body)?;
                    }
                    if let Some(body) = finally_body {
                        self.analyze_pending_bodies(body)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn analyze_loop_body(&mut self, body: Vec<Stmt>) -> Result<Vec<Stmt>> {
        self.loop_depth += 1;
        let body = self.analyze_block(body);
        self.loop_depth -= 1;
        body
    }

    fn analyze_stmt(&mut self, stmt: Stmt) -> Result<Stmt> {
        let Stmt { kind, loc } = stmt;

        let kind = match kind {
            StmtKind::Assign {
                target,
                type_hint,
                value,
            } => {
                let value = self.analyze_expr(value)?;
                let type_hint = type_hint.map(|h| self.check_hint(h)).transpose()?;
                let target = self.analyze_target(target, type_hint.clone())?;
                StmtKind::Assign {
                    target,
                    type_hint,
                    value,
                }
            }
            StmtKind::AugAssign { target, op, value } => StmtKind::AugAssign {
                target: self.analyze_expr(target)?,
                op,
                value: self.analyze_expr(value)?,
            },
            StmtKind::If {
                condition,
                then_body,
                elif_clauses,
                else_body,
            } => {
                let condition = self.analyze_expr(condition)?;
                let then_body = self.analyze_block(then_body)?;
                let mut clauses = Vec::with_capacity(elif_clauses.len());
                for (cond, body) in elif_clauses {
                    clauses.push((self.analyze_expr(cond)?, self.analyze_block(body)?));
                }
                let else_body = else_body.map(|b| self.analyze_block(b)).transpose()?;
                StmtKind::If {
                    condition,
                    then_body,
                    elif_clauses: clauses,
                    else_body,
                }
            }
            StmtKind::While { condition, body } => StmtKind::While {
                condition: self.analyze_expr(condition)?,
                body: self.analyze_loop_body(body)?,
            },
            StmtKind::For {
                targets,
                iter,
                body,
            } => {
                let iter = self.analyze_expr(iter)?;
                for target in &targets {
                    self.scopes.define(target, SymbolKind::Variable, None);
                }
                StmtKind::For {
                    targets,
                    iter,
                    body: self.analyze_loop_body(body)?,
                }
            }
            StmtKind::FuncDef(def) => {
                let mut def = self.analyze_function_header(def, &loc)?;
                self.analyze_function_body(&mut def)?;
                StmtKind::FuncDef(def)
            }
            StmtKind::ClassDef {
                name,
                bases,
                decorators,
                body,
            } => self.analyze_class(name, bases, decorators, body)?,
            StmtKind::Try {
                body,
                handlers,
                finally_body,
            } => {
                let body = self.analyze_block(body)?;
                let mut analyzed = Vec::with_capacity(handlers.len());
                for handler in handlers {
                    analyzed.push(self.analyze_handler(handler)?);
                }
                let finally_body = finally_body.map(|b| self.analyze_block(b)).transpose()?;
                StmtKind::Try {
                    body,
                    handlers: analyzed,
                    finally_body,
                }
            }
            StmtKind::Using {
                resource,
                binding,
                body,
            } => {
                let (resource, is_async) = desugar::using_resource(resource, self.in_async());
                self.analyze_with(resource, binding, body, is_async)?
            }
            StmtKind::With {
                resource,
                binding,
                body,
                is_async,
            } => self.analyze_with(resource, binding, body, is_async)?,
            StmtKind::Sleep { seconds } => {
                let call = desugar::sleep(seconds, self.in_async(), &loc);
                StmtKind::Expr(self.analyze_expr(call)?)
            }
            StmtKind::Endpoint { .. } => {
                return Err(CompileError::syntax(
                    "api endpoints must be defined at the top level",
                    loc,
                    "create an api endpoint",
                ));
            }
            StmtKind::Import {
                module,
                alias,
                names,
            } => {
                self.bind_import(&module, alias.as_deref(), names.as_deref());
                StmtKind::Import {
                    module,
                    alias,
                    names,
                }
            }
            StmtKind::Return(value) => {
                if self.functions.is_empty() {
                    return Err(CompileError::syntax("'return' outside a function", loc, "return"));
                }
                StmtKind::Return(value.map(|v| self.analyze_expr(v)).transpose()?)
            }
            StmtKind::Raise(value) => StmtKind::Raise(value.map(|v| self.analyze_expr(v)).transpose()?),
            StmtKind::Assert { test, msg } => StmtKind::Assert {
                test: self.analyze_expr(test)?,
                msg: msg.map(|m| self.analyze_expr(m)).transpose()?,
            },
            StmtKind::Delete(targets) => StmtKind::Delete(
                targets
                    .into_iter()
                    .map(|t| self.analyze_expr(t))
                    .collect::<Result<Vec<_>>>()?,
            ),
            StmtKind::Break => self.loop_control(StmtKind::Break, "break", &loc)?,
            StmtKind::Continue => self.loop_control(StmtKind::Continue, "continue", &loc)?,
            StmtKind::Pass => StmtKind::Pass,
            StmtKind::Expr(expr) => StmtKind::Expr(self.analyze_expr(expr)?),
        };

        Ok(Stmt::new(kind, loc))
    }

    fn loop_control(&self, kind: StmtKind, word: &str, loc: &SourceLocation) -> Result<StmtKind> {
        if self.loop_depth == 0 {
            return Err(CompileError::syntax(format!("'{word}' outside a loop"), loc.clone(), word));
        }
        Ok(kind)
    }

    /// A plain name target creates a binding; anything else is a reference
    fn analyze_target(&mut self, target: Expr, type_hint: Option<TypeHint>) -> Result<Expr> {
        if let ExprKind::Name(name) = &target.kind {
            self.scopes.define(name, SymbolKind::Variable, type_hint);
            return Ok(target);
        }
        self.analyze_expr(target)
    }

    fn analyze_with(
        &mut self,
        resource: Expr,
        binding: Option<String>,
        body: Vec<Stmt>,
        is_async: bool,
    ) -> Result<StmtKind> {
        let resource = self.analyze_expr(resource)?;
        if let Some(name) = &binding {
            self.scopes.define(name, SymbolKind::Variable, None);
        }
        Ok(StmtKind::With {
            resource,
            binding,
            body: self.analyze_block(body)?,
            is_async,
        })
    }

    fn analyze_handler(&mut self, handler: Handler) -> Result<Handler> {
        let exception = handler.exception.map(|e| self.analyze_expr(e)).transpose()?;
        if let Some(name) = &handler.binding {
            self.scopes.define(name, SymbolKind::Variable, None);
        }
        Ok(Handler {
            exception,
            binding: handler.binding,
            body: self.analyze_block(handler.body)?,
            loc: handler.loc,
        })
    }

    fn bind_import(&mut self, module: &str, alias: Option<&str>, names: Option<&[String]>) {
        match (names, alias) {
            (Some(names), _) => {
                for name in names {
                    self.scopes.define(name, SymbolKind::ModuleAlias, None);
                }
            }
            (None, Some(alias)) => self.scopes.define(alias, SymbolKind::ModuleAlias, None),
            (None, None) => {
                let root = module.split('.').next().unwrap_or(module);
                self.scopes.define(root, SymbolKind::ModuleAlias, None);
            }
        }
    }

    /// Decorators, defaults and hints, evaluated where the definition appears
    fn analyze_function_header(&mut self, def: FunctionDef, loc: &SourceLocation) -> Result<FunctionDef> {
        let mut def = def;

        let method = match def.method {
            Some(_) if !self.in_class_body => {
                return Err(CompileError::syntax(
                    "methods can only be defined inside a class",
                    loc.clone(),
                    def.name.clone(),
                ));
            }
            Some(kind) => Some(kind),
            None if self.in_class_body => Some(MethodKind::Instance),
            None => None,
        };

        def.decorators = std::mem::take(&mut def.decorators)
            .into_iter()
            .map(|d| self.analyze_expr(d))
            .collect::<Result<Vec<_>>>()?;

        let mut params = Vec::with_capacity(def.params.len());
        for param in std::mem::take(&mut def.params) {
            params.push(Param {
                type_hint: param.type_hint.map(|h| self.check_hint(h)).transpose()?,
                default: param.default.map(|d| self.analyze_expr(d)).transpose()?,
                name: param.name,
            });
        }
        def.params = params;
        def.return_type = def.return_type.take().map(|h| self.check_hint(h)).transpose()?;

        if let Some(kind) = method {
            desugar::apply_method_kind(&mut def, kind, loc);
        }
        def.method = method;

        self.scopes.define(&def.name, SymbolKind::Function, None);
        Ok(def)
    }

    fn analyze_function_body(&mut self, def: &mut FunctionDef) -> Result<()> {
        self.scopes.push(ScopeKind::Function);
        for param in &def.params {
            self.scopes.define(&param.name, SymbolKind::Variable, param.type_hint.clone());
        }
        self.functions.push(FunctionContext {
            is_async: def.is_async,
            saw_yield: false,
        });
        let saved_loop_depth = std::mem::replace(&mut self.loop_depth, 0);
        let saved_in_class = std::mem::replace(&mut self.in_class_body, false);

        let body = self.analyze_block(std::mem::take(&mut def.body));

        self.loop_depth = saved_loop_depth;
        self.in_class_body = saved_in_class;
        let context = self.functions.pop();
        self.scopes.pop();

        def.body = body?;
        def.is_generator = context.is_some_and(|c| c.saw_yield);
        Ok(())
    }

    fn analyze_class(
        &mut self,
        name: String,
        bases: Vec<Expr>,
        decorators: Vec<Expr>,
        body: Vec<Stmt>,
    ) -> Result<StmtKind> {
        let bases = bases
            .into_iter()
            .map(|b| self.analyze_expr(b))
            .collect::<Result<Vec<_>>>()?;
        let decorators = decorators
            .into_iter()
            .map(|d| self.analyze_expr(d))
            .collect::<Result<Vec<_>>>()?;
        self.scopes.define(&name, SymbolKind::Class, None);

        self.scopes.push(ScopeKind::Class);
        let saved_loop_depth = std::mem::replace(&mut self.loop_depth, 0);
        let saved_in_class = std::mem::replace(&mut self.in_class_body, true);
        let body = self.analyze_block(body);
        self.loop_depth = saved_loop_depth;
        self.in_class_body = saved_in_class;
        self.scopes.pop();

        Ok(StmtKind::ClassDef {
            name,
            bases,
            decorators,
            body: body?,
        })
    }
}

#[cfg(test)]
mod tests;
