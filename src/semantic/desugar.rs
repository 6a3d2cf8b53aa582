//! Rewrites of Plain-only constructs into Python shapes
//!
//! Each helper returns unanalysed nodes; the analyzer runs them through the
//! normal resolution path, which is what pulls in `asyncio` or `time`.

use std::collections::HashSet;

use super::Scope;
use crate::error::{CompileError, Result};
use crate::location::SourceLocation;
use crate::parser::*;

/// Application object every endpoint registers on
const APP: &str = "app";

fn module_call(module: &str, func: &str, args: Vec<Expr>, loc: &SourceLocation) -> Expr {
    let callee = Expr::attribute(Expr::name(module, loc.clone()), func, loc.clone());
    Expr::call(callee, args, loc.clone())
}

/// `wait for E`: awaited inside async functions, run to completion elsewhere
pub fn wait_for(inner: Expr, in_async: bool, loc: SourceLocation) -> Expr {
    if in_async {
        Expr::new(ExprKind::Await(Box::new(inner)), loc)
    } else {
        module_call("asyncio", "run", vec![inner], &loc)
    }
}

/// `wait N seconds`
pub fn sleep(seconds: Expr, in_async: bool, loc: &SourceLocation) -> Expr {
    if in_async {
        let call = module_call("asyncio", "sleep", vec![seconds], loc);
        Expr::new(ExprKind::Await(Box::new(call)), loc.clone())
    } else {
        module_call("time", "sleep", vec![seconds], loc)
    }
}

/// Resource of a `using` block and whether it becomes `async with`
pub fn using_resource(resource: Expr, in_async: bool) -> (Expr, bool) {
    match resource.kind {
        ExprKind::WaitFor(inner) if in_async => (*inner, true),
        kind => (Expr::new(kind, resource.loc), false),
    }
}

/// Receiver parameter and decorator for a method marker
pub fn apply_method_kind(def: &mut FunctionDef, kind: MethodKind, loc: &SourceLocation) {
    let (receiver, decorator) = match kind {
        MethodKind::Instance => (Some("self"), None),
        MethodKind::Property => (Some("self"), Some("property")),
        MethodKind::Class => (Some("cls"), Some("classmethod")),
        MethodKind::Static => (None, Some("staticmethod")),
    };

    if let Some(receiver) = receiver {
        let has_receiver = def.params.first().is_some_and(|p| p.name == receiver);
        if !has_receiver {
            def.params.insert(0, Param::plain(receiver));
        }
    }

    if let Some(decorator) = decorator {
        let already = def
            .decorators
            .iter()
            .any(|d| matches!(&d.kind, ExprKind::Name(n) if n == decorator));
        if !already {
            def.decorators.insert(0, Expr::name(decorator, loc.clone()));
        }
    }
}

/// Top-level api endpoints become Flask view functions. A program that does
/// not bind `app` yet gets the application object before its first endpoint
/// and a `__main__` runner at its end.
pub fn endpoints(statements: Vec<Stmt>, globals: &Scope) -> Result<Vec<Stmt>> {
    let Some(first) = statements
        .iter()
        .position(|s| matches!(s.kind, StmtKind::Endpoint { .. }))
    else {
        return Ok(statements);
    };

    let binds_app = |s: &Stmt| matches!(&s.kind, StmtKind::Assign { target, .. } if target.kind == ExprKind::Name(APP.to_string()));
    let needs_app = globals.lookup(APP).is_none() && !statements.iter().any(binds_app);

    let mut taken: HashSet<String> = HashSet::new();
    let mut last_loc = statements[first].loc.clone();
    let mut out = Vec::with_capacity(statements.len() + 2);
    for (index, Stmt { kind, loc }) in statements.into_iter().enumerate() {
        if index == first && needs_app {
            out.push(flask_app(&loc));
        }
        match kind {
            StmtKind::Endpoint {
                route,
                method,
                body,
                is_async,
            } => {
                let name = view_name(&method, &route, |n| taken.contains(n) || globals.lookup(n).is_some());
                taken.insert(name.clone());
                let def = view_function(name, &route, &method, body, is_async, &loc)?;
                last_loc = loc.clone();
                out.push(Stmt::new(StmtKind::FuncDef(def), loc));
            }
            kind => out.push(Stmt::new(kind, loc)),
        }
    }
    if needs_app {
        out.push(main_runner(&last_loc));
    }
    Ok(out)
}

/// `app = Flask(__name__)`
fn flask_app(loc: &SourceLocation) -> Stmt {
    let flask = Expr::name("Flask", loc.clone());
    let value = Expr::call(flask, vec![Expr::name("__name__", loc.clone())], loc.clone());
    Stmt::new(
        StmtKind::Assign {
            target: Expr::name(APP, loc.clone()),
            type_hint: None,
            value,
        },
        loc.clone(),
    )
}

/// `if __name__ == "__main__": app.run(debug=True, port=5000)`
fn main_runner(loc: &SourceLocation) -> Stmt {
    let condition = Expr::new(
        ExprKind::BinOp {
            left: Box::new(Expr::name("__name__", loc.clone())),
            op: BinOp::Eq,
            right: Box::new(Expr::new(ExprKind::Str("\"__main__\"".to_string()), loc.clone())),
        },
        loc.clone(),
    );
    let run = Expr::new(
        ExprKind::Call {
            func: Box::new(Expr::attribute(Expr::name(APP, loc.clone()), "run", loc.clone())),
            args: vec![],
            kwargs: vec![
                ("debug".to_string(), Expr::new(ExprKind::Bool(true), loc.clone())),
                ("port".to_string(), Expr::new(ExprKind::Number("5000".to_string()), loc.clone())),
            ],
        },
        loc.clone(),
    );
    Stmt::new(
        StmtKind::If {
            condition,
            then_body: vec![Stmt::expr(run)],
            elif_clauses: vec![],
            else_body: None,
        },
        loc.clone(),
    )
}

/// `get_users_int_id` for `GET /users/<int:id>`; `_2`, `_3`... when taken
fn view_name(method: &str, route: &str, is_taken: impl Fn(&str) -> bool) -> String {
    let mut cleaned = String::new();
    let mut gap = false;
    for c in route.chars() {
        if c.is_alphanumeric() || c == '_' {
            if gap && !cleaned.is_empty() {
                cleaned.push('_');
            }
            gap = false;
            cleaned.push(c);
        } else {
            gap = true;
        }
    }
    let cleaned = match cleaned.trim_matches('_') {
        "" => "root",
        trimmed => trimmed,
    };

    let base = format!("{}_{}", method.to_ascii_lowercase(), cleaned);
    let mut name = base.clone();
    let mut counter = 2;
    while is_taken(&name) {
        name = format!("{base}_{counter}");
        counter += 1;
    }
    name
}

/// Names of the `<name>` and `<converter:name>` segments of a route
fn route_params(route: &str) -> Vec<&str> {
    route
        .split('<')
        .skip(1)
        .filter_map(|part| part.split_once('>'))
        .map(|(inner, _)| inner.rsplit(':').next().unwrap_or(inner).trim())
        .collect()
}

fn view_function(
    name: String,
    route: &str,
    method: &str,
    body: Vec<Stmt>,
    is_async: bool,
    loc: &SourceLocation,
) -> Result<FunctionDef> {
    let mut params = Vec::new();
    for param in route_params(route) {
        if !is_valid_name(param) {
            return Err(CompileError::syntax(
                format!("route parameter '{param}' is not a valid name"),
                loc.clone(),
                route,
            ));
        }
        params.push(Param::plain(param));
    }

    let quoted = |text: &str| {
        let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
        Expr::new(ExprKind::Str(format!("\"{escaped}\"")), loc.clone())
    };
    let decorator = Expr::new(
        ExprKind::Call {
            func: Box::new(Expr::attribute(Expr::name(APP, loc.clone()), "route", loc.clone())),
            args: vec![quoted(route)],
            kwargs: vec![(
                "methods".to_string(),
                Expr::new(ExprKind::List(vec![quoted(method)]), loc.clone()),
            )],
        },
        loc.clone(),
    );

    Ok(FunctionDef {
        name,
        params,
        return_type: None,
        body,
        decorators: vec![decorator],
        is_async,
        method: None,
        is_generator: false,
    })
}
