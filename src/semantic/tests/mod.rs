//! semantic module tests

use super::*;
use crate::parser::parse;
use pretty_assertions::assert_eq;

fn analyze_source(source: &str) -> Result<Analysis> {
    analyze(parse(source).unwrap())
}

fn statements(source: &str) -> Vec<Stmt> {
    analyze_source(source).unwrap().program.statements
}

fn callee(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Call { func, .. } => match &func.kind {
            ExprKind::Name(name) => name.clone(),
            ExprKind::Attribute { value, attr } => match &value.kind {
                ExprKind::Name(base) => format!("{base}.{attr}"),
                _ => attr.clone(),
            },
            other => panic!("unexpected callee: {other:?}"),
        },
        other => panic!("expected a call, found {other:?}"),
    }
}

fn function(stmt: &Stmt) -> &FunctionDef {
    match &stmt.kind {
        StmtKind::FuncDef(def) => def,
        other => panic!("expected a function, found {other:?}"),
    }
}

// --- name resolution ---

#[test]
fn test_bound_names_pass_through() {
    let stmts = statements("let total be 1\nsay total plus 1");
    assert_eq!(stmts.len(), 2);
}

#[test]
fn test_unbound_name_suggests_nearby_binding() {
    match analyze_source("let total be 1\nsay totl") {
        Err(CompileError::UnboundName { name, loc, hint }) => {
            assert_eq!(name, "totl");
            assert_eq!(loc.line, 2);
            assert_eq!(hint.as_deref(), Some("'total'"));
        }
        other => panic!("expected an unbound name, got {other:?}"),
    }
}

#[test]
fn test_unbound_name_without_candidate() {
    match analyze_source("say zzzqqq") {
        Err(CompileError::UnboundName { hint, .. }) => assert_eq!(hint, None),
        other => panic!("expected an unbound name, got {other:?}"),
    }
}

#[test]
fn test_builtins_are_always_bound() {
    let analysis = analyze_source("say len([1, 2]) plus abs(-3)").unwrap();
    assert!(analysis.new_imports.is_empty());
}

#[test]
fn test_library_name_is_imported_once() {
    let source = r#"
let a be pandas.DataFrame()
let b be pd.read_csv("data.csv")
say pandas
"#;
    let analysis = analyze_source(source).unwrap();
    assert_eq!(analysis.new_imports, vec!["import pandas as pd".to_string()]);

    // Every reference is spelled with the bound name
    match &analysis.program.statements[2].kind {
        StmtKind::Expr(call) => match &call.kind {
            ExprKind::Call { args, .. } => assert_eq!(args[0].kind, ExprKind::Name("pd".to_string())),
            other => panic!("unexpected expression: {other:?}"),
        },
        other => panic!("unexpected statement: {other:?}"),
    }
}

#[test]
fn test_imports_keep_first_required_order() {
    let analysis = analyze_source("say json.dumps(1)\nsay math.pi\nsay json.dumps(2)").unwrap();
    assert_eq!(
        analysis.new_imports,
        vec!["import json".to_string(), "import math".to_string()]
    );
}

#[test]
fn test_local_binding_shadows_library() {
    let analysis = analyze_source("let json be 3\nsay json").unwrap();
    assert!(analysis.new_imports.is_empty());
}

#[test]
fn test_explicit_import_binds_without_auto_import() {
    let analysis = analyze_source("import numpy as numeric\nsay numeric.zeros(3)").unwrap();
    assert!(analysis.new_imports.is_empty());

    let analysis = analyze_source("from os.path import join\nsay join(\"a\", \"b\")").unwrap();
    assert!(analysis.new_imports.is_empty());
}

#[test]
fn test_statement_phrases_pull_in_their_module() {
    let analysis = analyze_source("log info \"starting\"\nexit with code 1").unwrap();
    assert_eq!(
        analysis.new_imports,
        vec!["import logging".to_string(), "import sys".to_string()]
    );
}

// --- scopes ---

#[test]
fn test_function_forward_references() {
    let source = r#"
define a function called first and returns second()
define a function called second and returns 2
say first()
"#;
    assert_eq!(statements(source).len(), 3);
}

#[test]
fn test_function_body_sees_later_globals() {
    let source = r#"
define a function called show_limit
    say limit
let limit be 10
show_limit()
"#;
    assert!(analyze_source(source).is_ok());
}

#[test]
fn test_parameters_are_local_to_the_function() {
    let source = r#"
define a function called double taking n and returns n times 2
say n
"#;
    assert!(matches!(
        analyze_source(source),
        Err(CompileError::UnboundName { name, .. }) if name == "n"
    ));
}

#[test]
fn test_comprehension_targets_do_not_leak() {
    assert!(analyze_source("let xs be [1, 2]\nlet ys be a list of x times 2 for each x in xs").is_ok());
    assert!(matches!(
        analyze_source("let xs be [1, 2]\nlet ys be [x for x in xs]\nsay x"),
        Err(CompileError::UnboundName { .. })
    ));
}

#[test]
fn test_for_targets_and_handler_bindings_are_bound() {
    let source = r#"
for each i, item in enumerate([1, 2])
    say i, item
try
    say 1 divided by 0
if something goes wrong as problem
    say problem
"#;
    assert!(analyze_source(source).is_ok());
}

// --- control flow placement ---

#[test]
fn test_return_outside_function_is_rejected() {
    match analyze_source("return 1") {
        Err(CompileError::Syntax { message, .. }) => assert!(message.contains("return")),
        other => panic!("expected a syntax error, got {other:?}"),
    }
}

#[test]
fn test_break_outside_loop_is_rejected() {
    assert!(matches!(analyze_source("stop"), Err(CompileError::Syntax { .. })));
    assert!(analyze_source("while true\n    stop").is_ok());
}

#[test]
fn test_loop_does_not_extend_into_nested_function() {
    let source = r#"
while true
    define a function called inner
        skip
"#;
    assert!(matches!(analyze_source(source), Err(CompileError::Syntax { .. })));
}

#[test]
fn test_yield_marks_generator() {
    let stmts = statements("define a generator called counter and yields 1");
    assert!(function(&stmts[0]).is_generator);

    let stmts = statements("define a function called plain and returns 1");
    assert!(!function(&stmts[0]).is_generator);
}

#[test]
fn test_yield_outside_function_is_rejected() {
    assert!(matches!(analyze_source("yield 1"), Err(CompileError::Syntax { .. })));
}

// --- type hints ---

#[test]
fn test_hints_are_canonicalised() {
    let stmts = statements("let n of type integer be 1\nlet names of type list of text be []");
    let hints: Vec<String> = stmts
        .iter()
        .map(|s| match &s.kind {
            StmtKind::Assign { type_hint, .. } => type_hint.as_ref().unwrap().to_string(),
            other => panic!("unexpected statement: {other:?}"),
        })
        .collect();
    assert_eq!(hints, vec!["int".to_string(), "list[str]".to_string()]);
}

#[test]
fn test_optional_hint_requires_typing() {
    let analysis = analyze_source("let name of type optional text be none").unwrap();
    match &analysis.program.statements[0].kind {
        StmtKind::Assign { type_hint, .. } => {
            assert_eq!(type_hint.as_ref().unwrap().to_string(), "Optional[str]")
        }
        other => panic!("unexpected statement: {other:?}"),
    }
    assert_eq!(analysis.new_imports.len(), 1);
    assert!(analysis.new_imports[0].starts_with("from typing import"));
}

#[test]
fn test_unknown_hint_is_rejected() {
    match analyze_source("let w of type widget be 1") {
        Err(CompileError::TypeHint { hint, .. }) => assert_eq!(hint, "widget"),
        other => panic!("expected a type hint error, got {other:?}"),
    }
}

#[test]
fn test_wrong_container_arity_is_rejected() {
    assert!(matches!(
        analyze_source("let d of type dict[str] be {}"),
        Err(CompileError::TypeHint { .. })
    ));
}

#[test]
fn test_class_names_are_valid_hints() {
    let source = r#"
define a class called Point
    pass
let origin of type Point be Point()
"#;
    assert!(analyze_source(source).is_ok());
}

// --- desugaring ---

#[test]
fn test_sleep_outside_async_uses_time() {
    let analysis = analyze_source("wait 2 seconds").unwrap();
    match &analysis.program.statements[0].kind {
        StmtKind::Expr(call) => assert_eq!(callee(call), "time.sleep"),
        other => panic!("unexpected statement: {other:?}"),
    }
    assert_eq!(analysis.new_imports, vec!["import time".to_string()]);
}

#[test]
fn test_sleep_inside_async_is_awaited() {
    let source = r#"
asynchronously define a function called main
    wait 1 second
"#;
    let analysis = analyze_source(source).unwrap();
    let def = function(&analysis.program.statements[0]);
    match &def.body[0].kind {
        StmtKind::Expr(Expr {
            kind: ExprKind::Await(inner),
            ..
        }) => assert_eq!(callee(inner), "asyncio.sleep"),
        other => panic!("unexpected statement: {other:?}"),
    }
    assert_eq!(analysis.new_imports, vec!["import asyncio".to_string()]);
}

#[test]
fn test_wait_for_depends_on_context() {
    let source = r#"
asynchronously define a function called fetch and returns 1
asynchronously define a function called main
    wait for fetch()
wait for main()
"#;
    let analysis = analyze_source(source).unwrap();
    let main = function(&analysis.program.statements[1]);
    assert!(matches!(
        &main.body[0].kind,
        StmtKind::Expr(Expr {
            kind: ExprKind::Await(_),
            ..
        })
    ));
    match &analysis.program.statements[2].kind {
        StmtKind::Expr(call) => assert_eq!(callee(call), "asyncio.run"),
        other => panic!("unexpected statement: {other:?}"),
    }
}

#[test]
fn test_using_becomes_with() {
    let source = r#"
using open file "notes.txt" as notes
    say notes.read()
"#;
    match &statements(source)[0].kind {
        StmtKind::With {
            binding, is_async, ..
        } => {
            assert_eq!(binding.as_deref(), Some("notes"));
            assert!(!is_async);
        }
        other => panic!("unexpected statement: {other:?}"),
    }
}

#[test]
fn test_using_wait_for_in_async_function_is_async_with() {
    let source = r#"
define a function called session and returns 1
asynchronously define a function called main
    using wait for session() as s
        say s
"#;
    let stmts = statements(source);
    match &function(&stmts[1]).body[0].kind {
        StmtKind::With { is_async, resource, .. } => {
            assert!(is_async);
            assert_eq!(callee(resource), "session");
        }
        other => panic!("unexpected statement: {other:?}"),
    }
}

#[test]
fn test_methods_get_receivers_and_decorators() {
    let source = r#"
define a class called Counter
    define a method called bump
        increase my count
    define a static method called zero and returns 0
    define a function called helper and returns 1
"#;
    let stmts = statements(source);
    let StmtKind::ClassDef { body, .. } = &stmts[0].kind else {
        panic!("expected a class");
    };

    let bump = function(&body[0]);
    assert_eq!(bump.params[0].name, "self");

    let zero = function(&body[1]);
    assert!(zero.params.is_empty());
    assert_eq!(zero.decorators[0].kind, ExprKind::Name("staticmethod".to_string()));

    let helper = function(&body[2]);
    assert_eq!(helper.method, Some(MethodKind::Instance));
    assert_eq!(helper.params[0].name, "self");
}

#[test]
fn test_method_outside_class_is_rejected() {
    assert!(matches!(
        analyze_source("define a method called bump\n    pass"),
        Err(CompileError::Syntax { .. })
    ));
}

#[test]
fn test_class_attributes_are_not_visible_in_methods() {
    let source = r#"
define a class called Config
    let limit be 3
    define a method called show
        say limit
"#;
    assert!(matches!(
        analyze_source(source),
        Err(CompileError::UnboundName { name, .. }) if name == "limit"
    ));
}

#[test]
fn test_method_bodies_see_names_bound_after_the_class() {
    let source = r#"
define a class called Greeter
    define a method called greet
        say greeting
let greeting be "hi"
"#;
    let stmts = statements(source);
    let StmtKind::ClassDef { body, .. } = &stmts[0].kind else {
        panic!("expected a class");
    };
    assert_eq!(function(&body[0]).body.len(), 1);
}

#[test]
fn test_nested_class_methods_are_analyzed() {
    let source = r#"
define a function called build
    define a class called Inner
        define a method called show
            say label
    let label be "inner"
    return Inner
"#;
    let stmts = statements(source);
    let build = function(&stmts[0]);
    let StmtKind::ClassDef { body, .. } = &build.body[0].kind else {
        panic!("expected a class");
    };
    assert_eq!(function(&body[0]).params[0].name, "self");

    let err = analyze_source("define a class called Broken
    define a method called show
        say missing").unwrap_err();
    assert!(matches!(err, CompileError::UnboundName { name, .. } if name == "missing"));
}

// --- web endpoints ---

#[test]
fn test_endpoint_becomes_flask_view() {
    let analysis = analyze_source("create an api endpoint at \"/users/<int:id>\" that gets and returns id").unwrap();
    let stmts = &analysis.program.statements;
    assert_eq!(stmts.len(), 3);

    match &stmts[0].kind {
        StmtKind::Assign { value, .. } => assert_eq!(callee(value), "Flask"),
        other => panic!("unexpected statement: {other:?}"),
    }
    let view = function(&stmts[1]);
    assert_eq!(view.name, "get_users_int_id");
    assert_eq!(view.params[0].name, "id");
    assert_eq!(callee(&view.decorators[0]), "app.route");
    assert!(matches!(stmts[2].kind, StmtKind::If { .. }));
    assert!(analysis.new_imports[0].starts_with("from flask import Flask"));
}

#[test]
fn test_endpoint_names_are_deduplicated() {
    let source = "create an api endpoint at \"/\" that gets and returns 1\ncreate an api endpoint at \"/\" that gets and returns 2";
    let stmts = statements(source);
    assert_eq!(function(&stmts[1]).name, "get_root");
    assert_eq!(function(&stmts[2]).name, "get_root_2");
}

#[test]
fn test_existing_app_is_reused() {
    let first = analyze_source("let app be Flask(__name__)").unwrap();
    let second = analyze_with(
        parse("create an async api endpoint at \"/ping\" that posts and returns \"pong\"").unwrap(),
        &first.globals,
    )
    .unwrap();
    assert_eq!(second.program.statements.len(), 1);
    let view = function(&second.program.statements[0]);
    assert!(view.is_async);
    assert_eq!(view.name, "post_ping");
}

#[test]
fn test_nested_endpoint_is_rejected() {
    let source = "if True then\n    create an api endpoint at \"/\" that gets and returns 1";
    assert!(matches!(analyze_source(source), Err(CompileError::Syntax { .. })));
}

// --- incremental analysis ---

#[test]
fn test_globals_carry_between_units() {
    let first = analyze_source("let x be 1\nsay pandas").unwrap();
    assert_eq!(first.new_imports.len(), 1);

    let second = analyze_with(parse("say x\nsay pd").unwrap(), &first.globals).unwrap();
    assert!(second.new_imports.is_empty());
    assert_eq!(second.globals.imports.len(), 1);
}

#[test]
fn test_failed_unit_leaves_globals_untouched() {
    let first = analyze_source("let x be 1").unwrap();
    let before = first.globals.clone();

    let failed = analyze_with(parse("let y be numpy.zeros(2)\nsay missing").unwrap(), &first.globals);
    assert!(failed.is_err());
    assert_eq!(first.globals, before);

    let next = analyze_with(parse("say y").unwrap(), &first.globals);
    assert!(matches!(next, Err(CompileError::UnboundName { .. })));
}
