//! parser module tests

use super::*;
use crate::error::CompileError;
use pretty_assertions::assert_eq;

fn first_stmt(source: &str) -> StmtKind {
    let program = parse(source).unwrap();
    program.statements.into_iter().next().unwrap().kind
}

fn expr_of(source: &str) -> ExprKind {
    match first_stmt(source) {
        StmtKind::Assign { value, .. } => value.kind,
        StmtKind::Expr(expr) => expr.kind,
        other => panic!("unexpected statement: {other:?}"),
    }
}

fn name_of(expr: &Expr) -> &str {
    match &expr.kind {
        ExprKind::Name(name) => name,
        other => panic!("expected a name, got {other:?}"),
    }
}

fn callee(kind: &ExprKind) -> String {
    match kind {
        ExprKind::Call { func, .. } => match &func.kind {
            ExprKind::Name(name) => name.clone(),
            ExprKind::Attribute { attr, .. } => attr.clone(),
            other => panic!("unexpected callee: {other:?}"),
        },
        other => panic!("expected a call, got {other:?}"),
    }
}

#[test]
fn test_parse_let_and_say() {
    let program = parse("let x be 5\nsay x").unwrap();
    assert_eq!(program.statements.len(), 2);

    match &program.statements[0].kind {
        StmtKind::Assign {
            target,
            type_hint,
            value,
        } => {
            assert_eq!(name_of(target), "x");
            assert!(type_hint.is_none());
            assert_eq!(value.kind, ExprKind::Number("5".to_string()));
        }
        other => panic!("unexpected statement: {other:?}"),
    }

    match &program.statements[1].kind {
        StmtKind::Expr(expr) => assert_eq!(callee(&expr.kind), "print"),
        other => panic!("unexpected statement: {other:?}"),
    }
    assert_eq!(program.statements[1].loc.line, 2);
}

#[test]
fn test_let_without_value_is_syntax_error() {
    let err = parse("let x be").unwrap_err();
    match err {
        CompileError::Syntax { loc, .. } => assert_eq!(loc.line, 1),
        other => panic!("expected syntax error, got {other:?}"),
    }
}

#[test]
fn test_empty_input_is_rejected() {
    assert!(matches!(parse("\n\n# only a comment\n"), Err(CompileError::Syntax { .. })));
}

#[test]
fn test_inline_if_otherwise() {
    let source = "if x is greater than 5 then say \"big\" otherwise say \"small\"";
    match first_stmt(source) {
        StmtKind::If {
            condition,
            then_body,
            elif_clauses,
            else_body,
        } => {
            match condition.kind {
                ExprKind::BinOp { op, .. } => assert_eq!(op, BinOp::Gt),
                other => panic!("unexpected condition: {other:?}"),
            }
            assert_eq!(then_body.len(), 1);
            assert!(elif_clauses.is_empty());
            assert_eq!(else_body.map(|b| b.len()), Some(1));
        }
        other => panic!("unexpected statement: {other:?}"),
    }
}

#[test]
fn test_block_if_with_else_if() {
    let source = r#"
if score is at least 90 then
    say "A"
otherwise if score is at least 80 then
    say "B"
otherwise
    say "C"
"#;
    match first_stmt(source) {
        StmtKind::If {
            elif_clauses,
            else_body,
            ..
        } => {
            assert_eq!(elif_clauses.len(), 1);
            assert!(else_body.is_some());
        }
        other => panic!("unexpected statement: {other:?}"),
    }
}

#[test]
fn test_nested_blocks() {
    let source = r#"
for each n in the numbers from 1 to 3
    if n is 2 then
        say n
say "done"
"#;
    let program = parse(source).unwrap();
    assert_eq!(program.statements.len(), 2);
    match &program.statements[0].kind {
        StmtKind::For { targets, iter, body } => {
            assert_eq!(targets, &vec!["n".to_string()]);
            assert_eq!(callee(&iter.kind), "range");
            assert!(matches!(body[0].kind, StmtKind::If { .. }));
        }
        other => panic!("unexpected statement: {other:?}"),
    }
}

#[test]
fn test_repeat_times() {
    match first_stmt("repeat 3 times\n    say \"hi\"") {
        StmtKind::For { targets, iter, body } => {
            assert_eq!(targets, vec!["_".to_string()]);
            assert_eq!(callee(&iter.kind), "range");
            assert_eq!(body.len(), 1);
        }
        other => panic!("unexpected statement: {other:?}"),
    }
}

#[test]
fn test_function_phrase_binds_tighter_than_arithmetic() {
    match expr_of("let n be the length of xs plus 1") {
        ExprKind::BinOp { left, op, right } => {
            assert_eq!(op, BinOp::Add);
            assert_eq!(callee(&left.kind), "len");
            assert_eq!(right.kind, ExprKind::Number("1".to_string()));
        }
        other => panic!("unexpected expression: {other:?}"),
    }
}

#[test]
fn test_multiplication_binds_tighter_than_addition() {
    match expr_of("let y be 1 plus 2 times 3") {
        ExprKind::BinOp { op, right, .. } => {
            assert_eq!(op, BinOp::Add);
            assert!(matches!(right.kind, ExprKind::BinOp { op: BinOp::Mul, .. }));
        }
        other => panic!("unexpected expression: {other:?}"),
    }
}

#[test]
fn test_power_is_right_associative() {
    match expr_of("let y be 2 ** 3 ** 2") {
        ExprKind::BinOp { op, left, right } => {
            assert_eq!(op, BinOp::Pow);
            assert_eq!(left.kind, ExprKind::Number("2".to_string()));
            assert!(matches!(right.kind, ExprKind::BinOp { op: BinOp::Pow, .. }));
        }
        other => panic!("unexpected expression: {other:?}"),
    }
}

#[test]
fn test_not_binds_looser_than_comparison() {
    match expr_of("let ok be not x is 3 and y") {
        ExprKind::BinOp { op, left, .. } => {
            assert_eq!(op, BinOp::And);
            match left.kind {
                ExprKind::UnaryOp { op, operand } => {
                    assert_eq!(op, UnaryOp::Not);
                    assert!(matches!(operand.kind, ExprKind::BinOp { op: BinOp::Eq, .. }));
                }
                other => panic!("unexpected operand: {other:?}"),
            }
        }
        other => panic!("unexpected expression: {other:?}"),
    }
}

#[test]
fn test_comparison_phrases() {
    assert!(matches!(
        expr_of("let b be x is nothing"),
        ExprKind::BinOp { op: BinOp::Is, .. }
    ));
    assert!(matches!(
        expr_of("let b be xs contains 3"),
        ExprKind::BinOp { op: BinOp::In, .. }
    ));
    assert!(matches!(
        expr_of("let b be age is between 18 and 65"),
        ExprKind::Between { .. }
    ));
    assert!(matches!(
        expr_of("let b be x is greater than or equal to 3"),
        ExprKind::BinOp { op: BinOp::GtEq, .. }
    ));
}

#[test]
fn test_contains_puts_collection_on_the_right() {
    match expr_of("let b be names contains \"Ann\"") {
        ExprKind::BinOp { left, right, .. } => {
            assert_eq!(left.kind, ExprKind::Str("\"Ann\"".to_string()));
            assert_eq!(name_of(&right), "names");
        }
        other => panic!("unexpected expression: {other:?}"),
    }
}

#[test]
fn test_conditional_expression() {
    match expr_of("let label be \"even\" if n % 2 == 0 otherwise \"odd\"") {
        ExprKind::IfExp { body, orelse, .. } => {
            assert_eq!(body.kind, ExprKind::Str("\"even\"".to_string()));
            assert_eq!(orelse.kind, ExprKind::Str("\"odd\"".to_string()));
        }
        other => panic!("unexpected expression: {other:?}"),
    }
}

#[test]
fn test_english_comprehension() {
    match expr_of("let squares be a list of n * n for each n in nums where n > 0") {
        ExprKind::Comprehension {
            targets, condition, ..
        } => {
            assert_eq!(targets, vec!["n".to_string()]);
            assert!(condition.is_some());
        }
        other => panic!("unexpected expression: {other:?}"),
    }
}

#[test]
fn test_list_of_items() {
    match expr_of("let xs be a list of 1, 2 and 3") {
        ExprKind::List(items) => assert_eq!(items.len(), 3),
        other => panic!("unexpected expression: {other:?}"),
    }
}

#[test]
fn test_python_style_fallback() {
    let program = parse("x = 10\nx += 1\nprint(x, sep=\"\")").unwrap();
    assert!(matches!(program.statements[0].kind, StmtKind::Assign { .. }));
    assert!(matches!(
        program.statements[1].kind,
        StmtKind::AugAssign { op: BinOp::Add, .. }
    ));
    match &program.statements[2].kind {
        StmtKind::Expr(Expr {
            kind: ExprKind::Call { kwargs, .. },
            ..
        }) => assert_eq!(kwargs[0].0, "sep"),
        other => panic!("unexpected statement: {other:?}"),
    }
}

#[test]
fn test_unknown_phrase_gets_hint() {
    let err = parse("craete a variable called x").unwrap_err();
    match err {
        CompileError::Syntax { hint, .. } => {
            assert_eq!(hint, Some("'create a variable called'".to_string()));
        }
        other => panic!("expected syntax error, got {other:?}"),
    }
}

#[test]
fn test_create_variable_with_type_hint() {
    match first_stmt("create a variable called age of type whole number with value 30") {
        StmtKind::Assign {
            type_hint, value, ..
        } => {
            assert_eq!(type_hint.map(|h| h.name), Some("whole number".to_string()));
            assert_eq!(value.kind, ExprKind::Number("30".to_string()));
        }
        other => panic!("unexpected statement: {other:?}"),
    }
}

#[test]
fn test_define_function_english_params() {
    let source = "define a function called add that takes a and b and returns a plus b";
    match first_stmt(source) {
        StmtKind::FuncDef(def) => {
            assert_eq!(def.name, "add");
            let params: Vec<_> = def.params.iter().map(|p| p.name.as_str()).collect();
            assert_eq!(params, vec!["a", "b"]);
            assert!(matches!(def.body[0].kind, StmtKind::Return(Some(_))));
        }
        other => panic!("unexpected statement: {other:?}"),
    }
}

#[test]
fn test_define_function_with_typed_params_and_block() {
    let source = r#"
define a function called greet taking name of type text returning text
    return "Hi " + name
"#;
    match first_stmt(source) {
        StmtKind::FuncDef(def) => {
            assert_eq!(def.params[0].type_hint.as_ref().map(|h| h.name.as_str()), Some("text"));
            assert_eq!(def.return_type.map(|h| h.name), Some("text".to_string()));
            assert_eq!(def.body.len(), 1);
        }
        other => panic!("unexpected statement: {other:?}"),
    }
}

#[test]
fn test_class_with_methods() {
    let source = r#"
define a class called Dog that extends Animal
    define a method called speak
        say "Woof"
"#;
    match first_stmt(source) {
        StmtKind::ClassDef { name, bases, body, .. } => {
            assert_eq!(name, "Dog");
            assert_eq!(name_of(&bases[0]), "Animal");
            match &body[0].kind {
                StmtKind::FuncDef(def) => assert_eq!(def.method, Some(MethodKind::Instance)),
                other => panic!("unexpected member: {other:?}"),
            }
        }
        other => panic!("unexpected statement: {other:?}"),
    }
}

#[test]
fn test_try_with_handler() {
    let source = r#"
try
    let n be int(text)
if something goes wrong as e
    say e
finally
    say "done"
"#;
    match first_stmt(source) {
        StmtKind::Try {
            body,
            handlers,
            finally_body,
        } => {
            assert_eq!(body.len(), 1);
            assert_eq!(handlers.len(), 1);
            assert_eq!(handlers[0].binding.as_deref(), Some("e"));
            assert_eq!(handlers[0].exception.as_ref().map(name_of), Some("Exception"));
            assert!(finally_body.is_some());
        }
        other => panic!("unexpected statement: {other:?}"),
    }
}

#[test]
fn test_try_without_handler_is_rejected() {
    assert!(matches!(
        parse("try\n    say 1\nsay 2"),
        Err(CompileError::Syntax { .. })
    ));
}

#[test]
fn test_continuation_without_header_is_rejected() {
    assert!(matches!(parse("otherwise say 1"), Err(CompileError::Syntax { .. })));
}

#[test]
fn test_wait_forms() {
    assert!(matches!(first_stmt("wait 2 seconds"), StmtKind::Sleep { .. }));
    assert!(matches!(first_stmt("wait for 5 minutes"), StmtKind::Sleep { .. }));
    assert!(matches!(
        first_stmt("wait for fetch()"),
        StmtKind::Expr(Expr {
            kind: ExprKind::WaitFor(_),
            ..
        })
    ));
}

#[test]
fn test_imports() {
    match first_stmt("use the requests library") {
        StmtKind::Import { module, names, .. } => {
            assert_eq!(module, "requests");
            assert!(names.is_none());
        }
        other => panic!("unexpected statement: {other:?}"),
    }
    match first_stmt("from os.path import join, exists") {
        StmtKind::Import { module, names, .. } => {
            assert_eq!(module, "os.path");
            assert_eq!(names, Some(vec!["join".to_string(), "exists".to_string()]));
        }
        other => panic!("unexpected statement: {other:?}"),
    }
}

#[test]
fn test_use_known_library_takes_its_alias() {
    match first_stmt("use the pandas library") {
        StmtKind::Import { module, alias, .. } => {
            assert_eq!(module, "pandas");
            assert_eq!(alias.as_deref(), Some("pd"));
        }
        other => panic!("unexpected statement: {other:?}"),
    }
    match first_stmt("use pyplot") {
        StmtKind::Import { module, alias, .. } => {
            assert_eq!(module, "matplotlib.pyplot");
            assert_eq!(alias.as_deref(), Some("plt"));
        }
        other => panic!("unexpected statement: {other:?}"),
    }
    match first_stmt("use numpy as numeric") {
        StmtKind::Import { alias, .. } => assert_eq!(alias.as_deref(), Some("numeric")),
        other => panic!("unexpected statement: {other:?}"),
    }
}

#[test]
fn test_collection_statements() {
    assert_eq!(callee(&expr_of("add 4 to the list numbers")), "append");
    assert_eq!(callee(&expr_of("remove 4 from numbers")), "remove");
    match expr_of("sort numbers in reverse order") {
        ExprKind::Call { kwargs, .. } => assert_eq!(kwargs[0].0, "reverse"),
        other => panic!("unexpected expression: {other:?}"),
    }
}

#[test]
fn test_increase_defaults_to_one() {
    match first_stmt("increase count") {
        StmtKind::AugAssign { op, value, .. } => {
            assert_eq!(op, BinOp::Add);
            assert_eq!(value.kind, ExprKind::Number("1".to_string()));
        }
        other => panic!("unexpected statement: {other:?}"),
    }
}

#[test]
fn test_decorator_requires_definition() {
    let ok = parse("apply decorator cache\ndefine a function called f and returns 1").unwrap();
    match &ok.statements[0].kind {
        StmtKind::FuncDef(def) => assert_eq!(def.decorators.len(), 1),
        other => panic!("unexpected statement: {other:?}"),
    }

    assert!(matches!(
        parse("apply decorator cache\nsay 1"),
        Err(CompileError::Syntax { .. })
    ));
}

#[test]
fn test_using_block() {
    let source = "using open the file \"a.txt\" for writing as f\n    f.write(\"x\")";
    match first_stmt(source) {
        StmtKind::Using {
            resource, binding, ..
        } => {
            assert_eq!(callee(&resource.kind), "open");
            assert_eq!(binding.as_deref(), Some("f"));
        }
        other => panic!("unexpected statement: {other:?}"),
    }
}

#[test]
fn test_parse_is_deterministic() {
    let source = "let x be 3\nif x is 3 then say x otherwise say 0";
    assert_eq!(parse(source).unwrap(), parse(source).unwrap());
}

#[test]
fn test_prepend_and_pop() {
    match expr_of("prepend 0 to the list numbers") {
        ExprKind::Call { func, args, .. } => {
            assert!(matches!(&func.kind, ExprKind::Attribute { attr, .. } if attr == "insert"));
            assert_eq!(args[0].kind, ExprKind::Number("0".to_string()));
            assert_eq!(args.len(), 2);
        }
        other => panic!("unexpected expression: {other:?}"),
    }
    assert_eq!(callee(&expr_of("pop from the list numbers")), "pop");
    assert_eq!(callee(&expr_of("pop numbers")), "pop");
}

#[test]
fn test_print_numbers_is_a_loop() {
    match first_stmt("print numbers from 1 to 5") {
        StmtKind::For { targets, iter, body } => {
            assert_eq!(targets, vec!["number".to_string()]);
            assert_eq!(callee(&iter.kind), "range");
            assert_eq!(body.len(), 1);
        }
        other => panic!("unexpected statement: {other:?}"),
    }
}

#[test]
fn test_run_calls_function() {
    match expr_of("run main with 1 and 2") {
        ExprKind::Call { func, args, .. } => {
            assert_eq!(name_of(&func), "main");
            assert_eq!(args.len(), 2);
        }
        other => panic!("unexpected expression: {other:?}"),
    }
    assert_eq!(callee(&expr_of("execute cleanup")), "cleanup");
    // Python call syntax on the bare verb stays a Python call
    assert_eq!(callee(&expr_of("run(job)")), "run");
}

#[test]
fn test_database_phrases() {
    match first_stmt("connect to the database \"app.db\"") {
        StmtKind::Assign { target, value, .. } => {
            assert_eq!(name_of(&target), "db_connection");
            assert_eq!(callee(&value.kind), "connect");
        }
        other => panic!("unexpected statement: {other:?}"),
    }
    match first_stmt("query the database with \"SELECT * FROM users\"") {
        StmtKind::Assign { target, value, .. } => {
            assert_eq!(name_of(&target), "result");
            assert_eq!(callee(&value.kind), "execute");
        }
        other => panic!("unexpected statement: {other:?}"),
    }
    assert_eq!(
        callee(&expr_of("insert into the database \"INSERT INTO users VALUES (1)\"")),
        "execute"
    );
}

#[test]
fn test_api_endpoint_inline_return() {
    match first_stmt("create an api endpoint at \"/users/<int:id>\" that gets and returns id") {
        StmtKind::Endpoint {
            route,
            method,
            body,
            is_async,
        } => {
            assert_eq!(route, "/users/<int:id>");
            assert_eq!(method, "GET");
            assert!(!is_async);
            assert!(matches!(body[0].kind, StmtKind::Return(Some(_))));
        }
        other => panic!("unexpected statement: {other:?}"),
    }
}

#[test]
fn test_async_api_endpoint_block() {
    let source = "create an async api endpoint at \"/jobs\" that posts and does\n    say \"queued\"\n    return \"ok\"";
    match first_stmt(source) {
        StmtKind::Endpoint {
            method,
            body,
            is_async,
            ..
        } => {
            assert_eq!(method, "POST");
            assert!(is_async);
            assert_eq!(body.len(), 2);
        }
        other => panic!("unexpected statement: {other:?}"),
    }
}

#[test]
fn test_api_endpoint_needs_quoted_route_and_method() {
    assert!(matches!(
        parse("create an api endpoint at users that gets and returns 1"),
        Err(CompileError::Syntax { .. })
    ));
    assert!(matches!(
        parse("create an api endpoint at \"/\" that fetches and returns 1"),
        Err(CompileError::Syntax { .. })
    ));
}
