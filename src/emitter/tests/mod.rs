//! emitter module tests

use super::*;
use crate::parser::parse;
use crate::semantic::analyze;
use pretty_assertions::assert_eq;

fn loc(line: usize) -> SourceLocation {
    SourceLocation::new(line, 1)
}

fn num(n: &str) -> Expr {
    Expr::new(ExprKind::Number(n.to_string()), loc(1))
}

fn name(n: &str) -> Expr {
    Expr::name(n, loc(1))
}

fn bin(left: Expr, op: BinOp, right: Expr) -> Expr {
    Expr::new(
        ExprKind::BinOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        loc(1),
    )
}

fn render(expr: &Expr) -> String {
    PythonEmitter::new(DEFAULT_INDENT_WIDTH).expr(expr, PREC_YIELD)
}

/// Full pipeline up to Python text
fn python(source: &str) -> String {
    let analysis = analyze(parse(source).unwrap()).unwrap();
    emit(&analysis.program, &analysis.new_imports).unwrap().0
}

// --- expressions ---

#[test]
fn test_precedence_adds_parentheses_only_where_needed() {
    let sum = bin(name("a"), BinOp::Add, name("b"));
    assert_eq!(render(&bin(sum.clone(), BinOp::Mul, name("c"))), "(a + b) * c");
    assert_eq!(render(&bin(name("c"), BinOp::Mul, sum.clone())), "c * (a + b)");
    assert_eq!(render(&bin(sum.clone(), BinOp::Add, name("c"))), "a + b + c");
    assert_eq!(render(&bin(name("c"), BinOp::Sub, sum)), "c - (a + b)");
}

#[test]
fn test_power_is_right_associative() {
    let right = bin(name("b"), BinOp::Pow, name("c"));
    assert_eq!(render(&bin(name("a"), BinOp::Pow, right)), "a ** b ** c");

    let left = bin(name("a"), BinOp::Pow, name("b"));
    assert_eq!(render(&bin(left, BinOp::Pow, name("c"))), "(a ** b) ** c");
}

#[test]
fn test_nested_comparisons_are_not_chained() {
    let inner = bin(name("a"), BinOp::Lt, name("b"));
    assert_eq!(render(&bin(inner, BinOp::Eq, name("c"))), "(a < b) == c");
}

#[test]
fn test_unary_operators() {
    let neg = Expr::new(
        ExprKind::UnaryOp {
            op: UnaryOp::Neg,
            operand: Box::new(bin(num("1"), BinOp::Add, num("2"))),
        },
        loc(1),
    );
    assert_eq!(render(&neg), "-(1 + 2)");

    let not = Expr::new(
        ExprKind::UnaryOp {
            op: UnaryOp::Not,
            operand: Box::new(bin(name("a"), BinOp::And, name("b"))),
        },
        loc(1),
    );
    assert_eq!(render(&not), "not (a and b)");
}

#[test]
fn test_literals_and_containers() {
    assert_eq!(render(&Expr::new(ExprKind::Bool(true), loc(1))), "True");
    assert_eq!(render(&Expr::new(ExprKind::NoneLit, loc(1))), "None");
    assert_eq!(render(&Expr::new(ExprKind::Tuple(vec![num("1")]), loc(1))), "(1,)");
    assert_eq!(
        render(&Expr::new(ExprKind::Dict(vec![(Expr::new(ExprKind::Str("'a'".into()), loc(1)), num("1"))]), loc(1))),
        "{'a': 1}"
    );
}

#[test]
fn test_call_with_keywords() {
    let call = Expr::new(
        ExprKind::Call {
            func: Box::new(name("print")),
            args: vec![name("x")],
            kwargs: vec![("end".to_string(), Expr::new(ExprKind::Str("\"\"".into()), loc(1)))],
        },
        loc(1),
    );
    assert_eq!(render(&call), "print(x, end=\"\")");
}

#[test]
fn test_between_renders_chained_comparison() {
    let between = Expr::new(
        ExprKind::Between {
            value: Box::new(name("x")),
            low: Box::new(num("1")),
            high: Box::new(num("10")),
        },
        loc(1),
    );
    assert_eq!(render(&between), "1 <= x <= 10");
}

#[test]
fn test_conditional_expression() {
    let ifexp = Expr::new(
        ExprKind::IfExp {
            test: Box::new(bin(name("x"), BinOp::Gt, num("0"))),
            body: Box::new(Expr::new(ExprKind::Str("\"pos\"".into()), loc(1))),
            orelse: Box::new(Expr::new(ExprKind::Str("\"neg\"".into()), loc(1))),
        },
        loc(1),
    );
    assert_eq!(render(&ifexp), "\"pos\" if x > 0 else \"neg\"");
    let sum = bin(ifexp, BinOp::Add, num("1"));
    assert!(render(&sum).starts_with("(\"pos\""));
}

// --- statements ---

#[test]
fn test_let_assignment() {
    assert_eq!(python("let x be 5"), "x = 5\n");
}

#[test]
fn test_inline_if_becomes_block() {
    let out = python("let x be 5\nif x is greater than 3 then say \"big\" otherwise say \"small\"");
    assert_eq!(
        out,
        "x = 5\nif x > 3:\n    print(\"big\")\nelse:\n    print(\"small\")\n"
    );
}

#[test]
fn test_nested_blocks_follow_source_indentation() {
    let source = r#"
define a function called report taking items
    for each item in items
        if item is greater than 2 then
            say item
report([1, 5])
"#;
    assert_eq!(
        python(source),
        "def report(items):\n    for item in items:\n        if item > 2:\n            print(item)\nreport([1, 5])\n"
    );
}

#[test]
fn test_imports_come_first_then_blank_line() {
    let out = python("let frame be pandas.DataFrame()\nsay pd.read_csv(\"a.csv\")\nsay pandas");
    assert_eq!(
        out,
        "import pandas as pd\n\nframe = pd.DataFrame()\nprint(pd.read_csv(\"a.csv\"))\nprint(pd)\n"
    );
    assert_eq!(out.matches("import pandas").count(), 1);
}

#[test]
fn test_empty_body_emits_pass() {
    assert_eq!(python("define a class called Empty"), "class Empty:\n    pass\n");
}

#[test]
fn test_function_signature() {
    let source = "define a function called greet taking name of type text and greeting defaulting to \"Hi\" returning text and returns greeting + name";
    assert_eq!(
        python(source),
        "def greet(name: str, greeting=\"Hi\") -> str:\n    return greeting + name\n"
    );
}

#[test]
fn test_methods_and_decorators() {
    let source = r#"
define a class called Counter
    define a static method called zero and returns 0
"#;
    assert_eq!(
        python(source),
        "class Counter:\n    @staticmethod\n    def zero():\n        return 0\n"
    );
}

#[test]
fn test_try_and_with() {
    let source = r#"
try
    using open file "notes.txt" as notes
        say notes.read()
if something goes wrong as problem
    say problem
finally
    say "done"
"#;
    assert_eq!(
        python(source),
        concat!(
            "try:\n",
            "    with open(\"notes.txt\", \"r\") as notes:\n",
            "        print(notes.read())\n",
            "except Exception as problem:\n",
            "    print(problem)\n",
            "finally:\n",
            "    print(\"done\")\n"
        )
    );
}

#[test]
fn test_async_function_with_sleep() {
    let source = r#"
asynchronously define a function called main
    wait 1 second
wait for main()
"#;
    assert_eq!(
        python(source),
        "import asyncio\n\nasync def main():\n    await asyncio.sleep(1)\nasyncio.run(main())\n"
    );
}

#[test]
fn test_custom_indent_width() {
    let analysis = analyze(parse("while true\n    stop").unwrap()).unwrap();
    let (out, _) = PythonEmitter::new(2)
        .emit_unit(&analysis.program, &analysis.new_imports)
        .unwrap();
    assert_eq!(out, "while True:\n  break\n");
}

#[test]
fn test_output_is_deterministic() {
    let source = "say json.dumps(1)\nsay math.pi\nsay random.choice([1, 2])";
    assert_eq!(python(source), python(source));
}

#[test]
fn test_pyplot_is_imported_as_plt() {
    assert_eq!(python("pyplot.show()"), "import matplotlib.pyplot as plt\n\nplt.show()\n");
    assert_eq!(
        python("use the pyplot library\nplt.plot([1, 2])"),
        "import matplotlib.pyplot as plt\nplt.plot([1, 2])\n"
    );
}

#[test]
fn test_number_means_float() {
    assert_eq!(
        python("total: number = \"3\" as number\ncount: int = \"3\" as integer"),
        "total: float = float(\"3\")\ncount: int = int(\"3\")\n"
    );
}

#[test]
fn test_list_front_and_back() {
    let source = "let numbers be [1, 2]\nprepend 0 to numbers\npop from the list numbers";
    assert_eq!(
        python(source),
        "numbers = [1, 2]\nnumbers.insert(0, 0)\nnumbers.pop()\n"
    );
}

#[test]
fn test_print_numbers_loop() {
    assert_eq!(
        python("print numbers from 1 to 3"),
        "for number in range(1, 3 + 1):\n    print(number)\n"
    );
}

#[test]
fn test_run_and_stop_program() {
    let source = "define a function called main and returns 1\nrun main\nexit the program";
    assert_eq!(
        python(source),
        "import sys\n\ndef main():\n    return 1\nmain()\nsys.exit(0)\n"
    );
}

#[test]
fn test_database_phrases_use_sqlite() {
    let source = concat!(
        "connect to the database \"app.db\"\n",
        "insert into the database \"INSERT INTO notes VALUES ('hi')\"\n",
        "query the database with \"SELECT * FROM notes\"\n",
        "say result.fetchall()",
    );
    assert_eq!(
        python(source),
        concat!(
            "import sqlite3\n\n",
            "db_connection = sqlite3.connect(\"app.db\")\n",
            "db_connection.execute(\"INSERT INTO notes VALUES ('hi')\")\n",
            "result = db_connection.execute(\"SELECT * FROM notes\")\n",
            "print(result.fetchall())\n",
        )
    );
}

#[test]
fn test_api_endpoint_program() {
    let source = "create an api endpoint at \"/hello/<name>\" that gets and returns \"hi \" + name";
    assert_eq!(
        python(source),
        concat!(
            "from flask import Flask, request, jsonify, render_template, send_file, send_from_directory\n\n",
            "app = Flask(__name__)\n",
            "@app.route(\"/hello/<name>\", methods=[\"GET\"])\n",
            "def get_hello_name(name):\n",
            "    return \"hi \" + name\n",
            "if __name__ == \"__main__\":\n",
            "    app.run(debug=True, port=5000)\n",
        )
    );
}

// --- line map ---

#[test]
fn test_line_map_skips_imports() {
    let analysis = analyze(parse("say math.pi\n\nsay 2").unwrap()).unwrap();
    let (out, map) = emit(&analysis.program, &analysis.new_imports).unwrap();
    assert_eq!(out, "import math\n\nprint(math.pi)\nprint(2)\n");
    assert_eq!(map.source_line(1), None);
    assert_eq!(map.source_line(2), None);
    assert_eq!(map.source_line(3), Some(1));
    assert_eq!(map.source_line(4), Some(3));
}

// --- internal errors ---

#[test]
fn test_undesugared_nodes_are_internal_errors() {
    let using = Program {
        statements: vec![Stmt::new(
            StmtKind::Using {
                resource: name("r"),
                binding: None,
                body: vec![],
            },
            loc(4),
        )],
    };
    let err = emit(&using, &[]).unwrap_err();
    assert!(err.is_internal());
    assert_eq!(err.location().map(|l| l.line), Some(4));

    let sleep = Program {
        statements: vec![Stmt::new(StmtKind::Sleep { seconds: num("1") }, loc(1))],
    };
    assert!(emit(&sleep, &[]).unwrap_err().is_internal());

    let wait = Program {
        statements: vec![Stmt::expr(Expr::new(ExprKind::WaitFor(Box::new(name("f"))), loc(2)))],
    };
    assert!(emit(&wait, &[]).unwrap_err().is_internal());
}
