//! AST definitions
//!
//! Nodes own their children and carry the position of the Plain text they came
//! from. Some kinds (`Using`, `Sleep`, `Endpoint`, `WaitFor`) only exist between
//! parsing and semantic analysis; the analyzer rewrites them into Python-shaped
//! nodes.

use crate::location::SourceLocation;

/// Expression node
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub loc: SourceLocation,
}

impl Expr {
    pub fn new(kind: ExprKind, loc: SourceLocation) -> Self {
        Self { kind, loc }
    }

    pub fn name(name: impl Into<String>, loc: SourceLocation) -> Self {
        Self::new(ExprKind::Name(name.into()), loc)
    }

    /// `func(args...)` with no keyword arguments
    pub fn call(func: Expr, args: Vec<Expr>, loc: SourceLocation) -> Self {
        Self::new(
            ExprKind::Call {
                func: Box::new(func),
                args,
                kwargs: vec![],
            },
            loc,
        )
    }

    /// `value.attr`
    pub fn attribute(value: Expr, attr: impl Into<String>, loc: SourceLocation) -> Self {
        Self::new(
            ExprKind::Attribute {
                value: Box::new(value),
                attr: attr.into(),
            },
            loc,
        )
    }

    /// `value.method(args...)`
    pub fn method_call(value: Expr, method: &str, args: Vec<Expr>, loc: SourceLocation) -> Self {
        let func = Self::attribute(value, method, loc.clone());
        Self::call(func, args, loc)
    }

    pub fn is_assignable(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Name(_) | ExprKind::Attribute { .. } | ExprKind::Index { .. }
        )
    }
}

/// Expression types
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Numeric literal, raw text
    Number(String),
    /// String literal, raw text including quotes and prefix
    Str(String),
    Bool(bool),
    NoneLit,
    /// Identifier
    Name(String),
    BinOp {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// `low <= value <= high`
    Between {
        value: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
    },
    /// Function call with positional and keyword arguments
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        kwargs: Vec<(String, Expr)>,
    },
    /// Attribute access (obj.attr)
    Attribute { value: Box<Expr>, attr: String },
    /// Index access (target[index])
    Index { value: Box<Expr>, index: Box<Expr> },
    /// Slice inside an index (`lower:upper`)
    Slice {
        lower: Option<Box<Expr>>,
        upper: Option<Box<Expr>>,
    },
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    /// List comprehension [elt for targets in iter if condition]
    Comprehension {
        elt: Box<Expr>,
        targets: Vec<String>,
        iter: Box<Expr>,
        condition: Option<Box<Expr>>,
    },
    Lambda {
        params: Vec<String>,
        body: Box<Expr>,
    },
    /// Conditional expression (body if test else orelse)
    IfExp {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
    },
    /// `wait for E` before desugaring
    WaitFor(Box<Expr>),
    Await(Box<Expr>),
    Yield(Option<Box<Expr>>),
}

/// Binary operators, including comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    In,
    NotIn,
    Is,
    IsNot,
    And,
    Or,
}

impl BinOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq
                | BinOp::NotEq
                | BinOp::Lt
                | BinOp::Gt
                | BinOp::LtEq
                | BinOp::GtEq
                | BinOp::In
                | BinOp::NotIn
                | BinOp::Is
                | BinOp::IsNot
        )
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Statement node
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub loc: SourceLocation,
}

impl Stmt {
    pub fn new(kind: StmtKind, loc: SourceLocation) -> Self {
        Self { kind, loc }
    }

    pub fn expr(expr: Expr) -> Self {
        let loc = expr.loc.clone();
        Self::new(StmtKind::Expr(expr), loc)
    }
}

/// Statement types
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Assign {
        target: Expr,
        type_hint: Option<TypeHint>,
        value: Expr,
    },
    /// Augmented assignment (x += 1, x -= 1, ...)
    AugAssign {
        target: Expr,
        op: BinOp,
        value: Expr,
    },
    If {
        condition: Expr,
        then_body: Vec<Stmt>,
        elif_clauses: Vec<(Expr, Vec<Stmt>)>,
        else_body: Option<Vec<Stmt>>,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
    },
    For {
        targets: Vec<String>,
        iter: Expr,
        body: Vec<Stmt>,
    },
    FuncDef(FunctionDef),
    ClassDef {
        name: String,
        bases: Vec<Expr>,
        decorators: Vec<Expr>,
        body: Vec<Stmt>,
    },
    Try {
        body: Vec<Stmt>,
        handlers: Vec<Handler>,
        finally_body: Option<Vec<Stmt>>,
    },
    /// `using R as N` before desugaring
    Using {
        resource: Expr,
        binding: Option<String>,
        body: Vec<Stmt>,
    },
    /// Python `with` / `async with`
    With {
        resource: Expr,
        binding: Option<String>,
        body: Vec<Stmt>,
        is_async: bool,
    },
    /// `wait N seconds` before desugaring; duration is in seconds
    Sleep { seconds: Expr },
    /// Web route handler before desugaring; `route` is unquoted
    Endpoint {
        route: String,
        method: String,
        body: Vec<Stmt>,
        is_async: bool,
    },
    /// import module [as alias] / from module import names
    Import {
        module: String,
        alias: Option<String>,
        names: Option<Vec<String>>,
    },
    Return(Option<Expr>),
    Raise(Option<Expr>),
    Assert {
        test: Expr,
        msg: Option<Expr>,
    },
    Delete(Vec<Expr>),
    Break,
    Continue,
    Pass,
    Expr(Expr),
}

/// Function or method definition
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<TypeHint>,
    pub body: Vec<Stmt>,
    pub decorators: Vec<Expr>,
    pub is_async: bool,
    /// Set by the parser for method phrases, consumed by the analyzer
    pub method: Option<MethodKind>,
    /// Set by the analyzer when the body yields
    pub is_generator: bool,
}

/// Kind of method requested by a method phrase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Instance,
    Static,
    Class,
    Property,
}

/// Function parameter with optional default value
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub type_hint: Option<TypeHint>,
    pub default: Option<Expr>,
}

impl Param {
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_hint: None,
            default: None,
        }
    }
}

/// `except [exception] [as binding]:` clause
#[derive(Debug, Clone, PartialEq)]
pub struct Handler {
    pub exception: Option<Expr>,
    pub binding: Option<String>,
    pub body: Vec<Stmt>,
    pub loc: SourceLocation,
}

/// Type hint (`list of int`, `dict[str, int]`)
#[derive(Debug, Clone, PartialEq)]
pub struct TypeHint {
    pub name: String,
    pub params: Vec<TypeHint>,
    pub loc: SourceLocation,
}

impl TypeHint {
    pub fn simple(name: impl Into<String>, loc: SourceLocation) -> Self {
        Self {
            name: name.into(),
            params: vec![],
            loc,
        }
    }
}

impl std::fmt::Display for TypeHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.params.is_empty() {
            return write!(f, "{}", self.name);
        }
        let params: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
        write!(f, "{}[{}]", self.name, params.join(", "))
    }
}

/// Program (collection of statements)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}
