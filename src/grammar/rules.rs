//! Phrase rule tables
//!
//! Statement, prefix-expression and infix-operator phrases. Registration order
//! matters only for phrases of equal length; keep more specific phrases next
//! to the general ones they refine so the tables stay readable.

use super::RuleTable;
use crate::parser::ast::BinOp;
use once_cell::sync::Lazy;

/// Statement-level productions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StmtRule {
    Let,
    Set,
    CreateVariable,
    CreateList,
    CreateDict,
    Increase,
    Decrease,
    Say,
    PrintNumbers,
    Log,
    If,
    ElseIf,
    Else,
    While,
    ForEach,
    RepeatTimes,
    RepeatUntil,
    RepeatWhile,
    RepeatForever,
    Break,
    Continue,
    Pass,
    DefineFunction,
    DefineAsyncFunction,
    DefineGenerator,
    DefineMethod,
    DefineStaticMethod,
    DefineClassMethod,
    DefineProperty,
    DefineClass,
    Decorate,
    ApplyDecorator,
    Try,
    Catch,
    Finally,
    Raise,
    RaiseError,
    Assert,
    Using,
    WaitFor,
    Sleep,
    ApiEndpoint,
    AsyncApiEndpoint,
    ConnectDatabase,
    QueryDatabase,
    InsertDatabase,
    Run,
    Import,
    FromImport,
    UseLibrary,
    Append,
    Prepend,
    Pop,
    Remove,
    Delete,
    Sort,
    Reverse,
    Clear,
    Exit,
    StopProgram,
    Return,
    Yield,
}

impl StmtRule {
    /// Productions that continue a compound statement instead of starting one
    pub fn is_continuation(self) -> bool {
        matches!(
            self,
            StmtRule::ElseIf | StmtRule::Else | StmtRule::Catch | StmtRule::Finally
        )
    }
}

/// Productions that start an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefix {
    LengthOf,
    SumOf,
    AverageOf,
    MaxOf,
    MinOf,
    AbsOf,
    Uppercase,
    Lowercase,
    Ask,
    Call,
    New,
    ListOf,
    EmptyList,
    EmptyDict,
    My,
    WaitFor,
    RandomBetween,
    NumbersFrom,
    Lambda,
    OpenFile,
    Not,
    Negative,
}

/// Operator phrases that continue an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Infix {
    Or,
    And,
    Compare(BinOp),
    Contains,
    NotContains,
    Between,
    StartsWith,
    EndsWith,
    IsEmpty,
    IsNotEmpty,
    Arith(BinOp),
    /// Postfix conversion, holding the Python builtin to call
    Convert(&'static str),
    /// `A if C otherwise B`
    Conditional,
}

/// Binding power of `not`
pub const NOT_PRECEDENCE: u8 = 4;
/// Binding power of comparison phrases
pub const COMPARE_PRECEDENCE: u8 = 5;
/// Binding power of unary minus
pub const UNARY_PRECEDENCE: u8 = 8;

impl Infix {
    pub fn precedence(self) -> u8 {
        match self {
            Infix::Conditional => 1,
            Infix::Or => 2,
            Infix::And => 3,
            Infix::Compare(_)
            | Infix::Contains
            | Infix::NotContains
            | Infix::Between
            | Infix::StartsWith
            | Infix::EndsWith
            | Infix::IsEmpty
            | Infix::IsNotEmpty => COMPARE_PRECEDENCE,
            Infix::Arith(BinOp::Add | BinOp::Sub) => 6,
            Infix::Arith(BinOp::Pow) => 9,
            Infix::Arith(_) => 7,
            Infix::Convert(_) => 10,
        }
    }

    pub fn is_right_assoc(self) -> bool {
        matches!(self, Infix::Arith(BinOp::Pow))
    }
}

const STATEMENT_SPECS: &[(&str, StmtRule)] = &[
    // Declarations
    ("let", StmtRule::Let),
    ("set [the]", StmtRule::Set),
    ("(create|make) [a|an] [new] variable (called|named)", StmtRule::CreateVariable),
    ("(create|make) [a|an] [new|empty] list (called|named)", StmtRule::CreateList),
    (
        "(create|make) [a|an] [new|empty] (dictionary|dict|map) (called|named)",
        StmtRule::CreateDict,
    ),
    ("(increase|increment) [the]", StmtRule::Increase),
    ("(decrease|decrement) [the]", StmtRule::Decrease),
    // Output
    ("(say|print|show|display|tell|announce)", StmtRule::Say),
    ("(say|print|show|display) [the] numbers from", StmtRule::PrintNumbers),
    ("(log|logging) (debug|info|warning|error|critical)", StmtRule::Log),
    // Control flow
    ("if", StmtRule::If),
    ("(otherwise|else) if", StmtRule::ElseIf),
    ("elif", StmtRule::ElseIf),
    ("(otherwise|else)", StmtRule::Else),
    ("while", StmtRule::While),
    ("for [each|every]", StmtRule::ForEach),
    ("repeat", StmtRule::RepeatTimes),
    ("repeat until", StmtRule::RepeatUntil),
    ("repeat while", StmtRule::RepeatWhile),
    ("repeat forever", StmtRule::RepeatForever),
    ("(stop|break)", StmtRule::Break),
    ("exit the loop", StmtRule::Break),
    ("(skip|continue)", StmtRule::Continue),
    ("move on", StmtRule::Continue),
    ("do nothing", StmtRule::Pass),
    ("pass", StmtRule::Pass),
    // Functions and classes
    ("(define|create|make) [a|an] function (called|named)", StmtRule::DefineFunction),
    (
        "asynchronously (define|create|make) [a|an] function (called|named)",
        StmtRule::DefineAsyncFunction,
    ),
    (
        "(define|create|make) [a|an] (async|asynchronous) function (called|named)",
        StmtRule::DefineAsyncFunction,
    ),
    ("(define|create|make) [a|an] generator (called|named)", StmtRule::DefineGenerator),
    ("(define|create|make) [a|an] method (called|named)", StmtRule::DefineMethod),
    ("(define|create|make) [a|an] static method (called|named)", StmtRule::DefineStaticMethod),
    ("(define|create|make) [a|an] class method (called|named)", StmtRule::DefineClassMethod),
    ("(define|create|make) [a|an] property (called|named)", StmtRule::DefineProperty),
    ("(define|create|make) [a|an] class (called|named)", StmtRule::DefineClass),
    ("decorate", StmtRule::Decorate),
    ("apply [the] decorator", StmtRule::ApplyDecorator),
    // Exceptions
    ("try", StmtRule::Try),
    ("if something goes wrong", StmtRule::Catch),
    ("if an error (happens|occurs)", StmtRule::Catch),
    ("(catch|except)", StmtRule::Catch),
    ("on error", StmtRule::Catch),
    ("finally", StmtRule::Finally),
    ("in any case", StmtRule::Finally),
    ("(raise|throw)", StmtRule::Raise),
    ("(raise|throw) [an|a] (error|exception) (saying|with)", StmtRule::RaiseError),
    ("make sure", StmtRule::Assert),
    // Resources and concurrency
    ("using", StmtRule::Using),
    ("with", StmtRule::Using),
    ("wait for", StmtRule::WaitFor),
    ("(wait|sleep|pause)", StmtRule::Sleep),
    // Web and database
    ("(create|make) [an|a] (api|web) endpoint at", StmtRule::ApiEndpoint),
    (
        "(create|make) [an|a] (async|asynchronous) (api|web) endpoint at",
        StmtRule::AsyncApiEndpoint,
    ),
    ("connect to [the] database", StmtRule::ConnectDatabase),
    ("query [the] database with", StmtRule::QueryDatabase),
    ("insert into [the] database", StmtRule::InsertDatabase),
    ("(run|execute)", StmtRule::Run),
    // Modules
    ("import", StmtRule::Import),
    ("from", StmtRule::FromImport),
    ("use [the]", StmtRule::UseLibrary),
    // Collections
    ("(add|append|push)", StmtRule::Append),
    ("prepend", StmtRule::Prepend),
    ("pop [from]", StmtRule::Pop),
    ("remove", StmtRule::Remove),
    ("delete", StmtRule::Delete),
    ("sort [the]", StmtRule::Sort),
    ("reverse [the]", StmtRule::Reverse),
    ("(clear|empty) [the]", StmtRule::Clear),
    // Program exit and function results
    ("(exit|quit)", StmtRule::Exit),
    ("(stop|end|exit|quit) [the] program", StmtRule::StopProgram),
    ("return", StmtRule::Return),
    ("(give|send) back", StmtRule::Return),
    ("(yield|produce)", StmtRule::Yield),
];

const PREFIX_SPECS: &[(&str, Prefix)] = &[
    ("[the] (length|size) of", Prefix::LengthOf),
    ("[the] (sum|total) of", Prefix::SumOf),
    ("[the] (average|mean) of", Prefix::AverageOf),
    ("[the] (maximum|max|largest) of", Prefix::MaxOf),
    ("[the] (minimum|min|smallest) of", Prefix::MinOf),
    ("[the] absolute value of", Prefix::AbsOf),
    ("[the] uppercase [version] of", Prefix::Uppercase),
    ("[the] lowercase [version] of", Prefix::Lowercase),
    ("(ask|prompt) [for]", Prefix::Ask),
    ("call", Prefix::Call),
    ("[a|an] new", Prefix::New),
    ("[a|an] list (of|containing)", Prefix::ListOf),
    ("[an] empty list", Prefix::EmptyList),
    ("[an] empty (dictionary|dict|map)", Prefix::EmptyDict),
    ("my", Prefix::My),
    ("wait for", Prefix::WaitFor),
    ("[a] random number between", Prefix::RandomBetween),
    ("[the] numbers from", Prefix::NumbersFrom),
    ("[a] function that takes", Prefix::Lambda),
    ("open [the] file", Prefix::OpenFile),
    ("not", Prefix::Not),
    ("(negative|minus)", Prefix::Negative),
    ("-", Prefix::Negative),
];

const INFIX_SPECS: &[(&str, Infix)] = &[
    ("or", Infix::Or),
    ("and", Infix::And),
    // Comparisons
    ("is", Infix::Compare(BinOp::Eq)),
    ("is equal to", Infix::Compare(BinOp::Eq)),
    ("equals", Infix::Compare(BinOp::Eq)),
    ("is the same as", Infix::Compare(BinOp::Eq)),
    ("is not", Infix::Compare(BinOp::NotEq)),
    ("is not equal to", Infix::Compare(BinOp::NotEq)),
    ("(does|do) not equal", Infix::Compare(BinOp::NotEq)),
    ("doesn't equal", Infix::Compare(BinOp::NotEq)),
    ("is different from", Infix::Compare(BinOp::NotEq)),
    ("is (greater|bigger|larger|more|higher) than", Infix::Compare(BinOp::Gt)),
    (
        "is (greater|bigger|larger|more|higher) than or equal to",
        Infix::Compare(BinOp::GtEq),
    ),
    ("is (less|smaller|lower|fewer) than", Infix::Compare(BinOp::Lt)),
    (
        "is (less|smaller|lower|fewer) than or equal to",
        Infix::Compare(BinOp::LtEq),
    ),
    ("is at least", Infix::Compare(BinOp::GtEq)),
    ("is at most", Infix::Compare(BinOp::LtEq)),
    ("is no (less|fewer) than", Infix::Compare(BinOp::GtEq)),
    ("is no (more|greater) than", Infix::Compare(BinOp::LtEq)),
    ("is in", Infix::Compare(BinOp::In)),
    ("is not in", Infix::Compare(BinOp::NotIn)),
    ("in", Infix::Compare(BinOp::In)),
    ("not in", Infix::Compare(BinOp::NotIn)),
    ("==", Infix::Compare(BinOp::Eq)),
    ("!=", Infix::Compare(BinOp::NotEq)),
    ("<", Infix::Compare(BinOp::Lt)),
    (">", Infix::Compare(BinOp::Gt)),
    ("<=", Infix::Compare(BinOp::LtEq)),
    (">=", Infix::Compare(BinOp::GtEq)),
    ("contains", Infix::Contains),
    ("(does|do) not contain", Infix::NotContains),
    ("doesn't contain", Infix::NotContains),
    ("is between", Infix::Between),
    ("(starts|begins) with", Infix::StartsWith),
    ("ends with", Infix::EndsWith),
    ("is empty", Infix::IsEmpty),
    ("is not empty", Infix::IsNotEmpty),
    // Arithmetic
    ("plus", Infix::Arith(BinOp::Add)),
    ("+", Infix::Arith(BinOp::Add)),
    ("minus", Infix::Arith(BinOp::Sub)),
    ("-", Infix::Arith(BinOp::Sub)),
    ("times", Infix::Arith(BinOp::Mul)),
    ("multiplied by", Infix::Arith(BinOp::Mul)),
    ("*", Infix::Arith(BinOp::Mul)),
    ("divided by", Infix::Arith(BinOp::Div)),
    ("/", Infix::Arith(BinOp::Div)),
    ("integer divided by", Infix::Arith(BinOp::FloorDiv)),
    ("//", Infix::Arith(BinOp::FloorDiv)),
    ("(modulo|mod)", Infix::Arith(BinOp::Mod)),
    ("%", Infix::Arith(BinOp::Mod)),
    ("to the power of", Infix::Arith(BinOp::Pow)),
    ("**", Infix::Arith(BinOp::Pow)),
    // Conversions
    ("as (text|string|str)", Infix::Convert("str")),
    ("as (integer|int)", Infix::Convert("int")),
    ("as (float|decimal|number)", Infix::Convert("float")),
    ("as (boolean|bool)", Infix::Convert("bool")),
    ("if", Infix::Conditional),
];

/// Statement phrase table
pub static STATEMENT_RULES: Lazy<RuleTable<StmtRule>> =
    Lazy::new(|| RuleTable::from_specs(STATEMENT_SPECS));

/// Prefix expression phrase table
pub static PREFIX_RULES: Lazy<RuleTable<Prefix>> =
    Lazy::new(|| RuleTable::from_specs(PREFIX_SPECS));

/// Infix operator phrase table
pub static INFIX_RULES: Lazy<RuleTable<Infix>> = Lazy::new(|| RuleTable::from_specs(INFIX_SPECS));
