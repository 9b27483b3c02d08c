//! Abstract Syntax Tree definitions for the cell language.
//!
//! A cell (or injected fragment) parses to a [`Program`]: a flat list of statements executed top to bottom in the
//! shared environment.

use std::fmt;

/// Source location span (byte offsets)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// A node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

pub type Ident = String;

/// A parsed cell body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Spanned<Statement>>,
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Expr(Spanned<Expr>),
    /// `a = b = value`; one entry per `=`-separated target.
    Assign(AssignStmt),
    AugAssign(AugAssignStmt),
    Import(Vec<ImportItem>),
    FromImport(FromImportStmt),
    FunctionDef(FunctionDef),
    Return(Option<Spanned<Expr>>),
    If(IfStmt),
    For(ForStmt),
    While(WhileStmt),
    Break,
    Continue,
    Pass,
    Assert(AssertStmt),
    Raise(Option<Spanned<Expr>>),
    Del(Vec<Spanned<Target>>),
}

/// Left-hand side of an assignment, `for` header or `del`.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Name(Ident),
    Attribute(Box<Spanned<Expr>>, Ident),
    Index(Box<Spanned<Expr>>, Box<Spanned<Expr>>),
    Tuple(Vec<Spanned<Target>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignStmt {
    pub targets: Vec<Spanned<Target>>,
    pub value: Spanned<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AugAssignStmt {
    pub target: Spanned<Target>,
    pub op: BinaryOp,
    pub value: Spanned<Expr>,
}

/// `import a.b.c as d`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportItem {
    pub path: Vec<Ident>,
    pub alias: Option<Ident>,
}

impl ImportItem {
    /// The dotted module path as written (`a.b.c`).
    pub fn dotted(&self) -> String {
        self.path.join(".")
    }
}

/// `from a.b import x as y, z`
#[derive(Debug, Clone, PartialEq)]
pub struct FromImportStmt {
    pub module: Vec<Ident>,
    pub names: Vec<ImportName>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportName {
    pub name: Ident,
    pub alias: Option<Ident>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: Ident,
    pub params: Vec<Spanned<Param>>,
    pub body: Vec<Spanned<Statement>>,
}

/// A function parameter. Annotations are parsed and discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Ident,
    pub default: Option<Spanned<Expr>>,
    /// Declared after a bare `*`.
    pub keyword_only: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub condition: Spanned<Expr>,
    pub then_body: Vec<Spanned<Statement>>,
    pub elif_branches: Vec<(Spanned<Expr>, Vec<Spanned<Statement>>)>,
    pub else_body: Option<Vec<Spanned<Statement>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub target: Spanned<Target>,
    pub iter: Spanned<Expr>,
    pub body: Vec<Spanned<Statement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub condition: Spanned<Expr>,
    pub body: Vec<Spanned<Statement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssertStmt {
    pub condition: Spanned<Expr>,
    pub message: Option<Spanned<Expr>>,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Ident(Ident),
    Attribute(Box<Spanned<Expr>>, Ident),
    Call(Box<Spanned<Expr>>, Vec<CallArg>),
    MethodCall(Box<Spanned<Expr>>, Ident, Vec<CallArg>),
    Index(Box<Spanned<Expr>>, Box<Spanned<Expr>>),
    Slice(Box<Spanned<Expr>>, SliceExpr),
    Binary(Box<Spanned<Expr>>, BinaryOp, Box<Spanned<Expr>>),
    Unary(UnaryOp, Box<Spanned<Expr>>),
    /// `then if condition else otherwise`
    Conditional(Box<ConditionalExpr>),
    List(Vec<Spanned<Expr>>),
    Tuple(Vec<Spanned<Expr>>),
    Dict(Vec<(Spanned<Expr>, Spanned<Expr>)>),
    Set(Vec<Spanned<Expr>>),
    ListComp(Box<ListComp>),
    DictComp(Box<DictComp>),
    FString(Vec<FStringPart>),
    Paren(Box<Spanned<Expr>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SliceExpr {
    pub start: Option<Box<Spanned<Expr>>>,
    pub end: Option<Box<Spanned<Expr>>>,
    pub step: Option<Box<Spanned<Expr>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalExpr {
    pub then: Spanned<Expr>,
    pub condition: Spanned<Expr>,
    pub otherwise: Spanned<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListComp {
    pub expr: Spanned<Expr>,
    pub target: Spanned<Target>,
    pub iter: Spanned<Expr>,
    pub filter: Option<Spanned<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DictComp {
    pub key: Spanned<Expr>,
    pub value: Spanned<Expr>,
    pub target: Spanned<Target>,
    pub iter: Spanned<Expr>,
    pub filter: Option<Spanned<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FStringPart {
    Literal(String),
    Expr {
        expr: Spanned<Expr>,
        format_spec: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    In,
    NotIn,
    Is,
    IsNot,
    // Logical (short-circuit)
    And,
    Or,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::In => "in",
            BinaryOp::NotIn => "not in",
            BinaryOp::Is => "is",
            BinaryOp::IsNot => "is not",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallArg {
    Positional(Spanned<Expr>),
    Named(Ident, Spanned<Expr>),
}

impl Expr {
    /// Convert an already-parsed expression into an assignment target, if it has that shape.
    pub fn into_target(self) -> Option<Target> {
        match self {
            Expr::Ident(name) => Some(Target::Name(name)),
            Expr::Attribute(object, name) => Some(Target::Attribute(object, name)),
            Expr::Index(object, index) => Some(Target::Index(object, index)),
            Expr::Tuple(items) | Expr::List(items) => {
                let mut targets = Vec::with_capacity(items.len());
                for item in items {
                    let span = item.span;
                    targets.push(Spanned::new(item.node.into_target()?, span));
                }
                Some(Target::Tuple(targets))
            }
            Expr::Paren(inner) => inner.node.into_target(),
            _ => None,
        }
    }
}
