use crate::span::Spanned;

/// A parsed MiniLang program: one or more top-level statements.
#[derive(Clone, Debug)]
pub struct Program {
    pub stmts: Vec<Spanned<Stmt>>,
}

/// A brace-delimited sequence of statements.
#[derive(Clone, Debug)]
pub struct Block {
    pub stmts: Vec<Spanned<Stmt>>,
}

/// Statements.
#[derive(Clone, Debug)]
pub enum Stmt {
    /// `x := expr;`
    Assign {
        name: Spanned<String>,
        value: Spanned<Expr>,
    },
    /// `if (cond) { ... } else { ... }` — else is optional.
    If {
        cond: Spanned<Expr>,
        then_block: Spanned<Block>,
        else_block: Option<Spanned<Block>>,
    },
    /// `while (cond) { ... }`
    While {
        cond: Spanned<Expr>,
        body: Spanned<Block>,
    },
    /// `for (x := e; cond; x := e) { ... }`
    For {
        init: Box<Spanned<Stmt>>,
        cond: Spanned<Expr>,
        step: Box<Spanned<Stmt>>,
        body: Spanned<Block>,
    },
    /// `assert(cond);`
    Assert { cond: Spanned<Expr> },
    /// A nested `{ ... }` block. MiniLang has no shadowing, so this is
    /// pure sequencing.
    Block(Spanned<Block>),
}

/// Expressions.
#[derive(Clone, Debug)]
pub enum Expr {
    Number(i64),
    Var(String),
    Binary {
        op: BinOp,
        lhs: Box<Spanned<Expr>>,
        rhs: Box<Spanned<Expr>>,
    },
    Compare {
        op: CmpOp,
        lhs: Box<Spanned<Expr>>,
        rhs: Box<Spanned<Expr>>,
    },
}

/// Arithmetic operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add, // +
    Sub, // -
    Mul, // *
    Div, // /
}

impl BinOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
        }
    }
}

/// Comparison operators (non-chainable).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq, // ==
    Ne, // !=
    Lt, // <
    Le, // <=
    Gt, // >
    Ge, // >=
}

impl CmpOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }

    /// The operator holding exactly when `self` does not.
    pub fn negated(&self) -> CmpOp {
        match self {
            CmpOp::Eq => CmpOp::Ne,
            CmpOp::Ne => CmpOp::Eq,
            CmpOp::Lt => CmpOp::Ge,
            CmpOp::Le => CmpOp::Gt,
            CmpOp::Gt => CmpOp::Le,
            CmpOp::Ge => CmpOp::Lt,
        }
    }
}
