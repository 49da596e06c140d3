//! Abstract Syntax Tree node types
//!
//! Every node records the 1-based source line it came from so that later
//! stages (codegen, error reports) can attribute failures to user code.

use serde::{Deserialize, Serialize};

/// A parsed source file: statements in program order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub body: Vec<Stmt>,
}

/// Statement AST node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Stmt {
    /// `Name = expr`; the line is the line of the `=` token
    Assign { name: String, expr: Expr, line: usize },
    /// One `if` / `else if` clause. `else_body` holds either the next clause
    /// (as a single `If`) or the statements of the trailing `else` block.
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
        line: usize,
    },
    /// A bare expression on its own line, e.g. `output(X)`
    Expr { expr: Expr, line: usize },
}

impl Stmt {
    pub fn line(&self) -> usize {
        match self {
            Stmt::Assign { line, .. } | Stmt::If { line, .. } | Stmt::Expr { line, .. } => *line,
        }
    }
}

/// Literal payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Literal {
    Integer(i64),
    List(Vec<Expr>),
}

/// Expression AST node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Expr {
    Literal {
        value: Literal,
        line: usize,
    },
    Ident {
        name: String,
        line: usize,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        line: usize,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        line: usize,
    },
    /// `name(args)`, or `a.name(args)` desugared to `name(a, args)`.
    /// `is_method` only changes how traces render the call.
    Call {
        name: String,
        args: Vec<Expr>,
        is_method: bool,
        line: usize,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
        line: usize,
    },
}

impl Expr {
    pub fn line(&self) -> usize {
        match self {
            Expr::Literal { line, .. }
            | Expr::Ident { line, .. }
            | Expr::Binary { line, .. }
            | Expr::Unary { line, .. }
            | Expr::Call { line, .. }
            | Expr::Index { line, .. } => *line,
        }
    }
}

/// Binary operators, grouped by precedence tier (lowest first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Or,
    And,

    Eq,
    Ne,
    Ge,
    Le,
    Gt,
    Lt,

    Add,
    Sub,

    Mul,
    /// `/`, always real division
    Div,
    /// `div`, integer quotient
    IntDiv,
    /// `mod` and `%`
    Mod,
}

impl BinaryOp {
    /// Map an operator token to its operator
    pub fn from_token(token: &str) -> Option<Self> {
        let op = match token {
            "or" => BinaryOp::Or,
            "and" => BinaryOp::And,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            ">=" => BinaryOp::Ge,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            "<" => BinaryOp::Lt,
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "div" => BinaryOp::IntDiv,
            "mod" | "%" => BinaryOp::Mod,
            _ => return None,
        };
        Some(op)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Ge => ">=",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Lt => "<",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::IntDiv => "div",
            BinaryOp::Mod => "mod",
        }
    }
}

/// Prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    /// `not X`
    Not,
    /// `!X`
    Bang,
    /// `-X`
    Neg,
}

impl UnaryOp {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "not" => Some(UnaryOp::Not),
            "!" => Some(UnaryOp::Bang),
            "-" => Some(UnaryOp::Neg),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Not => "not",
            UnaryOp::Bang => "!",
            UnaryOp::Neg => "-",
        }
    }
}
