//! Abstract syntax tree produced by the [`Parser`](crate::parser::Parser).
//!
//! Nodes own their data (names are `String`s, not token slices) so that a
//! [`Program`] outlives the source text and the token buffer, and can be
//! interpreted any number of times.  Function bodies sit behind an `Rc` so
//! that every `Function` value created from a declaration shares the same
//! statements instead of cloning them.

use std::fmt;
use std::rc::Rc;

use crate::token::Position;

/// Infix operators, loosest binding last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Negate => "-",
            UnaryOp::Not => "!",
        }
    }
}

/// `=`, `+=` and `-=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
}

impl AssignOp {
    pub fn symbol(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
        }
    }
}

/// An expression node together with its source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Number(f64),

    /// String literal without surrounding quotes; escapes are kept verbatim.
    Str(String),

    Bool(bool),

    Null,

    /// Variable reference.  `new C` and `this` also parse to this node.
    Identifier(String),

    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },

    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },

    /// `object.name`
    Member {
        object: Box<Expr>,
        name: String,
    },

    /// `target op value`; the target is an `Identifier` or a `Member`.
    Assign {
        target: Box<Expr>,
        op: AssignOp,
        value: Box<Expr>,
    },
}

impl Expr {
    pub fn new(kind: ExprKind, pos: Position) -> Self {
        Self { kind, pos }
    }

    #[inline]
    pub fn line(&self) -> usize {
        self.pos.line
    }
}

/// A statement node together with its source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr),

    /// `var NAME [= initializer];`
    Var {
        name: String,
        initializer: Option<Expr>,
    },

    /// `return [value];`
    Return(Option<Expr>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    While {
        condition: Expr,
        body: Box<Stmt>,
    },

    For {
        initializer: Option<Box<Stmt>>,
        condition: Option<Expr>,
        increment: Option<Expr>,
        body: Box<Stmt>,
    },

    /// Braced scope containing zero or more statements.
    Block(Vec<Stmt>),

    Function(FunctionDecl),

    Class(ClassDecl),

    /// Class property; only produced inside a class body.
    Property(PropertyDecl),
}

impl Stmt {
    pub fn new(kind: StmtKind, pos: Position) -> Self {
        Self { kind, pos }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Rc<Vec<Stmt>>,
    pub is_static: bool,
    pub is_public: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: String,

    /// `Function` and `Property` statements.
    pub members: Vec<Stmt>,

    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDecl {
    pub name: String,
    pub initializer: Option<Expr>,
    pub is_static: bool,
    pub is_public: bool,
}

/// Ordered sequence of top-level statements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

impl Program {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Self { statements }
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}
