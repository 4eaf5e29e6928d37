//! Abstract Syntax Tree types for the scene format

use crate::layout::{ChainStyle, Direction, MeasureFrom};

pub use crate::parser::lexer::Span;

/// AST node with source location
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

/// Valid identifier (alphanumeric + underscore, starts with letter/_)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(pub String);

impl Identifier {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Root AST node - a complete scene
///
/// Top-level statements make up the first pass, every `pass { }` block one
/// later pass, in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scene {
    pub statements: Vec<Spanned<Statement>>,
    pub passes: Vec<Spanned<Vec<Spanned<Statement>>>>,
}

/// Arithmetic expression, not yet checked for linearity
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// Scalar variable: `gap`
    Variable(Identifier),
    /// Dimension member: `box.left`
    Member {
        dimension: Identifier,
        member: Spanned<Identifier>,
    },
    Neg(Box<Spanned<Expr>>),
    Binary {
        op: BinaryOp,
        lhs: Box<Spanned<Expr>>,
        rhs: Box<Spanned<Expr>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    LessOrEqual,
    GreaterOrEqual,
}

/// Value of a `[key: value]` option
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Number(f64),
    Word(Identifier),
}

/// `key` or `key: value` inside square brackets
#[derive(Debug, Clone, PartialEq)]
pub struct SceneOption {
    pub key: Spanned<Identifier>,
    pub value: Option<Spanned<OptionValue>>,
}

/// One statement of a pass
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `constrain a.left = b.right + 10 [strength: weak]`
    Constrain {
        lhs: Spanned<Expr>,
        comparison: Comparison,
        rhs: Spanned<Expr>,
        options: Vec<Spanned<SceneOption>>,
    },
    /// `measure label 120 20`
    Measure {
        dimension: Spanned<Identifier>,
        width: Spanned<f64>,
        height: Spanned<f64>,
    },
    /// `average [a.top, b.top] >= line`
    Average {
        inputs: Vec<Spanned<Expr>>,
        target: Spanned<Expr>,
    },
    /// `chain toolbar row spread in root [a, b, c]`
    Chain {
        name: Spanned<Identifier>,
        direction: Direction,
        style: ChainStyle,
        boundary: Spanned<Identifier>,
        items: Vec<Spanned<Identifier>>,
    },
    /// `boundary frame around [a, b] [left, right, tight]`
    Boundary {
        boundary: Spanned<Identifier>,
        members: Vec<Spanned<Identifier>>,
        options: Vec<Spanned<SceneOption>>,
    },
    /// `sum cols [1 * a.width, 2 * b.width] = root.width`
    Sum {
        name: Spanned<Identifier>,
        terms: Vec<(Spanned<f64>, Spanned<Expr>)>,
        comparison: Comparison,
        target: Spanned<Expr>,
    },
    /// `place dot in root center [horizontal: 0.5]`
    Place {
        inner: Spanned<Identifier>,
        outer: Spanned<Identifier>,
        measure_from: MeasureFrom,
        options: Vec<Spanned<SceneOption>>,
    },
    /// `table grid in root 2 by 3`
    Table {
        name: Spanned<Identifier>,
        boundary: Spanned<Identifier>,
        rows: usize,
        cols: usize,
    },
}
