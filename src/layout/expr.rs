//! Linear expressions over layout variables
//!
//! Expressions are kept independent of the solver library: a constraint is
//! compared against the one it replaces by reducing both to a canonical form
//! (sorted `(variable, coefficient)` pairs plus a constant).

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// Handle to one scalar unknown of a layout.
///
/// The handle is a plain id; copying it never creates a new unknown. Names
/// and values live in the [`Layout`](super::Layout) that allocated it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable(u32);

impl Variable {
    pub(crate) fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Numeric id of this variable, unique within its layout
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// `coefficient * variable`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Term {
    pub variable: Variable,
    pub coefficient: f64,
}

impl Term {
    pub fn new(variable: Variable, coefficient: f64) -> Self {
        Self {
            variable,
            coefficient,
        }
    }
}

/// Ordered list of terms plus a constant
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Expression {
    pub terms: Vec<Term>,
    pub constant: f64,
}

/// Expression reduced to sorted, merged terms without zero coefficients
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CanonicalExpression {
    pub terms: Vec<(Variable, f64)>,
    pub constant: f64,
}

impl Expression {
    pub fn new(terms: Vec<Term>, constant: f64) -> Self {
        Self { terms, constant }
    }

    /// Expression without variables
    pub fn from_constant(constant: f64) -> Self {
        Self::new(Vec::new(), constant)
    }

    /// Sum of several expressions
    pub fn sum<I, E>(items: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Expression>,
    {
        items
            .into_iter()
            .fold(Expression::default(), |acc, item| acc + item)
    }

    /// Variables mentioned by this expression, in term order
    pub fn variables(&self) -> impl Iterator<Item = Variable> + '_ {
        self.terms.iter().map(|t| t.variable)
    }

    /// Reduce to canonical form.
    ///
    /// Two expressions are structurally equal iff their canonical forms are
    /// equal, regardless of term order or how the terms were split.
    pub fn canonical(&self) -> CanonicalExpression {
        let mut terms: Vec<(Variable, f64)> = self
            .terms
            .iter()
            .map(|t| (t.variable, t.coefficient))
            .collect();
        terms.sort_by_key(|(v, _)| *v);

        let mut merged: Vec<(Variable, f64)> = Vec::with_capacity(terms.len());
        for (variable, coefficient) in terms {
            match merged.last_mut() {
                Some((last, sum)) if *last == variable => *sum += coefficient,
                _ => merged.push((variable, coefficient)),
            }
        }
        merged.retain(|(_, c)| *c != 0.0);

        CanonicalExpression {
            terms: merged,
            constant: self.constant,
        }
    }

    /// Evaluate with the given variable values
    pub fn evaluate(&self, value_of: impl Fn(Variable) -> f64) -> f64 {
        self.terms
            .iter()
            .map(|t| t.coefficient * value_of(t.variable))
            .sum::<f64>()
            + self.constant
    }

    /// Render with human-readable variable names
    pub fn describe(&self, name_of: &dyn Fn(Variable) -> String) -> String {
        let mut out = String::new();
        for (i, term) in self.terms.iter().enumerate() {
            let name = name_of(term.variable);
            let (sign, magnitude) = if term.coefficient < 0.0 {
                ("-", -term.coefficient)
            } else {
                ("+", term.coefficient)
            };
            if i == 0 {
                if sign == "-" {
                    out.push('-');
                }
            } else {
                out.push_str(&format!(" {} ", sign));
            }
            if magnitude == 1.0 {
                out.push_str(&name);
            } else {
                out.push_str(&format!("{} * {}", magnitude, name));
            }
        }
        if self.terms.is_empty() {
            out.push_str(&format!("{}", self.constant));
        } else if self.constant > 0.0 {
            out.push_str(&format!(" + {}", self.constant));
        } else if self.constant < 0.0 {
            out.push_str(&format!(" - {}", -self.constant));
        }
        out
    }
}

impl CanonicalExpression {
    /// True when no variable survives and the constant is zero
    pub fn is_zero(&self) -> bool {
        self.terms.is_empty() && self.constant == 0.0
    }

    pub fn negated(&self) -> CanonicalExpression {
        CanonicalExpression {
            terms: self.terms.iter().map(|(v, c)| (*v, -c)).collect(),
            constant: -self.constant,
        }
    }

    /// True when the lowest variable carries a negative coefficient
    pub fn leads_negative(&self) -> bool {
        self.terms.first().is_some_and(|(_, c)| *c < 0.0)
    }
}

impl From<Variable> for Expression {
    fn from(variable: Variable) -> Self {
        Expression::new(vec![Term::new(variable, 1.0)], 0.0)
    }
}

impl From<f64> for Expression {
    fn from(constant: f64) -> Self {
        Expression::from_constant(constant)
    }
}

impl From<Term> for Expression {
    fn from(term: Term) -> Self {
        Expression::new(vec![term], 0.0)
    }
}

impl From<(f64, Variable)> for Expression {
    fn from((coefficient, variable): (f64, Variable)) -> Self {
        Expression::from(Term::new(variable, coefficient))
    }
}

impl<T: Into<Expression>> Add<T> for Expression {
    type Output = Expression;

    fn add(mut self, rhs: T) -> Expression {
        let rhs = rhs.into();
        self.terms.extend(rhs.terms);
        self.constant += rhs.constant;
        self
    }
}

impl<T: Into<Expression>> Sub<T> for Expression {
    type Output = Expression;

    fn sub(self, rhs: T) -> Expression {
        let rhs: Expression = rhs.into();
        self + (-rhs)
    }
}

impl Mul<f64> for Expression {
    type Output = Expression;

    fn mul(mut self, factor: f64) -> Expression {
        for term in &mut self.terms {
            term.coefficient *= factor;
        }
        self.constant *= factor;
        self
    }
}

impl Neg for Expression {
    type Output = Expression;

    fn neg(self) -> Expression {
        self * -1.0
    }
}

impl<T: Into<Expression>> Add<T> for Variable {
    type Output = Expression;

    fn add(self, rhs: T) -> Expression {
        Expression::from(self) + rhs
    }
}

impl<T: Into<Expression>> Sub<T> for Variable {
    type Output = Expression;

    fn sub(self, rhs: T) -> Expression {
        Expression::from(self) - rhs
    }
}

impl Mul<f64> for Variable {
    type Output = Expression;

    fn mul(self, factor: f64) -> Expression {
        Expression::from((factor, self))
    }
}

impl Neg for Variable {
    type Output = Expression;

    fn neg(self) -> Expression {
        Expression::from((-1.0, self))
    }
}

impl Mul<Variable> for f64 {
    type Output = Expression;

    fn mul(self, variable: Variable) -> Expression {
        variable * self
    }
}

impl Mul<Expression> for f64 {
    type Output = Expression;

    fn mul(self, expression: Expression) -> Expression {
        expression * self
    }
}

impl Add<Variable> for f64 {
    type Output = Expression;

    fn add(self, variable: Variable) -> Expression {
        variable + self
    }
}

impl Add<Expression> for f64 {
    type Output = Expression;

    fn add(self, expression: Expression) -> Expression {
        expression + self
    }
}
