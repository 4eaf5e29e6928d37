//! Constraint solver integration
//!
//! This module wraps the kasuari Cassowary solver behind a small backend
//! trait. The layout only ever talks to [`ConstraintBackend`], so the diffing
//! logic can be exercised against instrumented backends in tests.

use std::collections::HashMap;

use kasuari::{
    Constraint as KasuariConstraint, Solver as KasuariSolver, Strength as KasuariStrength,
    Variable as KasuariVariable, WeightedRelation::*,
};
use thiserror::Error;
use tracing::trace;

use super::declare::{Relation, Strength};
use super::expr::{CanonicalExpression, Variable};

/// Identity of one constraint handed to a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintId(u64);

impl ConstraintId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// A constraint in reduced form: `expression (relation) 0`
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveConstraint {
    pub expression: CanonicalExpression,
    pub relation: Relation,
    pub strength: Strength,
}

impl PrimitiveConstraint {
    /// True when the constraint mentions no variable and holds on its own
    fn trivially_holds(&self) -> bool {
        let c = self.expression.constant;
        match self.relation {
            Relation::Equal => c == 0.0,
            Relation::LessOrEqual => c <= 0.0,
            Relation::GreaterOrEqual => c >= 0.0,
        }
    }
}

/// Errors from the constraint solver
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolverError {
    #[error("constraint {id:?} cannot be satisfied together with the installed constraints")]
    Unsatisfiable { id: ConstraintId },

    #[error("constraint {id:?} is not installed")]
    UnknownConstraint { id: ConstraintId },

    #[error("constraint {id:?} is already installed")]
    Duplicate { id: ConstraintId },

    #[error("internal solver error: {0}")]
    Internal(String),
}

/// Incremental linear constraint solver as seen by the layout
pub trait ConstraintBackend {
    /// Install a constraint; an unsatisfiable strong constraint is rejected
    /// and leaves the backend unchanged.
    fn add_constraint(
        &mut self,
        id: ConstraintId,
        constraint: &PrimitiveConstraint,
    ) -> Result<(), SolverError>;

    fn remove_constraint(&mut self, id: ConstraintId) -> Result<(), SolverError>;

    /// Resolve the system and report every variable whose value changed
    /// since the previous call.
    fn resolve_all(&mut self) -> Vec<(Variable, f64)>;

    /// Forget a variable that no installed constraint mentions anymore
    fn release_variable(&mut self, variable: Variable);

    fn constraint_count(&self) -> usize;
}

/// Backend built on the kasuari solver
pub struct KasuariBackend {
    solver: KasuariSolver,
    /// Maps our variables to kasuari variables
    variables: HashMap<Variable, KasuariVariable>,
    reverse: HashMap<KasuariVariable, Variable>,
    constraints: HashMap<ConstraintId, Option<KasuariConstraint>>,
}

impl KasuariBackend {
    pub fn new() -> Self {
        Self {
            solver: KasuariSolver::new(),
            variables: HashMap::new(),
            reverse: HashMap::new(),
            constraints: HashMap::new(),
        }
    }

    fn get_or_create_var(&mut self, var: Variable) -> KasuariVariable {
        if let Some(&kvar) = self.variables.get(&var) {
            kvar
        } else {
            let kvar = KasuariVariable::new();
            self.variables.insert(var, kvar);
            self.reverse.insert(kvar, var);
            kvar
        }
    }

    fn build(&mut self, constraint: &PrimitiveConstraint) -> KasuariConstraint {
        let terms = constraint
            .expression
            .terms
            .iter()
            .map(|&(var, coefficient)| kasuari::Term::new(self.get_or_create_var(var), coefficient))
            .collect();
        let expr = kasuari::Expression::new(terms, constraint.expression.constant);
        let strength = convert_strength(constraint.strength);
        match constraint.relation {
            Relation::Equal => expr | EQ(strength) | 0.0,
            Relation::LessOrEqual => expr | LE(strength) | 0.0,
            Relation::GreaterOrEqual => expr | GE(strength) | 0.0,
        }
    }

    /// Convert a kasuari error to a SolverError with context
    fn convert_kasuari_error(e: kasuari::AddConstraintError, id: ConstraintId) -> SolverError {
        match e {
            kasuari::AddConstraintError::UnsatisfiableConstraint => SolverError::Unsatisfiable { id },
            kasuari::AddConstraintError::DuplicateConstraint => SolverError::Duplicate { id },
            kasuari::AddConstraintError::InternalSolverError(msg) => {
                SolverError::Internal(format!("adding {:?}: {}", id, msg))
            }
        }
    }
}

impl Default for KasuariBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn convert_strength(strength: Strength) -> KasuariStrength {
    match strength {
        Strength::Strong => KasuariStrength::REQUIRED,
        Strength::Medium => KasuariStrength::MEDIUM,
        Strength::Weak => KasuariStrength::WEAK,
    }
}

impl ConstraintBackend for KasuariBackend {
    fn add_constraint(
        &mut self,
        id: ConstraintId,
        constraint: &PrimitiveConstraint,
    ) -> Result<(), SolverError> {
        if self.constraints.contains_key(&id) {
            return Err(SolverError::Duplicate { id });
        }

        // kasuari has no use for constraints without variables
        if constraint.expression.terms.is_empty() {
            if constraint.strength == Strength::Strong && !constraint.trivially_holds() {
                return Err(SolverError::Unsatisfiable { id });
            }
            self.constraints.insert(id, None);
            return Ok(());
        }

        let built = self.build(constraint);
        self.solver
            .add_constraint(built.clone())
            .map_err(|e| Self::convert_kasuari_error(e, id))?;
        trace!(id = id.raw(), "kasuari constraint added");
        self.constraints.insert(id, Some(built));
        Ok(())
    }

    fn remove_constraint(&mut self, id: ConstraintId) -> Result<(), SolverError> {
        match self.constraints.remove(&id) {
            None => Err(SolverError::UnknownConstraint { id }),
            Some(None) => Ok(()),
            Some(Some(built)) => {
                if let Err(e) = self.solver.remove_constraint(&built) {
                    self.constraints.insert(id, Some(built));
                    return Err(SolverError::Internal(format!("removing {:?}: {:?}", id, e)));
                }
                trace!(id = id.raw(), "kasuari constraint removed");
                Ok(())
            }
        }
    }

    fn resolve_all(&mut self) -> Vec<(Variable, f64)> {
        let reverse = &self.reverse;
        self.solver
            .fetch_changes()
            .iter()
            .filter_map(|(kvar, value)| reverse.get(kvar).map(|var| (*var, *value)))
            .collect()
    }

    fn release_variable(&mut self, variable: Variable) {
        if let Some(kvar) = self.variables.remove(&variable) {
            self.reverse.remove(&kvar);
        }
    }

    fn constraint_count(&self) -> usize {
        self.constraints.len()
    }
}
