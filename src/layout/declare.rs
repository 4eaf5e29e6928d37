//! Constraint declarations and per-site diffing
//!
//! Every declaration is made from a *site*: a stable key that identifies the
//! place in the layout description that produced it. Re-declaring an
//! equivalent constraint from the same site in the next pass is a no-op; a
//! different constraint replaces the installed one; a site that is not
//! declared at all during a pass has its constraint removed when the pass
//! finishes. The solver is only touched once the whole pass is known.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::mem;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use super::error::LayoutError;
use super::expr::{CanonicalExpression, Expression, Variable};
use super::solver::{ConstraintBackend, ConstraintId, PrimitiveConstraint, SolverError};

/// Relational operator of a constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    LessOrEqual,
    GreaterOrEqual,
    Equal,
}

impl Relation {
    pub fn symbol(&self) -> &'static str {
        match self {
            Relation::LessOrEqual => "<=",
            Relation::GreaterOrEqual => ">=",
            Relation::Equal => "=",
        }
    }
}

/// Priority tier used when the system is over-constrained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strength {
    /// Must hold; a contradicting strong constraint is rejected
    #[default]
    Strong,
    Medium,
    Weak,
}

impl Strength {
    pub fn from_name(name: &str) -> Option<Strength> {
        match name {
            "strong" => Some(Strength::Strong),
            "medium" => Some(Strength::Medium),
            "weak" => Some(Strength::Weak),
            _ => None,
        }
    }
}

/// Interpolation durations of a declaration.
///
/// Durations are not tracked per variable. The next resolve uses the
/// longest duration among all deltas of the passes since the previous
/// resolve, and every variable whose solved value changed moves over that
/// duration, including variables only reached through declarations
/// without a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transition {
    /// First time the site is declared
    pub enter: Duration,
    /// The site's constraint changed
    pub update: Duration,
    /// The site disappeared
    pub exit: Duration,
}

impl Transition {
    /// No interpolation
    pub fn none() -> Self {
        Self::default()
    }

    /// Animate only changes of an existing constraint
    pub fn updates(duration: Duration) -> Self {
        Self {
            update: duration,
            ..Self::default()
        }
    }

    /// Same duration for enter, update and exit
    pub fn all(duration: Duration) -> Self {
        Self {
            enter: duration,
            update: duration,
            exit: duration,
        }
    }
}

/// One declared relationship `lhs (relation) rhs`
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub lhs: Expression,
    pub relation: Relation,
    pub rhs: Expression,
    pub strength: Strength,
    pub transition: Transition,
}

impl Declaration {
    pub fn new(lhs: impl Into<Expression>, relation: Relation, rhs: impl Into<Expression>) -> Self {
        Self {
            lhs: lhs.into(),
            relation,
            rhs: rhs.into(),
            strength: Strength::default(),
            transition: Transition::default(),
        }
    }

    pub fn equal(lhs: impl Into<Expression>, rhs: impl Into<Expression>) -> Self {
        Self::new(lhs, Relation::Equal, rhs)
    }

    pub fn less_or_equal(lhs: impl Into<Expression>, rhs: impl Into<Expression>) -> Self {
        Self::new(lhs, Relation::LessOrEqual, rhs)
    }

    pub fn greater_or_equal(lhs: impl Into<Expression>, rhs: impl Into<Expression>) -> Self {
        Self::new(lhs, Relation::GreaterOrEqual, rhs)
    }

    pub fn with_strength(mut self, strength: Strength) -> Self {
        self.strength = strength;
        self
    }

    pub fn with_transition(mut self, transition: Transition) -> Self {
        self.transition = transition;
        self
    }

    /// `lhs - rhs` in canonical form
    pub fn reduced(&self) -> CanonicalExpression {
        (self.lhs.clone() - self.rhs.clone()).canonical()
    }

    /// Both declarations reduce to the same primitive constraint, whichever
    /// side each term was written on.
    pub fn is_equivalent(&self, other: &Declaration) -> bool {
        self.primitive() == other.primitive()
    }

    /// All variables on either side
    pub fn variables(&self) -> impl Iterator<Item = Variable> + '_ {
        self.lhs.variables().chain(self.rhs.variables())
    }

    /// Primitive form handed to the solver backend.
    ///
    /// `e >= 0` is stored as `-e <= 0` and equalities lead with a positive
    /// coefficient, so equivalent declarations compare equal.
    pub fn primitive(&self) -> PrimitiveConstraint {
        let reduced = self.reduced();
        let (expression, relation) = match self.relation {
            Relation::GreaterOrEqual => (reduced.negated(), Relation::LessOrEqual),
            Relation::Equal if reduced.leads_negative() => (reduced.negated(), Relation::Equal),
            relation => (reduced, relation),
        };
        PrimitiveConstraint {
            expression,
            relation,
            strength: self.strength,
        }
    }

    pub fn describe(&self, name_of: &dyn Fn(Variable) -> String) -> String {
        format!(
            "{} {} {}",
            self.lhs.describe(name_of),
            self.relation.symbol(),
            self.rhs.describe(name_of)
        )
    }
}

/// Stable identity of a declaration site
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SiteKey(String);

impl SiteKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Constraint currently installed in the solver for one site
#[derive(Debug, Clone)]
pub(crate) struct Installed {
    pub id: ConstraintId,
    pub primitive: PrimitiveConstraint,
    pub transition: Transition,
}

impl Installed {
    fn mentions(&self, variable: Variable) -> bool {
        self.primitive
            .expression
            .terms
            .iter()
            .any(|(v, _)| *v == variable)
    }
}

/// What a declaration will do to the solver when the pass is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteOutcome {
    Added,
    Replaced,
    Unchanged,
}

/// A new or changed constraint waiting for the end of the pass
#[derive(Debug)]
struct Staged {
    key: SiteKey,
    primitive: PrimitiveConstraint,
    transition: Transition,
    description: String,
    /// Ordinal of the declaration within the pass
    ordinal: usize,
    /// Constraint of the previous pass still installed for this site
    replaces: Option<Installed>,
}

#[derive(Debug)]
enum SiteChange {
    Added(SiteKey),
    Kept(SiteKey),
    Removed(SiteKey, Installed),
}

/// A staged constraint the solver rejected
#[derive(Debug)]
pub(crate) struct Rejected {
    pub ordinal: usize,
    pub error: LayoutError,
}

/// Two-generation table of installed constraints, keyed by site.
///
/// Declarations are only staged while a pass runs. [`SiteTable::apply`]
/// then removes every retired or replaced constraint before adding the new
/// ones, so the solver sees the finished pass as one set.
#[derive(Debug, Default)]
pub(crate) struct SiteTable {
    previous: HashMap<SiteKey, Installed>,
    current: HashMap<SiteKey, Installed>,
    staged: Vec<Staged>,
    declared: HashSet<SiteKey>,
    journal: Vec<SiteChange>,
    next_id: u64,
}

impl SiteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constraints installed in the solver
    pub fn len(&self) -> usize {
        self.current.len() + self.previous.len()
    }

    /// Sites declared so far in the running pass
    pub fn declared(&self) -> usize {
        self.declared.len()
    }

    pub fn begin_pass(&mut self) {
        let leftover = mem::take(&mut self.current);
        self.previous.extend(leftover);
        self.staged.clear();
        self.declared.clear();
        self.journal.clear();
    }

    fn allocate_id(&mut self) -> ConstraintId {
        self.next_id += 1;
        ConstraintId::new(self.next_id)
    }

    /// Declare `primitive` from `key` for the running pass.
    ///
    /// Nothing reaches the solver until [`SiteTable::apply`]. `describe` is
    /// only called for constraints that will be added.
    pub fn declare(
        &mut self,
        key: SiteKey,
        primitive: PrimitiveConstraint,
        transition: Transition,
        describe: impl FnOnce() -> String,
    ) -> Result<SiteOutcome, LayoutError> {
        if !self.declared.insert(key.clone()) {
            return Err(LayoutError::duplicate_site(key.as_str()));
        }
        let ordinal = self.declared.len() - 1;

        match self.previous.remove(&key) {
            Some(old) if old.primitive == primitive => {
                self.current.insert(
                    key.clone(),
                    Installed {
                        transition,
                        ..old
                    },
                );
                self.journal.push(SiteChange::Kept(key));
                Ok(SiteOutcome::Unchanged)
            }
            replaces => {
                let outcome = if replaces.is_some() {
                    SiteOutcome::Replaced
                } else {
                    SiteOutcome::Added
                };
                self.staged.push(Staged {
                    key,
                    primitive,
                    transition,
                    description: describe(),
                    ordinal,
                    replaces,
                });
                Ok(outcome)
            }
        }
    }

    /// Bring the solver to the declared state of the pass.
    ///
    /// Constraints of undeclared sites and the old side of replaced sites
    /// are removed first, then staged constraints are added in declaration
    /// order. Returns the number of removed sites and the longest exit
    /// transition among them.
    pub fn apply(
        &mut self,
        backend: &mut dyn ConstraintBackend,
    ) -> Result<(usize, Duration), Rejected> {
        let mut keys: Vec<SiteKey> = self.previous.keys().cloned().collect();
        keys.sort();

        let mut exit = Duration::ZERO;
        let mut removed = 0;
        for key in keys {
            let Some(old) = self.previous.remove(&key) else {
                continue;
            };
            if let Err(e) = backend.remove_constraint(old.id) {
                self.previous.insert(key, old);
                return Err(Rejected {
                    ordinal: self.declared.len(),
                    error: e.into(),
                });
            }
            debug!(site = %key, "constraint removed");
            exit = exit.max(old.transition.exit);
            removed += 1;
            self.journal.push(SiteChange::Removed(key, old));
        }

        for staged in &mut self.staged {
            let Some(old) = staged.replaces.take() else {
                continue;
            };
            if let Err(e) = backend.remove_constraint(old.id) {
                let ordinal = staged.ordinal;
                staged.replaces = Some(old);
                return Err(Rejected {
                    ordinal,
                    error: e.into(),
                });
            }
            self.journal
                .push(SiteChange::Removed(staged.key.clone(), old));
        }

        for staged in mem::take(&mut self.staged) {
            let id = self.allocate_id();
            if let Err(e) = backend.add_constraint(id, &staged.primitive) {
                return Err(Rejected {
                    ordinal: staged.ordinal,
                    error: convert_add_error(e, &staged.key, staged.description),
                });
            }
            debug!(site = %staged.key, constraint = %staged.description, "constraint installed");
            self.current.insert(
                staged.key.clone(),
                Installed {
                    id,
                    primitive: staged.primitive,
                    transition: staged.transition,
                },
            );
            self.journal.push(SiteChange::Added(staged.key));
        }
        Ok((removed, exit))
    }

    /// First installed site that mentions one of `variables`
    pub fn site_referencing(&self, variables: &[Variable]) -> Option<(&SiteKey, Variable)> {
        let mut keys: Vec<&SiteKey> = self.current.keys().collect();
        keys.sort();
        keys.into_iter().find_map(|key| {
            let installed = &self.current[key];
            variables
                .iter()
                .find(|v| installed.mentions(**v))
                .map(|v| (key, *v))
        })
    }

    pub fn commit(&mut self) {
        self.journal.clear();
        self.declared.clear();
    }

    /// Undo every solver mutation of the running pass, newest first, and
    /// restore the table of the last completed pass.
    pub fn rollback(&mut self, backend: &mut dyn ConstraintBackend) {
        // Replaced constraints the pass never got to remove are still installed
        for staged in mem::take(&mut self.staged) {
            if let Some(old) = staged.replaces {
                self.previous.insert(staged.key, old);
            }
        }
        while let Some(change) = self.journal.pop() {
            match change {
                SiteChange::Added(key) => {
                    if let Some(added) = self.current.remove(&key) {
                        undo_add(backend, &key, &added);
                    }
                }
                SiteChange::Kept(key) => {
                    if let Some(kept) = self.current.remove(&key) {
                        self.previous.insert(key, kept);
                    }
                }
                SiteChange::Removed(key, old) => {
                    undo_remove(backend, &key, &old);
                    self.previous.insert(key, old);
                }
            }
        }
        let restored = mem::take(&mut self.previous);
        self.current.extend(restored);
        self.declared.clear();
    }
}

fn undo_add(backend: &mut dyn ConstraintBackend, key: &SiteKey, installed: &Installed) {
    if let Err(e) = backend.remove_constraint(installed.id) {
        warn!(site = %key, error = %e, "rollback could not remove constraint");
    }
}

fn undo_remove(backend: &mut dyn ConstraintBackend, key: &SiteKey, installed: &Installed) {
    if let Err(e) = backend.add_constraint(installed.id, &installed.primitive) {
        warn!(site = %key, error = %e, "rollback could not reinstall constraint");
    }
}

fn convert_add_error(e: SolverError, key: &SiteKey, description: String) -> LayoutError {
    match e {
        SolverError::Unsatisfiable { .. } => LayoutError::unsatisfiable(key.as_str(), description),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::solver::KasuariBackend;

    fn v(n: u32) -> Variable {
        Variable::from_raw(n)
    }

    fn declare(
        table: &mut SiteTable,
        key: &str,
        declaration: &Declaration,
    ) -> Result<SiteOutcome, LayoutError> {
        table.declare(
            SiteKey::new(key),
            declaration.primitive(),
            declaration.transition,
            || key.to_string(),
        )
    }

    fn apply(table: &mut SiteTable, backend: &mut KasuariBackend) -> usize {
        let removed = table.apply(backend).map_err(|r| r.error).unwrap().0;
        table.commit();
        removed
    }

    fn value_of(backend: &mut KasuariBackend, variable: Variable) -> Option<f64> {
        backend
            .resolve_all()
            .into_iter()
            .find(|(var, _)| *var == variable)
            .map(|(_, value)| value)
    }

    #[test]
    fn test_equivalence_ignores_sides() {
        let a = Declaration::equal(v(1), v(2) + 10.0);
        let b = Declaration::equal(v(1) - v(2), 10.0);
        assert!(a.is_equivalent(&b));
    }

    #[test]
    fn test_equivalence_ignores_orientation() {
        let a = Declaration::equal(v(1) - v(2), 10.0);
        let b = Declaration::equal(v(2) + 10.0, v(1));
        assert!(a.is_equivalent(&b));
        let c = Declaration::greater_or_equal(v(1), 10.0);
        let d = Declaration::less_or_equal(10.0, v(1));
        assert!(c.is_equivalent(&d));
        assert!(!c.is_equivalent(&Declaration::less_or_equal(v(1), 10.0)));
    }

    #[test]
    fn test_equivalence_respects_strength_and_relation() {
        let a = Declaration::equal(v(1), 10.0);
        assert!(!a.is_equivalent(&a.clone().with_strength(Strength::Weak)));
        assert!(!a.is_equivalent(&Declaration::less_or_equal(v(1), 10.0)));
    }

    #[test]
    fn test_equivalence_detects_constant_change() {
        let a = Declaration::equal(v(1), 10.0);
        let b = Declaration::equal(v(1), 10.0 + 1e-9);
        assert!(!a.is_equivalent(&b));
    }

    #[test]
    fn test_redeclaration_is_unchanged() {
        let mut backend = KasuariBackend::new();
        let mut table = SiteTable::new();
        let decl = Declaration::equal(v(1), 5.0);

        table.begin_pass();
        assert_eq!(declare(&mut table, "a", &decl).unwrap(), SiteOutcome::Added);
        apply(&mut table, &mut backend);

        table.begin_pass();
        assert_eq!(declare(&mut table, "a", &decl).unwrap(), SiteOutcome::Unchanged);
        assert_eq!(apply(&mut table, &mut backend), 0);
        assert_eq!(backend.constraint_count(), 1);
    }

    #[test]
    fn test_declarations_wait_for_apply() {
        let mut backend = KasuariBackend::new();
        let mut table = SiteTable::new();
        table.begin_pass();
        declare(&mut table, "a", &Declaration::equal(v(1), 5.0)).unwrap();
        assert_eq!(backend.constraint_count(), 0);
        apply(&mut table, &mut backend);
        assert_eq!(backend.constraint_count(), 1);
    }

    #[test]
    fn test_undeclared_site_is_retired() {
        let mut backend = KasuariBackend::new();
        let mut table = SiteTable::new();

        table.begin_pass();
        declare(&mut table, "a", &Declaration::equal(v(1), 5.0)).unwrap();
        apply(&mut table, &mut backend);

        table.begin_pass();
        assert_eq!(apply(&mut table, &mut backend), 1);
        assert_eq!(backend.constraint_count(), 0);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_retired_site_makes_room_for_new_one() {
        let mut backend = KasuariBackend::new();
        let mut table = SiteTable::new();

        table.begin_pass();
        declare(&mut table, "a", &Declaration::equal(v(1), 5.0)).unwrap();
        apply(&mut table, &mut backend);

        // same variable, pinned elsewhere from another site
        table.begin_pass();
        declare(&mut table, "b", &Declaration::equal(v(1), 10.0)).unwrap();
        assert_eq!(apply(&mut table, &mut backend), 1);
        assert_eq!(backend.constraint_count(), 1);
        assert_eq!(value_of(&mut backend, v(1)), Some(10.0));
    }

    #[test]
    fn test_duplicate_site_rejected() {
        let mut table = SiteTable::new();
        table.begin_pass();
        declare(&mut table, "a", &Declaration::equal(v(1), 5.0)).unwrap();
        let err = declare(&mut table, "a", &Declaration::equal(v(2), 5.0));
        assert!(matches!(err, Err(LayoutError::DuplicateSite { .. })));
    }

    #[test]
    fn test_rejection_names_declaration() {
        let mut backend = KasuariBackend::new();
        let mut table = SiteTable::new();
        table.begin_pass();
        declare(&mut table, "a", &Declaration::equal(v(1), 5.0)).unwrap();
        declare(&mut table, "b", &Declaration::equal(v(2), 1.0)).unwrap();
        declare(&mut table, "c", &Declaration::equal(v(1), 6.0)).unwrap();
        let rejected = table.apply(&mut backend).unwrap_err();
        assert_eq!(rejected.ordinal, 2);
        assert!(matches!(rejected.error, LayoutError::Unsatisfiable { .. }));
        table.rollback(&mut backend);
        assert_eq!(backend.constraint_count(), 0);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_rollback_before_apply_restores_previous_pass() {
        let mut backend = KasuariBackend::new();
        let mut table = SiteTable::new();

        table.begin_pass();
        declare(&mut table, "a", &Declaration::equal(v(1), 5.0)).unwrap();
        apply(&mut table, &mut backend);

        table.begin_pass();
        declare(&mut table, "a", &Declaration::equal(v(1), 7.0)).unwrap();
        declare(&mut table, "b", &Declaration::equal(v(2), 1.0)).unwrap();
        table.rollback(&mut backend);

        assert_eq!(table.len(), 1);
        assert_eq!(backend.constraint_count(), 1);
        assert_eq!(value_of(&mut backend, v(1)), Some(5.0));
    }

    #[test]
    fn test_rollback_after_failed_apply_restores_previous_pass() {
        let mut backend = KasuariBackend::new();
        let mut table = SiteTable::new();

        table.begin_pass();
        declare(&mut table, "a", &Declaration::equal(v(1), 5.0)).unwrap();
        declare(&mut table, "b", &Declaration::equal(v(2), 1.0)).unwrap();
        apply(&mut table, &mut backend);

        // replace a, drop b, and add a conflicting site
        table.begin_pass();
        declare(&mut table, "a", &Declaration::equal(v(1), 7.0)).unwrap();
        declare(&mut table, "c", &Declaration::equal(v(1), 8.0)).unwrap();
        assert!(table.apply(&mut backend).is_err());
        table.rollback(&mut backend);

        assert_eq!(table.len(), 2);
        assert_eq!(backend.constraint_count(), 2);
        let mut values = backend.resolve_all();
        values.sort_by_key(|(var, _)| *var);
        assert_eq!(values, vec![(v(1), 5.0), (v(2), 1.0)]);
    }
}
