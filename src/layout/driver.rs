//! Evaluation pass driver
//!
//! A [`Layout`] owns one solver. Callers describe the layout inside
//! [`Layout::pass`]; the pass diffs its declarations against the previous
//! pass and applies only the difference. [`Layout::tick`] resolves the
//! system once per frame and publishes interpolated values.

use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::mem;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace};

use super::config::LayoutConfig;
use super::declare::{Declaration, Relation, SiteKey, SiteOutcome, SiteTable};
use super::error::LayoutError;
use super::expr::{Expression, Variable};
use super::generator::{Access, Dimension, Edge, Generator};
use super::keyframe::Keyframes;
use super::solver::{ConstraintBackend, KasuariBackend};
use super::types::{round, BoundingBox, Size};

/// Wall-clock source used for interpolation
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin
    fn now(&self) -> Duration;
}

/// Clock backed by [`Instant`]
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock advanced by hand; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, now: Duration) {
        self.now.set(now);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Host hook asked to call [`Layout::tick`] before the next paint
pub trait FrameScheduler {
    fn request_frame(&mut self);
}

impl<F: FnMut()> FrameScheduler for F {
    fn request_frame(&mut self) {
        self()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriverState {
    Clean,
    Dirty,
}

/// What a call to [`Layout::tick`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickOutcome {
    /// The solver was asked for a new solution
    pub resolved: bool,
    /// Some transition is still in flight
    pub animating: bool,
}

/// Solver work done by one completed pass
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PassSummary {
    pub added: usize,
    pub replaced: usize,
    pub unchanged: usize,
    pub removed: usize,
    /// Variables and dimensions torn down at the end of the pass
    pub discarded: Vec<String>,
}

impl PassSummary {
    /// True when the pass changed nothing in the solver
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.replaced == 0 && self.removed == 0
    }
}

/// Named values of a layout, sorted by name
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayoutSnapshot {
    pub dimensions: Vec<(String, BoundingBox)>,
    pub variables: Vec<(String, f64)>,
}

impl fmt::Display for LayoutSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, bounds) in &self.dimensions {
            writeln!(f, "{}: {}", name, bounds)?;
        }
        for (name, value) in &self.variables {
            writeln!(f, "{} = {}", name, round(*value))?;
        }
        Ok(())
    }
}

/// An incrementally maintained constraint layout
pub struct Layout {
    config: LayoutConfig,
    backend: Box<dyn ConstraintBackend>,
    clock: Box<dyn Clock>,
    scheduler: Box<dyn FrameScheduler>,
    names: HashMap<Variable, String>,
    next_variable: u32,
    variables: Generator<Variable>,
    dimensions: Generator<Dimension>,
    sites: SiteTable,
    keyframes: Keyframes,
    solved: HashMap<Variable, f64>,
    published: HashMap<Variable, f64>,
    state: DriverState,
    /// Longest transition among deltas not yet resolved
    pending_transition: Duration,
    pass_transition: Duration,
    staging: PassSummary,
    last_pass: PassSummary,
    rejected_declaration: Option<usize>,
}

impl Default for Layout {
    fn default() -> Self {
        Self::new()
    }
}

impl Layout {
    pub fn new() -> Self {
        Self::with_config(LayoutConfig::default())
    }

    pub fn with_config(config: LayoutConfig) -> Self {
        Self {
            config,
            backend: Box::new(KasuariBackend::new()),
            clock: Box::new(SystemClock::new()),
            scheduler: Box::new(|| {}),
            names: HashMap::new(),
            next_variable: 0,
            variables: Generator::new(),
            dimensions: Generator::new(),
            sites: SiteTable::new(),
            keyframes: Keyframes::new(),
            solved: HashMap::new(),
            published: HashMap::new(),
            state: DriverState::Clean,
            pending_transition: Duration::ZERO,
            pass_transition: Duration::ZERO,
            staging: PassSummary::default(),
            last_pass: PassSummary::default(),
            rejected_declaration: None,
        }
    }

    /// Replace the solver backend; only meaningful before the first pass
    pub fn with_backend(mut self, backend: Box<dyn ConstraintBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_scheduler(mut self, scheduler: impl FrameScheduler + 'static) -> Self {
        self.scheduler = Box::new(scheduler);
        self
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Run one evaluation pass.
    ///
    /// On error every solver change made by the pass is undone and the
    /// layout stays at the last completed pass.
    pub fn pass<T, F>(&mut self, describe: F) -> Result<T, LayoutError>
    where
        F: FnOnce(&mut Pass<'_>) -> Result<T, LayoutError>,
    {
        self.begin_pass();
        let result = {
            let mut pass = Pass::new(self);
            describe(&mut pass)
        };
        match result.and_then(|value| self.finish_pass().map(|_| value)) {
            Ok(value) => Ok(value),
            Err(e) => {
                debug!(error = %e, "pass failed, rolling back");
                self.abort_pass();
                Err(e)
            }
        }
    }

    /// Summary of the last completed pass
    pub fn last_pass(&self) -> &PassSummary {
        &self.last_pass
    }

    /// Ordinal, counted from 0 in declaration order, of the declaration
    /// whose constraint made the last failed pass unsolvable.
    ///
    /// See [`Pass::declaration_count`].
    pub fn rejected_declaration(&self) -> Option<usize> {
        self.rejected_declaration
    }

    fn begin_pass(&mut self) {
        self.sites.begin_pass();
        self.variables.begin_pass();
        self.dimensions.begin_pass();
        self.pass_transition = Duration::ZERO;
        self.staging = PassSummary::default();
        self.rejected_declaration = None;
    }

    fn finish_pass(&mut self) -> Result<(), LayoutError> {
        let (removed, exit) = match self.sites.apply(self.backend.as_mut()) {
            Ok(applied) => applied,
            Err(rejected) => {
                self.rejected_declaration = Some(rejected.ordinal);
                return Err(rejected.error);
            }
        };
        self.staging.removed = removed;
        if removed > 0 {
            self.pass_transition = self.pass_transition.max(exit);
        }

        let mut doomed: Vec<Variable> = self.variables.doomed().map(|(_, v)| *v).collect();
        for (_, dim) in self.dimensions.doomed() {
            doomed.extend(dim.variables());
        }
        if let Some((site, variable)) = self.sites.site_referencing(&doomed) {
            return Err(LayoutError::stale_variable(
                site.as_str(),
                display_name(&self.names, variable),
            ));
        }

        self.sites.commit();
        let mut discarded = Vec::new();
        for (name, variable) in self.variables.end_pass() {
            debug!(variable = %name, "variable discarded");
            self.release(variable);
            discarded.push(name);
        }
        for (name, dim) in self.dimensions.end_pass() {
            debug!(dimension = %name, "dimension discarded");
            for variable in dim.variables() {
                self.release(variable);
            }
            discarded.push(name);
        }
        discarded.sort();
        self.staging.discarded = discarded;

        if !self.staging.is_noop() {
            self.pending_transition = self.pending_transition.max(self.pass_transition);
            self.state = DriverState::Dirty;
            self.scheduler.request_frame();
        }
        self.last_pass = mem::take(&mut self.staging);
        debug!(
            added = self.last_pass.added,
            replaced = self.last_pass.replaced,
            removed = self.last_pass.removed,
            "pass complete"
        );
        Ok(())
    }

    fn abort_pass(&mut self) {
        self.sites.rollback(self.backend.as_mut());
        for (_, variable) in self.variables.abort_pass() {
            self.release(variable);
        }
        for (_, dim) in self.dimensions.abort_pass() {
            for variable in dim.variables() {
                self.release(variable);
            }
        }
        self.staging = PassSummary::default();
    }

    fn release(&mut self, variable: Variable) {
        self.backend.release_variable(variable);
        self.names.remove(&variable);
        self.solved.remove(&variable);
        self.published.remove(&variable);
        self.keyframes.forget(variable);
    }

    fn request_variable(&mut self, name: &str) -> Result<Variable, LayoutError> {
        let Layout {
            variables,
            names,
            next_variable,
            ..
        } = self;
        let (variable, access) =
            variables.access(name, || Ok(allocate(names, next_variable, name.to_string())))?;
        if access == Access::Created {
            debug!(variable = %name, "variable created");
        }
        Ok(variable)
    }

    fn request_dimension(&mut self, name: &str) -> Result<Dimension, LayoutError> {
        let Layout {
            dimensions,
            names,
            next_variable,
            ..
        } = self;
        let (dim, access) = dimensions.access(name, || {
            let [left, right, top, bottom, width, height] = Edge::ALL
                .map(|edge| allocate(names, next_variable, format!("{}-{}", name, edge.name())));
            Ok(Dimension {
                left,
                right,
                top,
                bottom,
                width,
                height,
            })
        })?;

        match access {
            Access::Created => debug!(dimension = %name, "dimension created"),
            Access::Reused => trace!(dimension = %name, "dimension reused"),
            Access::Current => return Ok(dim),
        }

        let width = Declaration::equal(dim.right - dim.left, dim.width);
        let height = Declaration::equal(dim.bottom - dim.top, dim.height);
        self.declare_site(SiteKey::new(format!("dim:{}/width", name)), &width)?;
        self.declare_site(SiteKey::new(format!("dim:{}/height", name)), &height)?;
        Ok(dim)
    }

    fn declare_site(
        &mut self,
        key: SiteKey,
        declaration: &Declaration,
    ) -> Result<SiteOutcome, LayoutError> {
        for variable in declaration.variables() {
            if !self.names.contains_key(&variable) {
                return Err(LayoutError::stale_variable(key.as_str(), variable.to_string()));
            }
        }

        let names = &self.names;
        let outcome = self.sites.declare(
            key,
            declaration.primitive(),
            declaration.transition,
            || declaration.describe(&|v| display_name(names, v)),
        )?;

        match outcome {
            SiteOutcome::Added => {
                self.staging.added += 1;
                self.pass_transition = self.pass_transition.max(declaration.transition.enter);
            }
            SiteOutcome::Replaced => {
                self.staging.replaced += 1;
                self.pass_transition = self.pass_transition.max(declaration.transition.update);
            }
            SiteOutcome::Unchanged => self.staging.unchanged += 1,
        }
        Ok(outcome)
    }

    /// Resolve pending changes and publish values for this frame
    pub fn tick(&mut self) -> TickOutcome {
        let now = self.clock.now();
        let mut resolved = false;

        if self.state == DriverState::Dirty {
            let duration = mem::take(&mut self.pending_transition);
            for (variable, value) in self.backend.resolve_all() {
                if !self.names.contains_key(&variable) {
                    continue;
                }
                self.solved.insert(variable, value);
                self.keyframes.retarget(variable, value, now, duration);
            }
            self.state = DriverState::Clean;
            resolved = true;
        } else if self.keyframes.active_count() == 0 {
            trace!("nothing to resolve or animate");
            return TickOutcome::default();
        }

        for variable in self.names.keys() {
            let solved = self.solved.get(variable).copied().unwrap_or(0.0);
            let shown = self.keyframes.read(*variable, solved, now);
            self.published.insert(*variable, shown);
        }

        let animating = self.keyframes.is_animating(now);
        if animating {
            self.scheduler.request_frame();
        }
        if self.config.debug {
            for (name, bounds) in self.snapshot().dimensions {
                info!(dimension = %name, %bounds, "layout");
            }
        }
        TickOutcome {
            resolved,
            animating,
        }
    }

    /// True when a tick would resolve or advance a transition
    pub fn needs_frame(&self) -> bool {
        self.state == DriverState::Dirty || self.keyframes.active_count() > 0
    }

    /// Last published value of `variable`
    pub fn value(&self, variable: Variable) -> f64 {
        self.published.get(&variable).copied().unwrap_or(0.0)
    }

    /// Value from the last resolve, ignoring transitions
    pub fn solved_value(&self, variable: Variable) -> f64 {
        self.solved.get(&variable).copied().unwrap_or(0.0)
    }

    pub fn evaluate(&self, expression: &Expression) -> f64 {
        expression.evaluate(|v| self.value(v))
    }

    /// Published bounds of a dimension
    pub fn bounds(&self, dim: &Dimension) -> BoundingBox {
        BoundingBox::from_edges(
            self.value(dim.left),
            self.value(dim.top),
            self.value(dim.right),
            self.value(dim.bottom),
        )
    }

    pub fn find_dimension(&self, name: &str) -> Option<Dimension> {
        self.dimensions.get(name).copied()
    }

    pub fn find_variable(&self, name: &str) -> Option<Variable> {
        self.variables.get(name).copied()
    }

    pub fn name_of(&self, variable: Variable) -> Option<&str> {
        self.names.get(&variable).map(String::as_str)
    }

    /// Check `right - left = width` and `bottom - top = height` on solved values
    pub fn check_dimension(&self, dim: &Dimension) -> bool {
        let v = |var| self.solved_value(var);
        let tolerance = self.config.tolerance;
        (v(dim.right) - v(dim.left) - v(dim.width)).abs() <= tolerance
            && (v(dim.bottom) - v(dim.top) - v(dim.height)).abs() <= tolerance
    }

    /// Names of dimensions whose solved values break their own consistency
    pub fn inconsistent_dimensions(&self) -> Vec<String> {
        self.dimensions
            .live()
            .into_iter()
            .filter(|(_, dim)| !self.check_dimension(dim))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Published values of every live dimension and variable
    pub fn snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot {
            dimensions: self
                .dimensions
                .live()
                .into_iter()
                .map(|(name, dim)| (name.clone(), self.bounds(dim)))
                .collect(),
            variables: self
                .variables
                .live()
                .into_iter()
                .map(|(name, var)| (name.clone(), self.value(*var)))
                .collect(),
        }
    }

    /// Constraints currently installed in the backend
    pub fn constraint_count(&self) -> usize {
        self.backend.constraint_count()
    }

    /// Number of live variables, dimension variables included
    pub fn variable_count(&self) -> usize {
        self.names.len()
    }
}

fn display_name(names: &HashMap<Variable, String>, variable: Variable) -> String {
    names
        .get(&variable)
        .cloned()
        .unwrap_or_else(|| variable.to_string())
}

fn allocate(names: &mut HashMap<Variable, String>, next: &mut u32, name: String) -> Variable {
    let variable = Variable::from_raw(*next);
    *next += 1;
    names.insert(variable, name);
    variable
}

struct Scope {
    path: String,
    ordinal: u32,
}

/// Declaration context of one evaluation pass
pub struct Pass<'a> {
    layout: &'a mut Layout,
    scopes: Vec<Scope>,
}

impl<'a> Pass<'a> {
    fn new(layout: &'a mut Layout) -> Self {
        Self {
            layout,
            scopes: vec![Scope {
                path: String::new(),
                ordinal: 0,
            }],
        }
    }

    fn scope_path(&self) -> &str {
        self.scopes.last().map(|s| s.path.as_str()).unwrap_or("")
    }

    /// `name` prefixed with the enclosing scopes
    pub fn qualified(&self, name: &str) -> String {
        let path = self.scope_path();
        if path.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", path, name)
        }
    }

    fn next_site(&mut self) -> SiteKey {
        match self.scopes.last_mut() {
            Some(scope) => {
                let key = SiteKey::new(format!("{}#{}", scope.path, scope.ordinal));
                scope.ordinal += 1;
                key
            }
            None => SiteKey::new("#"),
        }
    }

    /// Run `f` with names and sites prefixed by `name`
    pub fn scope<T>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut Pass<'a>) -> Result<T, LayoutError>,
    ) -> Result<T, LayoutError> {
        let path = self.qualified(name);
        self.scopes.push(Scope { path, ordinal: 0 });
        let result = f(self);
        self.scopes.pop();
        result
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.layout.config
    }

    /// Scalar variable `name`, stable across passes
    pub fn variable(&mut self, name: &str) -> Result<Variable, LayoutError> {
        let name = self.qualified(name);
        self.layout.request_variable(&name)
    }

    /// Dimension `name`, stable across passes
    pub fn dimension(&mut self, name: &str) -> Result<Dimension, LayoutError> {
        let name = self.qualified(name);
        self.layout.request_dimension(&name)
    }

    /// Declarations made so far in this pass, dimension consistency
    /// included
    pub fn declaration_count(&self) -> usize {
        self.layout.sites.declared()
    }

    /// Declare from the next positional site of the current scope
    pub fn declare(&mut self, declaration: Declaration) -> Result<SiteOutcome, LayoutError> {
        let key = self.next_site();
        self.layout.declare_site(key, &declaration)
    }

    /// Declare from an explicitly named site of the current scope
    pub fn declare_keyed(
        &mut self,
        key: &str,
        declaration: Declaration,
    ) -> Result<SiteOutcome, LayoutError> {
        let key = SiteKey::new(format!("{}@{}", self.scope_path(), key));
        self.layout.declare_site(key, &declaration)
    }

    fn declare_default(
        &mut self,
        lhs: Expression,
        relation: Relation,
        rhs: Expression,
    ) -> Result<SiteOutcome, LayoutError> {
        let declaration = Declaration::new(lhs, relation, rhs)
            .with_strength(self.layout.config.default_strength)
            .with_transition(self.layout.config.default_transition);
        self.declare(declaration)
    }

    pub fn equal(
        &mut self,
        lhs: impl Into<Expression>,
        rhs: impl Into<Expression>,
    ) -> Result<SiteOutcome, LayoutError> {
        self.declare_default(lhs.into(), Relation::Equal, rhs.into())
    }

    pub fn less_or_equal(
        &mut self,
        lhs: impl Into<Expression>,
        rhs: impl Into<Expression>,
    ) -> Result<SiteOutcome, LayoutError> {
        self.declare_default(lhs.into(), Relation::LessOrEqual, rhs.into())
    }

    pub fn greater_or_equal(
        &mut self,
        lhs: impl Into<Expression>,
        rhs: impl Into<Expression>,
    ) -> Result<SiteOutcome, LayoutError> {
        self.declare_default(lhs.into(), Relation::GreaterOrEqual, rhs.into())
    }

    /// Size `dim` to measured content
    pub fn measure(&mut self, dim: &Dimension, size: Size) -> Result<(), LayoutError> {
        self.measure_width(dim, size.width)?;
        self.measure_height(dim, size.height)
    }

    pub fn measure_width(&mut self, dim: &Dimension, width: f64) -> Result<(), LayoutError> {
        check_measurement(width)?;
        self.equal(dim.width, width)?;
        Ok(())
    }

    pub fn measure_height(&mut self, dim: &Dimension, height: f64) -> Result<(), LayoutError> {
        check_measurement(height)?;
        self.equal(dim.height, height)?;
        Ok(())
    }
}

fn check_measurement(value: f64) -> Result<(), LayoutError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(LayoutError::invalid_input(
            "measure",
            format!("size must be finite and non-negative, got {}", value),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::declare::{Strength, Transition};
    use pretty_assertions::assert_eq;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_values_published_after_tick() {
        let mut layout = Layout::new();
        let x = layout
            .pass(|p| {
                let x = p.variable("x")?;
                p.equal(x, 42.0)?;
                Ok(x)
            })
            .unwrap();
        assert_eq!(layout.value(x), 0.0);
        assert!(layout.tick().resolved);
        assert_eq!(layout.value(x), 42.0);
    }

    #[test]
    fn test_clean_tick_is_noop() {
        let mut layout = Layout::new();
        layout
            .pass(|p| {
                let x = p.variable("x")?;
                p.equal(x, 1.0)?;
                Ok(())
            })
            .unwrap();
        layout.tick();
        assert_eq!(layout.tick(), TickOutcome::default());
        assert!(!layout.needs_frame());
    }

    #[test]
    fn test_frame_requested_on_change() {
        let frames = Rc::new(Cell::new(0));
        let counter = frames.clone();
        let mut layout = Layout::new().with_scheduler(move || counter.set(counter.get() + 1));

        let describe = |p: &mut Pass<'_>| -> Result<(), LayoutError> {
            let x = p.variable("x")?;
            p.equal(x, 1.0)?;
            Ok(())
        };
        layout.pass(describe).unwrap();
        assert_eq!(frames.get(), 1);
        layout.tick();

        layout.pass(describe).unwrap();
        assert!(layout.last_pass().is_noop());
        assert_eq!(frames.get(), 1);
    }

    #[test]
    fn test_dimension_outside_pass_is_rejected() {
        let mut layout = Layout::new();
        assert!(matches!(
            layout.request_dimension("box"),
            Err(LayoutError::OutsidePass { .. })
        ));
        assert_eq!(layout.variable_count(), 0);
    }

    #[test]
    fn test_scoped_names_and_sites() {
        let mut layout = Layout::new();
        let (gap, name) = layout
            .pass(|p| {
                p.scope("row", |p| {
                    let gap = p.variable("gap")?;
                    p.equal(gap, 5.0)?;
                    Ok((gap, p.qualified("gap")))
                })
            })
            .unwrap();
        assert_eq!(name, "row/gap");
        assert_eq!(layout.find_variable("row/gap"), Some(gap));
        assert_eq!(layout.name_of(gap), Some("row/gap"));
    }

    #[test]
    fn test_keyed_sites_survive_reordering() {
        let mut layout = Layout::new();
        layout
            .pass(|p| {
                let a = p.variable("a")?;
                let b = p.variable("b")?;
                p.declare_keyed("a", Declaration::equal(a, 1.0))?;
                p.declare_keyed("b", Declaration::equal(b, 2.0))?;
                Ok(())
            })
            .unwrap();
        layout
            .pass(|p| {
                let a = p.variable("a")?;
                let b = p.variable("b")?;
                p.declare_keyed("b", Declaration::equal(b, 2.0))?;
                p.declare_keyed("a", Declaration::equal(a, 1.0))?;
                Ok(())
            })
            .unwrap();
        assert!(layout.last_pass().is_noop());
        assert_eq!(layout.last_pass().unchanged, 2);
    }

    #[test]
    fn test_snapshot_is_sorted() {
        let mut layout = Layout::new();
        layout
            .pass(|p| {
                let b = p.dimension("b")?;
                let a = p.dimension("a")?;
                p.measure(&a, Size::new(10.0, 20.0))?;
                p.measure(&b, Size::new(30.0, 40.0))?;
                p.equal(a.left, 0.0)?;
                p.equal(a.top, 0.0)?;
                p.equal(b.left, a.right)?;
                p.equal(b.top, 0.0)?;
                let w = p.variable("total")?;
                p.equal(w, b.right)?;
                Ok(())
            })
            .unwrap();
        layout.tick();
        let snapshot = layout.snapshot();
        assert_eq!(
            snapshot.dimensions,
            vec![
                ("a".to_string(), BoundingBox::new(0.0, 0.0, 10.0, 20.0)),
                ("b".to_string(), BoundingBox::new(10.0, 0.0, 30.0, 40.0)),
            ]
        );
        assert_eq!(snapshot.variables, vec![("total".to_string(), 40.0)]);
        assert_eq!(
            snapshot.to_string(),
            "a: x=0 y=0 w=10 h=20\nb: x=10 y=0 w=30 h=40\ntotal = 40\n"
        );
    }

    #[test]
    fn test_invalid_measurement() {
        let mut layout = Layout::new();
        let result = layout.pass(|p| {
            let d = p.dimension("d")?;
            p.measure_width(&d, f64::NAN)
        });
        assert!(matches!(result, Err(LayoutError::InvalidBuilderInput { .. })));
        assert_eq!(layout.constraint_count(), 0);
        assert_eq!(layout.variable_count(), 0);
    }

    #[test]
    fn test_config_defaults_apply_to_helpers() {
        let clock = ManualClock::new();
        let config = LayoutConfig::new()
            .with_default_strength(Strength::Weak)
            .with_default_transition(Transition::all(ms(100)));
        let mut layout = Layout::with_config(config).with_clock(clock.clone());
        let x = layout
            .pass(|p| {
                let x = p.variable("x")?;
                p.equal(x, 10.0)?;
                p.declare(Declaration::equal(x, 20.0))?;
                Ok(x)
            })
            .unwrap();
        layout.tick();
        clock.advance(ms(100));
        layout.tick();
        // the weak default gives way to the strong declaration
        assert_eq!(layout.value(x), 20.0);
    }
}
