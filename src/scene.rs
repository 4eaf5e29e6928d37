//! Running scenes
//!
//! A parsed [`Scene`] is checked and lowered into commands first, so a
//! malformed statement is reported before anything reaches the solver. Each
//! pass is then declared on one [`Layout`] driven by a [`ManualClock`] and
//! ticked at a fixed frame interval until its transitions settle.

use std::fmt;
use std::time::Duration;

use tracing::{debug, warn};

use crate::layout::{
    ChainStyle, Clock, Declaration, Direction, Edge, Expression, Layout, LayoutConfig, LayoutError,
    LayoutSnapshot, ManualClock, MeasureFrom, Pass, PassSummary, Placement, Relation, Sides, Size,
    Strength, TableSpec, Transition,
};
use crate::parser::{
    BinaryOp, Comparison, Expr, Identifier, OptionValue, Scene, SceneOption, Span, Spanned,
    Statement,
};
use crate::SceneError;

/// Configuration for running a scene
#[derive(Debug, Clone)]
pub struct SceneConfig {
    pub layout: LayoutConfig,
    /// Clock step between two ticks
    pub frame_interval: Duration,
    /// Upper bound on ticks per pass
    pub max_frames: usize,
    /// Keep a snapshot of every tick, not only the settled one
    pub record_frames: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            frame_interval: Duration::from_millis(16),
            max_frames: 1000,
            record_frames: false,
        }
    }
}

impl SceneConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(mut self, config: LayoutConfig) -> Self {
        self.layout = config;
        self
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = max_frames;
        self
    }

    pub fn with_record_frames(mut self, record: bool) -> Self {
        self.record_frames = record;
        self
    }
}

/// Published layout at one tick
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub at: Duration,
    pub snapshot: LayoutSnapshot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PassReport {
    pub summary: PassSummary,
    /// Every tick of the pass, when frames are recorded
    pub frames: Vec<FrameReport>,
    /// False when the frame limit was hit mid-transition
    pub settled: bool,
    /// Clock time of the last tick
    pub at: Duration,
    pub layout: LayoutSnapshot,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneReport {
    pub passes: Vec<PassReport>,
}

impl fmt::Display for SceneReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, pass) in self.passes.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let s = &pass.summary;
            writeln!(
                f,
                "pass {}: added {}, replaced {}, unchanged {}, removed {}",
                i + 1,
                s.added,
                s.replaced,
                s.unchanged,
                s.removed
            )?;
            if !s.discarded.is_empty() {
                writeln!(f, "discarded: {}", s.discarded.join(", "))?;
            }
            for frame in &pass.frames {
                writeln!(f, "frame {}ms", frame.at.as_millis())?;
                write!(f, "{}", frame.snapshot)?;
            }
            if pass.settled {
                writeln!(f, "settled at {}ms", pass.at.as_millis())?;
            } else {
                writeln!(f, "still animating at {}ms", pass.at.as_millis())?;
            }
            write!(f, "{}", pass.layout)?;
        }
        Ok(())
    }
}

/// Coefficient-carrying reference to a layout variable, by name
#[derive(Debug, Clone, PartialEq)]
enum Reference {
    Scalar(String),
    Edge(String, Edge),
    CenterX(String),
    CenterY(String),
}

/// Linear form of a scene expression, before names are resolved
#[derive(Debug, Clone, PartialEq, Default)]
struct Linear {
    terms: Vec<(Reference, f64)>,
    constant: f64,
}

impl Linear {
    fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    fn reference(reference: Reference) -> Self {
        Self {
            terms: vec![(reference, 1.0)],
            constant: 0.0,
        }
    }

    fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    fn scale(mut self, factor: f64) -> Self {
        for (_, coefficient) in &mut self.terms {
            *coefficient *= factor;
        }
        self.constant *= factor;
        self
    }

    fn plus(mut self, other: Linear, sign: f64) -> Self {
        self.terms
            .extend(other.terms.into_iter().map(|(r, c)| (r, c * sign)));
        self.constant += other.constant * sign;
        self
    }
}

/// Per-field transition overrides of a `constrain` statement, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct TransitionOverride {
    enter: Option<Duration>,
    update: Option<Duration>,
    exit: Option<Duration>,
}

impl TransitionOverride {
    fn over(&self, base: Transition) -> Transition {
        Transition {
            enter: self.enter.unwrap_or(base.enter),
            update: self.update.unwrap_or(base.update),
            exit: self.exit.unwrap_or(base.exit),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Constrain {
        lhs: Linear,
        relation: Relation,
        rhs: Linear,
        strength: Option<Strength>,
        transition: TransitionOverride,
        key: Option<String>,
    },
    Measure {
        dimension: String,
        size: Size,
    },
    Average {
        inputs: Vec<Linear>,
        target: Linear,
    },
    Chain {
        name: String,
        direction: Direction,
        style: ChainStyle,
        boundary: String,
        items: Vec<String>,
    },
    Boundary {
        boundary: String,
        members: Vec<String>,
        sides: Sides,
        tight: bool,
    },
    Sum {
        name: String,
        terms: Vec<(Linear, f64)>,
        relation: Relation,
        target: Linear,
    },
    Place {
        inner: String,
        outer: String,
        placement: Placement,
    },
    Table {
        name: String,
        boundary: String,
        spec: TableSpec,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    span: Span,
    command: Command,
}

fn invalid(span: Span, message: impl Into<String>) -> SceneError {
    SceneError::Invalid {
        span,
        message: message.into(),
    }
}

fn relation(comparison: Comparison) -> Relation {
    match comparison {
        Comparison::Equal => Relation::Equal,
        Comparison::LessOrEqual => Relation::LessOrEqual,
        Comparison::GreaterOrEqual => Relation::GreaterOrEqual,
    }
}

fn names(list: &[Spanned<Identifier>]) -> Vec<String> {
    list.iter().map(|id| id.node.0.clone()).collect()
}

fn lower(expr: &Spanned<Expr>) -> Result<Linear, SceneError> {
    match &expr.node {
        Expr::Number(n) => Ok(Linear::constant(*n)),
        Expr::Variable(id) => Ok(Linear::reference(Reference::Scalar(id.0.clone()))),
        Expr::Member { dimension, member } => {
            let name = dimension.0.clone();
            let reference = match member.node.as_str() {
                "center_x" => Reference::CenterX(name),
                "center_y" => Reference::CenterY(name),
                other => match Edge::from_name(other) {
                    Some(edge) => Reference::Edge(name, edge),
                    None => {
                        return Err(invalid(
                            member.span.clone(),
                            format!(
                                "unknown member '{}' (expected left, right, top, bottom, width, height, center_x or center_y)",
                                other
                            ),
                        ))
                    }
                },
            };
            Ok(Linear::reference(reference))
        }
        Expr::Neg(inner) => Ok(lower(inner)?.scale(-1.0)),
        Expr::Binary { op, lhs, rhs } => {
            let (l, r) = (lower(lhs)?, lower(rhs)?);
            match op {
                BinaryOp::Add => Ok(l.plus(r, 1.0)),
                BinaryOp::Sub => Ok(l.plus(r, -1.0)),
                BinaryOp::Mul if l.is_constant() => Ok(r.scale(l.constant)),
                BinaryOp::Mul if r.is_constant() => Ok(l.scale(r.constant)),
                BinaryOp::Mul => Err(invalid(
                    expr.span.clone(),
                    "product of two variable terms is not linear",
                )),
            }
        }
    }
}

/// Options of one statement, checked against the keys it accepts
struct Options<'a> {
    statement: &'static str,
    list: &'a [Spanned<SceneOption>],
}

impl<'a> Options<'a> {
    fn new(
        statement: &'static str,
        list: &'a [Spanned<SceneOption>],
        allowed: &[&str],
    ) -> Result<Self, SceneError> {
        for (i, option) in list.iter().enumerate() {
            let key = option.node.key.node.as_str();
            if !allowed.contains(&key) {
                return Err(invalid(
                    option.node.key.span.clone(),
                    format!(
                        "unknown option '{}' for {} (expected one of: {})",
                        key,
                        statement,
                        allowed.join(", ")
                    ),
                ));
            }
            if list[..i]
                .iter()
                .any(|earlier| earlier.node.key.node.as_str() == key)
            {
                return Err(invalid(
                    option.span.clone(),
                    format!("option '{}' given twice", key),
                ));
            }
        }
        Ok(Self { statement, list })
    }

    fn find(&self, key: &str) -> Option<&'a Spanned<SceneOption>> {
        self.list.iter().find(|o| o.node.key.node.as_str() == key)
    }

    fn flag(&self, key: &str) -> Result<bool, SceneError> {
        match self.find(key) {
            None => Ok(false),
            Some(option) if option.node.value.is_none() => Ok(true),
            Some(option) => Err(invalid(
                option.span.clone(),
                format!("{} option '{}' takes no value", self.statement, key),
            )),
        }
    }

    fn number(&self, key: &str) -> Result<Option<f64>, SceneError> {
        let Some(option) = self.find(key) else {
            return Ok(None);
        };
        match &option.node.value {
            Some(Spanned {
                node: OptionValue::Number(n),
                ..
            }) => Ok(Some(*n)),
            _ => Err(invalid(
                option.span.clone(),
                format!("option '{}' expects a number", key),
            )),
        }
    }

    fn word(&self, key: &str) -> Result<Option<(&'a str, Span)>, SceneError> {
        let Some(option) = self.find(key) else {
            return Ok(None);
        };
        match &option.node.value {
            Some(Spanned {
                node: OptionValue::Word(word),
                span,
            }) => Ok(Some((word.as_str(), span.clone()))),
            _ => Err(invalid(
                option.span.clone(),
                format!("option '{}' expects a name", key),
            )),
        }
    }

    fn millis(&self, key: &str) -> Result<Option<Duration>, SceneError> {
        match self.number(key)? {
            None => Ok(None),
            Some(ms) if ms.is_finite() && ms >= 0.0 => {
                Ok(Some(Duration::from_micros((ms * 1000.0).round() as u64)))
            }
            Some(ms) => {
                let span = self.find(key).map(|o| o.span.clone()).unwrap_or_default();
                Err(invalid(
                    span,
                    format!("option '{}' must be a non-negative duration, got {}", key, ms),
                ))
            }
        }
    }
}

fn compile(statement: &Spanned<Statement>) -> Result<Step, SceneError> {
    let command = match &statement.node {
        Statement::Constrain {
            lhs,
            comparison,
            rhs,
            options,
        } => {
            let options = Options::new(
                "constrain",
                options,
                &["strength", "enter", "update", "exit", "key"],
            )?;
            let strength = match options.word("strength")? {
                None => None,
                Some((name, span)) => Some(Strength::from_name(name).ok_or_else(|| {
                    invalid(
                        span,
                        format!("unknown strength '{}' (expected strong, medium or weak)", name),
                    )
                })?),
            };
            Command::Constrain {
                lhs: lower(lhs)?,
                relation: relation(*comparison),
                rhs: lower(rhs)?,
                strength,
                transition: TransitionOverride {
                    enter: options.millis("enter")?,
                    update: options.millis("update")?,
                    exit: options.millis("exit")?,
                },
                key: options.word("key")?.map(|(key, _)| key.to_string()),
            }
        }
        Statement::Measure {
            dimension,
            width,
            height,
        } => Command::Measure {
            dimension: dimension.node.0.clone(),
            size: Size::new(width.node, height.node),
        },
        Statement::Average { inputs, target } => Command::Average {
            inputs: inputs.iter().map(lower).collect::<Result<_, _>>()?,
            target: lower(target)?,
        },
        Statement::Chain {
            name,
            direction,
            style,
            boundary,
            items,
        } => Command::Chain {
            name: name.node.0.clone(),
            direction: *direction,
            style: *style,
            boundary: boundary.node.0.clone(),
            items: names(items),
        },
        Statement::Boundary {
            boundary,
            members,
            options,
        } => {
            let options = Options::new(
                "boundary",
                options,
                &["left", "right", "top", "bottom", "tight"],
            )?;
            let sides = Sides {
                left: options.flag("left")?,
                right: options.flag("right")?,
                top: options.flag("top")?,
                bottom: options.flag("bottom")?,
            };
            Command::Boundary {
                boundary: boundary.node.0.clone(),
                members: names(members),
                sides: if sides.is_empty() { Sides::ALL } else { sides },
                tight: options.flag("tight")?,
            }
        }
        Statement::Sum {
            name,
            terms,
            comparison,
            target,
        } => Command::Sum {
            name: name.node.0.clone(),
            terms: terms
                .iter()
                .map(|(weight, value)| -> Result<(Linear, f64), SceneError> {
                    Ok((lower(value)?, weight.node))
                })
                .collect::<Result<_, _>>()?,
            relation: relation(*comparison),
            target: lower(target)?,
        },
        Statement::Place {
            inner,
            outer,
            measure_from,
            options,
        } => {
            let options = Options::new("place", options, &["horizontal", "vertical"])?;
            let horizontal = options.number("horizontal")?;
            let vertical = options.number("vertical")?;
            let placement = if horizontal.is_none() && vertical.is_none() {
                Placement::centered()
            } else {
                Placement {
                    measure_from: MeasureFrom::default(),
                    horizontal,
                    vertical,
                }
            };
            Command::Place {
                inner: inner.node.0.clone(),
                outer: outer.node.0.clone(),
                placement: placement.measured_from(*measure_from),
            }
        }
        Statement::Table {
            name,
            boundary,
            rows,
            cols,
        } => Command::Table {
            name: name.node.0.clone(),
            boundary: boundary.node.0.clone(),
            spec: TableSpec::new(*rows, *cols),
        },
    };
    Ok(Step {
        span: statement.span.clone(),
        command,
    })
}

fn resolve(p: &mut Pass<'_>, linear: &Linear) -> Result<Expression, LayoutError> {
    let mut expression = Expression::from_constant(linear.constant);
    for (reference, coefficient) in &linear.terms {
        let term: Expression = match reference {
            Reference::Scalar(name) => p.variable(name)?.into(),
            Reference::Edge(name, edge) => p.dimension(name)?.edge(*edge).into(),
            Reference::CenterX(name) => p.dimension(name)?.center_x(),
            Reference::CenterY(name) => p.dimension(name)?.center_y(),
        };
        expression = expression + term * *coefficient;
    }
    Ok(expression)
}

fn apply(p: &mut Pass<'_>, command: &Command) -> Result<(), LayoutError> {
    match command {
        Command::Constrain {
            lhs,
            relation,
            rhs,
            strength,
            transition,
            key,
        } => {
            let lhs = resolve(p, lhs)?;
            let rhs = resolve(p, rhs)?;
            let declaration = Declaration::new(lhs, *relation, rhs)
                .with_strength(strength.unwrap_or(p.config().default_strength))
                .with_transition(transition.over(p.config().default_transition));
            match key {
                Some(key) => p.declare_keyed(key, declaration)?,
                None => p.declare(declaration)?,
            };
            Ok(())
        }
        Command::Measure { dimension, size } => {
            let dim = p.dimension(dimension)?;
            p.measure(&dim, *size)
        }
        Command::Average { inputs, target } => {
            let inputs = inputs
                .iter()
                .map(|input| resolve(p, input))
                .collect::<Result<Vec<_>, _>>()?;
            let target = resolve(p, target)?;
            p.average(inputs, target)
        }
        Command::Chain {
            name,
            direction,
            style,
            boundary,
            items,
        } => {
            let boundary = p.dimension(boundary)?;
            let items = items
                .iter()
                .map(|item| p.dimension(item))
                .collect::<Result<Vec<_>, _>>()?;
            p.chain(name, *direction, *style, &boundary, &items)
        }
        Command::Boundary {
            boundary,
            members,
            sides,
            tight,
        } => {
            let scope = format!("boundary:{}", boundary);
            let boundary = p.dimension(boundary)?;
            let members = members
                .iter()
                .map(|member| p.dimension(member))
                .collect::<Result<Vec<_>, _>>()?;
            if *tight {
                p.tight_boundary(&scope, &boundary, &members, *sides)
            } else {
                p.boundary(&scope, &boundary, &members, *sides)
            }
        }
        Command::Sum {
            name,
            terms,
            relation,
            target,
        } => {
            let pairs = terms
                .iter()
                .map(|(value, weight)| -> Result<(Expression, f64), LayoutError> {
                    Ok((resolve(p, value)?, *weight))
                })
                .collect::<Result<Vec<_>, _>>()?;
            let target = resolve(p, target)?;
            p.weighted_sum(name, &pairs, *relation, target)?;
            Ok(())
        }
        Command::Place {
            inner,
            outer,
            placement,
        } => {
            let scope = format!("place:{}:{}", inner, outer);
            let inner = p.dimension(inner)?;
            let outer = p.dimension(outer)?;
            p.place_inside(&scope, &inner, &outer, *placement)
        }
        Command::Table {
            name,
            boundary,
            spec,
        } => {
            let boundary = p.dimension(boundary)?;
            p.table(name, &boundary, spec)?;
            Ok(())
        }
    }
}

/// Check every statement and lower the scene into its passes.
///
/// Top-level statements form the first pass; it is left out when empty and
/// `pass { }` blocks follow.
fn compile_scene(scene: &Scene) -> Result<Vec<Vec<Step>>, SceneError> {
    let mut passes = Vec::with_capacity(scene.passes.len() + 1);
    if !scene.statements.is_empty() || scene.passes.is_empty() {
        passes.push(
            scene
                .statements
                .iter()
                .map(compile)
                .collect::<Result<Vec<_>, _>>()?,
        );
    }
    for block in &scene.passes {
        passes.push(
            block
                .node
                .iter()
                .map(compile)
                .collect::<Result<Vec<_>, _>>()?,
        );
    }
    Ok(passes)
}

/// Evaluate every pass of `scene` in order
pub fn run_scene(scene: &Scene, config: &SceneConfig) -> Result<SceneReport, SceneError> {
    let passes = compile_scene(scene)?;

    let clock = ManualClock::new();
    let mut layout = Layout::with_config(config.layout.clone()).with_clock(clock.clone());
    let mut report = SceneReport::default();

    for (index, steps) in passes.iter().enumerate() {
        let mut failed_at = None;
        // declaration count after each step
        let mut step_ends = Vec::with_capacity(steps.len());
        let result = layout.pass(|p| {
            for step in steps {
                if let Err(e) = apply(p, &step.command) {
                    failed_at = Some(step.span.clone());
                    return Err(e);
                }
                step_ends.push(p.declaration_count());
            }
            Ok(())
        });
        if let Err(source) = result {
            let span = failed_at.or_else(|| {
                let ordinal = layout.rejected_declaration()?;
                let step = step_ends.iter().position(|end| ordinal < *end)?;
                Some(steps[step].span.clone())
            });
            return Err(SceneError::Layout {
                pass: index + 1,
                span,
                source,
            });
        }
        let summary = layout.last_pass().clone();
        debug!(
            pass = index + 1,
            added = summary.added,
            replaced = summary.replaced,
            removed = summary.removed,
            "scene pass declared"
        );

        let mut frames = Vec::new();
        let mut ticks = 0;
        while layout.needs_frame() && ticks < config.max_frames {
            let outcome = layout.tick();
            ticks += 1;
            if config.record_frames {
                frames.push(FrameReport {
                    at: clock.now(),
                    snapshot: layout.snapshot(),
                });
            }
            if outcome.animating {
                clock.advance(config.frame_interval);
            }
        }
        let settled = !layout.needs_frame();
        if !settled {
            warn!(pass = index + 1, ticks, "transitions did not settle");
        }
        let broken = layout.inconsistent_dimensions();
        if !broken.is_empty() {
            warn!(pass = index + 1, dimensions = ?broken, "inconsistent dimensions");
        }

        report.passes.push(PassReport {
            summary,
            frames,
            settled,
            at: clock.now(),
            layout: layout.snapshot(),
        });
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    fn compiled(source: &str) -> Result<Vec<Vec<Step>>, SceneError> {
        compile_scene(&parse(source).expect("Should parse"))
    }

    fn invalid_message(source: &str) -> String {
        match compiled(source) {
            Err(SceneError::Invalid { message, .. }) => message,
            other => panic!("Expected invalid scene, got {:?}", other),
        }
    }

    #[test]
    fn test_lower_collects_terms() {
        let passes = compiled("constrain 2 * (a.left + 5) - gap = 0").unwrap();
        match &passes[0][0].command {
            Command::Constrain { lhs, .. } => {
                assert_eq!(
                    lhs,
                    &Linear {
                        terms: vec![
                            (Reference::Edge("a".to_string(), Edge::Left), 2.0),
                            (Reference::Scalar("gap".to_string()), -1.0),
                        ],
                        constant: 10.0,
                    }
                );
            }
            other => panic!("Expected constrain, got {:?}", other),
        }
    }

    #[test]
    fn test_nonlinear_product_rejected() {
        assert!(invalid_message("constrain a.width * b.width = 10").contains("not linear"));
    }

    #[test]
    fn test_unknown_member_rejected() {
        assert!(invalid_message("constrain a.middle = 10").contains("unknown member 'middle'"));
    }

    #[test]
    fn test_unknown_option_rejected() {
        assert!(invalid_message("constrain x = 1 [speed: 3]").contains("unknown option 'speed'"));
        assert!(invalid_message("boundary b around [a] [left: 3]").contains("takes no value"));
        assert!(invalid_message("constrain x = 1 [strength: mighty]").contains("unknown strength"));
        assert!(invalid_message("constrain x = 1 [update: 1, update: 2]").contains("given twice"));
    }

    #[test]
    fn test_transition_override() {
        let passes = compiled("constrain x = 1 [update: 300]").unwrap();
        match &passes[0][0].command {
            Command::Constrain { transition, .. } => {
                let base = Transition::all(Duration::from_millis(50));
                assert_eq!(
                    transition.over(base),
                    Transition {
                        enter: Duration::from_millis(50),
                        update: Duration::from_millis(300),
                        exit: Duration::from_millis(50),
                    }
                );
            }
            other => panic!("Expected constrain, got {:?}", other),
        }
    }

    #[test]
    fn test_boundary_defaults_to_all_sides() {
        let passes = compiled("boundary frame around [a]").unwrap();
        assert!(matches!(
            &passes[0][0].command,
            Command::Boundary {
                sides: Sides::ALL,
                tight: false,
                ..
            }
        ));
    }

    #[test]
    fn test_place_without_axes_centers() {
        let passes = compiled("place a in b sides").unwrap();
        match &passes[0][0].command {
            Command::Place { placement, .. } => assert_eq!(*placement, Placement::centered()),
            other => panic!("Expected place, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_top_level_pass_skipped() {
        assert_eq!(compiled("pass { measure a 1 1 }").unwrap().len(), 1);
        assert_eq!(compiled("").unwrap().len(), 1);
        assert_eq!(compiled("measure a 1 1 pass { }").unwrap().len(), 2);
    }
}
