//! Incremental constraint layout kernel
//!
//! Layouts are described again on every pass; only the difference to the
//! previous pass reaches the solver. Values are read back per frame, with
//! optional interpolation between solutions.

pub mod builders;
pub mod config;
pub mod declare;
pub mod driver;
pub mod error;
pub mod expr;
pub mod generator;
pub mod keyframe;
pub mod solver;
pub mod types;

pub use builders::{ChainStyle, Direction, MeasureFrom, Placement, Sides, Table, TableSpec};
pub use config::{ConfigError, LayoutConfig};
pub use declare::{Declaration, Relation, SiteOutcome, Strength, Transition};
pub use driver::{
    Clock, FrameScheduler, Layout, LayoutSnapshot, ManualClock, Pass, PassSummary, SystemClock,
    TickOutcome,
};
pub use error::LayoutError;
pub use expr::{Expression, Term, Variable};
pub use generator::{Access, Dimension, Edge};
pub use keyframe::Keyframes;
pub use solver::{ConstraintBackend, ConstraintId, KasuariBackend, PrimitiveConstraint, SolverError};
pub use types::{BoundingBox, Point, Size};
