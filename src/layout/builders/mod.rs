//! Composite constraint builders
//!
//! Builders expand into ordinary declarations on a [`Pass`](super::Pass).
//! They keep no state of their own: they are re-run every pass and rely on
//! their scope name for stable sites and generated variables.

mod boundary;
mod chain;
mod place;
mod sum;
mod table;

pub use boundary::Sides;
pub use chain::{ChainStyle, Direction};
pub use place::{MeasureFrom, Placement};
pub use table::{Table, TableSpec};

use super::error::LayoutError;

fn require_finite(builder: &str, what: &str, value: f64) -> Result<(), LayoutError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(LayoutError::invalid_input(
            builder,
            format!("{} must be finite, got {}", what, value),
        ))
    }
}

fn require_nonempty<T>(builder: &str, what: &str, items: &[T]) -> Result<(), LayoutError> {
    if items.is_empty() {
        Err(LayoutError::invalid_input(builder, format!("{} is empty", what)))
    } else {
        Ok(())
    }
}
