//! Placing one dimension inside another

use crate::layout::declare::Declaration;
use crate::layout::driver::Pass;
use crate::layout::error::LayoutError;
use crate::layout::generator::{Dimension, Edge};

use super::require_finite;

/// Reference points used to place the inner dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeasureFrom {
    /// Split the free space around the inner dimension: ratio `0` is flush
    /// with the start edge, `1` with the end edge
    #[default]
    Sides,
    /// Put the inner centre at `ratio` along the outer span
    Center,
}

impl MeasureFrom {
    pub fn from_name(name: &str) -> Option<MeasureFrom> {
        match name {
            "sides" => Some(MeasureFrom::Sides),
            "center" => Some(MeasureFrom::Center),
            _ => None,
        }
    }
}

/// Per-axis placement ratios; `None` leaves that axis free
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Placement {
    pub measure_from: MeasureFrom,
    pub horizontal: Option<f64>,
    pub vertical: Option<f64>,
}

impl Placement {
    /// Centre on both axes
    pub fn centered() -> Self {
        Self {
            measure_from: MeasureFrom::Sides,
            horizontal: Some(0.5),
            vertical: Some(0.5),
        }
    }

    pub fn horizontal(mut self, ratio: f64) -> Self {
        self.horizontal = Some(ratio);
        self
    }

    pub fn vertical(mut self, ratio: f64) -> Self {
        self.vertical = Some(ratio);
        self
    }

    pub fn measured_from(mut self, measure_from: MeasureFrom) -> Self {
        self.measure_from = measure_from;
        self
    }
}

fn placement(
    measure_from: MeasureFrom,
    ratio: f64,
    inner: &Dimension,
    outer: &Dimension,
    start: Edge,
    end: Edge,
) -> Declaration {
    let (inner_start, inner_end) = (inner.edge(start), inner.edge(end));
    let (outer_start, outer_end) = (outer.edge(start), outer.edge(end));
    match measure_from {
        MeasureFrom::Sides => Declaration::equal(
            (1.0 - ratio) * inner_start - (1.0 - ratio) * outer_start,
            ratio * outer_end - ratio * inner_end,
        ),
        MeasureFrom::Center => Declaration::equal(
            0.5 * inner_start + 0.5 * inner_end,
            (1.0 - ratio) * outer_start + ratio * outer_end,
        ),
    }
}

impl Pass<'_> {
    /// Position `inner` within `outer` on the axes `placement` names
    pub fn place_inside(
        &mut self,
        name: &str,
        inner: &Dimension,
        outer: &Dimension,
        placement_spec: Placement,
    ) -> Result<(), LayoutError> {
        if placement_spec.horizontal.is_none() && placement_spec.vertical.is_none() {
            return Err(LayoutError::invalid_input("place inside", "no axis requested"));
        }
        if let Some(ratio) = placement_spec.horizontal {
            require_finite("place inside", "horizontal ratio", ratio)?;
        }
        if let Some(ratio) = placement_spec.vertical {
            require_finite("place inside", "vertical ratio", ratio)?;
        }

        let from = placement_spec.measure_from;
        self.scope(name, |p| {
            if let Some(ratio) = placement_spec.horizontal {
                let declaration = placement(from, ratio, inner, outer, Edge::Left, Edge::Right);
                p.declare_keyed("horizontal", declaration)?;
            }
            if let Some(ratio) = placement_spec.vertical {
                let declaration = placement(from, ratio, inner, outer, Edge::Top, Edge::Bottom);
                p.declare_keyed("vertical", declaration)?;
            }
            Ok(())
        })
    }
}
