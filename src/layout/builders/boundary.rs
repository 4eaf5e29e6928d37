//! Boundaries: a dimension that envelopes its members

use crate::layout::declare::{Declaration, Strength};
use crate::layout::driver::Pass;
use crate::layout::error::LayoutError;
use crate::layout::expr::Expression;
use crate::layout::generator::{Dimension, Edge};

use super::require_nonempty;

/// Which sides of a boundary to constrain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sides {
    pub left: bool,
    pub right: bool,
    pub top: bool,
    pub bottom: bool,
}

impl Sides {
    pub const ALL: Sides = Sides {
        left: true,
        right: true,
        top: true,
        bottom: true,
    };

    pub const NONE: Sides = Sides {
        left: false,
        right: false,
        top: false,
        bottom: false,
    };

    pub const HORIZONTAL: Sides = Sides {
        left: true,
        right: true,
        top: false,
        bottom: false,
    };

    pub const VERTICAL: Sides = Sides {
        left: false,
        right: false,
        top: true,
        bottom: true,
    };

    pub fn is_empty(&self) -> bool {
        !(self.left || self.right || self.top || self.bottom)
    }

    fn edges(&self) -> impl Iterator<Item = Edge> {
        [
            (self.left, Edge::Left),
            (self.right, Edge::Right),
            (self.top, Edge::Top),
            (self.bottom, Edge::Bottom),
        ]
        .into_iter()
        .filter_map(|(on, edge)| on.then_some(edge))
    }
}

impl Default for Sides {
    fn default() -> Self {
        Sides::ALL
    }
}

/// `boundary.edge (<= or >=) member` depending on which side it is
fn envelope(edge: Edge, outer: Expression, member: Expression) -> Declaration {
    match edge {
        Edge::Left | Edge::Top => Declaration::less_or_equal(outer, member),
        _ => Declaration::greater_or_equal(outer, member),
    }
}

impl Pass<'_> {
    /// Keep every member inside `boundary` on the requested sides
    pub fn boundary(
        &mut self,
        name: &str,
        boundary: &Dimension,
        members: &[Dimension],
        sides: Sides,
    ) -> Result<(), LayoutError> {
        self.boundary_impl(name, boundary, members, sides, false)
    }

    /// Like [`Pass::boundary`], and additionally pull each requested side
    /// onto the outermost member.
    pub fn tight_boundary(
        &mut self,
        name: &str,
        boundary: &Dimension,
        members: &[Dimension],
        sides: Sides,
    ) -> Result<(), LayoutError> {
        self.boundary_impl(name, boundary, members, sides, true)
    }

    fn boundary_impl(
        &mut self,
        name: &str,
        boundary: &Dimension,
        members: &[Dimension],
        sides: Sides,
        tight: bool,
    ) -> Result<(), LayoutError> {
        require_nonempty("boundary", "member list", members)?;
        if sides.is_empty() {
            return Err(LayoutError::invalid_input("boundary", "no side requested"));
        }

        self.scope(name, |p| {
            for edge in sides.edges() {
                for member in members {
                    let outer = boundary.edge(edge);
                    let inner = member.edge(edge);
                    p.declare(envelope(edge, outer.into(), inner.into()))?;
                    if tight {
                        p.declare(Declaration::equal(outer, inner).with_strength(Strength::Weak))?;
                    }
                }
            }
            Ok(())
        })
    }

    /// Envelope bare coordinates: `xs` bound left and right, `ys` bound top
    /// and bottom.
    pub fn boundary_points(
        &mut self,
        name: &str,
        boundary: &Dimension,
        xs: &[Expression],
        ys: &[Expression],
    ) -> Result<(), LayoutError> {
        if xs.is_empty() && ys.is_empty() {
            return Err(LayoutError::invalid_input("boundary", "no points given"));
        }

        self.scope(name, |p| {
            for x in xs {
                p.declare(envelope(Edge::Left, boundary.left.into(), x.clone()))?;
                p.declare(envelope(Edge::Right, boundary.right.into(), x.clone()))?;
            }
            for y in ys {
                p.declare(envelope(Edge::Top, boundary.top.into(), y.clone()))?;
                p.declare(envelope(Edge::Bottom, boundary.bottom.into(), y.clone()))?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::declare::Relation;

    #[test]
    fn test_sides_edges() {
        let edges: Vec<Edge> = Sides::HORIZONTAL.edges().collect();
        assert_eq!(edges, vec![Edge::Left, Edge::Right]);
        assert!(Sides::NONE.is_empty());
        assert_eq!(Sides::default(), Sides::ALL);
    }

    #[test]
    fn test_envelope_direction() {
        let d = |e: Edge| envelope(e, Expression::from_constant(0.0), Expression::from_constant(1.0));
        assert_eq!(d(Edge::Left).relation, Relation::LessOrEqual);
        assert_eq!(d(Edge::Top).relation, Relation::LessOrEqual);
        assert_eq!(d(Edge::Right).relation, Relation::GreaterOrEqual);
        assert_eq!(d(Edge::Bottom).relation, Relation::GreaterOrEqual);
    }
}
