//! Chains: dimensions laid out one after another inside a boundary

use crate::layout::declare::Declaration;
use crate::layout::driver::Pass;
use crate::layout::error::LayoutError;
use crate::layout::expr::{Expression, Variable};
use crate::layout::generator::{Dimension, Edge};

use super::require_nonempty;

/// Axis and order of a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Left to right
    Row,
    /// Right to left
    RowReverse,
    /// Top to bottom
    Column,
    /// Bottom to top
    ColumnReverse,
}

impl Direction {
    pub fn from_name(name: &str) -> Option<Direction> {
        match name {
            "row" => Some(Direction::Row),
            "row_reverse" => Some(Direction::RowReverse),
            "column" => Some(Direction::Column),
            "column_reverse" => Some(Direction::ColumnReverse),
            _ => None,
        }
    }

    fn edges(&self) -> (Edge, Edge) {
        match self {
            Direction::Row | Direction::RowReverse => (Edge::Left, Edge::Right),
            Direction::Column | Direction::ColumnReverse => (Edge::Top, Edge::Bottom),
        }
    }

    fn is_reverse(&self) -> bool {
        matches!(self, Direction::RowReverse | Direction::ColumnReverse)
    }
}

/// Where the shared gap goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainStyle {
    /// Between items and at both ends
    Spread,
    /// Between items only
    SpreadInside,
    /// At both ends only
    Packed,
    /// Nowhere
    Gapless,
}

impl ChainStyle {
    pub fn from_name(name: &str) -> Option<ChainStyle> {
        match name {
            "spread" => Some(ChainStyle::Spread),
            "spread_inside" => Some(ChainStyle::SpreadInside),
            "packed" => Some(ChainStyle::Packed),
            "gapless" => Some(ChainStyle::Gapless),
            _ => None,
        }
    }

    fn gap_at_ends(&self) -> bool {
        matches!(self, ChainStyle::Spread | ChainStyle::Packed)
    }

    fn gap_between(&self) -> bool {
        matches!(self, ChainStyle::Spread | ChainStyle::SpreadInside)
    }
}

fn offset(gap: Option<Variable>, apply: bool) -> Expression {
    match gap {
        Some(gap) if apply => gap.into(),
        _ => Expression::default(),
    }
}

impl Pass<'_> {
    /// Lay out `items` along `direction` inside `boundary`.
    ///
    /// Declares exactly `items.len() + 1` equalities: the leading edge, one
    /// per adjacent pair and the trailing edge. All non-gapless styles share
    /// one gap variable generated as `gap` under `name`.
    pub fn chain(
        &mut self,
        name: &str,
        direction: Direction,
        style: ChainStyle,
        boundary: &Dimension,
        items: &[Dimension],
    ) -> Result<(), LayoutError> {
        require_nonempty("chain", "item list", items)?;
        let (start, end) = direction.edges();
        let ordered: Vec<&Dimension> = if direction.is_reverse() {
            items.iter().rev().collect()
        } else {
            items.iter().collect()
        };

        self.scope(name, |p| {
            let gap = match style {
                ChainStyle::Gapless => None,
                _ => Some(p.variable("gap")?),
            };
            let ends = offset(gap, style.gap_at_ends());
            let between = offset(gap, style.gap_between());

            let first = ordered[0];
            p.declare(Declaration::equal(
                first.edge(start),
                boundary.edge(start) + ends.clone(),
            ))?;
            for pair in ordered.windows(2) {
                p.declare(Declaration::equal(
                    pair[1].edge(start),
                    pair[0].edge(end) + between.clone(),
                ))?;
            }
            let last = ordered[ordered.len() - 1];
            p.declare(Declaration::equal(
                boundary.edge(end),
                last.edge(end) + ends,
            ))?;
            Ok(())
        })
    }
}
