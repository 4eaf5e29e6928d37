//! Tables: a grid of cells sized by row and column weights

use crate::layout::declare::{Declaration, Relation};
use crate::layout::driver::Pass;
use crate::layout::error::LayoutError;
use crate::layout::expr::Expression;
use crate::layout::generator::Dimension;

use super::{require_finite, ChainStyle, Direction};

/// Shape of a table; missing weights default to `1` per band
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableSpec {
    pub rows: usize,
    pub cols: usize,
    pub row_weights: Option<Vec<f64>>,
    pub col_weights: Option<Vec<f64>>,
}

impl TableSpec {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            row_weights: None,
            col_weights: None,
        }
    }

    pub fn with_row_weights(mut self, weights: Vec<f64>) -> Self {
        self.row_weights = Some(weights);
        self
    }

    pub fn with_col_weights(mut self, weights: Vec<f64>) -> Self {
        self.col_weights = Some(weights);
        self
    }
}

/// Dimensions generated for a table
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub rows: Vec<Dimension>,
    pub cols: Vec<Dimension>,
    /// Indexed `[row][col]`
    pub cells: Vec<Vec<Dimension>>,
}

impl Table {
    pub fn cell(&self, row: usize, col: usize) -> Option<&Dimension> {
        self.cells.get(row).and_then(|r| r.get(col))
    }
}

fn weights(what: &str, given: Option<&Vec<f64>>, count: usize) -> Result<Vec<f64>, LayoutError> {
    let Some(given) = given else {
        return Ok(vec![1.0; count]);
    };
    if given.len() != count {
        return Err(LayoutError::invalid_input(
            "table",
            format!("expected {} {} weights, got {}", count, what, given.len()),
        ));
    }
    for weight in given {
        require_finite("table", "weight", *weight)?;
        if *weight <= 0.0 {
            return Err(LayoutError::invalid_input(
                "table",
                format!("{} weights must be positive, got {}", what, weight),
            ));
        }
    }
    Ok(given.clone())
}

impl Pass<'_> {
    /// Split `boundary` into `rows x cols` cells.
    ///
    /// Rows are chained top to bottom and columns left to right without
    /// gaps; band sizes are proportional to their weights and every cell is
    /// pinned to the intersection of its row and column.
    pub fn table(
        &mut self,
        name: &str,
        boundary: &Dimension,
        spec: &TableSpec,
    ) -> Result<Table, LayoutError> {
        if spec.rows == 0 || spec.cols == 0 {
            return Err(LayoutError::invalid_input(
                "table",
                format!("needs at least one row and column, got {} x {}", spec.rows, spec.cols),
            ));
        }
        let row_weights = weights("row", spec.row_weights.as_ref(), spec.rows)?;
        let col_weights = weights("column", spec.col_weights.as_ref(), spec.cols)?;

        self.scope(name, |p| {
            let rows = (0..spec.rows)
                .map(|i| p.dimension(&format!("row{}", i)))
                .collect::<Result<Vec<_>, _>>()?;
            let cols = (0..spec.cols)
                .map(|j| p.dimension(&format!("col{}", j)))
                .collect::<Result<Vec<_>, _>>()?;

            p.chain("rows", Direction::Column, ChainStyle::Gapless, boundary, &rows)?;
            p.chain("cols", Direction::Row, ChainStyle::Gapless, boundary, &cols)?;

            let heights: Vec<(Expression, f64)> = rows
                .iter()
                .zip(&row_weights)
                .map(|(row, w)| (row.height.into(), *w))
                .collect();
            p.weighted_sum("heights", &heights, Relation::Equal, boundary.height)?;
            let widths: Vec<(Expression, f64)> = cols
                .iter()
                .zip(&col_weights)
                .map(|(col, w)| (col.width.into(), *w))
                .collect();
            p.weighted_sum("widths", &widths, Relation::Equal, boundary.width)?;

            // Bands span the whole table across their axis
            for row in &rows {
                p.declare(Declaration::equal(row.left, boundary.left))?;
                p.declare(Declaration::equal(row.right, boundary.right))?;
            }
            for col in &cols {
                p.declare(Declaration::equal(col.top, boundary.top))?;
                p.declare(Declaration::equal(col.bottom, boundary.bottom))?;
            }

            let mut cells = Vec::with_capacity(spec.rows);
            for (i, row) in rows.iter().enumerate() {
                let mut line = Vec::with_capacity(spec.cols);
                for (j, col) in cols.iter().enumerate() {
                    let cell = p.dimension(&format!("cell{}-{}", i, j))?;
                    p.declare(Declaration::equal(cell.left, col.left))?;
                    p.declare(Declaration::equal(cell.right, col.right))?;
                    p.declare(Declaration::equal(cell.top, row.top))?;
                    p.declare(Declaration::equal(cell.bottom, row.bottom))?;
                    line.push(cell);
                }
                cells.push(line);
            }

            Ok(Table { rows, cols, cells })
        })
    }
}
