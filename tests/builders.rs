//! Integration tests for the composite builders, checked against solved
//! positions.

use constraint_layout::layout::{
    BoundingBox, ChainStyle, Declaration, Dimension, Direction, Layout, LayoutError, MeasureFrom,
    Pass, Placement, Relation, Sides, Size, Strength, TableSpec,
};
use pretty_assertions::assert_eq;

const TOLERANCE: f64 = 1e-6;

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() <= TOLERANCE,
        "expected {}, got {}",
        expected,
        actual
    );
}

fn assert_bounds(actual: BoundingBox, expected: BoundingBox) {
    assert!(
        (actual.x - expected.x).abs() <= TOLERANCE
            && (actual.y - expected.y).abs() <= TOLERANCE
            && (actual.width - expected.width).abs() <= TOLERANCE
            && (actual.height - expected.height).abs() <= TOLERANCE,
        "expected {}, got {}",
        expected,
        actual
    );
}

/// Pin `dim` to the given box
fn pin(p: &mut Pass<'_>, dim: &Dimension, bounds: BoundingBox) -> Result<(), LayoutError> {
    p.equal(dim.left, bounds.x)?;
    p.equal(dim.top, bounds.y)?;
    p.measure(dim, bounds.size())
}

fn sized(p: &mut Pass<'_>, names: &[&str], size: Size) -> Result<Vec<Dimension>, LayoutError> {
    names
        .iter()
        .map(|name| -> Result<Dimension, LayoutError> {
            let dim = p.dimension(name)?;
            p.measure(&dim, size)?;
            Ok(dim)
        })
        .collect()
}

/// Chain `names`, each 100 wide, inside a 400 wide boundary
fn run_chain(
    names: &[&str],
    direction: Direction,
    style: ChainStyle,
) -> Result<(Layout, Vec<Dimension>), LayoutError> {
    let mut layout = Layout::new();
    let items = layout.pass(|p| {
        let root = p.dimension("root")?;
        pin(p, &root, BoundingBox::new(0.0, 0.0, 400.0, 400.0))?;
        let items = sized(p, names, Size::new(100.0, 100.0))?;
        p.chain("bar", direction, style, &root, &items)?;
        Ok(items)
    })?;
    layout.tick();
    Ok((layout, items))
}

fn lefts(layout: &Layout, items: &[Dimension]) -> Vec<f64> {
    items.iter().map(|d| layout.value(d.left)).collect()
}

fn assert_all_close(actual: Vec<f64>, expected: &[f64]) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.into_iter().zip(expected) {
        assert_close(a, *e);
    }
}

#[test]
fn test_chain_spread() {
    let (layout, items) = run_chain(&["a", "b", "c"], Direction::Row, ChainStyle::Spread).unwrap();
    assert_all_close(lefts(&layout, &items), &[25.0, 150.0, 275.0]);
    let gap = layout.find_variable("bar/gap").unwrap();
    assert_close(layout.value(gap), 25.0);
}

#[test]
fn test_chain_spread_inside() {
    let (layout, items) =
        run_chain(&["a", "b", "c"], Direction::Row, ChainStyle::SpreadInside).unwrap();
    assert_all_close(lefts(&layout, &items), &[0.0, 150.0, 300.0]);
}

#[test]
fn test_chain_packed() {
    let (layout, items) = run_chain(&["a", "b", "c"], Direction::Row, ChainStyle::Packed).unwrap();
    assert_all_close(lefts(&layout, &items), &[50.0, 150.0, 250.0]);
    let gap = layout.find_variable("bar/gap").unwrap();
    assert_close(layout.value(gap), 50.0);
}

#[test]
fn test_chain_gapless() {
    let (layout, items) =
        run_chain(&["a", "b", "c", "d"], Direction::Row, ChainStyle::Gapless).unwrap();
    assert_all_close(lefts(&layout, &items), &[0.0, 100.0, 200.0, 300.0]);
    assert_close(layout.value(items[3].right), 400.0);
    assert_eq!(layout.find_variable("bar/gap"), None);
}

#[test]
fn test_chain_gapless_overfull_is_unsatisfiable() {
    let result = run_chain(&["a", "b", "c"], Direction::Row, ChainStyle::Gapless);
    assert!(matches!(result, Err(LayoutError::Unsatisfiable { .. })));
}

#[test]
fn test_chain_row_reverse() {
    let (layout, items) =
        run_chain(&["a", "b", "c"], Direction::RowReverse, ChainStyle::Spread).unwrap();
    assert_all_close(lefts(&layout, &items), &[275.0, 150.0, 25.0]);
}

#[test]
fn test_chain_column() {
    let (layout, items) =
        run_chain(&["a", "b", "c"], Direction::Column, ChainStyle::SpreadInside).unwrap();
    let tops: Vec<f64> = items.iter().map(|d| layout.value(d.top)).collect();
    assert_all_close(tops, &[0.0, 150.0, 300.0]);
}

#[test]
fn test_chain_declares_one_constraint_per_link() {
    let (layout, _) = run_chain(&["a", "b", "c"], Direction::Row, ChainStyle::Spread).unwrap();
    // root: 2 pins + 2 sizes + 2 consistency; items: 4 each; chain: 4
    assert_eq!(layout.constraint_count(), 6 + 3 * 4 + 4);
}

#[test]
fn test_tight_boundary_with_negative_coordinates() {
    let mut layout = Layout::new();
    let frame = layout
        .pass(|p| {
            let a = p.dimension("a")?;
            let b = p.dimension("b")?;
            pin(p, &a, BoundingBox::new(-50.0, -20.0, 30.0, 10.0))?;
            pin(p, &b, BoundingBox::new(100.0, 40.0, 20.0, 20.0))?;
            let frame = p.dimension("frame")?;
            p.tight_boundary("frame", &frame, &[a, b], Sides::ALL)?;
            Ok(frame)
        })
        .unwrap();
    layout.tick();
    assert_bounds(
        layout.bounds(&frame),
        BoundingBox::from_edges(-50.0, -20.0, 120.0, 60.0),
    );
}

#[test]
fn test_boundary_envelopes_members_with_negative_coordinates() {
    let mut layout = Layout::new();
    let frame = layout
        .pass(|p| {
            let a = p.dimension("a")?;
            let b = p.dimension("b")?;
            pin(p, &a, BoundingBox::new(-50.0, -20.0, 30.0, 10.0))?;
            pin(p, &b, BoundingBox::new(-5.0, -80.0, 20.0, 20.0))?;
            let frame = p.dimension("frame")?;
            p.boundary("frame", &frame, &[a, b], Sides::ALL)?;
            Ok(frame)
        })
        .unwrap();
    layout.tick();
    let bounds = layout.bounds(&frame);
    assert!(bounds.x <= -50.0 + TOLERANCE, "left {}", bounds.x);
    assert!(bounds.y <= -80.0 + TOLERANCE, "top {}", bounds.y);
    assert!(bounds.right() >= 15.0 - TOLERANCE, "right {}", bounds.right());
    assert!(bounds.bottom() >= -10.0 - TOLERANCE, "bottom {}", bounds.bottom());
}

#[test]
fn test_boundary_rejects_escaping_member() {
    let mut layout = Layout::new();
    let result = layout.pass(|p| {
        let frame = p.dimension("frame")?;
        pin(p, &frame, BoundingBox::new(0.0, 0.0, 100.0, 100.0))?;
        let a = p.dimension("a")?;
        pin(p, &a, BoundingBox::new(-10.0, 10.0, 20.0, 20.0))?;
        p.boundary("frame", &frame, &[a], Sides::HORIZONTAL)
    });
    assert!(matches!(result, Err(LayoutError::Unsatisfiable { .. })));
    assert_eq!(layout.constraint_count(), 0);
}

#[test]
fn test_boundary_points() {
    let mut layout = Layout::new();
    let frame = layout
        .pass(|p| {
            let x = p.variable("x")?;
            let y = p.variable("y")?;
            p.equal(x, -5.0)?;
            p.equal(y, 7.0)?;
            let frame = p.dimension("frame")?;
            p.boundary_points("frame", &frame, &[x.into()], &[y.into()])?;
            // pull the frame onto the point
            p.declare(Declaration::equal(frame.width, 0.0).with_strength(Strength::Weak))?;
            p.declare(Declaration::equal(frame.height, 0.0).with_strength(Strength::Weak))?;
            Ok(frame)
        })
        .unwrap();
    layout.tick();
    let bounds = layout.bounds(&frame);
    assert!(bounds.x <= -5.0 + TOLERANCE && bounds.right() >= -5.0 - TOLERANCE);
    assert!(bounds.y <= 7.0 + TOLERANCE && bounds.bottom() >= 7.0 - TOLERANCE);
}

fn run_place(measure_from: MeasureFrom, placement: Placement) -> BoundingBox {
    let mut layout = Layout::new();
    let inner = layout
        .pass(|p| {
            let outer = p.dimension("outer")?;
            pin(p, &outer, BoundingBox::new(0.0, 0.0, 400.0, 200.0))?;
            let inner = p.dimension("inner")?;
            p.measure(&inner, Size::new(100.0, 50.0))?;
            p.place_inside("place", &inner, &outer, placement.measured_from(measure_from))?;
            Ok(inner)
        })
        .unwrap();
    layout.tick();
    layout.bounds(&inner)
}

#[test]
fn test_place_inside_sides() {
    let placed = run_place(
        MeasureFrom::Sides,
        Placement::default().horizontal(0.25).vertical(0.5),
    );
    assert_bounds(placed, BoundingBox::new(75.0, 75.0, 100.0, 50.0));
}

#[test]
fn test_place_inside_center() {
    let placed = run_place(
        MeasureFrom::Center,
        Placement::default().horizontal(0.25).vertical(1.0),
    );
    assert_bounds(placed, BoundingBox::new(50.0, 175.0, 100.0, 50.0));
}

#[test]
fn test_place_inside_centered() {
    let placed = run_place(MeasureFrom::Sides, Placement::centered());
    assert_bounds(placed, BoundingBox::new(150.0, 75.0, 100.0, 50.0));
}

#[test]
fn test_average_bounds_target() {
    let mut layout = Layout::new();
    let line = layout
        .pass(|p| {
            let a = p.variable("a")?;
            let b = p.variable("b")?;
            let line = p.variable("line")?;
            p.equal(a, 10.0)?;
            p.equal(b, 30.0)?;
            p.average([a, b], line)?;
            p.declare(Declaration::equal(line, 100.0).with_strength(Strength::Weak))?;
            Ok(line)
        })
        .unwrap();
    layout.tick();
    assert_close(layout.value(line), 20.0);
}

#[test]
fn test_weighted_sum_proportions() {
    let mut layout = Layout::new();
    let (x, y, unit) = layout
        .pass(|p| {
            let x = p.variable("x")?;
            let y = p.variable("y")?;
            let unit = p.weighted_sum(
                "split",
                &[(x.into(), 1.0), (y.into(), 3.0)],
                Relation::Equal,
                80.0,
            )?;
            Ok((x, y, unit))
        })
        .unwrap();
    layout.tick();
    assert_eq!(layout.name_of(unit), Some("split/unit"));
    assert_close(layout.value(unit), 20.0);
    assert_close(layout.value(x), 20.0);
    assert_close(layout.value(y), 60.0);
}

#[test]
fn test_table_with_column_weights() {
    let mut layout = Layout::new();
    let table = layout
        .pass(|p| {
            let root = p.dimension("root")?;
            pin(p, &root, BoundingBox::new(0.0, 0.0, 300.0, 200.0))?;
            let spec = TableSpec::new(2, 3).with_col_weights(vec![1.0, 2.0, 3.0]);
            p.table("grid", &root, &spec)
        })
        .unwrap();
    layout.tick();

    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.cols.len(), 3);
    assert_bounds(
        layout.bounds(table.cell(0, 0).unwrap()),
        BoundingBox::new(0.0, 0.0, 50.0, 100.0),
    );
    assert_bounds(
        layout.bounds(table.cell(1, 2).unwrap()),
        BoundingBox::new(150.0, 100.0, 150.0, 100.0),
    );
    assert!(table.cell(2, 0).is_none());
    assert!(layout.find_dimension("grid/cell1-2").is_some());
    assert!(layout.inconsistent_dimensions().is_empty());
}

#[test]
fn test_malformed_builder_input() {
    let mut layout = Layout::new();
    let cases: Vec<Box<dyn Fn(&mut Pass<'_>) -> Result<(), LayoutError>>> = vec![
        Box::new(|p: &mut Pass<'_>| -> Result<(), LayoutError> {
            let root = p.dimension("root")?;
            p.chain("bar", Direction::Row, ChainStyle::Spread, &root, &[])
        }),
        Box::new(|p: &mut Pass<'_>| -> Result<(), LayoutError> {
            let root = p.dimension("root")?;
            let a = p.dimension("a")?;
            p.boundary("frame", &root, &[a], Sides::NONE)
        }),
        Box::new(|p: &mut Pass<'_>| -> Result<(), LayoutError> {
            let x = p.variable("x")?;
            p.weighted_sum("split", &[(x.into(), f64::NAN)], Relation::Equal, 1.0)?;
            Ok(())
        }),
        Box::new(|p: &mut Pass<'_>| -> Result<(), LayoutError> {
            let x = p.variable("x")?;
            p.average(Vec::<constraint_layout::layout::Variable>::new(), x)
        }),
        Box::new(|p: &mut Pass<'_>| -> Result<(), LayoutError> {
            let a = p.dimension("a")?;
            let b = p.dimension("b")?;
            p.place_inside("place", &a, &b, Placement::default())
        }),
        Box::new(|p: &mut Pass<'_>| -> Result<(), LayoutError> {
            let root = p.dimension("root")?;
            p.table("grid", &root, &TableSpec::new(0, 2))?;
            Ok(())
        }),
        Box::new(|p: &mut Pass<'_>| -> Result<(), LayoutError> {
            let root = p.dimension("root")?;
            p.measure(&root, Size::new(-1.0, 10.0))
        }),
    ];
    for (i, case) in cases.iter().enumerate() {
        let result = layout.pass(|p| case(p));
        assert!(
            matches!(result, Err(LayoutError::InvalidBuilderInput { .. })),
            "case {}: {:?}",
            i,
            result
        );
        assert_eq!(layout.constraint_count(), 0, "case {}", i);
        assert_eq!(layout.variable_count(), 0, "case {}", i);
    }
}
