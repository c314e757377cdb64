//! Integration tests: edge endpoints always sit on node borders.
//!
//! Sweeps target positions all the way around a source node and checks both
//! endpoints of every edge against the respective rectangle's perimeter.

use pv_core::geometry::{NodeGeometry, Point, boundary_point, edge_endpoints};

const EPS: f32 = 1e-2;

fn on_perimeter(rect: &NodeGeometry, p: Point) -> bool {
    let hw = rect.width / 2.0;
    let hh = rect.height / 2.0;
    let dx = (p.x - rect.x).abs();
    let dy = (p.y - rect.y).abs();
    let on_vertical = (dx - hw).abs() < EPS && dy <= hh + EPS;
    let on_horizontal = (dy - hh).abs() < EPS && dx <= hw + EPS;
    on_vertical || on_horizontal
}

#[test]
fn endpoints_lie_on_both_borders_for_all_directions() {
    let sizes = [(40.0, 20.0), (160.0, 96.0), (10.0, 80.0)];
    for &(sw, sh) in &sizes {
        for &(tw, th) in &sizes {
            let source = NodeGeometry::new(0.0, 0.0, sw, sh);
            for step in 0..72 {
                let theta = (step as f32) * std::f32::consts::TAU / 72.0;
                let target = NodeGeometry::new(400.0 * theta.cos(), 300.0 * theta.sin(), tw, th);
                let (a, b) = edge_endpoints(&source, &target);
                assert!(
                    on_perimeter(&source, a),
                    "source {sw}x{sh} step {step}: {a:?} not on border"
                );
                assert!(
                    on_perimeter(&target, b),
                    "target {tw}x{th} step {step}: {b:?} not on border"
                );
            }
        }
    }
}

#[test]
fn endpoint_lies_between_the_two_centers() {
    let source = NodeGeometry::new(100.0, 100.0, 160.0, 96.0);
    let target = NodeGeometry::new(420.0, 380.0, 160.0, 96.0);
    let p = boundary_point(&source, &target);
    assert!(p.x > source.x && p.x < target.x);
    assert!(p.y > source.y && p.y < target.y);
}

#[test]
fn aspect_ratio_does_not_matter_for_facing_nodes() {
    let wide = NodeGeometry::new(0.0, 0.0, 200.0, 20.0);
    let tall = NodeGeometry::new(300.0, 0.0, 20.0, 200.0);
    let (a, b) = edge_endpoints(&wide, &tall);
    assert!((a.x - 100.0).abs() < EPS && a.y.abs() < EPS);
    assert!((b.x - 290.0).abs() < EPS && b.y.abs() < EPS);
}
