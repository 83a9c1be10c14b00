//! Kernel concatenation via `+`: associative, not commutative.

use ptrack::prelude::*;

#[derive(Clone, Copy, Debug, Default, ParticleType, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
struct Tracer {
    time: f64,
    dt: f64,
    lon: f32,
    lat: f32,
    dep: f32,
    id: i32,
    state: i32,
    _pad: i32,
}

fn increment() -> Kernel<Tracer> {
    Kernel::new("Increment", body(|b| b.set_attr("lon", Expr::attr("lon") + Expr::float(1.0))))
}

fn scale() -> Kernel<Tracer> {
    Kernel::new("Scale", body(|b| b.set_attr("lon", Expr::attr("lon") * Expr::float(3.0))))
}

fn square() -> Kernel<Tracer> {
    Kernel::new("Square", body(|b| b.set_attr("lon", Expr::attr("lon") * Expr::attr("lon"))))
}

fn run(kernel: &Kernel<Tracer>) -> f32 {
    let grid = Grid::new();
    let mut p = Tracer::default();
    kernel.step_interpreted(&mut p, &grid).unwrap();
    p.lon()
}

#[test]
fn concatenation_runs_left_to_right() {
    // (0 + 1) * 3 == 3
    assert_eq!(run(&(increment() + scale())), 3.0);
    // (0 * 3) + 1 == 1
    assert_eq!(run(&(scale() + increment())), 1.0);
}

#[test]
fn concatenation_is_associative() {
    let left = (increment() + scale()) + square();
    let right = increment() + (scale() + square());
    assert_eq!(run(&left), run(&right));
}

#[test]
fn composed_kernel_name_records_the_pipeline() {
    let k = increment() + scale();
    assert_eq!(k.name, "Increment_Scale");
}

#[test]
fn cache_key_changes_when_kernel_body_changes() {
    let grid = Grid::new();
    let a = increment().cache_key(&grid);
    let b = scale().cache_key(&grid);
    assert_ne!(a, b);
}
