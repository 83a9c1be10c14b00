//! Set construction, merging, and removal semantics.

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
    age: f32,
}

fn particle(id: i32, lon: f32) -> Tracer {
    let mut p = Tracer::default();
    p.set_id(id);
    p.set_lon(lon);
    p
}

#[test]
fn constructs_from_explicit_layout() {
    let layout = SeedLayout::Explicit(vec![(1.0, 2.0, 0.0), (3.0, 4.0, 0.0)]);
    let pset: ParticleSet<Tracer> = ParticleSet::from_layout(&layout, 0.0, 60.0, 0);
    assert_eq!(pset.len(), 2);
    assert_eq!(pset[0].id(), 0);
    assert_eq!(pset[1].id(), 1);
    assert!((pset[1].lon() - 3.0).abs() < 1e-6);
}

#[test]
fn add_assign_grows_set_by_one() {
    let mut pset: ParticleSet<Tracer> = ParticleSet::new();
    pset += particle(0, 0.0);
    pset += particle(1, 1.0);
    assert_eq!(pset.len(), 2);
}

#[test]
fn merging_two_sets_concatenates_in_order() {
    let a: ParticleSet<Tracer> = vec![particle(0, 0.0), particle(1, 1.0)].into_iter().collect();
    let b: ParticleSet<Tracer> = vec![particle(2, 2.0)].into_iter().collect();
    let merged = a + b;
    assert_eq!(merged.len(), 3);
    assert_eq!(merged[2].id(), 2);
}

#[test]
fn remove_by_negative_index_drops_last_particle() {
    let mut pset: ParticleSet<Tracer> = vec![particle(0, 0.0), particle(1, 1.0), particle(2, 2.0)].into_iter().collect();
    let removed = pset.remove(-1);
    assert_eq!(removed.id(), 2);
    assert_eq!(pset.len(), 2);
}

#[test]
fn user_var_round_trips_through_get_set_attr() {
    let mut p = Tracer::default();
    assert!(p.set_attr("age", 3.5));
    assert_eq!(p.get_attr("age"), Some(3.5));
    assert_eq!(p.get_attr("nonexistent"), None);
}

#[test]
#[should_panic]
fn remove_out_of_bounds_panics() {
    let mut pset: ParticleSet<Tracer> = vec![particle(0, 0.0)].into_iter().collect();
    pset.remove(5);
}
