//! The recovery state machine end to end, against the interpreted path.

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

fn uniform_flow_grid(u: f32, v: f32) -> Grid {
    let mut grid = Grid::new();
    let lon = Axis::shared(vec![-180.0, 180.0], "lon").unwrap();
    let lat = Axis::shared(vec![-90.0, 90.0], "lat").unwrap();
    let time = Axis::shared(vec![0.0, 1_000_000.0], "time").unwrap();
    grid.from_data("U", Unit::Degrees, lon.clone(), lat.clone(), time.clone(), vec![u; 8]).unwrap();
    grid.from_data("V", Unit::Degrees, lon, lat, time, vec![v; 8]).unwrap();
    grid
}

#[test]
fn euler_advection_reaches_end_time() {
    let grid = uniform_flow_grid(1.0, 0.5);
    let mut pset: ParticleSet<Tracer> =
        ParticleSet::from_layout(&SeedLayout::Explicit(vec![(0.0, 0.0, 0.0)]), 0.0, 10.0, 0);

    let kernel = methods::advection_ee::<Tracer>(Unit::Degrees);
    pset.execute(&kernel, &grid, 100.0, &RecoveryMap::new(), &EngineConfig::default()).unwrap();

    assert_eq!(pset[0].time(), 100.0);
    assert!((pset[0].lon() - 100.0).abs() < 1e-6);
    assert!((pset[0].lat() - 50.0).abs() < 1e-6);
}

#[test]
fn particle_leaving_domain_without_recovery_is_deleted() {
    let grid = uniform_flow_grid(1.0, 0.0);
    let mut pset: ParticleSet<Tracer> =
        ParticleSet::from_layout(&SeedLayout::Explicit(vec![(179.5, 0.0, 0.0)]), 0.0, 10.0, 0);

    let kernel = methods::advection_ee::<Tracer>(Unit::Degrees);
    pset.execute(&kernel, &grid, 100.0, &RecoveryMap::new(), &EngineConfig::default()).unwrap();

    assert_eq!(pset.len(), 0);
}

#[test]
fn recovery_kernel_keeps_particle_alive() {
    let grid = uniform_flow_grid(1.0, 0.0);
    let mut pset: ParticleSet<Tracer> =
        ParticleSet::from_layout(&SeedLayout::Explicit(vec![(179.5, 0.0, 0.0)]), 0.0, 10.0, 0);

    let reset_to_origin = Kernel::new(
        "ResetToOrigin",
        body(|b| {
            b.set_attr("lon", Expr::float(0.0));
            b.set_state(ErrorCode::Success);
        }),
    );
    let mut recovery = RecoveryMap::new();
    recovery.insert(ErrorCode::ErrorOutOfBounds, reset_to_origin);

    let kernel = methods::advection_ee::<Tracer>(Unit::Degrees);
    pset.execute(&kernel, &grid, 100.0, &recovery, &EngineConfig::default()).unwrap();

    assert_eq!(pset.len(), 1);
    assert_eq!(pset[0].time(), 100.0);
}

#[test]
fn execute_requires_u_and_v_fields() {
    let grid = Grid::new();
    let mut pset: ParticleSet<Tracer> =
        ParticleSet::from_layout(&SeedLayout::Explicit(vec![(0.0, 0.0, 0.0)]), 0.0, 10.0, 0);
    let kernel = methods::advection_ee::<Tracer>(Unit::Degrees);
    let result = pset.execute(&kernel, &grid, 100.0, &RecoveryMap::new(), &EngineConfig::default());
    assert!(result.is_err());
}
