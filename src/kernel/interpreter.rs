//! Tree-walking evaluator for a kernel body. The "interpreted" execution
//! path: always available, used for any schema that doesn't
//! opt into `#[particle_type(jit)]`, and used by `tests/parity.rs` as the
//! reference the native path is checked against.

use std::collections::HashMap;

use crate::error::{FieldError, KernelError};
use crate::grid::Grid;
use crate::kernel::ast::{BinOp, Expr, Stmt};
use crate::particle::{ErrorCode, ParticleType};

/// Internal control-flow signal, never exposed outside this module.
enum Flow {
    OutOfBounds,
    Runtime(String),
}

impl From<FieldError> for Flow {
    fn from(_: FieldError) -> Self {
        Flow::OutOfBounds
    }
}

type EvalResult<T> = Result<T, Flow>;

/// Runs `stmts` against `particle`, mutating it in place, and returns the
/// status the executor should act on.
///
/// A field sample landing outside the grid's domain is not a Rust `Err`:
/// it's reported as `Ok(ErrorCode::ErrorOutOfBounds)`, the same post-step
/// status the native path reports for the same condition, so both paths
/// feed the recovery map identically. Only a malformed kernel — an unbound
/// local variable, an unknown attribute name, an unknown builtin function —
/// is a hard `KernelError::Runtime`.
pub fn run<P: ParticleType>(
    stmts: &[Stmt],
    particle: &mut P,
    grid: &Grid,
) -> Result<ErrorCode, KernelError> {
    let mut env: HashMap<String, f64> = HashMap::new();
    match exec_stmts(stmts, &mut env, particle, grid) {
        Ok(Some(code)) => Ok(code),
        Ok(None) => Ok(ErrorCode::Success),
        Err(Flow::OutOfBounds) => Ok(ErrorCode::ErrorOutOfBounds),
        Err(Flow::Runtime(msg)) => Err(KernelError::Runtime(msg)),
    }
}

fn exec_stmts<P: ParticleType>(
    stmts: &[Stmt],
    env: &mut HashMap<String, f64>,
    particle: &mut P,
    grid: &Grid,
) -> EvalResult<Option<ErrorCode>> {
    for stmt in stmts {
        match stmt {
            Stmt::Let { name, value } => {
                let v = eval(value, env, particle, grid)?;
                env.insert(name.clone(), v);
            }
            Stmt::Assign { name, value } => {
                let v = eval(value, env, particle, grid)?;
                if !env.contains_key(name) {
                    return Err(Flow::Runtime(format!("assignment to unbound local '{name}'")));
                }
                env.insert(name.clone(), v);
            }
            Stmt::SetAttr { name, value } => {
                let v = eval(value, env, particle, grid)?;
                set_attr(particle, name, v)?;
            }
            Stmt::If { cond, then_branch, else_branch } => {
                let c = eval(cond, env, particle, grid)?;
                let branch = if c != 0.0 { then_branch } else { else_branch };
                if let Some(code) = exec_stmts(branch, env, particle, grid)? {
                    return Ok(Some(code));
                }
            }
            Stmt::While { cond, body } => {
                while eval(cond, env, particle, grid)? != 0.0 {
                    if let Some(code) = exec_stmts(body, env, particle, grid)? {
                        return Ok(Some(code));
                    }
                }
            }
            Stmt::For { var, start, end, body } => {
                let end_v = eval(end, env, particle, grid)?;
                let mut i = eval(start, env, particle, grid)?;
                while i < end_v {
                    env.insert(var.clone(), i);
                    if let Some(code) = exec_stmts(body, env, particle, grid)? {
                        return Ok(Some(code));
                    }
                    i += 1.0;
                }
            }
            Stmt::Delete => return Ok(Some(ErrorCode::Delete)),
            Stmt::SetState(code) => return Ok(Some(*code)),
        }
    }
    Ok(None)
}

fn get_attr<P: ParticleType>(particle: &P, name: &str) -> EvalResult<f64> {
    match name {
        "lon" => Ok(particle.lon() as f64),
        "lat" => Ok(particle.lat() as f64),
        "dep" => Ok(particle.dep() as f64),
        "time" => Ok(particle.time()),
        "dt" => Ok(particle.dt()),
        "id" => Ok(particle.id() as f64),
        "state" => Ok(particle.state() as i32 as f64),
        _ => particle
            .get_attr(name)
            .ok_or_else(|| Flow::Runtime(format!("unknown particle attribute '{name}'"))),
    }
}

fn set_attr<P: ParticleType>(particle: &mut P, name: &str, value: f64) -> EvalResult<()> {
    match name {
        "lon" => particle.set_lon(value as f32),
        "lat" => particle.set_lat(value as f32),
        "dep" => particle.set_dep(value as f32),
        "time" => particle.set_time(value),
        "dt" => particle.set_dt(value),
        "id" => particle.set_id(value as i32),
        "state" => particle.set_state(ErrorCode::from_i32(value as i32)),
        _ => {
            if !particle.set_attr(name, value) {
                return Err(Flow::Runtime(format!("unknown particle attribute '{name}'")));
            }
        }
    }
    Ok(())
}

fn eval<P: ParticleType>(
    expr: &Expr,
    env: &HashMap<String, f64>,
    particle: &mut P,
    grid: &Grid,
) -> EvalResult<f64> {
    match expr {
        Expr::FloatLit(v) => Ok(*v),
        Expr::IntLit(v) => Ok(*v as f64),
        Expr::Var(name) => env
            .get(name)
            .copied()
            .ok_or_else(|| Flow::Runtime(format!("unbound local '{name}'"))),
        Expr::Attr(name) => get_attr(particle, name),
        Expr::FieldSample { field, lon, lat, dep, time } => {
            let lon = eval(lon, env, particle, grid)? as f32;
            let lat = eval(lat, env, particle, grid)? as f32;
            let _dep = eval(dep, env, particle, grid)?;
            let time = eval(time, env, particle, grid)?;
            let f = grid
                .field(field)
                .ok_or_else(|| Flow::Runtime(format!("no such field '{field}'")))?;
            Ok(f.sample(lon, lat, time)? as f64)
        }
        Expr::BinOp { op, lhs, rhs } => {
            let l = eval(lhs, env, particle, grid)?;
            let r = eval(rhs, env, particle, grid)?;
            Ok(match op {
                BinOp::Add => l + r,
                BinOp::Sub => l - r,
                BinOp::Mul => l * r,
                BinOp::Div => l / r,
                BinOp::Lt => bool_f64(l < r),
                BinOp::Le => bool_f64(l <= r),
                BinOp::Gt => bool_f64(l > r),
                BinOp::Ge => bool_f64(l >= r),
                BinOp::Eq => bool_f64(l == r),
            })
        }
        Expr::Neg(inner) => Ok(-eval(inner, env, particle, grid)?),
        Expr::Call { func, args } => {
            let values: Vec<f64> = args
                .iter()
                .map(|a| eval(a, env, particle, grid))
                .collect::<EvalResult<_>>()?;
            call_builtin(func, &values)
        }
    }
}

fn bool_f64(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn call_builtin(func: &str, args: &[f64]) -> EvalResult<f64> {
    use rand::Rng;
    match (func, args) {
        ("sqrt", [x]) => Ok(x.sqrt()),
        ("sin", [x]) => Ok(x.sin()),
        ("cos", [x]) => Ok(x.cos()),
        ("abs", [x]) => Ok(x.abs()),
        ("min", [a, b]) => Ok(a.min(*b)),
        ("max", [a, b]) => Ok(a.max(*b)),
        ("random_uniform", [lo, hi]) => Ok(rand::thread_rng().gen_range(*lo..*hi)),
        ("random_normal", [mean, std]) => {
            // Box-Muller, matching the pair the generated C runtime uses
            // (`runtime/sample.c`), so both paths draw from the same
            // distribution shape even though the two RNG streams differ.
            let mut rng = rand::thread_rng();
            let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
            let u2: f64 = rng.gen_range(0.0..1.0);
            let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
            Ok(mean + std * z0)
        }
        (name, _) => Err(Flow::Runtime(format!("unknown builtin function '{name}' or wrong arity"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::Axis;
    use crate::kernel::builder::body;
    use crate::units::Unit;
    use ptrack_derive::ParticleType;

    #[derive(Clone, Copy, Debug, Default, ParticleType, bytemuck::Pod, bytemuck::Zeroable)]
    #[repr(C)]
    struct TestParticle {
        time: f64,
        dt: f64,
        lon: f32,
        lat: f32,
        dep: f32,
        id: i32,
        state: i32,
        _pad: i32,
    }

    fn grid_with_uv() -> Grid {
        let mut grid = Grid::new();
        let lon = Axis::shared(vec![0.0, 1.0], "lon").unwrap();
        let lat = Axis::shared(vec![0.0, 1.0], "lat").unwrap();
        let time = Axis::shared(vec![0.0, 1.0], "time").unwrap();
        grid.from_data("U", Unit::Degrees, lon.clone(), lat.clone(), time.clone(), vec![1.0; 8]).unwrap();
        grid.from_data("V", Unit::Degrees, lon, lat, time, vec![0.0; 8]).unwrap();
        grid
    }

    #[test]
    fn simple_euler_step_updates_position() {
        let grid = grid_with_uv();
        let stmts = body(|b| {
            let u = b.let_("u", Expr::sample_here("U", Expr::attr("lon"), Expr::attr("lat")));
            b.set_attr("lon", Expr::attr("lon") + u * Expr::attr("dt"));
        });
        let mut p = TestParticle::default();
        p.set_dt(0.5);
        let code = run(&stmts, &mut p, &grid).unwrap();
        assert_eq!(code, ErrorCode::Success);
        assert!((p.lon() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn out_of_domain_sample_reports_error_out_of_bounds() {
        let grid = grid_with_uv();
        let stmts = body(|b| {
            b.let_("u", Expr::sample_here("U", Expr::float(5.0), Expr::attr("lat")));
        });
        let mut p = TestParticle::default();
        let code = run(&stmts, &mut p, &grid).unwrap();
        assert_eq!(code, ErrorCode::ErrorOutOfBounds);
    }

    #[test]
    fn delete_short_circuits_remaining_statements() {
        let grid = grid_with_uv();
        let stmts = body(|b| {
            b.delete();
            b.set_attr("lon", Expr::float(999.0));
        });
        let mut p = TestParticle::default();
        let code = run(&stmts, &mut p, &grid).unwrap();
        assert_eq!(code, ErrorCode::Delete);
        assert_eq!(p.lon(), 0.0);
    }

    #[test]
    fn while_loop_accumulates_until_condition_clears() {
        let grid = grid_with_uv();
        let stmts = body(|b| {
            b.let_("count", Expr::float(0.0));
            b.while_(Expr::var("count").lt(Expr::float(5.0)), |b| {
                b.set_attr("lon", Expr::attr("lon") + Expr::float(1.0));
                b.assign("count", Expr::var("count") + Expr::float(1.0));
            });
        });
        let mut p = TestParticle::default();
        let code = run(&stmts, &mut p, &grid).unwrap();
        assert_eq!(code, ErrorCode::Success);
        assert_eq!(p.lon(), 5.0);
    }

    #[test]
    fn for_loop_binds_loop_variable_each_iteration() {
        let grid = grid_with_uv();
        let stmts = body(|b| {
            b.for_range("i", Expr::float(0.0), Expr::float(4.0), |b| {
                b.set_attr("lon", Expr::attr("lon") + Expr::var("i"));
            });
        });
        let mut p = TestParticle::default();
        let code = run(&stmts, &mut p, &grid).unwrap();
        assert_eq!(code, ErrorCode::Success);
        assert_eq!(p.lon(), 6.0); // 0 + 1 + 2 + 3
    }

    #[test]
    fn delete_inside_a_loop_short_circuits_it() {
        let grid = grid_with_uv();
        let stmts = body(|b| {
            b.for_range("i", Expr::float(0.0), Expr::float(10.0), |b| {
                b.if_only(Expr::var("i").gt(Expr::float(2.0)), |b| b.delete());
                b.set_attr("lon", Expr::attr("lon") + Expr::float(1.0));
            });
        });
        let mut p = TestParticle::default();
        let code = run(&stmts, &mut p, &grid).unwrap();
        assert_eq!(code, ErrorCode::Delete);
        assert_eq!(p.lon(), 3.0); // i = 0,1,2 increment lon; i = 3 deletes before incrementing
    }
}
