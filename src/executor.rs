//! The per-particle recovery state machine that drives one `execute` call:
//! each particle advances in `dt`-sized (or smaller, when
//! near `end_time`) quanta until it reaches `end_time` or is deleted;
//! anything other than `Success`/`Repeat` routes through the recovery map
//! before the particle is allowed to continue or is dropped.

use std::collections::{HashMap, HashSet};

use crate::config::EngineConfig;
use crate::error::ExecutorError;
use crate::grid::Grid;
use crate::kernel::Kernel;
use crate::particle::{ErrorCode, ParticleType};
use crate::particle_set::ParticleSet;

/// Maps a post-step error code to the kernel that attempts to recover it.
/// Codes with no entry fall back to deleting the particle.
pub type RecoveryMap<P> = HashMap<ErrorCode, Kernel<P>>;

/// Runs kernels over a [`ParticleSet`] to completion.
pub struct Executor {
    config: EngineConfig,
}

impl Executor {
    pub fn new(config: EngineConfig) -> Self {
        Executor { config }
    }

    /// Advances every live particle in `pset` from its current `time` to
    /// `end_time`, applying `kernel` each step and `recovery_map` to any
    /// error it reports. Dispatches to the interpreted or native path based
    /// on `P::USES_JIT`.
    pub fn execute<P: ParticleType>(
        &self,
        pset: &mut ParticleSet<P>,
        kernel: &Kernel<P>,
        grid: &Grid,
        end_time: f64,
        recovery_map: &RecoveryMap<P>,
    ) -> Result<(), ExecutorError> {
        grid.validate()?;
        if kernel.interpreted_only && P::USES_JIT {
            return Err(crate::error::KernelError::JitUnsupported(kernel.name.clone()).into());
        }
        if P::USES_JIT {
            self.execute_native(pset, kernel, grid, end_time, recovery_map)
        } else {
            self.execute_interpreted(pset, kernel, grid, end_time, recovery_map)
        }
    }

    /// Steps every particle one at a time through the tree-walking
    /// interpreter. The `dt` this method hands the kernel for one step is
    /// clamped to whatever's left before `end_time` — but that clamp is
    /// local to the step: a kernel that writes its own `dt` (e.g.
    /// `AdvectionRK45` halving it on `Repeat`) has that write preserved,
    /// since nothing else would ever let it take effect.
    fn execute_interpreted<P: ParticleType>(
        &self,
        pset: &mut ParticleSet<P>,
        kernel: &Kernel<P>,
        grid: &Grid,
        end_time: f64,
        recovery_map: &RecoveryMap<P>,
    ) -> Result<(), ExecutorError> {
        // (particle id) -> (last unrecovered code, consecutive-occurrence count),
        // used to detect a recovery fixed point.
        let mut stuck_tracker: HashMap<i32, (ErrorCode, usize)> = HashMap::new();

        loop {
            let mut to_delete: HashSet<i32> = HashSet::new();
            let mut any_advanced = false;

            for idx in 0..pset.len() {
                let id = pset.as_slice()[idx].id();
                if to_delete.contains(&id) {
                    continue;
                }

                let (time, dt) = {
                    let p = &pset.as_slice()[idx];
                    (p.time(), p.dt())
                };
                if dt == 0.0 || time == end_time {
                    continue;
                }

                let dt_sign = if dt < 0.0 { -1.0 } else { 1.0 };
                let dt_pos = dt.abs().min((end_time - time).abs());
                if dt_pos == 0.0 {
                    continue;
                }

                let step_dt = dt_sign * dt_pos;
                {
                    let p = &mut pset.as_mut_slice()[idx];
                    p.set_dt(step_dt);
                }

                let code = kernel.step_interpreted(&mut pset.as_mut_slice()[idx], grid)?;
                {
                    let p = &mut pset.as_mut_slice()[idx];
                    p.set_state(code);
                    if p.dt() == step_dt {
                        p.set_dt(dt);
                    }
                }

                match code {
                    ErrorCode::Success => {
                        let p = &mut pset.as_mut_slice()[idx];
                        p.set_time(p.time() + step_dt);
                        stuck_tracker.remove(&id);
                        any_advanced = true;
                    }
                    ErrorCode::Repeat => {
                        any_advanced = true;
                    }
                    ErrorCode::Delete => {
                        to_delete.insert(id);
                    }
                    ErrorCode::ErrorOutOfBounds | ErrorCode::Error => {
                        let p = &mut pset.as_mut_slice()[idx];
                        self.apply_recovery(p, code, recovery_map, grid, &mut stuck_tracker, &mut to_delete)?;
                        any_advanced = true;
                    }
                }
            }

            if !to_delete.is_empty() {
                pset.retain(|p| !to_delete.contains(&p.id()));
            }

            if pset.is_empty() {
                break;
            }
            if !any_advanced {
                break;
            }
            if pset.iter().all(|p| p.time() == end_time) {
                break;
            }
        }

        Ok(())
    }

    /// Runs `kernel`'s compiled native loop, which steps every row's own
    /// `dt_remaining` state machine to `end_time` inside one call (so a
    /// native sweep may parallelise across particles — see
    /// [`crate::kernel::Kernel::execute_native`]), then handles any row
    /// that came back with an error in Rust, single-threaded, exactly as
    /// `execute_interpreted` does. Repeats the native sweep over survivors
    /// until nothing is left to recover.
    fn execute_native<P: ParticleType>(
        &self,
        pset: &mut ParticleSet<P>,
        kernel: &Kernel<P>,
        grid: &Grid,
        end_time: f64,
        recovery_map: &RecoveryMap<P>,
    ) -> Result<(), ExecutorError> {
        let mut stuck_tracker: HashMap<i32, (ErrorCode, usize)> = HashMap::new();

        loop {
            kernel.execute_native(pset, grid, end_time, &self.config.cache_dir, self.config.compiler.as_ref())?;

            let mut to_delete: HashSet<i32> = HashSet::new();
            let mut err_ids: HashSet<i32> = HashSet::new();
            for p in pset.iter() {
                match p.state() {
                    ErrorCode::Delete => {
                        to_delete.insert(p.id());
                    }
                    ErrorCode::ErrorOutOfBounds | ErrorCode::Error => {
                        err_ids.insert(p.id());
                    }
                    ErrorCode::Success | ErrorCode::Repeat => {}
                }
            }

            if !to_delete.is_empty() {
                pset.retain(|p| !to_delete.contains(&p.id()));
            }
            if pset.is_empty() || err_ids.is_empty() {
                break;
            }

            let mut recovery_delete: HashSet<i32> = HashSet::new();
            for idx in 0..pset.len() {
                let id = pset.as_slice()[idx].id();
                if !err_ids.contains(&id) {
                    continue;
                }
                let code = pset.as_slice()[idx].state();
                let p = &mut pset.as_mut_slice()[idx];
                self.apply_recovery(p, code, recovery_map, grid, &mut stuck_tracker, &mut recovery_delete)?;
            }
            if !recovery_delete.is_empty() {
                pset.retain(|p| !recovery_delete.contains(&p.id()));
            }
            if pset.is_empty() {
                break;
            }
            // Loop again: the native sweep re-runs over survivors. A
            // particle already at `end_time` costs nothing — its
            // `dt_remaining` is already zero on entry.
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_recovery<P: ParticleType>(
        &self,
        particle: &mut P,
        code: ErrorCode,
        recovery_map: &RecoveryMap<P>,
        grid: &Grid,
        stuck_tracker: &mut HashMap<i32, (ErrorCode, usize)>,
        to_delete: &mut HashSet<i32>,
    ) -> Result<(), ExecutorError> {
        let id = particle.id();
        match recovery_map.get(&code) {
            None => {
                log::debug!("particle {id} hit {code:?} with no recovery kernel registered, deleting");
                to_delete.insert(id);
            }
            Some(recovery_kernel) => {
                let new_code = recovery_kernel.step_interpreted(particle, grid)?;
                particle.set_state(new_code);

                if new_code.is_live() {
                    stuck_tracker.remove(&id);
                } else {
                    let entry = stuck_tracker.entry(id).or_insert((new_code, 0));
                    if entry.0 == new_code {
                        entry.1 += 1;
                    } else {
                        *entry = (new_code, 1);
                    }
                    if entry.1 >= self.config.max_recovery_iterations {
                        return Err(ExecutorError::StuckRecovery(vec![id]));
                    }
                    if new_code == ErrorCode::Delete {
                        to_delete.insert(id);
                    }
                }
            }
        }
        Ok(())
    }
}
