//! A growable collection of particles, packed as a flat `Vec<P>`.
//!
//! Because every `P: ParticleType` is `bytemuck::Pod`, `Vec<P>` already is
//! the packed row buffer the native `particle_loop` symbol expects —
//! `bytemuck::cast_slice` reinterprets it as `&[u8]` with no copy, so
//! handing a set to the JIT path costs nothing beyond the FFI call itself.

use std::ops::{Add, AddAssign, Index, IndexMut};

use crate::config::EngineConfig;
use crate::error::ExecutorError;
use crate::executor::{Executor, RecoveryMap};
use crate::grid::{Grid, SeedLayout};
use crate::kernel::Kernel;
use crate::particle::ParticleType;

/// A collection of particles of a single schema `P`.
#[derive(Clone, Debug, Default)]
pub struct ParticleSet<P: ParticleType> {
    particles: Vec<P>,
}

impl<P: ParticleType> ParticleSet<P> {
    pub fn new() -> Self {
        ParticleSet { particles: Vec::new() }
    }

    /// Seeds a set from a [`SeedLayout`], assigning sequential ids starting
    /// at `next_id` and giving every particle the same `time`/`dt`.
    pub fn from_layout(layout: &SeedLayout, time: f64, dt: f64, next_id: i32) -> Self {
        let mut particles = Vec::new();
        for (i, (lon, lat, dep)) in layout.positions().into_iter().enumerate() {
            let mut p = P::default();
            p.set_lon(lon);
            p.set_lat(lat);
            p.set_dep(dep);
            p.set_time(time);
            p.set_dt(dt);
            p.set_id(next_id + i as i32);
            particles.push(p);
        }
        ParticleSet { particles }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn push(&mut self, particle: P) {
        self.particles.push(particle);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, P> {
        self.particles.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, P> {
        self.particles.iter_mut()
    }

    pub fn as_slice(&self) -> &[P] {
        &self.particles
    }

    pub fn as_mut_slice(&mut self) -> &mut [P] {
        &mut self.particles
    }

    /// Zero-copy byte view of the packed rows, passed to the native
    /// `particle_loop` symbol.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.particles)
    }

    /// Removes and returns the particle at `index`. A negative index counts
    /// from the end (`-1` is the last particle), matching the set's
    /// "remove by position" convention — use [`ParticleSet::retain`] if you
    /// need removal by predicate instead.
    ///
    /// # Panics
    ///
    /// Panics if `index` (after resolving negative indices) is out of bounds.
    pub fn remove(&mut self, index: isize) -> P {
        let resolved = self.resolve_index(index);
        self.particles.remove(resolved)
    }

    /// Removes every particle whose (possibly negative) index appears in
    /// `indices`. Indices are resolved against the set's length *before*
    /// any removal, then removed in descending order of resolved index so
    /// earlier removals never shift the position of a later one — the
    /// surviving particles keep their original relative order.
    pub fn remove_many(&mut self, indices: &[isize]) {
        let mut resolved: Vec<usize> = indices.iter().map(|&i| self.resolve_index(i)).collect();
        resolved.sort_unstable_by(|a, b| b.cmp(a));
        resolved.dedup();
        for idx in resolved {
            self.particles.remove(idx);
        }
    }

    /// Drops every particle for which `keep` returns `false`, preserving
    /// the relative order of the rest.
    pub fn retain(&mut self, keep: impl FnMut(&P) -> bool) {
        self.particles.retain(keep);
    }

    fn resolve_index(&self, index: isize) -> usize {
        let len = self.particles.len() as isize;
        let resolved = if index < 0 { len + index } else { index };
        assert!(
            resolved >= 0 && resolved < len,
            "particle set index {index} out of bounds for length {len}"
        );
        resolved as usize
    }

    /// Runs `kernel` over every particle until each has either reached
    /// `end_time` or been deleted, applying `recovery_map` to any particle
    /// whose post-step state isn't `Success`/`Repeat`.
    pub fn execute(
        &mut self,
        kernel: &Kernel<P>,
        grid: &Grid,
        end_time: f64,
        recovery_map: &RecoveryMap<P>,
        config: &EngineConfig,
    ) -> Result<(), ExecutorError> {
        let executor = Executor::new(config.clone());
        executor.execute(self, kernel, grid, end_time, recovery_map)
    }
}

impl<P: ParticleType> Index<usize> for ParticleSet<P> {
    type Output = P;
    fn index(&self, i: usize) -> &P {
        &self.particles[i]
    }
}

impl<P: ParticleType> IndexMut<usize> for ParticleSet<P> {
    fn index_mut(&mut self, i: usize) -> &mut P {
        &mut self.particles[i]
    }
}

impl<P: ParticleType> Add<P> for ParticleSet<P> {
    type Output = ParticleSet<P>;
    fn add(mut self, rhs: P) -> ParticleSet<P> {
        self.push(rhs);
        self
    }
}

impl<P: ParticleType> AddAssign<P> for ParticleSet<P> {
    fn add_assign(&mut self, rhs: P) {
        self.push(rhs);
    }
}

impl<P: ParticleType> Add<ParticleSet<P>> for ParticleSet<P> {
    type Output = ParticleSet<P>;
    fn add(mut self, rhs: ParticleSet<P>) -> ParticleSet<P> {
        self.particles.extend(rhs.particles);
        self
    }
}

impl<P: ParticleType> AddAssign<ParticleSet<P>> for ParticleSet<P> {
    fn add_assign(&mut self, rhs: ParticleSet<P>) {
        self.particles.extend(rhs.particles);
    }
}

impl<P: ParticleType> FromIterator<P> for ParticleSet<P> {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        ParticleSet { particles: iter.into_iter().collect() }
    }
}

impl<P: ParticleType> IntoIterator for ParticleSet<P> {
    type Item = P;
    type IntoIter = std::vec::IntoIter<P>;
    fn into_iter(self) -> Self::IntoIter {
        self.particles.into_iter()
    }
}
