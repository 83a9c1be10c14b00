//! A Lagrangian particle-tracking engine for geophysical flow fields.
//!
//! Seed a [`particle_set::ParticleSet`] of particles onto a [`grid::Grid`]
//! of sampled velocity fields, compose an update rule from
//! [`methods`]'s pre-built kernels (or your own, built with
//! [`kernel::builder`]), and step the set forward in time with
//! [`particle_set::ParticleSet::execute`]. Particle schemas are plain
//! structs annotated `#[derive(ParticleType)]`; schemas opting into
//! `#[particle_type(jit)]` run through a compiled native loop instead of
//! the tree-walking interpreter, with both paths guaranteed to advance a
//! particle identically.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use ptrack::prelude::*;
//!
//! #[derive(Clone, Copy, Debug, Default, ParticleType, bytemuck::Pod, bytemuck::Zeroable)]
//! #[repr(C)]
//! struct Tracer {
//!     time: f64,
//!     dt: f64,
//!     lon: f32,
//!     lat: f32,
//!     dep: f32,
//!     id: i32,
//!     state: i32,
//!     _pad: i32,
//! }
//!
//! let mut grid = Grid::new();
//! // ... populate grid with "U" and "V" fields ...
//!
//! let mut pset: ParticleSet<Tracer> =
//!     ParticleSet::from_layout(&SeedLayout::Explicit(vec![(0.0, 0.0, 0.0)]), 0.0, 3600.0, 0);
//!
//! let kernel = methods::advection_rk4::<Tracer>(Unit::Metres);
//! pset.execute(&kernel, &grid, 86_400.0, &RecoveryMap::new(), &EngineConfig::default()).unwrap();
//! ```
//!
//! `#[derive(ParticleType)]` emits code referencing `::ptrack::particle::…`
//! absolute paths, so this crate aliases itself (`extern crate self as
//! ptrack;`) to keep those paths valid in its own tests.

extern crate self as ptrack;

pub mod axis;
pub mod config;
pub mod error;
pub mod executor;
pub mod field;
pub mod grid;
pub mod kernel;
pub mod methods;
pub mod particle;
pub mod particle_file;
pub mod particle_set;
pub mod units;

pub use ptrack_derive::ParticleType as ParticleTypeDerive;

/// Re-exports of everything a typical embedder needs.
pub mod prelude {
    pub use crate::axis::Axis;
    pub use crate::config::{default_recovery_map, cache_dir, EngineConfig};
    pub use crate::error::{EngineError, ExecutorError, FieldError, GridError, KernelError};
    pub use crate::executor::{Executor, RecoveryMap};
    pub use crate::field::Field;
    pub use crate::grid::{Grid, GridIo, SeedLayout};
    pub use crate::kernel::ast::{Expr, Stmt};
    pub use crate::kernel::builder::{body, KernelBuilder};
    pub use crate::kernel::Kernel;
    pub use crate::methods;
    pub use crate::particle::{ErrorCode, FieldDescriptor, ParticleSchema, ParticleType};
    pub use crate::particle_file::{ParticleFile, ParticleFileWriter};
    pub use crate::particle_set::ParticleSet;
    pub use crate::units::Unit;
    pub use ptrack_derive::ParticleType;
}
