//! Kernel composition, code generation, compilation, and execution.
//!
//! A [`Kernel`] wraps one `Vec<Stmt>` AST (see [`ast`]), built with the
//! [`builder`] combinators. The same tree drives both execution paths:
//! [`interpreter::run`] walks it directly, and [`codegen::generate_source`]
//! lowers it to C for [`compiler::Compiler`] to build and [`library`] to
//! load and call.

pub mod ast;
pub mod builder;
pub mod cache;
pub mod codegen;
pub mod compiler;
pub mod interpreter;
pub mod library;

use std::ffi::CString;
use std::fs;
use std::marker::PhantomData;
use std::ops::Add;
use std::path::Path;

use crate::error::KernelError;
use crate::grid::Grid;
use crate::kernel::ast::Stmt;
use crate::kernel::cache::CacheEntry;
use crate::kernel::compiler::Compiler;
use crate::kernel::library::{CompiledLibrary, FieldFfi, GridFfi};
use crate::particle::{ErrorCode, ParticleType};
use crate::particle_set::ParticleSet;

/// A named, composable update rule over a particle type `P`.
///
/// `Kernel`s combine with `+` (or [`Kernel::then`]): the result runs the
/// left kernel's statements, then the right's, against the same particle
/// and the same step. Composition is associative but not commutative —
/// `a + b` and `b + a` are different programs whenever one kernel reads a
/// value the other writes.
#[derive(Clone, Debug)]
pub struct Kernel<P: ParticleType> {
    pub name: String,
    pub stmts: Vec<Stmt>,
    /// `true` for kernels that must never run through the native path even
    /// if `P::USES_JIT` — e.g. `AdvectionRK45`, which only the interpreter runs.
    pub interpreted_only: bool,
    _marker: PhantomData<fn() -> P>,
}

impl<P: ParticleType> Kernel<P> {
    pub fn new(name: impl Into<String>, stmts: Vec<Stmt>) -> Self {
        Kernel { name: name.into(), stmts, interpreted_only: false, _marker: PhantomData }
    }

    /// Marks this kernel as interpreted-only; see [`Kernel::interpreted_only`].
    pub fn force_interpreted(mut self) -> Self {
        self.interpreted_only = true;
        self
    }

    /// Concatenates `self`'s statements with `other`'s, in order.
    pub fn then(mut self, other: Kernel<P>) -> Kernel<P> {
        self.name = format!("{}_{}", self.name, other.name);
        self.stmts.extend(other.stmts);
        self.interpreted_only = self.interpreted_only || other.interpreted_only;
        self
    }

    /// Runs this kernel's body against one particle using the tree-walking
    /// interpreter. Always available, regardless of `P::USES_JIT`.
    pub fn step_interpreted(&self, particle: &mut P, grid: &Grid) -> Result<ErrorCode, KernelError> {
        interpreter::run(&self.stmts, particle, grid)
    }

    /// Generates this kernel's C source against `grid`'s fields.
    pub fn generate_source(&self) -> String {
        codegen::generate_source(&self.name, &self.stmts, &P::SCHEMA)
    }

    /// Computes this kernel's cache key for the given grid: kernel name,
    /// particle schema descriptor, and the unit tag of every field the
    /// kernel's AST references.
    pub fn cache_key(&self, grid: &Grid) -> String {
        let field_units = cache::referenced_field_units(&self.stmts, grid);
        cache::cache_key(&self.name, P::CACHE_KEY, &field_units)
    }

    /// Ensures a compiled `.so` exists in `cache_dir` for this kernel
    /// against `grid`, compiling it if this exact combination hasn't been
    /// seen before. Both the generated source and the compiled library are
    /// written via a temp file plus `rename`, so a concurrent reader never
    /// observes a partially written source file or `dlopen`s a
    /// partially-written `.so`.
    pub fn ensure_compiled(
        &self,
        cache_dir: &Path,
        compiler: &dyn Compiler,
        grid: &Grid,
    ) -> Result<CacheEntry, KernelError> {
        fs::create_dir_all(cache_dir)?;
        let key = self.cache_key(grid);
        let entry = CacheEntry::new(cache_dir, &key);

        if entry.is_compiled() {
            log::debug!("kernel cache hit for '{}' (key {key})", self.name);
            return Ok(entry);
        }

        log::info!("kernel cache miss for '{}' (key {key}), compiling", self.name);
        let source = self.generate_source();
        let tmp_source = entry.source_path.with_extension("c.tmp");
        fs::write(&tmp_source, source)?;
        fs::rename(&tmp_source, &entry.source_path)?;

        let tmp_library = entry.library_path.with_extension("so.tmp");
        compiler.compile(&entry.source_path, &tmp_library, &entry.log_path)?;
        fs::rename(&tmp_library, &entry.library_path)?;
        Ok(entry)
    }

    /// Runs this kernel's compiled native loop over every particle in
    /// `particles` in place, each row stepping itself to `end_time` (or
    /// until it stops being `Success`/`Repeat`) inside the one native call.
    /// Compiles (and caches) the kernel first if needed.
    pub fn execute_native(
        &self,
        particles: &mut ParticleSet<P>,
        grid: &Grid,
        end_time: f64,
        cache_dir: &Path,
        compiler: &dyn Compiler,
    ) -> Result<(), KernelError> {
        let entry = self.ensure_compiled(cache_dir, compiler, grid)?;
        let library = CompiledLibrary::load(&entry.library_path)?;

        // `names` and `field_ffis` must outlive the FFI call below: `GridFfi`
        // only borrows them through raw pointers.
        let names: Vec<CString> = grid.fields().map(|f| CString::new(f.name.as_str()).unwrap()).collect();
        let field_ffis: Vec<FieldFfi> = grid
            .fields()
            .zip(names.iter())
            .map(|(f, name)| FieldFfi {
                name: name.as_ptr(),
                lon: f.lon_axis().values().as_ptr(),
                n_lon: f.lon_axis().len(),
                lat: f.lat_axis().values().as_ptr(),
                n_lat: f.lat_axis().len(),
                time: f.time_axis().values().as_ptr(),
                n_time: f.time_axis().len(),
                data: f.raw_data().as_ptr(),
            })
            .collect();

        let grid_ffi = GridFfi { fields: field_ffis.as_ptr(), n_fields: field_ffis.len() };
        let row_size = P::SCHEMA.row_size;
        let bytes = particles.as_bytes_mut();

        // Safety: `entry.library_path` was compiled by us from source this
        // module generated against `P::SCHEMA`, so `particle_loop`'s
        // expected row layout matches `particles`'s. `names`/`field_ffis`
        // outlive this call.
        #[cfg(feature = "parallel")]
        {
            run_native_loop_parallel(&library, bytes, row_size, end_time, &grid_ffi)
        }
        #[cfg(not(feature = "parallel"))]
        {
            let row_count = bytes.len() / row_size;
            unsafe { library.particle_loop(bytes, row_count, end_time, &grid_ffi as *const GridFfi) }
        }
    }
}

/// Sweeps disjoint row chunks across a rayon thread pool instead of one
/// `particle_loop` call over the whole buffer. Safe because each particle
/// touches only its own row and `grid` is read-only; the one piece of
/// mutable global state the generated C shares across calls, `sample.c`'s
/// out-of-bounds flag and RNG state, are `_Thread_local`, so concurrent
/// chunks never race on them.
#[cfg(feature = "parallel")]
fn run_native_loop_parallel(
    library: &CompiledLibrary,
    bytes: &mut [u8],
    row_size: usize,
    end_time: f64,
    grid: &GridFfi,
) -> Result<(), KernelError> {
    use rayon::prelude::*;

    struct SharedGrid(*const GridFfi);
    // `GridFfi` and everything it points to (axis arrays, field data) is
    // read-only for the lifetime of this call; no worker thread writes
    // through it.
    unsafe impl Sync for SharedGrid {}
    let grid = SharedGrid(grid as *const GridFfi);

    const ROWS_PER_CHUNK: usize = 256;
    bytes.par_chunks_mut(row_size * ROWS_PER_CHUNK).try_for_each(|chunk| {
        let rows = chunk.len() / row_size;
        unsafe { library.particle_loop(chunk, rows, end_time, grid.0) }
    })
}

impl<P: ParticleType> Add for Kernel<P> {
    type Output = Kernel<P>;
    fn add(self, rhs: Kernel<P>) -> Kernel<P> {
        self.then(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::ast::Expr;
    use crate::kernel::builder::body;
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

    fn add_one() -> Kernel<TestParticle> {
        Kernel::new("AddOne", body(|b| b.set_attr("lon", Expr::attr("lon") + Expr::float(1.0))))
    }

    fn double_it() -> Kernel<TestParticle> {
        Kernel::new("Double", body(|b| b.set_attr("lon", Expr::attr("lon") * Expr::float(2.0))))
    }

    #[test]
    fn composition_is_order_dependent() {
        let grid = Grid::new();
        let mut a = TestParticle::default();
        (add_one() + double_it()).step_interpreted(&mut a, &grid).unwrap();
        assert_eq!(a.lon(), 2.0); // (0 + 1) * 2

        let mut b = TestParticle::default();
        (double_it() + add_one()).step_interpreted(&mut b, &grid).unwrap();
        assert_eq!(b.lon(), 1.0); // (0 * 2) + 1
    }

    #[test]
    fn composition_is_associative() {
        let grid = Grid::new();
        let mut left = TestParticle::default();
        ((add_one() + double_it()) + add_one())
            .step_interpreted(&mut left, &grid)
            .unwrap();

        let mut right = TestParticle::default();
        (add_one() + (double_it() + add_one()))
            .step_interpreted(&mut right, &grid)
            .unwrap();

        assert_eq!(left.lon(), right.lon());
    }
}
