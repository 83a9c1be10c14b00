//! Loads a compiled kernel `.so` and calls its `particle_loop` symbol.
//!
//! Libraries are cached process-wide, keyed by path: `libloading::Library`
//! has no safe way to unload while symbols obtained from it are still in
//! use, so once a `.so` is mapped in this process it stays mapped, and a
//! second kernel built from the same cache entry reuses the same
//! `Library` instead of `dlopen`-ing it again.

use std::collections::HashMap;
use std::ffi::c_char;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use libloading::{Library, Symbol};

use crate::error::KernelError;

/// Mirrors `PtrackField` from `runtime/sample.c` field-for-field.
#[repr(C)]
pub struct FieldFfi {
    pub name: *const c_char,
    pub lon: *const f64,
    pub n_lon: usize,
    pub lat: *const f64,
    pub n_lat: usize,
    pub time: *const f64,
    pub n_time: usize,
    pub data: *const f32,
}

/// Mirrors `PtrackGrid` from `runtime/sample.c`.
#[repr(C)]
pub struct GridFfi {
    pub fields: *const FieldFfi,
    pub n_fields: usize,
}

type ParticleLoopFn = unsafe extern "C" fn(*mut u8, usize, f64, *const GridFfi);

fn library_cache() -> &'static Mutex<HashMap<PathBuf, Arc<Library>>> {
    static CACHE: OnceLock<Mutex<HashMap<PathBuf, Arc<Library>>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// A loaded kernel library, ready to call `particle_loop` on a packed
/// particle row buffer.
pub struct CompiledLibrary {
    library: Arc<Library>,
}

impl CompiledLibrary {
    /// Loads `path`, reusing an already-mapped library for the same path
    /// if one exists in this process.
    pub fn load(path: &Path) -> Result<Self, KernelError> {
        let mut cache = library_cache().lock().unwrap();
        if let Some(existing) = cache.get(path) {
            return Ok(CompiledLibrary { library: existing.clone() });
        }
        // Safety: the path was produced by our own `Compiler` implementation
        // from source this crate generated; loading it runs no code we
        // didn't just compile ourselves.
        let library = unsafe { Library::new(path) }
            .map_err(|e| KernelError::LibraryLoad(e.to_string()))?;
        let library = Arc::new(library);
        cache.insert(path.to_path_buf(), library.clone());
        Ok(CompiledLibrary { library })
    }

    /// Calls `particle_loop(particles, n, endtime, grid)`. Each row steps
    /// itself forward in `dt`-sized quanta until it reaches `endtime` or
    /// its state stops being `Success`/`Repeat`.
    ///
    /// # Safety
    ///
    /// `particles` must point to `n` contiguous, correctly laid-out rows
    /// matching the `Particle` struct this library was generated for, and
    /// `grid` must outlive the call.
    pub unsafe fn particle_loop(
        &self,
        particles: &mut [u8],
        row_count: usize,
        end_time: f64,
        grid: *const GridFfi,
    ) -> Result<(), KernelError> {
        let symbol: Symbol<ParticleLoopFn> = self
            .library
            .get(b"particle_loop\0")
            .map_err(|e| KernelError::LibraryLoad(e.to_string()))?;
        symbol(particles.as_mut_ptr(), row_count, end_time, grid);
        Ok(())
    }
}
