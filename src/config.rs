//! Engine-wide tunables: the compile cache directory and compiler,
//! default recovery limits, and the default recovery map constructor.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::kernel::compiler::{CcCompiler, Compiler};
use crate::kernel::Kernel;
use crate::particle::{ErrorCode, ParticleType};

/// Directory where compiled kernel `.so` files and their generated C
/// sources are cached.
///
/// Overridden by the `PTRACK_CACHE_DIR` environment variable; otherwise
/// `$TMPDIR/ptrack-cache` (or the platform equivalent via `std::env::temp_dir`).
pub fn cache_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PTRACK_CACHE_DIR") {
        return PathBuf::from(dir);
    }
    std::env::temp_dir().join("ptrack-cache")
}

/// Runtime knobs for [`crate::executor::Executor`].
#[derive(Clone)]
pub struct EngineConfig {
    /// Upper bound on recovery passes before a particle's error is treated
    /// as unrecoverable and reported as `EngineError::StuckRecovery`.
    pub max_recovery_iterations: usize,
    /// Where compiled kernels for the native execution path are cached.
    pub cache_dir: PathBuf,
    /// Compiler used to build generated kernel sources for `P::USES_JIT` schemas.
    pub compiler: Arc<dyn Compiler>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_recovery_iterations: 100,
            cache_dir: cache_dir(),
            compiler: Arc::new(CcCompiler::default()),
        }
    }
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("max_recovery_iterations", &self.max_recovery_iterations)
            .field("cache_dir", &self.cache_dir)
            .finish_non_exhaustive()
    }
}

/// Builds the default recovery map: empty. With no entry for
/// `ErrorOutOfBounds` or `Error`, [`crate::executor::Executor`] falls back to
/// its built-in policy of deleting the particle.
///
/// Callers that want a different policy (e.g. clamping back into the
/// domain) insert their own entries into a `HashMap` instead of calling this.
pub fn default_recovery_map<P: ParticleType>() -> HashMap<ErrorCode, Kernel<P>> {
    HashMap::new()
}
