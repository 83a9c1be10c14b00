//! Error types for the particle-tracking engine.
//!
//! Every error kind in the engine's error table gets its own variant
//! here: field sampling, kernel execution, code generation, compilation,
//! library loading, and schema mismatches. Particle-level errors (anything
//! caught inside a user kernel) never surface through these types — they're
//! captured in the particle's `state` field and routed through the recovery
//! map (see [`crate::executor`]); only failures that abort the whole
//! `execute` call reach here.

use std::fmt;
use std::path::PathBuf;

/// Errors raised by [`crate::field::Field::sample`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldError {
    /// The query point lies strictly outside the convex hull of the axes.
    OutOfBounds { lon: f32, lat: f32, time: f64 },
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::OutOfBounds { lon, lat, time } => write!(
                f,
                "sample point (lon={lon}, lat={lat}, time={time}) is outside the field domain"
            ),
        }
    }
}

impl std::error::Error for FieldError {}

/// Errors raised constructing or querying a [`crate::grid::Grid`].
#[derive(Debug, Clone, PartialEq)]
pub enum GridError {
    /// `from_data` was called without a "U" or "V" field.
    MissingRequiredField(&'static str),
    /// The supplied flat data array doesn't match the declared axes' product.
    ShapeMismatch { field: String, expected_len: usize, found_len: usize },
    /// An axis was not monotonically increasing.
    NonMonotonicAxis { axis: &'static str },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::MissingRequiredField(name) => {
                write!(f, "grid is missing required field \"{name}\"")
            }
            GridError::ShapeMismatch { field, expected_len, found_len } => write!(
                f,
                "field \"{field}\" has {found_len} data points, expected {expected_len} (lon.len() * lat.len() * time.len())"
            ),
            GridError::NonMonotonicAxis { axis } => {
                write!(f, "axis \"{axis}\" is not monotonically increasing")
            }
        }
    }
}

impl std::error::Error for GridError {}

/// Errors raised building, generating, compiling, or loading a [`crate::kernel::Kernel`].
#[derive(Debug)]
pub enum KernelError {
    /// A failure inside a user kernel body other than an out-of-bounds sample.
    Runtime(String),
    /// The kernel AST references an unsupported free symbol or construct.
    CodeGen(String),
    /// The external compiler returned a non-zero exit status.
    Compile { log_path: PathBuf },
    /// The compiled `.so` is missing the expected `particle_loop` symbol.
    LibraryLoad(String),
    /// A `ParticleSet` was executed with a `Kernel` built for a different `ParticleType`.
    SchemaMismatch { expected: &'static str, found: &'static str },
    /// A kernel marked interpreted-only (e.g. `AdvectionRK45`) was run
    /// against a `ParticleType` with `USES_JIT = true`.
    JitUnsupported(String),
    /// Underlying I/O failure writing the generated source or cache files.
    Io(std::io::Error),
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::Runtime(msg) => write!(f, "kernel runtime error: {msg}"),
            KernelError::CodeGen(msg) => write!(f, "kernel code generation failed: {msg}"),
            KernelError::Compile { log_path } => write!(
                f,
                "kernel compilation failed, see log at {}",
                log_path.display()
            ),
            KernelError::LibraryLoad(msg) => write!(f, "failed to load compiled kernel library: {msg}"),
            KernelError::SchemaMismatch { expected, found } => write!(
                f,
                "kernel was built for particle type \"{expected}\" but particle set uses \"{found}\""
            ),
            KernelError::JitUnsupported(name) => write!(
                f,
                "kernel \"{name}\" is interpreted-only and cannot run against a JIT particle type"
            ),
            KernelError::Io(e) => write!(f, "kernel cache I/O error: {e}"),
        }
    }
}

impl std::error::Error for KernelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KernelError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for KernelError {
    fn from(e: std::io::Error) -> Self {
        KernelError::Io(e)
    }
}

/// Errors raised by [`crate::executor::Executor::execute`].
#[derive(Debug)]
pub enum ExecutorError {
    /// A particle's `err_set` membership and state were identical across two
    /// consecutive recovery passes: the recovery map cannot make progress
    /// (a particle cycling through the same error code with no progress).
    StuckRecovery(Vec<i32>),
    Field(FieldError),
    Kernel(KernelError),
    Grid(GridError),
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorError::StuckRecovery(ids) => write!(
                f,
                "recovery map made no progress on particle ids {ids:?}; the same error recurred with no state change"
            ),
            ExecutorError::Field(e) => write!(f, "{e}"),
            ExecutorError::Kernel(e) => write!(f, "{e}"),
            ExecutorError::Grid(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ExecutorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExecutorError::Field(e) => Some(e),
            ExecutorError::Kernel(e) => Some(e),
            ExecutorError::Grid(e) => Some(e),
            ExecutorError::StuckRecovery(_) => None,
        }
    }
}

impl From<FieldError> for ExecutorError {
    fn from(e: FieldError) -> Self {
        ExecutorError::Field(e)
    }
}

impl From<KernelError> for ExecutorError {
    fn from(e: KernelError) -> Self {
        ExecutorError::Kernel(e)
    }
}

impl From<GridError> for ExecutorError {
    fn from(e: GridError) -> Self {
        ExecutorError::Grid(e)
    }
}

/// Crate-level umbrella error, used by the top-level `Grid`/`ParticleSet`
/// convenience methods that can fail for more than one reason.
#[derive(Debug)]
pub enum EngineError {
    Grid(GridError),
    Kernel(KernelError),
    Executor(ExecutorError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Grid(e) => write!(f, "{e}"),
            EngineError::Kernel(e) => write!(f, "{e}"),
            EngineError::Executor(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Grid(e) => Some(e),
            EngineError::Kernel(e) => Some(e),
            EngineError::Executor(e) => Some(e),
        }
    }
}

impl From<GridError> for EngineError {
    fn from(e: GridError) -> Self {
        EngineError::Grid(e)
    }
}

impl From<KernelError> for EngineError {
    fn from(e: KernelError) -> Self {
        EngineError::Kernel(e)
    }
}

impl From<ExecutorError> for EngineError {
    fn from(e: ExecutorError) -> Self {
        EngineError::Executor(e)
    }
}
