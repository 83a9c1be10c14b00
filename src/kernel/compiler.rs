//! Abstracts invoking an external C compiler so the engine and its tests
//! never have to agree on one concrete toolchain.

use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::Mutex;

use crate::error::KernelError;

/// Compiles one generated C source file into a shared library.
///
/// Implementations are free to shell out to any compiler; the engine only
/// needs the resulting library to export `particle_loop` with the
/// signature `runtime/sample.c`'s declarations describe.
pub trait Compiler: Send + Sync {
    fn compile(&self, source_path: &Path, library_path: &Path, log_path: &Path) -> Result<(), KernelError>;
}

/// Shells out to the system's C compiler (`$CC`, default `cc`), building a
/// position-independent shared library the way `gcc -shared -fPIC` would.
pub struct CcCompiler {
    pub cc: String,
    pub extra_args: Vec<String>,
}

impl Default for CcCompiler {
    fn default() -> Self {
        CcCompiler {
            cc: std::env::var("CC").unwrap_or_else(|_| "cc".to_string()),
            extra_args: vec!["-O2".to_string(), "-lm".to_string()],
        }
    }
}

impl Compiler for CcCompiler {
    fn compile(&self, source_path: &Path, library_path: &Path, log_path: &Path) -> Result<(), KernelError> {
        let output = Command::new(&self.cc)
            .arg("-shared")
            .arg("-fPIC")
            .args(&self.extra_args)
            .arg("-o")
            .arg(library_path)
            .arg(source_path)
            .output()?;

        fs::write(log_path, &output.stderr)?;

        if output.status.success() {
            Ok(())
        } else {
            Err(KernelError::Compile { log_path: log_path.to_path_buf() })
        }
    }
}

/// Test double recording every invocation instead of actually compiling
/// anything, and writing an empty placeholder file at `library_path` so
/// cache-hit bookkeeping can be exercised without a real toolchain.
#[derive(Default)]
pub struct SpyCompiler {
    pub calls: Mutex<Vec<(std::path::PathBuf, std::path::PathBuf)>>,
    pub fail: bool,
}

impl Compiler for SpyCompiler {
    fn compile(&self, source_path: &Path, library_path: &Path, log_path: &Path) -> Result<(), KernelError> {
        self.calls
            .lock()
            .unwrap()
            .push((source_path.to_path_buf(), library_path.to_path_buf()));
        if self.fail {
            fs::write(log_path, b"spy compiler configured to fail")?;
            return Err(KernelError::Compile { log_path: log_path.to_path_buf() });
        }
        fs::write(library_path, b"")?;
        Ok(())
    }
}
