//! On-disk cache for compiled kernels, keyed by a hash of everything that
//! affects the generated C source: the kernel's name, the particle
//! schema's cache-key descriptor, and the unit tag of every field the
//! kernel's AST references — changing any of these must
//! invalidate the cache, since the generated source would differ.

use std::path::{Path, PathBuf};

use md5::{Digest, Md5};

use crate::grid::Grid;
use crate::kernel::ast::{Expr, Stmt};

/// Computes the stable cache key for one kernel/schema/grid combination.
pub fn cache_key(kernel_name: &str, particle_cache_key: &str, field_units: &[(String, String)]) -> String {
    let mut tags: Vec<String> = field_units.iter().map(|(name, unit)| format!("{name}:{unit}")).collect();
    tags.sort();

    let mut hasher = Md5::new();
    hasher.update(kernel_name.as_bytes());
    hasher.update(b"\0");
    hasher.update(particle_cache_key.as_bytes());
    hasher.update(b"\0");
    hasher.update(tags.join(",").as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Collects `(field_name, unit_tag)` pairs for every field a kernel body
/// references, in the order they first appear, by walking the AST.
pub fn referenced_field_units(stmts: &[Stmt], grid: &Grid) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for stmt in stmts {
        walk_stmt(stmt, grid, &mut out);
    }
    out
}

fn walk_stmt(stmt: &Stmt, grid: &Grid, out: &mut Vec<(String, String)>) {
    match stmt {
        Stmt::Let { value, .. } | Stmt::Assign { value, .. } | Stmt::SetAttr { value, .. } => {
            walk_expr(value, grid, out)
        }
        Stmt::If { cond, then_branch, else_branch } => {
            walk_expr(cond, grid, out);
            for s in then_branch {
                walk_stmt(s, grid, out);
            }
            for s in else_branch {
                walk_stmt(s, grid, out);
            }
        }
        Stmt::While { cond, body } => {
            walk_expr(cond, grid, out);
            for s in body {
                walk_stmt(s, grid, out);
            }
        }
        Stmt::For { start, end, body, .. } => {
            walk_expr(start, grid, out);
            walk_expr(end, grid, out);
            for s in body {
                walk_stmt(s, grid, out);
            }
        }
        Stmt::Delete | Stmt::SetState(_) => {}
    }
}

fn walk_expr(expr: &Expr, grid: &Grid, out: &mut Vec<(String, String)>) {
    match expr {
        Expr::FieldSample { field, lon, lat, dep, time } => {
            if let Some(f) = grid.field(field) {
                let tag = format!("{:?}", f.unit);
                if !out.iter().any(|(n, _)| n == field) {
                    out.push((field.clone(), tag));
                }
            }
            walk_expr(lon, grid, out);
            walk_expr(lat, grid, out);
            walk_expr(dep, grid, out);
            walk_expr(time, grid, out);
        }
        Expr::BinOp { lhs, rhs, .. } => {
            walk_expr(lhs, grid, out);
            walk_expr(rhs, grid, out);
        }
        Expr::Neg(inner) => walk_expr(inner, grid, out),
        Expr::Call { args, .. } => {
            for a in args {
                walk_expr(a, grid, out);
            }
        }
        Expr::FloatLit(_) | Expr::IntLit(_) | Expr::Var(_) | Expr::Attr(_) => {}
    }
}

/// Paths for one cache entry, all sharing the same stem within `cache_dir`.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub source_path: PathBuf,
    pub library_path: PathBuf,
    pub log_path: PathBuf,
}

impl CacheEntry {
    pub fn new(cache_dir: &Path, key: &str) -> Self {
        CacheEntry {
            source_path: cache_dir.join(format!("{key}.c")),
            library_path: cache_dir.join(format!("{key}.so")),
            log_path: cache_dir.join(format!("{key}.log")),
        }
    }

    /// `true` once a previous run compiled this exact kernel successfully.
    pub fn is_compiled(&self) -> bool {
        self.library_path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_produce_same_key() {
        let a = cache_key("AdvectionEE", "P[lon:f32]", &[("U".into(), "Degrees".into())]);
        let b = cache_key("AdvectionEE", "P[lon:f32]", &[("U".into(), "Degrees".into())]);
        assert_eq!(a, b);
    }

    #[test]
    fn different_schema_changes_key() {
        let a = cache_key("AdvectionEE", "P[lon:f32]", &[]);
        let b = cache_key("AdvectionEE", "Q[lon:f32,age:f32]", &[]);
        assert_ne!(a, b);
    }

    #[test]
    fn field_unit_order_does_not_change_key() {
        let a = cache_key("K", "P", &[("U".into(), "Degrees".into()), ("V".into(), "Degrees".into())]);
        let b = cache_key("K", "P", &[("V".into(), "Degrees".into()), ("U".into(), "Degrees".into())]);
        assert_eq!(a, b);
    }
}
