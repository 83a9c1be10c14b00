//! Ergonomic construction of a kernel body, without the user ever writing
//! an `Stmt`/`Expr` variant by hand.
//!
//! Mirrors the shader-assembly style the native particle engine this crate
//! grew out of used for its own rule set: a builder accumulates statements,
//! and nested scopes (`if_`) borrow the same builder rather than returning
//! a separate tree the caller has to splice back in.

use crate::kernel::ast::{Expr, Stmt};
use crate::particle::ErrorCode;

/// Accumulates the `Vec<Stmt>` for one kernel body or one branch of an `if`.
#[derive(Default)]
pub struct KernelBuilder {
    stmts: Vec<Stmt>,
}

impl KernelBuilder {
    pub fn new() -> Self {
        KernelBuilder { stmts: Vec::new() }
    }

    /// Declares a local variable bound to `value` and returns an `Expr`
    /// referencing it, so call sites read like ordinary `let` bindings:
    /// `let u1 = b.let_("u1", Expr::sample_here("U", lon, lat));`.
    pub fn let_(&mut self, name: impl Into<String>, value: Expr) -> Expr {
        let name = name.into();
        self.stmts.push(Stmt::Let { name: name.clone(), value });
        Expr::var(name)
    }

    /// Reassigns a previously `let_`-bound local.
    pub fn assign(&mut self, name: impl Into<String>, value: Expr) {
        self.stmts.push(Stmt::Assign { name: name.into(), value });
    }

    /// `particle.<name> = value`.
    pub fn set_attr(&mut self, name: impl Into<String>, value: Expr) {
        self.stmts.push(Stmt::SetAttr { name: name.into(), value });
    }

    /// Marks the particle for deletion at the end of the current step.
    pub fn delete(&mut self) {
        self.stmts.push(Stmt::Delete);
    }

    /// Overrides this step's reported status.
    pub fn set_state(&mut self, code: ErrorCode) {
        self.stmts.push(Stmt::SetState(code));
    }

    /// Builds an `if`/`else` with each branch built by its own closure over
    /// a fresh builder scope.
    pub fn if_(
        &mut self,
        cond: Expr,
        then_branch: impl FnOnce(&mut KernelBuilder),
        else_branch: impl FnOnce(&mut KernelBuilder),
    ) {
        let mut then_builder = KernelBuilder::new();
        then_branch(&mut then_builder);
        let mut else_builder = KernelBuilder::new();
        else_branch(&mut else_builder);
        self.stmts.push(Stmt::If {
            cond,
            then_branch: then_builder.stmts,
            else_branch: else_builder.stmts,
        });
    }

    /// `if_` with no `else` branch.
    pub fn if_only(&mut self, cond: Expr, then_branch: impl FnOnce(&mut KernelBuilder)) {
        self.if_(cond, then_branch, |_| {});
    }

    /// Builds a `while cond { body }` loop, `body` run in its own scope.
    pub fn while_(&mut self, cond: Expr, body: impl FnOnce(&mut KernelBuilder)) {
        let mut loop_builder = KernelBuilder::new();
        body(&mut loop_builder);
        self.stmts.push(Stmt::While { cond, body: loop_builder.stmts });
    }

    /// Builds a `for var in start..end { body }` loop, `var` bound in `body`'s
    /// scope and stepping by `1.0` each iteration.
    pub fn for_range(
        &mut self,
        var: impl Into<String>,
        start: Expr,
        end: Expr,
        body: impl FnOnce(&mut KernelBuilder),
    ) {
        let mut loop_builder = KernelBuilder::new();
        body(&mut loop_builder);
        self.stmts.push(Stmt::For { var: var.into(), start, end, body: loop_builder.stmts });
    }

    pub fn build(self) -> Vec<Stmt> {
        self.stmts
    }
}

/// Builds a kernel body: `body(|b| { ... })`.
pub fn body(f: impl FnOnce(&mut KernelBuilder)) -> Vec<Stmt> {
    let mut builder = KernelBuilder::new();
    f(&mut builder);
    builder.build()
}
