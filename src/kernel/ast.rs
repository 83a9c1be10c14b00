//! The expression/statement tree every kernel body is built from.
//!
//! A single `Vec<Stmt>` drives both execution paths: [`super::interpreter`]
//! walks it directly, and [`super::codegen`] lowers it to C. Keeping one
//! tree instead of a Rust closure for the interpreted path and a second,
//! hand-matched enum for codegen is what lets the engine promise the two
//! paths produce identical trajectories — they're two renderings of the
//! same program, not two independently maintained ones.

/// A scalar expression. Always evaluates to `f64` in the interpreter; the
/// code generator narrows to `float`/`double`/`int32_t` based on context
/// (an attribute's declared element type, or the site it's used in).
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    FloatLit(f64),
    IntLit(i32),
    /// A kernel-local variable introduced by `Stmt::Let`.
    Var(String),
    /// A particle attribute: a required built-in (`lon`, `lat`, `dep`,
    /// `time`, `dt`, `id`, `state`) or a schema-declared user_var.
    Attr(String),
    /// Sample a named grid field at an explicit `(lon, lat, dep, time)`
    /// point. `dep` is accepted but unused by 2-D fields.
    FieldSample {
        field: String,
        lon: Box<Expr>,
        lat: Box<Expr>,
        dep: Box<Expr>,
        time: Box<Expr>,
    },
    BinOp { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Neg(Box<Expr>),
    /// A call to one of the runtime's built-in functions (`sqrt`, `sin`,
    /// `cos`, `abs`, `min`, `max`, `random_uniform`, `random_normal`).
    Call { func: &'static str, args: Vec<Expr> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

/// A single statement in a kernel body.
#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    /// Introduce a kernel-local variable, e.g. `let u1 = ...`.
    Let { name: String, value: Expr },
    /// Reassign a previously `Let`-bound local.
    Assign { name: String, value: Expr },
    /// `particle.<name> = value`.
    SetAttr { name: String, value: Expr },
    If { cond: Expr, then_branch: Vec<Stmt>, else_branch: Vec<Stmt> },
    /// Repeats `body` while `cond` is non-zero, re-evaluating `cond` each
    /// iteration against the particle's current state.
    While { cond: Expr, body: Vec<Stmt> },
    /// `for var in start..end { body }`, stepping `var` by `1.0` each
    /// iteration; `start`/`end` are evaluated once, before the first pass.
    For { var: String, start: Expr, end: Expr, body: Vec<Stmt> },
    /// Mark the particle for removal at the end of this step (`ErrorCode::Delete`).
    Delete,
    /// Explicitly set the particle's post-step status, overriding whatever
    /// the step would otherwise report. Used by recovery kernels to clear
    /// an error back to `Success` once they've handled it.
    SetState(crate::particle::ErrorCode),
}

impl Expr {
    pub fn float(v: f64) -> Expr {
        Expr::FloatLit(v)
    }

    pub fn attr(name: impl Into<String>) -> Expr {
        Expr::Attr(name.into())
    }

    pub fn var(name: impl Into<String>) -> Expr {
        Expr::Var(name.into())
    }

    pub fn sample(field: impl Into<String>, lon: Expr, lat: Expr, dep: Expr, time: Expr) -> Expr {
        Expr::FieldSample {
            field: field.into(),
            lon: Box::new(lon),
            lat: Box::new(lat),
            dep: Box::new(dep),
            time: Box::new(time),
        }
    }

    /// `Expr::sample` with `dep = particle.dep` and `time = particle.time`
    /// — the common case of sampling a field at the particle's own current
    /// position, used by every seed-test advection kernel.
    pub fn sample_here(field: impl Into<String>, lon: Expr, lat: Expr) -> Expr {
        Expr::sample(field, lon, lat, Expr::attr("dep"), Expr::attr("time"))
    }

    pub fn call(func: &'static str, args: Vec<Expr>) -> Expr {
        Expr::Call { func, args }
    }

    fn binop(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::BinOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }
    }

    pub fn add(self, rhs: Expr) -> Expr {
        Expr::binop(BinOp::Add, self, rhs)
    }

    pub fn sub(self, rhs: Expr) -> Expr {
        Expr::binop(BinOp::Sub, self, rhs)
    }

    pub fn mul(self, rhs: Expr) -> Expr {
        Expr::binop(BinOp::Mul, self, rhs)
    }

    pub fn div(self, rhs: Expr) -> Expr {
        Expr::binop(BinOp::Div, self, rhs)
    }

    pub fn lt(self, rhs: Expr) -> Expr {
        Expr::binop(BinOp::Lt, self, rhs)
    }

    pub fn gt(self, rhs: Expr) -> Expr {
        Expr::binop(BinOp::Gt, self, rhs)
    }

    pub fn neg(self) -> Expr {
        Expr::Neg(Box::new(self))
    }
}

impl std::ops::Add for Expr {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        Expr::add(self, rhs)
    }
}

impl std::ops::Sub for Expr {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        Expr::sub(self, rhs)
    }
}

impl std::ops::Mul for Expr {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr::mul(self, rhs)
    }
}

impl std::ops::Div for Expr {
    type Output = Expr;
    fn div(self, rhs: Expr) -> Expr {
        Expr::div(self, rhs)
    }
}
