//! Lowers a kernel body to C source for the native execution path.
//!
//! The emitted translation unit declares a `Particle` struct whose field
//! order and types mirror the Rust `ParticleType`'s `#[repr(C)]` layout
//! exactly, a `kernel_step` function transliterated from the `Stmt`/`Expr`
//! tree, and a `particle_loop` entry point — the one symbol
//! [`super::library`] looks up after compilation — that sweeps every
//! particle in the packed row buffer and calls it.
//!
//! Field sampling compiles to a call into the embedded runtime
//! (`runtime/sample.c`, included verbatim via `include_str!`) rather than
//! inlining the bracket-search/interpolation math per call site: the
//! runtime is the single place that logic lives, shared by every generated
//! kernel.

use crate::kernel::ast::{BinOp, Expr, Stmt};
use crate::particle::ParticleSchema;

/// The embedded C runtime providing `ptrack_sample` and the field/grid
/// struct declarations every generated kernel links against.
pub const RUNTIME_SOURCE: &str = include_str!("../runtime/sample.c");

/// Generates the full C translation unit for one kernel.
pub fn generate_source(kernel_name: &str, stmts: &[Stmt], schema: &ParticleSchema) -> String {
    let mut out = String::new();
    out.push_str("#include <math.h>\n");
    out.push_str("#include <stdint.h>\n");
    out.push_str("#include <stddef.h>\n\n");
    out.push_str(RUNTIME_SOURCE);
    out.push('\n');
    out.push_str(&generate_struct(schema));
    out.push('\n');
    out.push_str(&generate_step_function(kernel_name, stmts, schema));
    out.push('\n');
    out.push_str(&generate_loop_function(kernel_name));
    out
}

fn generate_struct(schema: &ParticleSchema) -> String {
    let mut out = String::from("typedef struct {\n");
    for field in schema.fields {
        out.push_str(&format!("    {} {};\n", field.elem_type.c_type(), field.name));
    }
    out.push_str("} Particle;\n");
    out
}

fn step_fn_name(kernel_name: &str) -> String {
    format!("kernel_step_{kernel_name}")
}

fn generate_step_function(kernel_name: &str, stmts: &[Stmt], schema: &ParticleSchema) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "static int32_t {}(Particle* p, const PtrackGrid* grid) {{\n",
        step_fn_name(kernel_name)
    ));
    out.push_str("    int32_t __status = 0; /* ErrorCode::Success */\n");
    let mut tmp_counter = 0usize;
    for stmt in stmts {
        generate_stmt(stmt, schema, &mut out, 1, &mut tmp_counter);
    }
    out.push_str("    return __status;\n");
    out.push_str("}\n");
    out
}

/// Emits `particle_loop`, which runs every row through the same
/// `dt_remaining` state machine `Executor::execute_interpreted` runs in
/// Rust: clamp this step to whatever's left before `endtime`, call the
/// kernel, advance on success, retry on repeat, stop and report the row's
/// status on anything else. Recovery itself stays in Rust, single-threaded,
/// between native sweeps — this loop never consults a recovery map.
fn generate_loop_function(kernel_name: &str) -> String {
    let step_fn = step_fn_name(kernel_name);
    let mut out = String::new();
    out.push_str("void particle_loop(Particle* particles, size_t n, double endtime, const PtrackGrid* grid) {\n");
    out.push_str("    size_t i;\n");
    out.push_str("    for (i = 0; i < n; i++) {\n");
    out.push_str("        Particle* p = &particles[i];\n");
    out.push_str("        double sign;\n");
    out.push_str("        if (p->state == 2 /* Delete */) continue;\n");
    out.push_str("        sign = (p->dt < 0.0) ? -1.0 : 1.0;\n");
    out.push_str("        for (;;) {\n");
    out.push_str("            double remaining = fabs(endtime - p->time);\n");
    out.push_str("            double mag = fabs(p->dt);\n");
    out.push_str("            double dt_remaining = (mag < remaining) ? mag : remaining;\n");
    out.push_str("            double orig_dt, step_dt;\n");
    out.push_str("            int32_t res;\n");
    out.push_str("            if (dt_remaining <= 0.0) break;\n");
    out.push_str("            orig_dt = p->dt;\n");
    out.push_str("            step_dt = sign * dt_remaining;\n");
    out.push_str("            p->dt = step_dt;\n");
    out.push_str(&format!("            res = {step_fn}(p, grid);\n"));
    out.push_str("            p->state = res;\n");
    // A kernel that leaves `dt` exactly as clamped gets its pre-step `dt`
    // restored; one that writes its own (e.g. an adaptive halving/doubling
    // scheme) keeps what it wrote. Mirrors Executor::execute_interpreted.
    out.push_str("            if (p->dt == step_dt) { p->dt = orig_dt; }\n");
    out.push_str("            if (res == 0 /* Success */) { p->time += step_dt; continue; }\n");
    out.push_str("            if (res == 1 /* Repeat */) continue;\n");
    out.push_str("            break;\n");
    out.push_str("        }\n");
    out.push_str("    }\n");
    out.push_str("}\n");
    out
}

fn indent_str(level: usize) -> String {
    "    ".repeat(level)
}

/// Emits the check every expression that might contain a `FieldSample`
/// needs right after it's evaluated: `ptrack_sample` reports an
/// out-of-domain query by setting a process-global flag (`runtime/sample.c`
/// can't return a Rust `Result` across the C boundary) rather than by its
/// return value, so the generated code has to poll for it explicitly to
/// match the interpreter, which aborts the statement sequence the instant
/// `Field::sample` errors — both paths must reach the same post-step
/// status for the same out-of-bounds condition.
fn emit_oob_check(pad: &str, out: &mut String) {
    out.push_str(&format!("{pad}if (ptrack_take_oob_flag()) {{ __status = 3; return __status; }}\n"));
}

fn next_tmp(counter: &mut usize) -> String {
    *counter += 1;
    format!("__t{counter}")
}

fn generate_stmt(stmt: &Stmt, schema: &ParticleSchema, out: &mut String, indent: usize, tmp_counter: &mut usize) {
    let pad = indent_str(indent);
    match stmt {
        Stmt::Let { name, value } => {
            out.push_str(&format!("{pad}double {name} = {};\n", generate_expr(value, schema)));
            emit_oob_check(&pad, out);
        }
        Stmt::Assign { name, value } => {
            out.push_str(&format!("{pad}{name} = {};\n", generate_expr(value, schema)));
            emit_oob_check(&pad, out);
        }
        Stmt::SetAttr { name, value } => {
            // Evaluate into a temporary and check for out-of-bounds before
            // writing `p->name`: the interpreter never applies a
            // `SetAttr` whose value expression raised, so a native sample
            // failure must not clobber the particle's row either.
            let tmp = next_tmp(tmp_counter);
            out.push_str(&format!("{pad}double {tmp} = {};\n", generate_expr(value, schema)));
            emit_oob_check(&pad, out);
            out.push_str(&format!("{pad}p->{name} = ({}) ({tmp});\n", attr_c_type(schema, name)));
        }
        Stmt::If { cond, then_branch, else_branch } => {
            let tmp = next_tmp(tmp_counter);
            out.push_str(&format!("{pad}double {tmp} = {};\n", generate_expr(cond, schema)));
            emit_oob_check(&pad, out);
            out.push_str(&format!("{pad}if ({tmp} != 0.0) {{\n"));
            for s in then_branch {
                generate_stmt(s, schema, out, indent + 1, tmp_counter);
            }
            if else_branch.is_empty() {
                out.push_str(&format!("{pad}}}\n"));
            } else {
                out.push_str(&format!("{pad}}} else {{\n"));
                for s in else_branch {
                    generate_stmt(s, schema, out, indent + 1, tmp_counter);
                }
                out.push_str(&format!("{pad}}}\n"));
            }
        }
        Stmt::While { cond, body } => {
            out.push_str(&format!("{pad}for (;;) {{\n"));
            let inner_pad = indent_str(indent + 1);
            let tmp = next_tmp(tmp_counter);
            out.push_str(&format!("{inner_pad}double {tmp} = {};\n", generate_expr(cond, schema)));
            emit_oob_check(&inner_pad, out);
            out.push_str(&format!("{inner_pad}if ({tmp} == 0.0) break;\n"));
            for s in body {
                generate_stmt(s, schema, out, indent + 1, tmp_counter);
            }
            out.push_str(&format!("{pad}}}\n"));
        }
        Stmt::For { var, start, end, body } => {
            let start_tmp = next_tmp(tmp_counter);
            out.push_str(&format!("{pad}double {start_tmp} = {};\n", generate_expr(start, schema)));
            emit_oob_check(&pad, out);
            let end_tmp = next_tmp(tmp_counter);
            out.push_str(&format!("{pad}double {end_tmp} = {};\n", generate_expr(end, schema)));
            emit_oob_check(&pad, out);
            out.push_str(&format!(
                "{pad}for (double {var} = {start_tmp}; {var} < {end_tmp}; {var} += 1.0) {{\n"
            ));
            for s in body {
                generate_stmt(s, schema, out, indent + 1, tmp_counter);
            }
            out.push_str(&format!("{pad}}}\n"));
        }
        Stmt::Delete => {
            out.push_str(&format!("{pad}__status = 2; /* ErrorCode::Delete */\n"));
            out.push_str(&format!("{pad}return __status;\n"));
        }
        Stmt::SetState(code) => {
            out.push_str(&format!("{pad}__status = {};\n", *code as i32));
            out.push_str(&format!("{pad}return __status;\n"));
        }
    }
}

fn attr_c_type(schema: &ParticleSchema, name: &str) -> &'static str {
    match name {
        "lon" | "lat" | "dep" => "float",
        "time" | "dt" => "double",
        "id" | "state" => "int32_t",
        _ => schema.field(name).map(|f| f.elem_type.c_type()).unwrap_or("double"),
    }
}

fn generate_expr(expr: &Expr, schema: &ParticleSchema) -> String {
    match expr {
        Expr::FloatLit(v) => format!("({v:.17})"),
        Expr::IntLit(v) => format!("({v})"),
        Expr::Var(name) => name.clone(),
        Expr::Attr(name) => format!("((double) p->{name})"),
        Expr::FieldSample { field, lon, lat, dep, time } => format!(
            "ptrack_sample(grid, \"{}\", (float)({}), (float)({}), (float)({}), (double)({}))",
            field,
            generate_expr(lon, schema),
            generate_expr(lat, schema),
            generate_expr(dep, schema),
            generate_expr(time, schema),
        ),
        Expr::BinOp { op, lhs, rhs } => {
            let l = generate_expr(lhs, schema);
            let r = generate_expr(rhs, schema);
            format!("({} {} {})", l, bin_op_token(*op), r)
        }
        Expr::Neg(inner) => format!("(-{})", generate_expr(inner, schema)),
        Expr::Call { func, args } => {
            let c_func = match *func {
                "random_uniform" => "ptrack_random_uniform",
                "random_normal" => "ptrack_random_normal",
                other => other,
            };
            let args = args.iter().map(|a| generate_expr(a, schema)).collect::<Vec<_>>().join(", ");
            format!("{c_func}({args})")
        }
    }
}

fn bin_op_token(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Lt => "<",
        BinOp::Le => "<=",
        BinOp::Gt => ">",
        BinOp::Ge => ">=",
        BinOp::Eq => "==",
    }
}
