//! Particle schema introspection and the closed per-particle error/status code.
//!
//! A [`ParticleType`] is never implemented by hand: derive it with
//! `#[derive(ParticleType)]` from `ptrack-derive` (re-exported at the crate
//! root), alongside a real `#[derive(bytemuck::Pod, bytemuck::Zeroable)]` —
//! `ParticleType` requires both, and only bytemuck's own derive can verify
//! the struct carries no padding. The struct you annotate must declare the
//! seven built-in attributes every schema carries — `lon: f32`, `lat: f32`,
//! `dep: f32`, `time: f64`, `dt: f64`, `id: i32`, `state: i32` — by name and
//! type; the derive macro verifies they're present, computes byte offsets
//! for the `#[repr(C)]` packed layout via `std::mem::offset_of!`, and
//! records a `CACHE_KEY` descriptor string used by the kernel compile cache
//! (see [`crate::kernel::cache`]). Any further fields of type
//! `f32`/`f64`/`i32` become "user_vars", reachable from kernels by name
//! through [`ParticleType::get_attr`]/[`ParticleType::set_attr`].

/// Element type tag for one field in a [`ParticleSchema`].
///
/// Used by the kernel code generator to choose the C type for a
/// `p->field`-style accessor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElemType {
    F32,
    F64,
    I32,
}

impl ElemType {
    /// Size in bytes of one element of this type.
    pub const fn size(&self) -> usize {
        match self {
            ElemType::F32 => 4,
            ElemType::F64 => 8,
            ElemType::I32 => 4,
        }
    }

    /// The C type used in generated kernel source.
    pub const fn c_type(&self) -> &'static str {
        match self {
            ElemType::F32 => "float",
            ElemType::F64 => "double",
            ElemType::I32 => "int32_t",
        }
    }
}

/// Offset and type of a single named attribute within a packed particle row.
#[derive(Clone, Copy, Debug)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub offset: usize,
    pub elem_type: ElemType,
}

/// The ordered attribute layout of a particle row, as generated by
/// `#[derive(ParticleType)]`.
///
/// Carries enough information for the kernel code generator to emit
/// `p->attr`-style accessors over the packed row without any runtime
/// reflection.
#[derive(Clone, Copy, Debug)]
pub struct ParticleSchema {
    pub fields: &'static [FieldDescriptor],
    pub row_size: usize,
}

impl ParticleSchema {
    /// Look up a field by name. Used by the code generator when lowering
    /// `particle.attr` expressions.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Per-particle post-step status. A closed enumeration: `Success` and
/// `Repeat` are "live" codes that keep the executor's inner loop running;
/// the remainder drive the recovery map (see [`crate::executor`]).
///
/// `#[repr(i32)]` so the value round-trips through the packed `state: i32`
/// row field and through the C ABI used by the native `particle_loop`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum ErrorCode {
    #[default]
    Success = 0,
    Repeat = 1,
    Delete = 2,
    ErrorOutOfBounds = 3,
    Error = 4,
}

impl ErrorCode {
    /// Live codes keep the inner `dt_remaining` loop of [`crate::executor::Executor`] running.
    pub const fn is_live(&self) -> bool {
        matches!(self, ErrorCode::Success | ErrorCode::Repeat)
    }

    pub const fn from_i32(v: i32) -> Self {
        match v {
            0 => ErrorCode::Success,
            1 => ErrorCode::Repeat,
            2 => ErrorCode::Delete,
            3 => ErrorCode::ErrorOutOfBounds,
            _ => ErrorCode::Error,
        }
    }
}

/// Trait implemented by `#[derive(ParticleType)]`. Never implement by hand —
/// the derive macro validates the required fields and computes the packed
/// layout and cache-key descriptor.
pub trait ParticleType: Copy + Clone + Default + bytemuck::Pod + bytemuck::Zeroable + Send + Sync + 'static {
    /// Layout of this schema's packed row.
    const SCHEMA: ParticleSchema;

    /// Stable descriptor string over the schema, folded into the kernel
    /// cache key alongside the kernel name and field units.
    const CACHE_KEY: &'static str;

    /// Selects the native (compiled) execution path when `true`, the
    /// interpreted path otherwise. Set via `#[particle_type(jit)]`.
    const USES_JIT: bool = false;

    fn lon(&self) -> f32;
    fn set_lon(&mut self, v: f32);
    fn lat(&self) -> f32;
    fn set_lat(&mut self, v: f32);
    fn dep(&self) -> f32;
    fn set_dep(&mut self, v: f32);
    fn time(&self) -> f64;
    fn set_time(&mut self, v: f64);
    fn dt(&self) -> f64;
    fn set_dt(&mut self, v: f64);
    fn id(&self) -> i32;
    fn set_id(&mut self, v: i32);

    fn state(&self) -> ErrorCode;
    fn set_state(&mut self, v: ErrorCode);

    /// Generic read access to a user-declared scalar attribute by name,
    /// widened to `f64`. Used by the kernel interpreter when evaluating
    /// `particle.attr` expressions that aren't one of the built-ins above.
    fn get_attr(&self, name: &str) -> Option<f64>;

    /// Generic write access to a user-declared scalar attribute by name.
    /// Returns `false` if `name` isn't a field of this schema.
    fn set_attr(&mut self, name: &str, value: f64) -> bool;
}
