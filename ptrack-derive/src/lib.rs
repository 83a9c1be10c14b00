//! Derive macro for particle schemas used by the `ptrack` particle-tracking
//! engine.
//!
//! This crate provides one derive macro:
//!
//! - `ParticleType` — validates the required built-in attributes on a
//!   particle struct, computes its packed byte layout, and implements
//!   `ptrack::particle::ParticleType`.
//!
//! # Usage
//!
//! Re-exported from the main `ptrack` crate; you don't need to depend on
//! this crate directly.
//!
//! ```ignore
//! use ptrack::prelude::*;
//!
//! #[derive(ParticleType, Clone, Copy, Default, bytemuck::Pod, bytemuck::Zeroable)]
//! #[repr(C)]
//! struct TracerParticle {
//!     time: f64,
//!     dt: f64,
//!     lon: f32,
//!     lat: f32,
//!     dep: f32,
//!     id: i32,
//!     state: i32,
//!     // user_vars:
//!     age: f32,
//! }
//! ```
//!
//! # The `ParticleType` Macro
//!
//! `#[derive(ParticleType)]` turns a plain `#[repr(C)]` struct into a
//! packed-row particle type usable with `ParticleSet`. It generates:
//!
//! - `impl ptrack::particle::ParticleType`, with `SCHEMA` built from
//!   `std::mem::offset_of!` over every declared field (so field reordering
//!   in your struct is safe — offsets are never hand-computed)
//! - `CACHE_KEY`, a descriptor string of `"name:type"` pairs that becomes
//!   part of the kernel compile-cache key (see `ptrack::kernel::cache`)
//!
//! It does *not* derive `bytemuck::Pod`/`Zeroable` itself — `ParticleType`
//! requires them (see `ptrack::particle::ParticleType`'s bound), so add
//! `#[derive(bytemuck::Pod, bytemuck::Zeroable)]` alongside it. bytemuck's
//! derive rejects any struct with padding at compile time, which is the
//! one sound way to enforce the "no uninitialized bytes in the packed row"
//! invariant `ParticleSet::as_bytes_mut` depends on. A struct that mixes
//! `f64` and 4-byte fields needs every `f64` field ordered before any
//! 4-byte one — putting `time`/`dt` first, as above, leaves zero padding;
//! if the 4-byte fields after them total an odd count, add one more (a
//! `_pad: i32` if no natural user_var fills that slot) so the struct size
//! lands on an 8-byte boundary with nothing left ungapped in between.
//!
//! # Required Fields
//!
//! Every particle struct must declare these seven fields, by name and
//! exact type (field order is free — `SCHEMA` offsets come from
//! `offset_of!`, not declaration order — but see the padding note above):
//!
//! | Field | Type |
//! |-------|------|
//! | `lon` | `f32` |
//! | `lat` | `f32` |
//! | `dep` | `f32` |
//! | `time` | `f64` |
//! | `dt` | `f64` |
//! | `id` | `i32` |
//! | `state` | `i32` |
//!
//! # Optional Fields
//!
//! Any further `f32`, `f64`, or `i32` field becomes a "user_var", reachable
//! from kernels by name through `get_attr`/`set_attr`.
//!
//! # The `jit` Attribute
//!
//! `#[particle_type(jit)]` selects the compiled native execution path
//! (`ParticleType::USES_JIT = true`) instead of the interpreted default.
//!
//! # Panics
//!
//! The macro panics at compile time if:
//! - Applied to anything other than a struct with named fields
//! - A required field is missing or has the wrong type
//! - Any field has a type other than `f32`, `f64`, or `i32`

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Type};

struct RequiredField {
    name: &'static str,
    rust_ty: &'static str,
}

const REQUIRED_FIELDS: &[RequiredField] = &[
    RequiredField { name: "lon", rust_ty: "f32" },
    RequiredField { name: "lat", rust_ty: "f32" },
    RequiredField { name: "dep", rust_ty: "f32" },
    RequiredField { name: "time", rust_ty: "f64" },
    RequiredField { name: "dt", rust_ty: "f64" },
    RequiredField { name: "id", rust_ty: "i32" },
    RequiredField { name: "state", rust_ty: "i32" },
];

fn type_ident(ty: &Type) -> Option<&'static str> {
    if let Type::Path(p) = ty {
        let seg = p.path.segments.last()?;
        return match seg.ident.to_string().as_str() {
            "f32" => Some("f32"),
            "f64" => Some("f64"),
            "i32" => Some("i32"),
            _ => None,
        };
    }
    None
}

fn elem_type_for(rust_ty: &str) -> &'static str {
    match rust_ty {
        "f32" => "F32",
        "f64" => "F64",
        "i32" => "I32",
        _ => unreachable!(),
    }
}

/// See module docs.
#[proc_macro_derive(ParticleType, attributes(particle_type))]
pub fn derive_particle_type(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let uses_jit = input.attrs.iter().any(|attr| {
        attr.path().is_ident("particle_type")
            && attr
                .parse_args::<syn::Ident>()
                .map(|ident| ident == "jit")
                .unwrap_or(false)
    });

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => panic!("ParticleType derive only supports structs with named fields"),
        },
        _ => panic!("ParticleType derive only supports structs"),
    };

    let mut seen = std::collections::HashMap::new();
    for field in fields.iter() {
        let field_name = field.ident.as_ref().unwrap().to_string();
        let rust_ty = type_ident(&field.ty).unwrap_or_else(|| {
            panic!("ParticleType field '{}' must be f32, f64, or i32", field_name)
        });
        seen.insert(field_name, rust_ty);
    }

    for req in REQUIRED_FIELDS {
        match seen.get(req.name) {
            Some(ty) if *ty == req.rust_ty => {}
            Some(ty) => panic!(
                "ParticleType field '{}' must have type {}, found {}",
                req.name, req.rust_ty, ty
            ),
            None => panic!(
                "ParticleType struct '{}' is missing required field '{}: {}'",
                name, req.name, req.rust_ty
            ),
        }
    }

    let field_descriptors: Vec<_> = fields
        .iter()
        .map(|field| {
            let field_name = field.ident.as_ref().unwrap();
            let field_name_str = field_name.to_string();
            let rust_ty = type_ident(&field.ty).unwrap();
            let elem = syn::Ident::new(elem_type_for(rust_ty), proc_macro2::Span::call_site());
            quote! {
                ::ptrack::particle::FieldDescriptor {
                    name: #field_name_str,
                    offset: ::std::mem::offset_of!(#name, #field_name),
                    elem_type: ::ptrack::particle::ElemType::#elem,
                }
            }
        })
        .collect();

    let cache_key_str = fields
        .iter()
        .map(|field| {
            let field_name = field.ident.as_ref().unwrap().to_string();
            let rust_ty = type_ident(&field.ty).unwrap();
            format!("{}:{}", field_name, rust_ty)
        })
        .collect::<Vec<_>>()
        .join(",");
    let cache_key = format!("{}[{}]", name, cache_key_str);

    let get_attr_arms = fields.iter().map(|field| {
        let field_name = field.ident.as_ref().unwrap();
        let field_name_str = field_name.to_string();
        quote! { #field_name_str => Some(self.#field_name as f64) }
    });

    let set_attr_arms = fields.iter().map(|field| {
        let field_name = field.ident.as_ref().unwrap();
        let field_name_str = field_name.to_string();
        let rust_ty = type_ident(&field.ty).unwrap();
        let cast = syn::Ident::new(rust_ty, proc_macro2::Span::call_site());
        quote! { #field_name_str => { self.#field_name = value as #cast; true } }
    });

    let n_fields = field_descriptors.len();

    let expanded = quote! {
        impl ::ptrack::particle::ParticleType for #name {
            const SCHEMA: ::ptrack::particle::ParticleSchema = ::ptrack::particle::ParticleSchema {
                fields: {
                    const FIELDS: [::ptrack::particle::FieldDescriptor; #n_fields] = [#(#field_descriptors),*];
                    &FIELDS
                },
                row_size: ::std::mem::size_of::<#name>(),
            };

            const CACHE_KEY: &'static str = #cache_key;
            const USES_JIT: bool = #uses_jit;

            fn lon(&self) -> f32 { self.lon }
            fn set_lon(&mut self, v: f32) { self.lon = v; }
            fn lat(&self) -> f32 { self.lat }
            fn set_lat(&mut self, v: f32) { self.lat = v; }
            fn dep(&self) -> f32 { self.dep }
            fn set_dep(&mut self, v: f32) { self.dep = v; }
            fn time(&self) -> f64 { self.time }
            fn set_time(&mut self, v: f64) { self.time = v; }
            fn dt(&self) -> f64 { self.dt }
            fn set_dt(&mut self, v: f64) { self.dt = v; }
            fn id(&self) -> i32 { self.id }
            fn set_id(&mut self, v: i32) { self.id = v; }

            fn state(&self) -> ::ptrack::particle::ErrorCode {
                ::ptrack::particle::ErrorCode::from_i32(self.state)
            }
            fn set_state(&mut self, v: ::ptrack::particle::ErrorCode) {
                self.state = v as i32;
            }

            fn get_attr(&self, name: &str) -> Option<f64> {
                match name {
                    #(#get_attr_arms,)*
                    _ => None,
                }
            }

            fn set_attr(&mut self, name: &str, value: f64) -> bool {
                match name {
                    #(#set_attr_arms,)*
                    _ => false,
                }
            }
        }
    };

    TokenStream::from(expanded)
}
