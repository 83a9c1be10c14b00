//! A single scalar field sampled on a structured lon/lat/time grid.
//!
//! Storage is a flat `Vec<f32>` in time-major, then latitude, then
//! longitude order (`idx = (ti * ny + yi) * nx + xi`) rather than an
//! `ndarray::Array3` — the packed layout is what the generated C kernels
//! index into directly, so the Rust and native sampling paths read the
//! exact same bytes.

use std::sync::Arc;

use crate::axis::Axis;
use crate::error::{FieldError, GridError};
use crate::units::Unit;

/// A sampled field on a structured grid: one value per `(time, lat, lon)`
/// grid point.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub unit: Unit,
    lon: Arc<Axis>,
    lat: Arc<Axis>,
    time: Arc<Axis>,
    /// Flat storage, `(time, lat, lon)` order.
    data: Vec<f32>,
}

impl Field {
    /// Builds a field from flat `data` and its three shared axes.
    ///
    /// `data.len()` must equal `lon.len() * lat.len() * time.len()`.
    pub fn new(
        name: impl Into<String>,
        unit: Unit,
        lon: Arc<Axis>,
        lat: Arc<Axis>,
        time: Arc<Axis>,
        data: Vec<f32>,
    ) -> Result<Self, GridError> {
        let name = name.into();
        let expected = lon.len() * lat.len() * time.len();
        if data.len() != expected {
            return Err(GridError::ShapeMismatch { field: name, expected_len: expected, found_len: data.len() });
        }
        Ok(Field { name, unit, lon, lat, time, data })
    }

    pub fn lon_axis(&self) -> &Axis {
        &self.lon
    }

    pub fn lat_axis(&self) -> &Axis {
        &self.lat
    }

    pub fn time_axis(&self) -> &Axis {
        &self.time
    }

    /// Flat `(time, lat, lon)`-ordered storage, for handing to the native
    /// execution path via FFI.
    pub fn raw_data(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    fn at(&self, xi: usize, yi: usize, ti: usize) -> f32 {
        let nx = self.lon.len();
        let ny = self.lat.len();
        self.data[(ti * ny + yi) * nx + xi]
    }

    /// Bilinear-in-space, linear-in-time interpolation at `(lon, lat, time)`.
    ///
    /// Brackets each axis with binary search (`Axis::bracket`, O(log n));
    /// any coordinate landing outside its axis's span is an out-of-bounds
    /// error, never a clamp or extrapolation.
    pub fn sample(&self, lon: f32, lat: f32, time: f64) -> Result<f32, FieldError> {
        let oob = || FieldError::OutOfBounds { lon, lat, time };

        let (xlo, xhi, tx) = self.lon.bracket(lon as f64).ok_or_else(oob)?;
        let (ylo, yhi, ty) = self.lat.bracket(lat as f64).ok_or_else(oob)?;

        // A field defined on a single time slice (e.g. a static bathymetry
        // field) samples that slice regardless of the query time.
        if self.time.len() == 1 {
            return Ok(self.bilinear(xlo, xhi, tx, ylo, yhi, ty, 0));
        }

        let (tlo, thi, tt) = self.time.bracket(time).ok_or_else(oob)?;
        let v_lo = self.bilinear(xlo, xhi, tx, ylo, yhi, ty, tlo) as f64;
        let v_hi = self.bilinear(xlo, xhi, tx, ylo, yhi, ty, thi) as f64;
        Ok((v_lo * (1.0 - tt) + v_hi * tt) as f32)
    }

    #[inline]
    #[allow(clippy::too_many_arguments)]
    fn bilinear(
        &self,
        xlo: usize,
        xhi: usize,
        tx: f64,
        ylo: usize,
        yhi: usize,
        ty: f64,
        ti: usize,
    ) -> f32 {
        let v00 = self.at(xlo, ylo, ti) as f64;
        let v10 = self.at(xhi, ylo, ti) as f64;
        let v01 = self.at(xlo, yhi, ti) as f64;
        let v11 = self.at(xhi, yhi, ti) as f64;
        let v0 = v00 * (1.0 - tx) + v10 * tx;
        let v1 = v01 * (1.0 - tx) + v11 * tx;
        (v0 * (1.0 - ty) + v1 * ty) as f32
    }
}
