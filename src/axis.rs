//! Monotonic coordinate axes shared between fields of a [`crate::grid::Grid`].
//!
//! Axes are wrapped in `Arc` so that, say, the U and V fields of a C-grid
//! can share the same lon/lat/time axis storage without duplicating it per
//! field.

use std::sync::Arc;

use crate::error::GridError;

/// A strictly monotonically increasing sequence of coordinate values.
///
/// Shared (via `Arc`) across every field of a grid that's defined on the
/// same coordinate points.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    values: Vec<f64>,
}

impl Axis {
    /// Builds an axis from `values`, checking strict monotonicity.
    pub fn new(values: Vec<f64>, name: &'static str) -> Result<Self, GridError> {
        if values.windows(2).any(|w| w[1] <= w[0]) {
            return Err(GridError::NonMonotonicAxis { axis: name });
        }
        Ok(Axis { values })
    }

    /// Wraps `new` in an `Arc` for sharing across fields.
    pub fn shared(values: Vec<f64>, name: &'static str) -> Result<Arc<Self>, GridError> {
        Ok(Arc::new(Self::new(values, name)?))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn first(&self) -> f64 {
        self.values[0]
    }

    pub fn last(&self) -> f64 {
        self.values[self.values.len() - 1]
    }

    /// `true` if `x` lies within `[first(), last()]` inclusive.
    pub fn contains(&self, x: f64) -> bool {
        x >= self.first() && x <= self.last()
    }

    /// Returns the bracketing index pair `(lo, hi)` and the interpolation
    /// fraction `t` in `[0, 1]` such that
    /// `x == values[lo] * (1 - t) + values[hi] * t`.
    ///
    /// Uses `partition_point` (binary search, O(log n)) to find the lower
    /// bracket. Ties resolve to the lower index: an exact hit on
    /// an interior grid point brackets `(i, i+1)` rather than `(i-1, i)`,
    /// except at the very last point where `(n-2, n-1)` is used so `hi`
    /// stays in bounds.
    pub fn bracket(&self, x: f64) -> Option<(usize, usize, f64)> {
        if !self.contains(x) || self.values.len() < 2 {
            return None;
        }
        let n = self.values.len();
        // Index of the first value strictly greater than x.
        let upper = self.values.partition_point(|&v| v <= x);
        let lo = if upper == 0 {
            0
        } else if upper >= n {
            n - 2
        } else {
            upper - 1
        };
        let hi = lo + 1;
        let span = self.values[hi] - self.values[lo];
        let t = if span.abs() < f64::EPSILON {
            0.0
        } else {
            (x - self.values[lo]) / span
        };
        Some((lo, hi, t))
    }
}
