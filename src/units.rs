//! Coordinate unit tags for field axes.
//!
//! A `Field` itself is unit-agnostic: `sample` always returns the raw
//! interpolated value. Units only matter one layer up, in the numerical
//! methods (`crate::methods`) that turn a sampled velocity into a lon/lat
//! displacement — a velocity field tagged `Metres` needs converting to
//! degrees before it can be added to a particle's `lon`/`lat`, while one
//! tagged `Degrees` (already expressed as degrees/second) does not.

use std::f64::consts::PI;

/// Mean radius of the Earth in metres, used to convert metre displacements
/// to degrees of longitude/latitude.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Units a field's values are expressed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unit {
    /// Values are metres (or metres/second for velocity fields); converted
    /// to degrees using the local latitude before being applied to a
    /// particle's position.
    Metres,
    /// Values are already expressed in degrees (or degrees/second);
    /// applied to a particle's position unconverted.
    Degrees,
    /// No positional meaning (e.g. a scalar tracer field); never converted.
    Unitless,
}

impl Unit {
    /// Converts a displacement in this unit to degrees of longitude at
    /// `lat_deg` degrees latitude. `Metres` accounts for meridian
    /// convergence; `Degrees` and `Unitless` pass through unchanged.
    pub fn to_degrees_lon(&self, value: f64, lat_deg: f64) -> f64 {
        match self {
            Unit::Metres => {
                let lat_rad = lat_deg * PI / 180.0;
                let circumference_at_lat = 2.0 * PI * EARTH_RADIUS_M * lat_rad.cos();
                if circumference_at_lat.abs() < f64::EPSILON {
                    0.0
                } else {
                    value * 360.0 / circumference_at_lat
                }
            }
            Unit::Degrees | Unit::Unitless => value,
        }
    }

    /// Converts a displacement in this unit to degrees of latitude.
    pub fn to_degrees_lat(&self, value: f64) -> f64 {
        match self {
            Unit::Metres => value * 360.0 / (2.0 * PI * EARTH_RADIUS_M),
            Unit::Degrees | Unit::Unitless => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metres_conversion_shrinks_towards_the_poles() {
        let equator = Unit::Metres.to_degrees_lon(1000.0, 0.0);
        let near_pole = Unit::Metres.to_degrees_lon(1000.0, 80.0);
        assert!(near_pole > equator);
    }

    #[test]
    fn degrees_and_unitless_pass_through_unchanged() {
        assert_eq!(Unit::Degrees.to_degrees_lon(1.5, 45.0), 1.5);
        assert_eq!(Unit::Unitless.to_degrees_lat(1.5), 1.5);
    }

    #[test]
    fn metres_latitude_conversion_matches_the_meridian_circumference() {
        let full_circle = Unit::Metres.to_degrees_lat(2.0 * PI * EARTH_RADIUS_M);
        assert!((full_circle - 360.0).abs() < 1e-9);
    }
}
