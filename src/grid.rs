//! A named collection of [`Field`]s sharing a coordinate system.
//!
//! A `Grid` is the thing kernels sample from: `particle.U` resolves to
//! `grid.field("U")`. The only hard invariant is that "U" and "V" — the
//! zonal/meridional velocity components every advection method needs —
//! must be present; anything else (a "W" vertical velocity, a tracer
//! field, bathymetry) is optional.

use std::collections::HashMap;
use std::sync::Arc;

use crate::axis::Axis;
use crate::error::GridError;
use crate::field::Field;
use crate::units::Unit;

/// A collection of fields sampled on a shared (or per-field) coordinate grid.
#[derive(Debug, Clone, Default)]
pub struct Grid {
    fields: HashMap<String, Field>,
}

impl Grid {
    /// Builds an empty grid. Use [`Grid::add_field`]/[`Grid::from_data`] to
    /// populate it, then [`Grid::validate`] before executing any kernel.
    pub fn new() -> Self {
        Grid { fields: HashMap::new() }
    }

    /// Inserts or replaces a field.
    pub fn add_field(&mut self, field: Field) {
        self.fields.insert(field.name.clone(), field);
    }

    /// Convenience constructor: build a field in place from flat data and
    /// shared axes and add it to the grid.
    #[allow(clippy::too_many_arguments)]
    pub fn from_data(
        &mut self,
        name: impl Into<String>,
        unit: Unit,
        lon: Arc<Axis>,
        lat: Arc<Axis>,
        time: Arc<Axis>,
        data: Vec<f32>,
    ) -> Result<(), GridError> {
        let field = Field::new(name, unit, lon, lat, time, data)?;
        self.add_field(field);
        Ok(())
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    /// Checks that the grid carries the fields every advection method
    /// requires. Called once by `Executor::execute` before stepping any
    /// particle, rather than lazily on first sample, so a misconfigured
    /// grid fails fast.
    pub fn validate(&self) -> Result<(), GridError> {
        for required in ["U", "V"] {
            if !self.fields.contains_key(required) {
                return Err(GridError::MissingRequiredField(required));
            }
        }
        Ok(())
    }
}

/// A starting layout for seeding a [`crate::particle_set::ParticleSet`]
/// from a grid.
pub enum SeedLayout {
    /// One particle per explicit `(lon, lat, dep)` triple.
    Explicit(Vec<(f32, f32, f32)>),
    /// `n` particles evenly spaced (inclusive) along the straight line from
    /// `start` to `finish`, all at `dep = 0.0`.
    Line { start: (f32, f32), finish: (f32, f32), n: usize },
}

impl SeedLayout {
    /// Expands the layout into explicit `(lon, lat, dep)` triples.
    pub fn positions(&self) -> Vec<(f32, f32, f32)> {
        match self {
            SeedLayout::Explicit(points) => points.clone(),
            SeedLayout::Line { start, finish, n } => {
                if *n == 0 {
                    return Vec::new();
                }
                if *n == 1 {
                    return vec![(start.0, start.1, 0.0)];
                }
                let start = glam::Vec2::from(*start);
                let finish = glam::Vec2::from(*finish);
                (0..*n)
                    .map(|i| {
                        let t = i as f32 / (*n - 1) as f32;
                        let p = start.lerp(finish, t);
                        (p.x, p.y, 0.0)
                    })
                    .collect()
            }
        }
    }
}

/// Hook for reading/writing a grid's fields from an external format (e.g.
/// NetCDF). The engine itself carries no file-format dependency; embedders
/// implement this trait against whatever their input pipeline produces.
pub trait GridIo {
    type Error: std::error::Error + 'static;

    fn read_grid(&self) -> Result<Grid, Self::Error>;
    fn write_grid(&self, grid: &Grid) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uv_grid() -> Grid {
        let mut grid = Grid::new();
        let lon = Axis::shared(vec![0.0, 1.0], "lon").unwrap();
        let lat = Axis::shared(vec![0.0, 1.0], "lat").unwrap();
        let time = Axis::shared(vec![0.0], "time").unwrap();
        grid.from_data("U", Unit::Metres, lon.clone(), lat.clone(), time.clone(), vec![0.0; 4]).unwrap();
        grid.from_data("V", Unit::Metres, lon, lat, time, vec![0.0; 4]).unwrap();
        grid
    }

    #[test]
    fn validate_requires_u_and_v() {
        let grid = Grid::new();
        assert!(grid.validate().is_err());
        assert!(uv_grid().validate().is_ok());
    }

    #[test]
    fn line_layout_spaces_points_evenly() {
        let layout = SeedLayout::Line { start: (0.0, 0.0), finish: (10.0, 0.0), n: 3 };
        let points = layout.positions();
        assert_eq!(points.len(), 3);
        assert!((points[1].0 - 5.0).abs() < 1e-6);
    }
}
