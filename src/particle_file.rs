//! Output hook for recording particle trajectories over time.
//!
//! The engine carries no file-format dependency of its own — no NetCDF,
//! no Zarr — matching the core/ambient split in `SPEC_FULL.md`'s
//! Non-goals: the actual storage format is an embedder's choice, wired in
//! through [`ParticleFileWriter`]. [`CsvParticleFile`] is the one
//! concrete implementation shipped here, useful for tests and small runs;
//! anything wanting a columnar or chunked format implements the trait
//! directly.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::particle::ParticleType;
use crate::particle_set::ParticleSet;

/// Records a [`ParticleSet`]'s state at a point in time.
pub trait ParticleFileWriter<P: ParticleType> {
    type Error: std::error::Error + 'static;

    /// Appends one output step: every particle's built-in attributes at `time`.
    fn write_step(&mut self, particles: &ParticleSet<P>, time: f64) -> Result<(), Self::Error>;

    /// Flushes any buffered output. Called once after the last step.
    fn finish(&mut self) -> Result<(), Self::Error>;
}

/// Marker alias for the common case of a writer usable across the whole
/// lifetime of an `execute` call (as opposed to one re-opened per step).
pub trait ParticleFile<P: ParticleType>: ParticleFileWriter<P> {}
impl<P: ParticleType, T: ParticleFileWriter<P>> ParticleFile<P> for T {}

/// Writes one row per particle per output step as CSV:
/// `time,id,lon,lat,dep,state` — one row per particle per output step.
pub struct CsvParticleFile {
    writer: BufWriter<File>,
    header_written: bool,
}

impl CsvParticleFile {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(CsvParticleFile { writer: BufWriter::new(file), header_written: false })
    }
}

impl<P: ParticleType> ParticleFileWriter<P> for CsvParticleFile {
    type Error = io::Error;

    fn write_step(&mut self, particles: &ParticleSet<P>, time: f64) -> io::Result<()> {
        if !self.header_written {
            writeln!(self.writer, "time,id,lon,lat,dep,state")?;
            self.header_written = true;
        }
        for p in particles.iter() {
            writeln!(
                self.writer,
                "{time},{},{},{},{},{}",
                p.id(),
                p.lon(),
                p.lat(),
                p.dep(),
                p.state() as i32
            )?;
        }
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptrack_derive::ParticleType;

    #[derive(Clone, Copy, Debug, Default, ParticleType, bytemuck::Pod, bytemuck::Zeroable)]
    #[repr(C)]
    struct Tracer {
        time: f64,
        dt: f64,
        lon: f32,
        lat: f32,
        dep: f32,
        id: i32,
        state: i32,
        _pad: i32,
    }

    #[test]
    fn writes_header_once_and_one_row_per_particle_per_step() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut writer = CsvParticleFile::create(&path).unwrap();

        let mut pset: ParticleSet<Tracer> = ParticleSet::new();
        pset.push(Tracer::default());
        ParticleFileWriter::write_step(&mut writer, &pset, 0.0).unwrap();
        ParticleFileWriter::write_step(&mut writer, &pset, 1.0).unwrap();
        writer.finish().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "time,id,lon,lat,dep,state");
        assert_eq!(lines.len(), 3);
    }
}
