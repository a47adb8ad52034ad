//! Photon storage and radiance estimation.
//!
//! Photons go through two stages:
//!
//! - [`PhotonStore`]: the mutable buffer filled during emission. Worker
//!   threads append to it under a mutex, and power scaling happens here.
//! - [`PhotonMap`]: the frozen kd-tree built from a store. Only queries are
//!   possible from this point on.
//!
//! Stores can be written to and read from a plain-text dump with one photon
//! per line: `px py pz dx dy dz r g b ref_index`. The `d` columns hold the
//! photon's direction of travel, so light arrives at the surface from
//! `-d`. Dumps that store the incoming direction instead must be negated
//! before loading, or the estimate will treat every photon as back-facing.

use std::f32::consts::PI;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use lux_math::{Color, Vec3};
use thiserror::Error;

use crate::config::GatherSettings;
use crate::kdtree::PhotonKdTree;
use crate::photon::Photon;

/// How many times an empty gather doubles its radius before giving up.
pub const MAX_RADIUS_DOUBLINGS: u32 = 5;

/// Errors that can occur while reading or writing photon dumps.
#[derive(Error, Debug)]
pub enum PhotonFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

pub type PhotonFileResult<T> = Result<T, PhotonFileError>;

/// Photons collected during emission, before the kd-tree exists.
#[derive(Debug, Default)]
pub struct PhotonStore {
    photons: Mutex<Vec<Photon>>,
}

impl PhotonStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_photons(photons: Vec<Photon>) -> Self {
        Self {
            photons: Mutex::new(photons),
        }
    }

    /// Append one photon.
    pub fn insert(&self, photon: Photon) {
        self.photons
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(photon);
    }

    /// Append a batch under a single lock.
    pub fn insert_batch(&self, batch: Vec<Photon>) {
        if batch.is_empty() {
            return;
        }
        self.photons
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(batch);
    }

    /// Multiply the power of every stored photon by `factor`.
    pub fn scale_power(&mut self, factor: f32) {
        let photons = self.photons.get_mut().unwrap_or_else(PoisonError::into_inner);
        for photon in photons.iter_mut() {
            photon.power = lux_math::Rgbe::pack(photon.power() * factor);
        }
    }

    pub fn len(&self) -> usize {
        self.photons
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_photons(self) -> Vec<Photon> {
        self.photons
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Freeze the store into a queryable photon map.
    pub fn build(self) -> PhotonMap {
        let photons = self.into_photons();
        let count = photons.len();
        let tree = PhotonKdTree::build(photons);
        log::info!(
            "Built photon map: {} photons ({} duplicates removed)",
            tree.len(),
            count - tree.len()
        );
        PhotonMap { tree }
    }

    /// Write all photons to a text dump, in insertion order.
    pub fn save(&self, path: impl AsRef<Path>) -> PhotonFileResult<()> {
        let path = path.as_ref();
        let photons = self.photons.lock().unwrap_or_else(PoisonError::into_inner);
        let mut out = BufWriter::new(File::create(path)?);

        for p in photons.iter() {
            let power = p.power();
            writeln!(
                out,
                "{} {} {} {} {} {} {} {} {} {}",
                p.position.x,
                p.position.y,
                p.position.z,
                p.direction.x,
                p.direction.y,
                p.direction.z,
                power.x,
                power.y,
                power.z,
                p.ref_index
            )?;
        }
        out.flush()?;

        log::info!("Wrote {} photons to {}", photons.len(), path.display());
        Ok(())
    }

    /// Read a text dump written by [`PhotonStore::save`]. Blank lines are
    /// skipped.
    pub fn load(path: impl AsRef<Path>) -> PhotonFileResult<PhotonStore> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let mut photons = Vec::new();

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            photons.push(parse_photon(&line, i + 1)?);
        }

        log::info!("Read {} photons from {}", photons.len(), path.display());
        Ok(PhotonStore::from_photons(photons))
    }
}

fn parse_photon(line: &str, line_number: usize) -> PhotonFileResult<Photon> {
    let values = line
        .split_whitespace()
        .map(|field| {
            field.parse::<f32>().map_err(|e| PhotonFileError::Parse {
                line: line_number,
                message: format!("invalid number '{}': {}", field, e),
            })
        })
        .collect::<PhotonFileResult<Vec<f32>>>()?;

    let [px, py, pz, dx, dy, dz, r, g, b, ref_index] = values[..] else {
        return Err(PhotonFileError::Parse {
            line: line_number,
            message: format!("expected 10 values, found {}", values.len()),
        });
    };

    Ok(Photon::new(
        Vec3::new(px, py, pz),
        Vec3::new(dx, dy, dz),
        Color::new(r, g, b),
        ref_index,
    ))
}

/// Read-only photon map used during rendering.
#[derive(Debug, Clone, Default)]
pub struct PhotonMap {
    tree: PhotonKdTree,
}

impl PhotonMap {
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn tree(&self) -> &PhotonKdTree {
        &self.tree
    }

    /// All photons inside the box `[min, max]`.
    pub fn range_query(&self, min: Vec3, max: Vec3) -> Vec<Photon> {
        self.tree.range_query(min, max)
    }

    /// Irradiance at `position` on a surface facing `normal`, estimated from
    /// the nearest photons with a cone filter.
    ///
    /// An empty neighbourhood doubles the search radius up to
    /// [`MAX_RADIUS_DOUBLINGS`] times before returning black.
    pub fn irradiance_estimate(&self, position: Vec3, normal: Vec3, settings: &GatherSettings) -> Color {
        if self.tree.is_empty() {
            return Color::ZERO;
        }

        let k = settings.cone_k;
        let mut radius = settings.radius;

        for _ in 0..=MAX_RADIUS_DOUBLINGS {
            let found = self
                .tree
                .nearest(position, normal, radius, settings.max_photons);

            if let Some(&(_, farthest)) = found.last() {
                // A full gather bounds the disc by its farthest photon, unless
                // every photon sits on the query point
                let r2 = if found.len() == settings.max_photons && farthest > 0.0 {
                    farthest
                } else {
                    radius * radius
                };
                let r = r2.sqrt();

                let sum: Color = found
                    .iter()
                    .map(|(photon, d2)| {
                        let w = 1.0 - d2.sqrt() / (k * r);
                        photon.power() * w.max(0.0)
                    })
                    .sum();

                return sum / ((1.0 - 2.0 / (3.0 * k)) * PI * r2);
            }

            radius *= 2.0;
        }

        Color::ZERO
    }
}
