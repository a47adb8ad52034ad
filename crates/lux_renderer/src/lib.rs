//! Lux renderer.
//!
//! Photon emission and storage, the kd-tree photon index, the three
//! light-transport integrators and a parallel bucket renderer.

mod bucket;
mod config;
mod integrator;
mod kdtree;
mod photon;
mod photon_map;
mod renderer;
mod transport;

pub use bucket::{generate_buckets, render_bucket, Bucket, BucketResult, DEFAULT_BUCKET_SIZE};
pub use config::{ConfigError, EmissionSettings, GatherSettings, RenderConfig, TracerKind};
pub use integrator::{direct_lighting, Integrator, PathTracer, PhotonMapTracer, WhittedTracer};
pub use kdtree::{Axis, KdNode, PhotonKdTree};
pub use photon::Photon;
pub use photon_map::{PhotonFileError, PhotonFileResult, PhotonMap, PhotonStore, MAX_RADIUS_DOUBLINGS};
pub use renderer::{color_to_rgba, render, render_pixel, ImageBuffer, GAMMA};
pub use transport::{emit_photons, PHOTON_BLOCK_SIZE};

pub use lux_math::{Color, Vec2, Vec3};

use rand::{Rng, RngCore};

/// Uniform random number in `[0, 1)`.
#[inline]
pub fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    rng.gen::<f32>()
}

/// Uniform random point in `[0, 1)^2`.
#[inline]
pub fn gen_vec2(rng: &mut dyn RngCore) -> Vec2 {
    Vec2::new(gen_f32(rng), gen_f32(rng))
}
