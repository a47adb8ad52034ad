//! Lux math - vectors, rays and the small numeric helpers shared by the
//! scene graph and the light-transport core.

// Re-export glam for convenience
pub use glam::*;

mod interval;
mod ray;
pub mod optics;
pub mod rgbe;
pub mod sampling;

pub use interval::Interval;
pub use ray::Ray;
pub use rgbe::Rgbe;

/// Linear RGB color.
pub type Color = Vec3;

/// Offset applied along the surface normal when spawning secondary rays,
/// so they do not immediately re-hit the surface they leave.
pub const BIAS: f32 = 1e-4;

/// Refractive index of the medium surrounding every figure.
pub const AIR_REF_INDEX: f32 = 1.0;
