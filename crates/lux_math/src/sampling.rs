//! Warping functions from uniform `[0, 1)` numbers to directions and points.
//!
//! Hemisphere samples are produced in a local frame where +Y is the surface
//! normal, then moved into world space with [`rotate_to_normal`].

use crate::{Vec2, Vec3};
use std::f32::consts::PI;

/// Density of a uniform hemisphere sample with respect to solid angle.
pub const HEMISPHERE_PDF: f32 = 1.0 / (2.0 * PI);

/// Uniform direction on the +Y hemisphere. `r1` is the cosine to the pole.
pub fn sample_hemisphere(r1: f32, r2: f32) -> Vec3 {
    let sin_t = (1.0 - r1 * r1).max(0.0).sqrt();
    let phi = 2.0 * PI * r2;
    Vec3::new(sin_t * phi.cos(), r1, sin_t * phi.sin())
}

/// Cosine-weighted direction on the +Y hemisphere (pdf = cos / pi).
pub fn cosine_hemisphere(r1: f32, r2: f32) -> Vec3 {
    let r = r1.sqrt();
    let phi = 2.0 * PI * r2;
    Vec3::new(r * phi.cos(), (1.0 - r1).max(0.0).sqrt(), r * phi.sin())
}

/// Uniform direction on the unit sphere.
pub fn uniform_sphere(r1: f32, r2: f32) -> Vec3 {
    let z = 1.0 - 2.0 * r1;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * PI * r2;
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

/// Uniform point on the unit disk.
pub fn uniform_disk(r1: f32, r2: f32) -> Vec2 {
    let r = r1.sqrt();
    let phi = 2.0 * PI * r2;
    Vec2::new(r * phi.cos(), r * phi.sin())
}

/// Two unit vectors `(tangent, bitangent)` completing `n` to an orthonormal
/// frame.
pub fn orthonormal_basis(n: Vec3) -> (Vec3, Vec3) {
    let tangent = if n.x.abs() > n.y.abs() {
        Vec3::new(n.z, 0.0, -n.x).normalize()
    } else {
        Vec3::new(0.0, -n.z, n.y).normalize()
    };
    let bitangent = n.cross(tangent).normalize();
    (tangent, bitangent)
}

/// Move a +Y-up local sample into the frame around `n`.
pub fn rotate_to_normal(sample: Vec3, n: Vec3) -> Vec3 {
    let (tangent, bitangent) = orthonormal_basis(n);
    sample.x * bitangent + sample.y * n + sample.z * tangent
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> impl Iterator<Item = (f32, f32)> {
        (0..16).flat_map(|i| (0..16).map(move |j| ((i as f32 + 0.5) / 16.0, (j as f32 + 0.5) / 16.0)))
    }

    #[test]
    fn test_hemisphere_samples_are_unit_and_up() {
        for (r1, r2) in grid() {
            for s in [sample_hemisphere(r1, r2), cosine_hemisphere(r1, r2)] {
                assert!((s.length() - 1.0).abs() < 1e-5);
                assert!(s.y >= 0.0);
            }
        }
    }

    #[test]
    fn test_uniform_sphere_covers_both_halves() {
        let (mut up, mut down) = (0, 0);
        for (r1, r2) in grid() {
            let s = uniform_sphere(r1, r2);
            assert!((s.length() - 1.0).abs() < 1e-5);
            if s.z > 0.0 {
                up += 1;
            } else {
                down += 1;
            }
        }
        assert_eq!(up, down);
    }

    #[test]
    fn test_uniform_disk_inside() {
        for (r1, r2) in grid() {
            assert!(uniform_disk(r1, r2).length() <= 1.0 + 1e-6);
        }
    }

    #[test]
    fn test_orthonormal_basis() {
        let normals = [Vec3::X, Vec3::Y, Vec3::Z, Vec3::new(1.0, 2.0, -3.0).normalize()];
        for n in normals {
            let (t, b) = orthonormal_basis(n);
            assert!(t.dot(n).abs() < 1e-5);
            assert!(b.dot(n).abs() < 1e-5);
            assert!(t.dot(b).abs() < 1e-5);
            assert!((t.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_rotate_to_normal_keeps_hemisphere() {
        let n = Vec3::new(-1.0, 0.5, 0.25).normalize();
        assert!((rotate_to_normal(Vec3::Y, n) - n).length() < 1e-5);
        for (r1, r2) in grid() {
            let d = rotate_to_normal(sample_hemisphere(r1, r2), n);
            assert!(d.dot(n) >= -1e-5);
            // The local cosine survives the rotation
            assert!((d.dot(n) - r1).abs() < 1e-4);
        }
    }
}
