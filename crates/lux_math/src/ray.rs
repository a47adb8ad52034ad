use crate::{Mat4, Vec3, AIR_REF_INDEX};

/// A ray in 3D space with origin, direction, and the refractive index of the
/// medium it travels through.
///
/// The direction is expected to be unit length at the call sites that build
/// rays, but nothing here enforces it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub ref_index: f32,
}

impl Ray {
    /// Create a new ray travelling through air.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            ref_index: AIR_REF_INDEX,
        }
    }

    /// Create a new ray travelling through a medium with the given index.
    pub fn with_ref_index(origin: Vec3, direction: Vec3, ref_index: f32) -> Self {
        Self {
            origin,
            direction,
            ref_index,
        }
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Transform this ray in place by an affine matrix (e.g. camera to world).
    pub fn transform(&mut self, matrix: &Mat4) {
        self.origin = matrix.transform_point3(self.origin);
        self.direction = matrix.transform_vector3(self.direction);
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::NEG_Z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);

        assert_eq!(ray.at(0.0), Vec3::ZERO);
        assert_eq!(ray.at(1.0), Vec3::X);
        assert_eq!(ray.at(2.0), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(ray.at(-1.0), Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_ray_defaults_to_air() {
        let ray = Ray::new(Vec3::ZERO, Vec3::Y);
        assert_eq!(ray.ref_index, AIR_REF_INDEX);

        let glass = Ray::with_ref_index(Vec3::ZERO, Vec3::Y, 1.5);
        assert_eq!(glass.ref_index, 1.5);
    }

    #[test]
    fn test_ray_transform() {
        let mut ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let matrix = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        ray.transform(&matrix);

        // Points move, directions do not
        assert_eq!(ray.origin, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(ray.direction, Vec3::NEG_Z);
    }
}
