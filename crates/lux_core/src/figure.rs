//! Geometric primitives.
//!
//! Every figure owns its material by value. Intersection reports the
//! outward normal; orienting it against the incoming ray is left to
//! [`crate::scene::Hit`].

use std::f32::consts::PI;

use lux_math::sampling::{orthonormal_basis, uniform_disk, uniform_sphere};
use lux_math::{Interval, Ray, Vec2, Vec3};

use crate::material::Material;

/// Index of a figure inside its [`crate::Scene`].
pub type FigureId = usize;

/// Denominators below this are treated as a ray parallel to a plane.
const PARALLEL_TOLERANCE: f32 = 1e-6;

/// Closest intersection of a ray with one figure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub t: f32,
    /// Outward (geometric) normal at the hit point.
    pub normal: Vec3,
}

/// Shape of a figure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Sphere { center: Vec3, radius: f32 },
    /// Infinite two-sided plane.
    Plane { point: Vec3, normal: Vec3 },
    Disk { center: Vec3, normal: Vec3, radius: f32 },
}

/// A shape with a material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Figure {
    pub shape: Shape,
    pub material: Material,
}

impl Figure {
    pub fn sphere(center: Vec3, radius: f32, material: Material) -> Self {
        Self {
            shape: Shape::Sphere { center, radius },
            material,
        }
    }

    pub fn plane(point: Vec3, normal: Vec3, material: Material) -> Self {
        Self {
            shape: Shape::Plane {
                point,
                normal: normal.normalize_or_zero(),
            },
            material,
        }
    }

    pub fn disk(center: Vec3, normal: Vec3, radius: f32, material: Material) -> Self {
        Self {
            shape: Shape::Disk {
                center,
                normal: normal.normalize_or_zero(),
                radius,
            },
            material,
        }
    }

    /// Intersect a ray with this figure, returning the closest hit with
    /// `t` strictly inside `ray_t`.
    pub fn intersect(&self, ray: &Ray, ray_t: Interval) -> Option<Intersection> {
        match self.shape {
            Shape::Sphere { center, radius } => hit_sphere(ray, ray_t, center, radius),
            Shape::Plane { point, normal } => hit_plane(ray, ray_t, point, normal),
            Shape::Disk {
                center,
                normal,
                radius,
            } => {
                let hit = hit_plane(ray, ray_t, center, normal)?;
                let offset = ray.at(hit.t) - center;
                (offset.length_squared() <= radius * radius).then_some(hit)
            }
        }
    }

    /// Uniformly sample a point on the surface and its outward normal.
    ///
    /// Unbounded planes cannot be sampled.
    pub fn sample_surface(&self, u: Vec2) -> Option<(Vec3, Vec3)> {
        match self.shape {
            Shape::Sphere { center, radius } => {
                let n = uniform_sphere(u.x, u.y);
                Some((center + n * radius, n))
            }
            Shape::Plane { .. } => None,
            Shape::Disk {
                center,
                normal,
                radius,
            } => {
                let (tangent, bitangent) = orthonormal_basis(normal);
                let d = uniform_disk(u.x, u.y) * radius;
                Some((center + d.x * tangent + d.y * bitangent, normal))
            }
        }
    }

    /// Surface area (infinite for planes).
    pub fn area(&self) -> f32 {
        match self.shape {
            Shape::Sphere { radius, .. } => 4.0 * PI * radius * radius,
            Shape::Plane { .. } => f32::INFINITY,
            Shape::Disk { radius, .. } => PI * radius * radius,
        }
    }
}

fn hit_sphere(ray: &Ray, ray_t: Interval, center: Vec3, radius: f32) -> Option<Intersection> {
    let oc = center - ray.origin;
    let a = ray.direction.length_squared();
    if a <= 0.0 {
        return None;
    }
    let h = ray.direction.dot(oc);
    let c = oc.length_squared() - radius * radius;

    let discriminant = h * h - a * c;
    if discriminant < 0.0 {
        return None;
    }

    let sqrtd = discriminant.sqrt();

    // Find the nearest root that lies in the acceptable range
    let mut root = (h - sqrtd) / a;
    if !ray_t.surrounds(root) {
        root = (h + sqrtd) / a;
        if !ray_t.surrounds(root) {
            return None;
        }
    }

    let normal = (ray.at(root) - center) / radius;
    Some(Intersection { t: root, normal })
}

fn hit_plane(ray: &Ray, ray_t: Interval, point: Vec3, normal: Vec3) -> Option<Intersection> {
    let denom = ray.direction.dot(normal);
    if denom.abs() <= PARALLEL_TOLERANCE {
        return None;
    }
    let t = normal.dot(point - ray.origin) / denom;
    ray_t.surrounds(t).then_some(Intersection { t, normal })
}
