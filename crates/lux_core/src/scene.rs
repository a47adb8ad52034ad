//! Scene container and ray queries.
//!
//! Figures are few, so queries are a linear scan over all of them.

use lux_math::{Interval, Ray, Vec3};

use crate::camera::Camera;
use crate::environment::Environment;
use crate::figure::{Figure, FigureId};
use crate::light::Light;

/// Closest intersection of a ray with the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub figure: FigureId,
    pub t: f32,
    pub point: Vec3,
    /// Surface normal at the hit (always points against the ray)
    pub normal: Vec3,
    /// Whether the ray hit the front face (outside) of the surface
    pub front_face: bool,
}

impl Hit {
    /// Build a hit, orienting the normal against the incoming ray.
    pub fn new(figure: FigureId, ray: &Ray, t: f32, outward_normal: Vec3) -> Self {
        // If the ray and normal point in the same direction, we're inside
        let front_face = ray.direction.dot(outward_normal) < 0.0;
        let normal = if front_face {
            outward_normal
        } else {
            -outward_normal
        };
        Self {
            figure,
            t,
            point: ray.at(t),
            normal,
            front_face,
        }
    }
}

/// Everything needed to render one image.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub figures: Vec<Figure>,
    pub lights: Vec<Light>,
    pub environment: Environment,
    pub camera: Camera,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a figure and return its id.
    pub fn add_figure(&mut self, figure: Figure) -> FigureId {
        self.figures.push(figure);
        self.figures.len() - 1
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn figure(&self, id: FigureId) -> Option<&Figure> {
        self.figures.get(id)
    }

    /// Closest figure hit by `ray` inside `ray_t`.
    pub fn closest_hit(&self, ray: &Ray, ray_t: Interval) -> Option<Hit> {
        let mut closest: Option<Hit> = None;
        let mut closest_so_far = ray_t.max;

        for (id, figure) in self.figures.iter().enumerate() {
            if let Some(isect) = figure.intersect(ray, ray_t.with_max(closest_so_far)) {
                closest_so_far = isect.t;
                closest = Some(Hit::new(id, ray, isect.t, isect.normal));
            }
        }

        closest
    }

    /// Whether anything blocks `ray` before `max_distance`, optionally
    /// ignoring one figure (the light's own emitter).
    pub fn occluded(&self, ray: &Ray, max_distance: f32, ignore: Option<FigureId>) -> bool {
        let ray_t = Interval::new(0.0, max_distance);
        self.figures
            .iter()
            .enumerate()
            .filter(|(id, _)| Some(*id) != ignore)
            .any(|(_, figure)| figure.intersect(ray, ray_t).is_some())
    }

    /// Whether `id` is the emitting figure of an area light.
    pub fn area_light_figure(&self, id: FigureId) -> bool {
        self.lights.iter().any(|light| light.figure() == Some(id))
    }

    /// Ids of the figures that reflect or transmit specularly.
    pub fn specular_figures(&self) -> Vec<FigureId> {
        self.figures
            .iter()
            .enumerate()
            .filter(|(_, f)| f.material.is_specular())
            .map(|(id, _)| id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::{AreaLight, Attenuation};
    use crate::material::Material;

    fn two_spheres() -> Scene {
        let mut scene = Scene::new();
        scene.add_figure(Figure::sphere(Vec3::new(0.0, 0.0, -5.0), 1.0, Material::default()));
        scene.add_figure(Figure::sphere(Vec3::new(0.0, 0.0, -10.0), 1.0, Material::mirror()));
        scene
    }

    #[test]
    fn test_closest_hit_picks_nearest() {
        let scene = two_spheres();
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let hit = scene.closest_hit(&ray, Interval::forward(1e-4)).unwrap();

        assert_eq!(hit.figure, 0);
        assert!((hit.t - 4.0).abs() < 1e-4);
        assert!(hit.front_face);
        assert!(hit.normal.dot(ray.direction) < 0.0);
    }

    #[test]
    fn test_hit_from_inside_flips_normal() {
        let mut scene = Scene::new();
        scene.add_figure(Figure::sphere(Vec3::ZERO, 2.0, Material::default()));
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        let hit = scene.closest_hit(&ray, Interval::forward(1e-4)).unwrap();

        assert!(!hit.front_face);
        assert!((hit.normal - Vec3::NEG_X).length() < 1e-5);
    }

    #[test]
    fn test_occluded() {
        let scene = two_spheres();
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);

        assert!(scene.occluded(&ray, 100.0, None));
        assert!(!scene.occluded(&ray, 3.0, None));
        // Ignoring the near sphere still leaves the far one
        assert!(scene.occluded(&ray, 100.0, Some(0)));
        assert!(!scene.occluded(&ray, 7.0, Some(0)));
    }

    #[test]
    fn test_area_light_figure() {
        let mut scene = two_spheres();
        let id = scene.add_figure(Figure::disk(
            Vec3::new(0.0, 5.0, 0.0),
            Vec3::NEG_Y,
            1.0,
            Material::emissive(Vec3::ONE),
        ));
        scene.add_light(Light::Area(AreaLight {
            figure: id,
            attenuation: Attenuation::default(),
        }));

        assert!(scene.area_light_figure(id));
        assert!(!scene.area_light_figure(0));
        assert_eq!(scene.specular_figures(), vec![1]);
    }
}
