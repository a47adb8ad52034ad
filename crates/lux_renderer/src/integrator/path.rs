//! Monte-Carlo path tracer.
//!
//! Direct light comes from shadow rays at every vertex, indirect light from
//! one uniform hemisphere sample per bounce. Emitters are only counted when
//! seen straight from the camera, since every other vertex already samples
//! them explicitly.

use std::f32::consts::PI;

use lux_core::Scene;
use lux_math::sampling::HEMISPHERE_PDF;
use lux_math::{Color, Interval, Ray, BIAS};
use rand::RngCore;

use super::{dielectric, direct_lighting, hemisphere_direction, reflected_ray};

#[derive(Debug, Clone, Copy)]
pub struct PathTracer {
    pub max_depth: u32,
}

impl PathTracer {
    pub fn new(max_depth: u32) -> Self {
        Self { max_depth }
    }

    pub fn trace_ray(&self, ray: &Ray, scene: &Scene, depth: u32, rng: &mut dyn RngCore) -> Color {
        if depth >= self.max_depth {
            return Color::ZERO;
        }

        let Some(hit) = scene.closest_hit(ray, Interval::forward(0.0)) else {
            return scene.environment.sample(ray).clamp(Color::ZERO, Color::ONE);
        };
        let material = &scene.figures[hit.figure].material;

        if scene.area_light_figure(hit.figure) {
            return if depth == 0 {
                material.emission.clamp(Color::ZERO, Color::ONE)
            } else {
                Color::ZERO
            };
        }

        let color = if material.transmissive {
            dielectric(ray, &hit, material, rng, |r, rng| {
                self.trace_ray(r, scene, depth + 1, rng)
            })
        } else {
            let (diffuse, specular) = direct_lighting(scene, &hit, ray, rng);
            let mut color =
                (1.0 - material.rho) * (diffuse * material.diffuse + specular * material.specular);

            let albedo = (1.0 - material.rho) * material.diffuse;
            if albedo.max_element() > 0.0 {
                let direction = hemisphere_direction(hit.normal, rng);
                let bounce = Ray::with_ref_index(hit.point + hit.normal * BIAS, direction, ray.ref_index);
                let cos_theta = direction.dot(hit.normal).max(0.0);
                let incoming = self.trace_ray(&bounce, scene, depth + 1, rng);
                color += albedo / PI * incoming * cos_theta / HEMISPHERE_PDF;
            }

            if material.rho > 0.0 {
                let reflected = reflected_ray(ray, &hit);
                color += material.rho * self.trace_ray(&reflected, scene, depth + 1, rng);
            }
            color
        };

        (material.emission + color).clamp(Color::ZERO, Color::ONE)
    }
}
