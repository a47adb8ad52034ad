//! Whitted-style ray tracer: direct lighting plus perfect reflection and
//! refraction.

use lux_core::Scene;
use lux_math::{Color, Interval, Ray};
use rand::RngCore;

use super::{dielectric, direct_lighting, reflected_ray};

#[derive(Debug, Clone, Copy)]
pub struct WhittedTracer {
    pub max_depth: u32,
}

impl WhittedTracer {
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
            return material.emission.clamp(Color::ZERO, Color::ONE);
        }

        let color = if material.transmissive {
            dielectric(ray, &hit, material, rng, |r, rng| {
                self.trace_ray(r, scene, depth + 1, rng)
            })
        } else {
            let (diffuse, specular) = direct_lighting(scene, &hit, ray, rng);
            let mut color =
                (1.0 - material.rho) * (diffuse * material.diffuse + specular * material.specular);
            if material.rho > 0.0 {
                let reflected = reflected_ray(ray, &hit);
                color += material.rho * self.trace_ray(&reflected, scene, depth + 1, rng);
            }
            color
        };

        (material.emission + color).clamp(Color::ZERO, Color::ONE)
    }
}
