//! Photon-map integrator.
//!
//! Diffuse light is read from the global photon map (plus the caustics map
//! when one was built) instead of being traced. Only the specular highlight
//! uses shadow rays.

use std::f32::consts::PI;
use std::sync::Arc;

use lux_core::Scene;
use lux_math::{Color, Interval, Ray};
use rand::RngCore;

use super::{dielectric, direct_lighting, environment_irradiance, reflected_ray};
use crate::config::GatherSettings;
use crate::photon_map::PhotonMap;

#[derive(Debug, Clone)]
pub struct PhotonMapTracer {
    pub max_depth: u32,
    pub gather: GatherSettings,
    global: Arc<PhotonMap>,
    caustics: Option<Arc<PhotonMap>>,
}

impl PhotonMapTracer {
    pub fn new(
        max_depth: u32,
        gather: GatherSettings,
        global: PhotonMap,
        caustics: Option<PhotonMap>,
    ) -> Self {
        Self {
            max_depth,
            gather,
            global: Arc::new(global),
            caustics: caustics.map(Arc::new),
        }
    }

    pub fn global_map(&self) -> &PhotonMap {
        &self.global
    }

    pub fn caustics_map(&self) -> Option<&PhotonMap> {
        self.caustics.as_deref()
    }

    pub fn trace_ray(&self, ray: &Ray, scene: &Scene, depth: u32, rng: &mut dyn RngCore) -> Color {
        if depth >= self.max_depth {
            return Color::ZERO;
        }

        let Some(hit) = scene.closest_hit(ray, Interval::forward(0.0)) else {
            return scene.environment.sample(ray);
        };
        let material = &scene.figures[hit.figure].material;

        if scene.area_light_figure(hit.figure) {
            return material.emission;
        }

        if material.transmissive {
            return material.emission
                + dielectric(ray, &hit, material, rng, |r, rng| {
                    self.trace_ray(r, scene, depth + 1, rng)
                });
        }

        let mut color = material.emission;

        if material.rho < 1.0 {
            let (_, specular) = direct_lighting(scene, &hit, ray, rng);

            let mut irradiance = self.global.irradiance_estimate(hit.point, hit.normal, &self.gather);
            if let Some(caustics) = &self.caustics {
                irradiance += caustics.irradiance_estimate(hit.point, hit.normal, &self.gather);
            }
            irradiance += environment_irradiance(scene, &hit, rng);

            color += (1.0 - material.rho)
                * (irradiance * material.diffuse / PI + specular * material.specular);
        }

        if material.rho > 0.0 {
            let reflected = reflected_ray(ray, &hit);
            color += material.rho * self.trace_ray(&reflected, scene, depth + 1, rng);
        }

        color
    }
}
