//! Photon emission and transport.
//!
//! Photons leave area and point lights, bounce through the scene and are
//! deposited on diffuse surfaces. Each light's photons are split into
//! fixed-size blocks traced in parallel; every block owns its own seeded RNG
//! and hands its photons to the store in one batch.

use std::f32::consts::PI;

use lux_core::{Figure, FigureId, Light, Scene};
use lux_math::optics::{fresnel, reflect, refract};
use lux_math::sampling::{cosine_hemisphere, rotate_to_normal, uniform_sphere};
use lux_math::{Color, Interval, Ray, Vec3, BIAS};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rayon::prelude::*;

use crate::config::EmissionSettings;
use crate::integrator::media;
use crate::photon::Photon;
use crate::photon_map::PhotonStore;
use crate::{gen_f32, gen_vec2};

/// Photons traced per RNG stream and per store lock.
pub const PHOTON_BLOCK_SIZE: usize = 1024;

/// Read-only state shared by every photon of a pass.
struct TraceContext<'a> {
    scene: &'a Scene,
    max_depth: u32,
    caustics: bool,
    exclude_caustic_paths: bool,
}

impl TraceContext<'_> {
    /// Whether a photon that reached a diffuse surface along `path` belongs
    /// in this pass's map.
    fn stores(&self, path: PathKind) -> bool {
        match path {
            PathKind::Caustic => self.caustics || !self.exclude_caustic_paths,
            PathKind::Direct | PathKind::Indirect => !self.caustics,
        }
    }
}

/// Scattering history of a photon in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathKind {
    /// Straight from the light.
    Direct,
    /// One or more specular bounces and nothing else.
    Caustic,
    /// At least one diffuse bounce.
    Indirect,
}

impl PathKind {
    fn after_specular(self) -> PathKind {
        match self {
            PathKind::Direct | PathKind::Caustic => PathKind::Caustic,
            PathKind::Indirect => PathKind::Indirect,
        }
    }
}

/// A photon in flight.
#[derive(Debug, Clone, Copy)]
struct PhotonRay {
    ray: Ray,
    power: Color,
    path: PathKind,
}

/// Seed for one block of one light, so results do not depend on thread
/// scheduling.
fn block_seed(seed: u64, light: usize, block: usize) -> u64 {
    seed ^ ((light as u64) << 40) ^ (block as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15)
}

/// Shoot `photons_per_light` photons from every area and point light and
/// collect the ones deposited on diffuse surfaces.
///
/// Power is normalised once at the end by the per-light photon count.
pub fn emit_photons(scene: &Scene, settings: &EmissionSettings) -> PhotonStore {
    let mut store = PhotonStore::new();
    let pass = if settings.caustics { "caustics" } else { "global" };

    let targets: Vec<FigureId> = if settings.caustics {
        let targets: Vec<FigureId> = scene
            .specular_figures()
            .into_iter()
            .filter(|&id| scene.figures[id].area().is_finite())
            .collect();
        if targets.is_empty() {
            log::warn!("No specular figures in the scene, skipping the caustics photon map");
            return store;
        }
        log::info!("Caustics pass aims at {} specular figures", targets.len());
        targets
    } else {
        Vec::new()
    };

    let ctx = TraceContext {
        scene,
        max_depth: settings.max_depth,
        caustics: settings.caustics,
        exclude_caustic_paths: settings.exclude_caustic_paths,
    };
    let n = settings.photons_per_light;
    let n_blocks = n.div_ceil(PHOTON_BLOCK_SIZE);

    for (light_index, light) in scene.lights.iter().enumerate() {
        match light {
            Light::Area(_) | Light::Point(_) => {}
            Light::Directional(_) | Light::Spot(_) => {
                log::debug!(
                    "Light {} ({:?}) does not emit photons, skipping",
                    light_index,
                    light.kind()
                );
                continue;
            }
        }

        let before = store.len();
        (0..n_blocks).into_par_iter().for_each(|block| {
            let mut rng = StdRng::seed_from_u64(block_seed(settings.seed, light_index, block));
            let mut deposited = Vec::new();

            let start = block * PHOTON_BLOCK_SIZE;
            let end = (start + PHOTON_BLOCK_SIZE).min(n);
            for p in start..end {
                let target = (!targets.is_empty()).then(|| targets[p % targets.len()]);
                if let Some(mut photon) = emit_one(scene, light, target, &mut rng) {
                    // Each target only receives its share of the photons
                    if target.is_some() {
                        photon.power *= targets.len() as f32;
                    }
                    trace_photon(&ctx, photon, 0, &mut rng, &mut deposited);
                }
            }

            store.insert_batch(deposited);
        });

        log::info!(
            "Light {}: traced {} {} photons, {} stored",
            light_index,
            n,
            pass,
            store.len() - before
        );
    }

    if n > 0 {
        store.scale_power(1.0 / n as f32);
    }
    log::info!("Stored {} {} photons", store.len(), pass);
    store
}

/// Direction from `origin` towards a uniform point on `figure`, together
/// with the inverse of that direction's solid-angle density,
/// `|cos| * area / distance²`.
///
/// Points hidden behind the figure's own near side are rejected, so every
/// direction comes from exactly one surface point.
fn aim_at(figure: &Figure, origin: Vec3, rng: &mut dyn RngCore) -> Option<(Vec3, f32)> {
    let (point, normal) = figure.sample_surface(gen_vec2(rng))?;
    let to_point = point - origin;
    let dist2 = to_point.length_squared();
    if dist2 <= 0.0 {
        return None;
    }
    let dist = dist2.sqrt();
    let dir = to_point / dist;

    let near = figure.intersect(&Ray::new(origin, dir), Interval::forward(0.0))?;
    if near.t < dist * (1.0 - 1e-4) {
        return None;
    }

    let cos_target = normal.dot(dir).abs();
    (cos_target > 0.0).then(|| (dir, cos_target * figure.area() / dist2))
}

/// Generate a primary photon leaving `light`, aimed at `target` if given.
///
/// The power is the light's flux divided by the density of the chosen
/// direction; callers divide by the photon count.
fn emit_one(
    scene: &Scene,
    light: &Light,
    target: Option<FigureId>,
    rng: &mut dyn RngCore,
) -> Option<PhotonRay> {
    let target: Option<&Figure> = match target {
        Some(id) => Some(scene.figures.get(id)?),
        None => None,
    };

    let (origin, direction, power) = match light {
        Light::Area(area) => {
            let figure = scene.figures.get(area.figure)?;
            let sample = light.sample_surface_point(&scene.figures, gen_vec2(rng))?;
            let origin = sample.position + sample.normal * BIAS;
            let emission = figure.material.emission * figure.area();

            match target {
                Some(target) => {
                    let (dir, inv_pdf) = aim_at(target, origin, rng)?;
                    // The emitter only radiates from its front side
                    let cos_emit = dir.dot(sample.normal);
                    if cos_emit <= 0.0 {
                        return None;
                    }
                    (origin, dir, emission * cos_emit * inv_pdf)
                }
                None => {
                    let r1 = gen_f32(rng);
                    let r2 = gen_f32(rng);
                    let dir = rotate_to_normal(cosine_hemisphere(r1, r2), sample.normal).normalize();
                    (origin, dir, emission * PI)
                }
            }
        }
        Light::Point(point) => match target {
            Some(target) => {
                let (dir, inv_pdf) = aim_at(target, point.position, rng)?;
                (point.position, dir, point.diffuse * inv_pdf)
            }
            None => {
                let r1 = gen_f32(rng);
                let r2 = gen_f32(rng);
                (point.position, uniform_sphere(r1, r2), point.diffuse * 4.0 * PI)
            }
        },
        Light::Directional(_) | Light::Spot(_) => return None,
    };

    Some(PhotonRay {
        ray: Ray::new(origin, direction),
        power,
        path: PathKind::Direct,
    })
}

/// Follow one photon through the scene, appending deposited photons to
/// `out`.
fn trace_photon(
    ctx: &TraceContext,
    photon: PhotonRay,
    depth: u32,
    rng: &mut dyn RngCore,
    out: &mut Vec<Photon>,
) {
    let ray = &photon.ray;
    let Some(hit) = ctx.scene.closest_hit(ray, Interval::forward(0.0)) else {
        return;
    };

    // Lights absorb
    if ctx.scene.area_light_figure(hit.figure) {
        return;
    }

    let material = &ctx.scene.figures[hit.figure].material;
    let can_bounce = depth < ctx.max_depth;
    let specular_path = photon.path.after_specular();

    if material.transmissive {
        if !can_bounce {
            return;
        }

        let (n1, n2) = media(ray.ref_index, material, hit.front_face);
        let kr = fresnel(ray.direction, hit.normal, n1, n2);

        if kr > 0.0 {
            let reflected = PhotonRay {
                ray: Ray::with_ref_index(
                    hit.point + hit.normal * BIAS,
                    reflect(ray.direction, hit.normal).normalize(),
                    ray.ref_index,
                ),
                power: photon.power * kr,
                path: specular_path,
            };
            trace_photon(ctx, reflected, depth + 1, rng, out);
        }

        if kr < 1.0 {
            if let Some(dir) = refract(ray.direction, hit.normal, n1 / n2) {
                let transmitted = PhotonRay {
                    ray: Ray::with_ref_index(hit.point - hit.normal * BIAS, dir, n2),
                    power: photon.power * (1.0 - kr),
                    path: specular_path,
                };
                trace_photon(ctx, transmitted, depth + 1, rng, out);
            }
        }
        return;
    }

    // Only surfaces with a diffuse part are density-estimated
    let albedo = (1.0 - material.rho) * material.diffuse;
    let diffuse = albedo.max_element() > 0.0;

    if diffuse && ctx.stores(photon.path) {
        out.push(Photon::new(hit.point, ray.direction, photon.power, ray.ref_index));
    }

    if !can_bounce {
        return;
    }

    if diffuse && !ctx.caustics {
        let r1 = gen_f32(rng);
        let r2 = gen_f32(rng);
        let dir = rotate_to_normal(cosine_hemisphere(r1, r2), hit.normal).normalize();
        let bounced = PhotonRay {
            ray: Ray::with_ref_index(hit.point + hit.normal * BIAS, dir, ray.ref_index),
            power: photon.power * albedo,
            path: PathKind::Indirect,
        };
        trace_photon(ctx, bounced, depth + 1, rng, out);
    }

    if material.rho > 0.0 {
        let mirrored = PhotonRay {
            ray: Ray::with_ref_index(
                hit.point + hit.normal * BIAS,
                reflect(ray.direction, hit.normal).normalize(),
                ray.ref_index,
            ),
            power: photon.power * material.rho,
            path: specular_path,
        };
        trace_photon(ctx, mirrored, depth + 1, rng, out);
    }
}
