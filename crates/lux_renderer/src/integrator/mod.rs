//! Light-transport integrators.
//!
//! Every integrator answers the same question, "how much light travels back
//! along this ray", and recurses into itself for reflected and refracted
//! rays. Recursion stops with black once `depth` reaches the integrator's
//! maximum depth.

mod path;
mod photon_map;
mod whitted;

pub use path::PathTracer;
pub use photon_map::PhotonMapTracer;
pub use whitted::WhittedTracer;

use lux_core::{Hit, LightKind, Material, Scene};
use lux_math::optics::{fresnel, reflect, refract};
use lux_math::sampling::{rotate_to_normal, sample_hemisphere, HEMISPHERE_PDF};
use lux_math::{Color, Ray, Vec3, AIR_REF_INDEX, BIAS};
use rand::RngCore;

use crate::{gen_f32, gen_vec2};

/// The integrator used for the final image.
#[derive(Debug, Clone)]
pub enum Integrator {
    Whitted(WhittedTracer),
    PathTracer(PathTracer),
    PhotonMap(PhotonMapTracer),
}

impl Integrator {
    /// Radiance arriving at the ray origin along `ray`.
    pub fn trace_ray(&self, ray: &Ray, scene: &Scene, depth: u32, rng: &mut dyn RngCore) -> Color {
        match self {
            Integrator::Whitted(tracer) => tracer.trace_ray(ray, scene, depth, rng),
            Integrator::PathTracer(tracer) => tracer.trace_ray(ray, scene, depth, rng),
            Integrator::PhotonMap(tracer) => tracer.trace_ray(ray, scene, depth, rng),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Integrator::Whitted(_) => "whitted",
            Integrator::PathTracer(_) => "monte_carlo",
            Integrator::PhotonMap(_) => "jensen",
        }
    }
}

/// Refractive indices `(from, to)` for a ray crossing the surface of
/// `material`. Leaving a body always goes back into air.
pub(crate) fn media(ray_ref_index: f32, material: &Material, front_face: bool) -> (f32, f32) {
    if front_face {
        (ray_ref_index, material.ref_index)
    } else {
        (ray_ref_index, AIR_REF_INDEX)
    }
}

/// Diffuse and specular light arriving directly from every visible light.
///
/// Area lights are sampled at one random surface point per call. The
/// returned colours are not yet multiplied by the material's albedo or
/// specular colour.
pub fn direct_lighting(scene: &Scene, hit: &Hit, ray: &Ray, rng: &mut dyn RngCore) -> (Color, Color) {
    let material = &scene.figures[hit.figure].material;
    let origin = hit.point + hit.normal * BIAS;

    let mut diffuse = Color::ZERO;
    let mut specular = Color::ZERO;

    for light in &scene.lights {
        let sample = if light.kind() == LightKind::Area {
            match light.sample_surface_point(&scene.figures, gen_vec2(rng)) {
                Some(sample) => Some(sample),
                None => continue,
            }
        } else {
            None
        };

        let (direction, distance) = light.direction_and_distance(hit.point, sample.as_ref());
        if direction == Vec3::ZERO {
            continue;
        }

        let shadow_ray = Ray::new(origin, direction);
        if scene.occluded(&shadow_ray, distance, light.figure()) {
            continue;
        }

        diffuse += light.diffuse(&scene.figures, hit.point, hit.normal, sample.as_ref(), material);
        specular += light.specular(
            &scene.figures,
            hit.point,
            hit.normal,
            ray.direction,
            sample.as_ref(),
            material,
        );
    }

    (diffuse, specular)
}

/// Mirror reflection of `ray` at `hit`, offset off the surface.
pub(crate) fn reflected_ray(ray: &Ray, hit: &Hit) -> Ray {
    Ray::with_ref_index(
        hit.point + hit.normal * BIAS,
        reflect(ray.direction, hit.normal).normalize(),
        ray.ref_index,
    )
}

/// Split `ray` at a dielectric surface by the Fresnel term and weight the
/// radiance `trace` returns along the reflected and refracted rays.
pub(crate) fn dielectric<F>(
    ray: &Ray,
    hit: &Hit,
    material: &Material,
    rng: &mut dyn RngCore,
    mut trace: F,
) -> Color
where
    F: FnMut(&Ray, &mut dyn RngCore) -> Color,
{
    let (n1, n2) = media(ray.ref_index, material, hit.front_face);
    let kr = fresnel(ray.direction, hit.normal, n1, n2);
    let mut color = Color::ZERO;

    if kr > 0.0 {
        color += kr * trace(&reflected_ray(ray, hit), rng);
    }

    if kr < 1.0 {
        if let Some(direction) = refract(ray.direction, hit.normal, n1 / n2) {
            let refracted = Ray::with_ref_index(hit.point - hit.normal * BIAS, direction, n2);
            color += (1.0 - kr) * trace(&refracted, rng);
        }
    }

    color
}

/// Uniform direction on the hemisphere around `normal`.
pub(crate) fn hemisphere_direction(normal: Vec3, rng: &mut dyn RngCore) -> Vec3 {
    let r1 = gen_f32(rng);
    let r2 = gen_f32(rng);
    rotate_to_normal(sample_hemisphere(r1, r2), normal).normalize()
}

/// One-sample estimate of the irradiance the environment sends onto `hit`.
pub(crate) fn environment_irradiance(scene: &Scene, hit: &Hit, rng: &mut dyn RngCore) -> Color {
    if scene.environment.is_black() {
        return Color::ZERO;
    }

    let direction = hemisphere_direction(hit.normal, rng);
    let ray = Ray::new(hit.point + hit.normal * BIAS, direction);
    if scene.occluded(&ray, f32::INFINITY, None) {
        return Color::ZERO;
    }

    let cos_theta = direction.dot(hit.normal).max(0.0);
    scene.environment.sample(&ray) * cos_theta / HEMISPHERE_PDF
}

#[cfg(test)]
pub(crate) mod test_scenes {
    use lux_core::{AreaLight, Attenuation, Camera, Environment, Figure, Light, Material, PointLight, Scene};
    use lux_math::{Color, Vec3};

    /// Box-like scene with a floor, a back wall, a matte, a mirror and a
    /// glass sphere, lit by a disk light and a point light under a dim sky.
    pub fn gallery() -> Scene {
        let mut scene = Scene::new();
        scene.camera = Camera::new(Vec3::new(0.0, 1.0, 4.0), Vec3::new(0.0, 0.8, 0.0), Vec3::Y, 60.0, 32, 24);
        scene.environment = Environment::Constant(Color::splat(0.2));

        scene.add_figure(Figure::plane(Vec3::ZERO, Vec3::Y, Material::diffuse(Color::splat(0.8))));
        scene.add_figure(Figure::plane(
            Vec3::new(0.0, 0.0, -2.0),
            Vec3::Z,
            Material::diffuse(Color::new(0.8, 0.3, 0.3)),
        ));
        scene.add_figure(Figure::sphere(
            Vec3::new(-1.0, 0.5, 0.0),
            0.5,
            Material {
                diffuse: Color::new(0.3, 0.8, 0.3),
                specular: Color::splat(0.5),
                shininess: 32.0,
                ..Default::default()
            },
        ));
        scene.add_figure(Figure::sphere(Vec3::new(0.2, 0.5, -0.5), 0.5, Material::mirror()));
        scene.add_figure(Figure::sphere(Vec3::new(1.2, 0.4, 0.6), 0.4, Material::glass(1.5)));

        let light = scene.add_figure(Figure::disk(
            Vec3::new(0.0, 2.5, 0.0),
            Vec3::NEG_Y,
            0.5,
            Material::emissive(Color::splat(4.0)),
        ));
        scene.add_light(Light::Area(AreaLight {
            figure: light,
            attenuation: Attenuation::default(),
        }));
        scene.add_light(Light::Point(PointLight {
            position: Vec3::new(2.0, 2.0, 2.0),
            diffuse: Color::splat(0.6),
            specular: Color::splat(0.6),
            attenuation: Attenuation::default(),
        }));
        scene
    }

    /// The camera sits inside a perfect mirror sphere, so rays never escape.
    pub fn hall_of_mirrors() -> Scene {
        let mut scene = Scene::new();
        scene.add_figure(Figure::sphere(Vec3::ZERO, 2.0, Material::mirror()));
        scene.add_light(Light::Point(PointLight {
            position: Vec3::new(0.0, 1.0, 0.0),
            diffuse: Color::ONE,
            specular: Color::ONE,
            attenuation: Attenuation::default(),
        }));
        scene
    }

    /// Index of the disk light figure in [`gallery`].
    pub const GALLERY_LIGHT: usize = 5;
}
