//! Surface materials and the local shading models.

use lux_math::optics::reflect;
use lux_math::{Color, Vec3, AIR_REF_INDEX};
use serde::Deserialize;

/// Local reflection model used for direct lighting.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Brdf {
    /// Lambert diffuse plus a Phong specular lobe.
    #[default]
    Phong,
    /// Heidrich-Seidel anisotropic model for brushed or threaded surfaces.
    /// `thread_dir` is projected onto the tangent plane at shading time.
    HeidrichSeidel { thread_dir: Vec3 },
}

impl Brdf {
    /// Diffuse response to a light of colour `light_color` arriving from
    /// `light_dir` (unit, pointing towards the light).
    pub fn diffuse(&self, light_dir: Vec3, normal: Vec3, light_color: Color) -> Color {
        let n_dot_l = normal.dot(light_dir).max(0.0);
        match self {
            Brdf::Phong => light_color * n_dot_l,
            Brdf::HeidrichSeidel { thread_dir } => {
                let t = thread_tangent(*thread_dir, normal);
                let l_dot_t = light_dir.dot(t);
                let k_diff = (1.0 - l_dot_t * l_dot_t).max(0.0).sqrt();
                light_color * k_diff * n_dot_l
            }
        }
    }

    /// Specular response for a viewer looking along `view_dir` (the incoming
    /// ray direction).
    pub fn specular(
        &self,
        light_dir: Vec3,
        normal: Vec3,
        view_dir: Vec3,
        light_color: Color,
        shininess: f32,
    ) -> Color {
        let phong = phong_specular(light_dir, normal, view_dir, light_color, shininess);
        match self {
            Brdf::Phong => phong,
            Brdf::HeidrichSeidel { thread_dir } => {
                let t = thread_tangent(*thread_dir, normal);
                let n_dot_l = normal.dot(light_dir).max(0.0);
                let l_dot_t = (-light_dir).dot(t).max(0.0);
                let v_dot_t = (-view_dir).dot(t).max(0.0);
                let sin_l = (1.0 - l_dot_t * l_dot_t).max(0.0).sqrt();
                let sin_v = (1.0 - v_dot_t * v_dot_t).max(0.0).sqrt();
                let base = sin_l * sin_v - l_dot_t * v_dot_t;
                let k_spec = base.max(0.0).powf(shininess);
                n_dot_l * (light_color * k_spec + phong)
            }
        }
    }
}

fn phong_specular(
    light_dir: Vec3,
    normal: Vec3,
    view_dir: Vec3,
    light_color: Color,
    shininess: f32,
) -> Color {
    if normal.dot(light_dir) <= 0.0 {
        return Color::ZERO;
    }
    let r = reflect(-light_dir, normal);
    let r_dot_v = r.dot(-view_dir).max(0.0);
    light_color * r_dot_v.powf(shininess)
}

/// Thread direction projected onto the plane orthogonal to `normal`.
fn thread_tangent(thread_dir: Vec3, normal: Vec3) -> Vec3 {
    (thread_dir - thread_dir.dot(normal) * normal).normalize_or_zero()
}

/// Material description carried by value on every figure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Diffuse albedo.
    pub diffuse: Color,
    /// Specular colour.
    pub specular: Color,
    /// Emitted radiance (non-zero on area-light figures).
    pub emission: Color,
    /// Mirror reflectance in [0, 1].
    pub rho: f32,
    /// Phong exponent.
    pub shininess: f32,
    /// Refractive index of the material's interior.
    pub ref_index: f32,
    /// Dielectric: light is split by the Fresnel term instead of shaded.
    pub transmissive: bool,
    pub brdf: Brdf,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            diffuse: Color::ONE,
            specular: Color::ONE,
            emission: Color::ZERO,
            rho: 0.0,
            shininess: 89.0,
            ref_index: AIR_REF_INDEX,
            transmissive: false,
            brdf: Brdf::Phong,
        }
    }
}

impl Material {
    /// Matte material with the given albedo and no specular highlight.
    pub fn diffuse(albedo: Color) -> Self {
        Self {
            diffuse: albedo,
            specular: Color::ZERO,
            ..Default::default()
        }
    }

    /// Perfect mirror.
    pub fn mirror() -> Self {
        Self {
            diffuse: Color::ZERO,
            specular: Color::ZERO,
            rho: 1.0,
            ..Default::default()
        }
    }

    /// Clear dielectric with the given refractive index.
    pub fn glass(ref_index: f32) -> Self {
        Self {
            diffuse: Color::ZERO,
            specular: Color::ZERO,
            ref_index,
            transmissive: true,
            ..Default::default()
        }
    }

    /// Emitter used by area lights.
    pub fn emissive(emission: Color) -> Self {
        Self {
            emission,
            ..Default::default()
        }
    }

    /// Whether photons bounce specularly off this material.
    pub fn is_specular(&self) -> bool {
        self.transmissive || self.rho > 0.0
    }

    /// Check if this material is emissive.
    pub fn is_emissive(&self) -> bool {
        self.emission.length_squared() > 0.0
    }
}

/// Material as written in a scene file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaterialDesc {
    pub diffuse: Option<[f32; 3]>,
    pub specular: Option<[f32; 3]>,
    pub emission: Option<[f32; 3]>,
    pub rho: Option<f32>,
    pub shininess: Option<f32>,
    pub ref_index: Option<f32>,
    pub transmissive: Option<bool>,
    pub brdf: Option<BrdfDesc>,
}

/// Shading model selector in a scene file.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum BrdfDesc {
    Phong,
    HeidrichSeidel { thread_dir: [f32; 3] },
}

impl From<MaterialDesc> for Material {
    fn from(desc: MaterialDesc) -> Self {
        let defaults = Material::default();
        Material {
            diffuse: desc.diffuse.map(Vec3::from).unwrap_or(defaults.diffuse),
            specular: desc.specular.map(Vec3::from).unwrap_or(defaults.specular),
            emission: desc.emission.map(Vec3::from).unwrap_or(defaults.emission),
            rho: desc.rho.unwrap_or(defaults.rho).clamp(0.0, 1.0),
            shininess: desc.shininess.unwrap_or(defaults.shininess),
            ref_index: desc.ref_index.unwrap_or(defaults.ref_index),
            transmissive: desc.transmissive.unwrap_or(defaults.transmissive),
            brdf: match desc.brdf {
                None | Some(BrdfDesc::Phong) => Brdf::Phong,
                Some(BrdfDesc::HeidrichSeidel { thread_dir }) => Brdf::HeidrichSeidel {
                    thread_dir: Vec3::from(thread_dir),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_default() {
        let mat = Material::default();
        assert_eq!(mat.diffuse, Color::ONE);
        assert_eq!(mat.shininess, 89.0);
        assert_eq!(mat.ref_index, AIR_REF_INDEX);
        assert!(!mat.is_specular());
        assert!(!mat.is_emissive());
    }

    #[test]
    fn test_material_presets() {
        assert!(Material::mirror().is_specular());
        assert!(Material::glass(1.5).is_specular());
        assert!(Material::emissive(Color::splat(4.0)).is_emissive());
    }

    #[test]
    fn test_phong_diffuse_cosine() {
        let brdf = Brdf::Phong;
        let head_on = brdf.diffuse(Vec3::Y, Vec3::Y, Color::ONE);
        let tilted = brdf.diffuse(Vec3::new(1.0, 1.0, 0.0).normalize(), Vec3::Y, Color::ONE);
        let behind = brdf.diffuse(Vec3::NEG_Y, Vec3::Y, Color::ONE);

        assert_eq!(head_on, Color::ONE);
        assert!((tilted.x - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-5);
        assert_eq!(behind, Color::ZERO);
    }

    #[test]
    fn test_phong_specular_peaks_on_mirror_direction() {
        let brdf = Brdf::Phong;
        let light = Vec3::new(1.0, 1.0, 0.0).normalize();
        // Viewer looks down along the mirror of the light direction
        let view = Vec3::new(1.0, -1.0, 0.0).normalize();
        let peak = brdf.specular(light, Vec3::Y, view, Color::ONE, 20.0);
        let off = brdf.specular(light, Vec3::Y, Vec3::NEG_Y, Color::ONE, 20.0);
        assert!((peak.x - 1.0).abs() < 1e-4);
        assert!(off.x < peak.x);
    }

    #[test]
    fn test_heidrich_seidel_is_non_negative() {
        let brdf = Brdf::HeidrichSeidel { thread_dir: Vec3::X };
        let light = Vec3::new(0.3, 1.0, 0.2).normalize();
        let view = Vec3::new(0.5, -1.0, 0.1).normalize();
        let d = brdf.diffuse(light, Vec3::Y, Color::ONE);
        let s = brdf.specular(light, Vec3::Y, view, Color::ONE, 10.0);
        assert!(d.min_element() >= 0.0);
        assert!(s.min_element() >= 0.0);
    }

    #[test]
    fn test_material_desc_defaults() {
        let mat: Material = MaterialDesc {
            diffuse: Some([0.5, 0.25, 0.0]),
            rho: Some(2.0),
            ..Default::default()
        }
        .into();
        assert_eq!(mat.diffuse, Vec3::new(0.5, 0.25, 0.0));
        assert_eq!(mat.rho, 1.0);
        assert_eq!(mat.specular, Color::ONE);
        assert_eq!(mat.brdf, Brdf::Phong);
    }
}
