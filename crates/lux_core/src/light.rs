//! Light sources.
//!
//! Area lights do not carry geometry of their own: they point at an
//! emitting figure of the scene and take their colour from its material.

use lux_math::{Color, Vec2, Vec3};

use crate::figure::{Figure, FigureId};
use crate::material::Material;

/// Distance falloff `1 / (constant + linear * d + quadratic * d^2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 0.0,
            quadratic: 0.0,
        }
    }
}

impl Attenuation {
    pub fn factor(&self, distance: f32) -> f32 {
        let denom = self.constant + self.linear * distance + self.quadratic * distance * distance;
        if denom > 0.0 {
            1.0 / denom
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaLight {
    pub figure: FigureId,
    pub attenuation: Attenuation,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub diffuse: Color,
    pub specular: Color,
    pub attenuation: Attenuation,
}

/// Light arriving from infinitely far away.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Direction the light travels in (unit).
    pub direction: Vec3,
    pub diffuse: Color,
    pub specular: Color,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotLight {
    pub position: Vec3,
    /// Cone axis (unit), pointing away from the light.
    pub direction: Vec3,
    /// Half-angle of the cone in degrees.
    pub cutoff: f32,
    /// Falloff exponent applied to the cosine to the axis.
    pub exponent: f32,
    pub diffuse: Color,
    pub specular: Color,
    pub attenuation: Attenuation,
}

/// Broad class of a light, used to pick emission and shadow strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Area,
    Point,
    Directional,
    Spot,
}

/// Point sampled on the surface of an area light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSample {
    pub position: Vec3,
    pub normal: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    Area(AreaLight),
    Point(PointLight),
    Directional(DirectionalLight),
    Spot(SpotLight),
}

/// Colours a light delivers to a point, before the BRDF.
struct Incident {
    direction: Vec3,
    diffuse: Color,
    specular: Color,
}

impl Light {
    pub fn kind(&self) -> LightKind {
        match self {
            Light::Area(_) => LightKind::Area,
            Light::Point(_) => LightKind::Point,
            Light::Directional(_) => LightKind::Directional,
            Light::Spot(_) => LightKind::Spot,
        }
    }

    /// Figure that emits for an area light.
    pub fn figure(&self) -> Option<FigureId> {
        match self {
            Light::Area(area) => Some(area.figure),
            _ => None,
        }
    }

    /// Sample a point on the emitting surface. `None` for non-area lights,
    /// or when the figure cannot be sampled.
    pub fn sample_surface_point(&self, figures: &[Figure], u: Vec2) -> Option<LightSample> {
        let Light::Area(area) = self else {
            return None;
        };
        let (position, normal) = figures.get(area.figure)?.sample_surface(u)?;
        Some(LightSample { position, normal })
    }

    /// Unit direction from `point` towards the light and the distance to it.
    ///
    /// Area lights aim at `sample`; without one the direction is zero.
    /// Directional lights are infinitely far away.
    pub fn direction_and_distance(&self, point: Vec3, sample: Option<&LightSample>) -> (Vec3, f32) {
        let towards = |target: Vec3| {
            let offset = target - point;
            (offset.normalize_or_zero(), offset.length())
        };
        match self {
            Light::Area(_) => match sample {
                Some(s) => towards(s.position),
                None => (Vec3::ZERO, 0.0),
            },
            Light::Point(light) => towards(light.position),
            Light::Spot(light) => towards(light.position),
            Light::Directional(light) => (-light.direction.normalize_or_zero(), f32::INFINITY),
        }
    }

    /// Diffuse contribution at `point`, assuming the light is visible.
    pub fn diffuse(
        &self,
        figures: &[Figure],
        point: Vec3,
        normal: Vec3,
        sample: Option<&LightSample>,
        material: &Material,
    ) -> Color {
        let incident = self.incident(figures, point, sample);
        material.brdf.diffuse(incident.direction, normal, incident.diffuse)
    }

    /// Specular contribution at `point` seen along `view_dir`, assuming the
    /// light is visible.
    pub fn specular(
        &self,
        figures: &[Figure],
        point: Vec3,
        normal: Vec3,
        view_dir: Vec3,
        sample: Option<&LightSample>,
        material: &Material,
    ) -> Color {
        let incident = self.incident(figures, point, sample);
        material.brdf.specular(
            incident.direction,
            normal,
            view_dir,
            incident.specular,
            material.shininess,
        )
    }

    fn incident(&self, figures: &[Figure], point: Vec3, sample: Option<&LightSample>) -> Incident {
        let (direction, distance) = self.direction_and_distance(point, sample);
        let dark = Incident {
            direction,
            diffuse: Color::ZERO,
            specular: Color::ZERO,
        };

        match self {
            Light::Area(area) => {
                let (Some(s), Some(figure)) = (sample, figures.get(area.figure)) else {
                    return dark;
                };
                let facing = s.normal.dot(-direction).max(0.0);
                let color =
                    figure.material.emission * area.attenuation.factor(distance) * facing;
                Incident {
                    direction,
                    diffuse: color,
                    specular: color,
                }
            }
            Light::Point(light) => {
                let att = light.attenuation.factor(distance);
                Incident {
                    direction,
                    diffuse: light.diffuse * att,
                    specular: light.specular * att,
                }
            }
            Light::Directional(light) => Incident {
                direction,
                diffuse: light.diffuse,
                specular: light.specular,
            },
            Light::Spot(light) => {
                let cos_axis = light.direction.normalize_or_zero().dot(-direction);
                if cos_axis < light.cutoff.to_radians().cos() {
                    return dark;
                }
                let falloff = cos_axis.max(0.0).powf(light.exponent);
                let att = light.attenuation.factor(distance) * falloff;
                Incident {
                    direction,
                    diffuse: light.diffuse * att,
                    specular: light.specular * att,
                }
            }
        }
    }
}
