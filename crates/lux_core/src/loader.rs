//! JSON scene loading.
//!
//! A scene file is a single object:
//!
//! ```json
//! {
//!   "camera": { "eye": [0, 1, 4], "look": [0, 1, 0], "up": [0, 1, 0], "fov": 60 },
//!   "environment": { "color": [0.1, 0.1, 0.1] },
//!   "figures": [
//!     { "type": "sphere", "position": [0, 1, 0], "radius": 1,
//!       "material": { "diffuse": [0.8, 0.2, 0.2] } },
//!     { "type": "plane", "point": [0, 0, 0], "normal": [0, 1, 0] }
//!   ],
//!   "lights": [
//!     { "type": "disk_area_light", "position": [0, 3, 0], "normal": [0, -1, 0],
//!       "radius": 0.5, "emission": [10, 10, 10] }
//!   ]
//! }
//! ```
//!
//! Area lights add their emitting figure to the figure list. Texture paths
//! are resolved relative to the scene file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lux_math::{Color, Vec3};
use serde::Deserialize;
use thiserror::Error;

use crate::camera::Camera;
use crate::environment::{Environment, Texture, TextureError};
use crate::figure::Figure;
use crate::light::{AreaLight, Attenuation, DirectionalLight, Light, PointLight, SpotLight};
use crate::material::{Material, MaterialDesc};
use crate::scene::Scene;

/// Errors that can occur during scene loading.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("Failed to read scene file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid scene JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error(transparent)]
    Texture(#[from] TextureError),
}

/// Result type for scene loading.
pub type SceneResult<T> = Result<T, SceneError>;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SceneDesc {
    camera: Option<CameraDesc>,
    environment: Option<EnvironmentDesc>,
    #[serde(default)]
    figures: Vec<FigureDesc>,
    #[serde(default)]
    lights: Vec<LightDesc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CameraDesc {
    eye: Option<[f32; 3]>,
    look: Option<[f32; 3]>,
    up: Option<[f32; 3]>,
    left: Option<[f32; 3]>,
    fov: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EnvironmentDesc {
    color: Option<[f32; 3]>,
    texture: Option<String>,
    #[serde(default)]
    light_probe: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
enum FigureDesc {
    Sphere {
        position: [f32; 3],
        radius: f32,
        #[serde(default)]
        material: MaterialDesc,
    },
    Plane {
        point: [f32; 3],
        normal: [f32; 3],
        #[serde(default)]
        material: MaterialDesc,
    },
    Disk {
        position: [f32; 3],
        normal: [f32; 3],
        radius: f32,
        #[serde(default)]
        material: MaterialDesc,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AttenuationDesc {
    #[serde(default = "one")]
    constant: f32,
    #[serde(default)]
    linear: f32,
    #[serde(default)]
    quadratic: f32,
}

fn one() -> f32 {
    1.0
}

fn white() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

impl From<AttenuationDesc> for Attenuation {
    fn from(desc: AttenuationDesc) -> Self {
        Attenuation {
            constant: desc.constant,
            linear: desc.linear,
            quadratic: desc.quadratic,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
enum LightDesc {
    PointLight {
        position: [f32; 3],
        #[serde(default = "white")]
        diffuse: [f32; 3],
        #[serde(default = "white")]
        specular: [f32; 3],
        attenuation: Option<AttenuationDesc>,
    },
    DirectionalLight {
        direction: [f32; 3],
        #[serde(default = "white")]
        diffuse: [f32; 3],
        #[serde(default = "white")]
        specular: [f32; 3],
    },
    SpotLight {
        position: [f32; 3],
        direction: [f32; 3],
        cutoff: f32,
        #[serde(default = "one")]
        exponent: f32,
        #[serde(default = "white")]
        diffuse: [f32; 3],
        #[serde(default = "white")]
        specular: [f32; 3],
        attenuation: Option<AttenuationDesc>,
    },
    SphereAreaLight {
        position: [f32; 3],
        radius: f32,
        emission: [f32; 3],
        attenuation: Option<AttenuationDesc>,
    },
    DiskAreaLight {
        position: [f32; 3],
        normal: [f32; 3],
        radius: f32,
        emission: [f32; 3],
        attenuation: Option<AttenuationDesc>,
    },
}

/// Load a scene from a JSON file.
pub fn load_scene(path: impl AsRef<Path>) -> SceneResult<Scene> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|source| SceneError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let base_dir = path.parent().map(Path::to_path_buf);
    let scene = scene_from_str(&json, base_dir.as_deref())?;

    log::info!(
        "Loaded scene {}: {} figures, {} lights",
        path.display(),
        scene.figures.len(),
        scene.lights.len()
    );
    Ok(scene)
}

/// Build a scene from JSON text. Relative texture paths are resolved
/// against `base_dir` when given.
pub fn scene_from_str(json: &str, base_dir: Option<&Path>) -> SceneResult<Scene> {
    let desc: SceneDesc = serde_json::from_str(json)?;
    let mut scene = Scene::new();

    if let Some(camera) = desc.camera {
        scene.camera = build_camera(camera)?;
    }
    if let Some(env) = desc.environment {
        scene.environment = build_environment(env, base_dir)?;
    }

    for (i, figure) in desc.figures.into_iter().enumerate() {
        scene.add_figure(build_figure(figure, i)?);
    }
    for (i, light) in desc.lights.into_iter().enumerate() {
        add_light(&mut scene, light, i)?;
    }

    Ok(scene)
}

fn build_camera(desc: CameraDesc) -> SceneResult<Camera> {
    let eye = desc
        .eye
        .map(Vec3::from)
        .ok_or_else(|| SceneError::MissingField("camera.eye".into()))?;
    let look = desc
        .look
        .map(Vec3::from)
        .ok_or_else(|| SceneError::MissingField("camera.look".into()))?;

    if (look - eye).length_squared() <= 0.0 {
        return Err(invalid("camera.look", "must differ from camera.eye"));
    }

    let defaults = Camera::default();
    let fov = desc.fov.unwrap_or(defaults.fov);
    if !(fov > 0.0 && fov < 180.0) {
        return Err(invalid("camera.fov", format!("{} is outside (0, 180)", fov)));
    }

    match (desc.up, desc.left) {
        (Some(up), _) => Ok(Camera::new(
            eye,
            look,
            non_zero(up, "camera.up")?,
            fov,
            defaults.width,
            defaults.height,
        )),
        (None, Some(left)) => Ok(Camera::from_left(
            eye,
            look,
            non_zero(left, "camera.left")?,
            fov,
            defaults.width,
            defaults.height,
        )),
        (None, None) => Err(SceneError::MissingField("camera.up or camera.left".into())),
    }
}

fn build_environment(desc: EnvironmentDesc, base_dir: Option<&Path>) -> SceneResult<Environment> {
    match (desc.texture, desc.color) {
        (Some(texture), _) => {
            let path = resolve_path(&texture, base_dir);
            let texture = Texture::load(&path)?;
            Ok(Environment::Texture {
                texture: Arc::new(texture),
                light_probe: desc.light_probe,
            })
        }
        (None, Some(color)) => Ok(Environment::Constant(Color::from(color))),
        (None, None) => Err(SceneError::MissingField(
            "environment.color or environment.texture".into(),
        )),
    }
}

fn build_figure(desc: FigureDesc, index: usize) -> SceneResult<Figure> {
    let field = |name: &str| format!("figures[{}].{}", index, name);
    match desc {
        FigureDesc::Sphere {
            position,
            radius,
            material,
        } => Ok(Figure::sphere(
            Vec3::from(position),
            positive(radius, &field("radius"))?,
            material.into(),
        )),
        FigureDesc::Plane {
            point,
            normal,
            material,
        } => Ok(Figure::plane(
            Vec3::from(point),
            non_zero(normal, &field("normal"))?,
            material.into(),
        )),
        FigureDesc::Disk {
            position,
            normal,
            radius,
            material,
        } => Ok(Figure::disk(
            Vec3::from(position),
            non_zero(normal, &field("normal"))?,
            positive(radius, &field("radius"))?,
            material.into(),
        )),
    }
}

fn add_light(scene: &mut Scene, desc: LightDesc, index: usize) -> SceneResult<()> {
    let field = |name: &str| format!("lights[{}].{}", index, name);
    let light = match desc {
        LightDesc::PointLight {
            position,
            diffuse,
            specular,
            attenuation,
        } => Light::Point(PointLight {
            position: Vec3::from(position),
            diffuse: Color::from(diffuse),
            specular: Color::from(specular),
            attenuation: attenuation.map(Into::into).unwrap_or_default(),
        }),
        LightDesc::DirectionalLight {
            direction,
            diffuse,
            specular,
        } => Light::Directional(DirectionalLight {
            direction: non_zero(direction, &field("direction"))?,
            diffuse: Color::from(diffuse),
            specular: Color::from(specular),
        }),
        LightDesc::SpotLight {
            position,
            direction,
            cutoff,
            exponent,
            diffuse,
            specular,
            attenuation,
        } => {
            if !(cutoff > 0.0 && cutoff <= 90.0) {
                return Err(invalid(field("cutoff"), format!("{} is outside (0, 90]", cutoff)));
            }
            Light::Spot(SpotLight {
                position: Vec3::from(position),
                direction: non_zero(direction, &field("direction"))?,
                cutoff,
                exponent,
                diffuse: Color::from(diffuse),
                specular: Color::from(specular),
                attenuation: attenuation.map(Into::into).unwrap_or_default(),
            })
        }
        LightDesc::SphereAreaLight {
            position,
            radius,
            emission,
            attenuation,
        } => {
            let figure = scene.add_figure(Figure::sphere(
                Vec3::from(position),
                positive(radius, &field("radius"))?,
                Material::emissive(Color::from(emission)),
            ));
            Light::Area(AreaLight {
                figure,
                attenuation: attenuation.map(Into::into).unwrap_or_default(),
            })
        }
        LightDesc::DiskAreaLight {
            position,
            normal,
            radius,
            emission,
            attenuation,
        } => {
            let figure = scene.add_figure(Figure::disk(
                Vec3::from(position),
                non_zero(normal, &field("normal"))?,
                positive(radius, &field("radius"))?,
                Material::emissive(Color::from(emission)),
            ));
            Light::Area(AreaLight {
                figure,
                attenuation: attenuation.map(Into::into).unwrap_or_default(),
            })
        }
    };
    scene.add_light(light);
    Ok(())
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> SceneError {
    SceneError::InvalidValue {
        field: field.into(),
        message: message.into(),
    }
}

fn positive(value: f32, field: &str) -> SceneResult<f32> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(invalid(field, format!("expected a positive number, got {}", value)))
    }
}

fn non_zero(v: [f32; 3], field: &str) -> SceneResult<Vec3> {
    let v = Vec3::from(v);
    if v.length_squared() > 0.0 && v.is_finite() {
        Ok(v.normalize())
    } else {
        Err(invalid(field, "vector must be finite and non-zero"))
    }
}

/// Resolve a path relative to the scene directory.
fn resolve_path(path: &str, base_dir: Option<&Path>) -> PathBuf {
    let path = Path::new(path);

    if path.is_absolute() {
        path.to_path_buf()
    } else if let Some(base) = base_dir {
        base.join(path)
    } else {
        path.to_path_buf()
    }
}
