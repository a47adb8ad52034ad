//! Scene background: a constant colour or an HDR environment texture.
//!
//! Textures are loaded once through the `image` crate and kept as linear
//! float RGB. Rays that escape the scene look them up by direction using
//! either a latitude-longitude or a light-probe (angular) mapping.

use std::f32::consts::PI;
use std::path::Path;
use std::sync::Arc;

use lux_math::{Color, Ray, Vec3};
use thiserror::Error;

/// Errors that can occur during texture loading.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Failed to load texture {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Texture {0} has no pixels")]
    Empty(String),
}

pub type TextureResult<T> = Result<T, TextureError>;

/// A loaded texture with linear RGB pixel data.
#[derive(Clone, Debug)]
pub struct Texture {
    pub width: u32,
    pub height: u32,

    /// Row-major, top row first.
    pub pixels: Vec<Color>,

    /// Original file path (for debugging)
    pub path: String,
}

impl Texture {
    pub fn new(width: u32, height: u32, pixels: Vec<Color>, path: impl Into<String>) -> Self {
        Self {
            width,
            height,
            pixels,
            path: path.into(),
        }
    }

    /// Load an image from disk. 8-bit images are assumed sRGB encoded and
    /// converted to linear; float images (HDR, EXR) are used as is.
    pub fn load(path: &Path) -> TextureResult<Self> {
        let name = path.to_string_lossy().to_string();
        let img = image::open(path).map_err(|source| TextureError::Load {
            path: name.clone(),
            source,
        })?;

        let is_float = matches!(
            img.color(),
            image::ColorType::Rgb32F | image::ColorType::Rgba32F
        );

        let (width, height, pixels) = if is_float {
            let rgb = img.to_rgb32f();
            let (w, h) = rgb.dimensions();
            let pixels = rgb.pixels().map(|p| Vec3::new(p[0], p[1], p[2])).collect();
            (w, h, pixels)
        } else {
            let rgb = img.to_rgb8();
            let (w, h) = rgb.dimensions();
            let pixels = rgb
                .pixels()
                .map(|p| Vec3::new(srgb_to_linear(p[0]), srgb_to_linear(p[1]), srgb_to_linear(p[2])))
                .collect();
            (w, h, pixels)
        };

        if width == 0 || height == 0 {
            return Err(TextureError::Empty(name));
        }

        log::debug!("Loaded environment texture: {} ({}x{})", name, width, height);
        Ok(Texture::new(width, height, pixels, name))
    }

    /// Nearest-texel lookup. `(0, 0)` is the bottom-left corner.
    pub fn sample(&self, u: f32, v: f32) -> Color {
        let u = u.clamp(0.0, 1.0);
        let v = v.clamp(0.0, 1.0);

        let x = (u * (self.width as f32 - 1.0)) as u32;
        let y = ((1.0 - v) * (self.height as f32 - 1.0)) as u32;

        self.get_pixel(x.min(self.width - 1), y.min(self.height - 1))
    }

    fn get_pixel(&self, x: u32, y: u32) -> Color {
        let idx = (y * self.width + x) as usize;
        self.pixels.get(idx).copied().unwrap_or(Color::ZERO)
    }
}

/// Convert sRGB byte value to linear float.
fn srgb_to_linear(value: u8) -> f32 {
    let v = value as f32 / 255.0;
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

/// Radiance arriving from outside the scene.
#[derive(Clone, Debug)]
pub enum Environment {
    Constant(Color),
    Texture {
        texture: Arc<Texture>,
        /// Angular light-probe mapping instead of latitude-longitude.
        light_probe: bool,
    },
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Constant(Color::ZERO)
    }
}

impl Environment {
    /// Radiance seen along an escaping ray.
    pub fn sample(&self, ray: &Ray) -> Color {
        match self {
            Environment::Constant(color) => *color,
            Environment::Texture {
                texture,
                light_probe,
            } => {
                let d = ray.direction.normalize_or_zero();
                let (u, v) = if *light_probe {
                    probe_coords(d)
                } else {
                    lat_long_coords(d)
                };
                texture.sample(u, v)
            }
        }
    }

    /// Whether any radiance can come from the environment at all.
    pub fn is_black(&self) -> bool {
        matches!(self, Environment::Constant(c) if c.max_element() <= 0.0)
    }
}

/// Equirectangular mapping; straight up is the top row, -Z the centre column.
fn lat_long_coords(d: Vec3) -> (f32, f32) {
    let u = (1.0 + d.x.atan2(-d.z) / PI) / 2.0;
    let v = 1.0 - d.y.clamp(-1.0, 1.0).acos() / PI;
    (u, v)
}

/// Debevec angular map; +Z looks at the centre of the probe.
fn probe_coords(d: Vec3) -> (f32, f32) {
    let planar = (d.x * d.x + d.y * d.y).sqrt();
    if planar <= f32::EPSILON {
        return (0.5, 0.5);
    }
    let r = d.z.clamp(-1.0, 1.0).acos() / (PI * planar);
    ((d.x * r + 1.0) / 2.0, (d.y * r + 1.0) / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_texture() -> Texture {
        // 2x2: top row red/green, bottom row blue/white
        Texture::new(
            2,
            2,
            vec![Vec3::X, Vec3::Y, Vec3::Z, Vec3::ONE],
            "<test>",
        )
    }

    #[test]
    fn test_constant_environment() {
        let env = Environment::Constant(Color::splat(0.1));
        assert_eq!(env.sample(&Ray::new(Vec3::ZERO, Vec3::Y)), Color::splat(0.1));
        assert!(!env.is_black());
        assert!(Environment::default().is_black());
    }

    #[test]
    fn test_texture_sample_corners() {
        let tex = gradient_texture();
        assert_eq!(tex.sample(0.0, 1.0), Vec3::X);
        assert_eq!(tex.sample(1.0, 1.0), Vec3::Y);
        assert_eq!(tex.sample(0.0, 0.0), Vec3::Z);
        assert_eq!(tex.sample(1.0, 0.0), Vec3::ONE);
    }

    #[test]
    fn test_lat_long_up_is_top_row() {
        let env = Environment::Texture {
            texture: Arc::new(gradient_texture()),
            light_probe: false,
        };
        let up = env.sample(&Ray::new(Vec3::ZERO, Vec3::Y));
        let down = env.sample(&Ray::new(Vec3::ZERO, Vec3::NEG_Y));
        assert!(up == Vec3::X || up == Vec3::Y);
        assert!(down == Vec3::Z || down == Vec3::ONE);
    }

    #[test]
    fn test_probe_coords_center() {
        let (u, v) = probe_coords(Vec3::Z);
        assert_eq!((u, v), (0.5, 0.5));
        let (u, _) = probe_coords(Vec3::X);
        assert!((u - 0.75).abs() < 1e-5);
    }

    #[test]
    fn test_srgb_to_linear() {
        assert!((srgb_to_linear(0) - 0.0).abs() < 0.001);
        assert!((srgb_to_linear(255) - 1.0).abs() < 0.001);

        // Mid-gray is darker in linear
        let mid = srgb_to_linear(128);
        assert!(mid < 0.5);
        assert!(mid > 0.1);
    }

    #[test]
    fn test_missing_texture_fails() {
        let err = Texture::load(Path::new("/nonexistent/probe.hdr")).unwrap_err();
        assert!(matches!(err, TextureError::Load { .. }));
    }
}
