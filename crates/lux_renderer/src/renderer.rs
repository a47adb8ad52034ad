//! Parallel image renderer.
//!
//! The image is split into spiral-ordered buckets rendered on rayon's pool;
//! every pixel averages `samples_per_pixel` jittered camera rays.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use lux_core::{Camera, Scene};
use lux_math::Color;
use rand::RngCore;
use rayon::prelude::*;

use crate::bucket::{generate_buckets, render_bucket, BucketResult};
use crate::config::RenderConfig;
use crate::gen_vec2;
use crate::integrator::Integrator;

/// Display gamma applied when converting to 8-bit.
pub const GAMMA: f32 = 2.2;

/// Clamp to [0, 1] and apply display gamma.
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    linear.clamp(0.0, 1.0).powf(1.0 / GAMMA)
}

/// Convert a color to 8-bit RGBA.
pub fn color_to_rgba(color: Color) -> [u8; 4] {
    let r = (255.0 * linear_to_gamma(color.x)).round() as u8;
    let g = (255.0 * linear_to_gamma(color.y)).round() as u8;
    let b = (255.0 * linear_to_gamma(color.z)).round() as u8;
    [r, g, b, 255]
}

/// Render a single pixel with multi-sampling.
pub fn render_pixel(
    scene: &Scene,
    camera: &Camera,
    integrator: &Integrator,
    row: u32,
    col: u32,
    samples: u32,
    rng: &mut dyn RngCore,
) -> Color {
    let mut pixel_color = Color::ZERO;

    for _ in 0..samples {
        let ray = camera.primary_ray(row, col, gen_vec2(rng));
        pixel_color += integrator.trace_ray(&ray, scene, 0, rng);
    }

    pixel_color / samples.max(1) as f32
}

/// Linear RGB framebuffer.
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

impl ImageBuffer {
    /// Create a new image buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; width as usize * height as usize],
        }
    }

    /// Row-major offset of (x, y), computed in `usize`.
    #[inline]
    pub fn pixel_index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Get the pixel at (x, y).
    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[self.pixel_index(x, y)]
    }

    /// Set the pixel at (x, y).
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        let i = self.pixel_index(x, y);
        self.pixels[i] = color;
    }

    /// Copy a rendered bucket into its region of the image.
    pub fn write_bucket(&mut self, result: &BucketResult) {
        let bucket = &result.bucket;
        for (i, color) in result.pixels.iter().enumerate() {
            let i = i as u32;
            self.set(bucket.x + i % bucket.width, bucket.y + i / bucket.width, *color);
        }
    }

    /// Convert to gamma-corrected RGBA bytes.
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for color in &self.pixels {
            bytes.extend_from_slice(&color_to_rgba(*color));
        }
        bytes
    }
}

/// Render the scene with `integrator` at the resolution in `config`.
///
/// The scene camera is re-projected to the configured resolution and, when
/// set, the configured field of view.
pub fn render(scene: &Scene, integrator: &Integrator, config: &RenderConfig) -> ImageBuffer {
    let mut camera = scene.camera.clone();
    let fov = config.fov.unwrap_or(camera.fov);
    camera.set_resolution(config.width, config.height, fov);

    let buckets = generate_buckets(config.width, config.height, config.bucket_size);
    let total = buckets.len();
    let done = AtomicUsize::new(0);
    let start = Instant::now();

    log::info!(
        "Rendering {}x{} @ {} spp with the {} tracer ({} buckets)",
        config.width,
        config.height,
        config.samples_per_pixel,
        integrator.name(),
        total
    );

    let results: Vec<BucketResult> = buckets
        .par_iter()
        .map(|bucket| {
            let pixels = render_bucket(bucket, scene, &camera, integrator, config);
            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
            if finished % (total / 10).max(1) == 0 {
                log::info!("Rendered {}/{} buckets", finished, total);
            }
            BucketResult::new(*bucket, pixels)
        })
        .collect();

    let mut image = ImageBuffer::new(config.width, config.height);
    for result in &results {
        image.write_bucket(result);
    }

    log::info!("Render finished in {:.2?}", start.elapsed());
    image
}
