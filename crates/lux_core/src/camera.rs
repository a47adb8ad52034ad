//! Pinhole camera for primary ray generation.

use lux_math::{Mat4, Ray, Vec2, Vec3};

/// Pinhole camera looking from `eye` towards `look`.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub look: Vec3,
    pub up: Vec3,

    /// Vertical field of view in degrees.
    pub fov: f32,
    pub width: u32,
    pub height: u32,

    // Cached by reset()
    inv_view: Mat4,
    aspect_ratio: f32,
    half_height: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y, 90.0, 640, 480)
    }
}

impl Camera {
    pub fn new(eye: Vec3, look: Vec3, up: Vec3, fov: f32, width: u32, height: u32) -> Self {
        let mut camera = Self {
            eye,
            look,
            up: up.normalize_or_zero(),
            fov,
            width,
            height,
            inv_view: Mat4::IDENTITY,
            aspect_ratio: 1.0,
            half_height: 1.0,
        };
        camera.reset();
        camera
    }

    /// Camera whose up vector is derived from a left vector.
    pub fn from_left(eye: Vec3, look: Vec3, left: Vec3, fov: f32, width: u32, height: u32) -> Self {
        let up = (look - eye).normalize_or_zero().cross(left);
        Self::new(eye, look, up, fov, width, height)
    }

    /// Change image resolution and field of view, keeping the pose.
    pub fn set_resolution(&mut self, width: u32, height: u32, fov: f32) {
        self.width = width;
        self.height = height;
        self.fov = fov;
        self.reset();
    }

    /// Recompute cached values after changing pose or projection.
    pub fn reset(&mut self) {
        self.inv_view = Mat4::look_at_rh(self.eye, self.look, self.up).inverse();
        self.aspect_ratio = self.width.max(1) as f32 / self.height.max(1) as f32;
        self.half_height = (self.fov.to_radians() / 2.0).tan();
    }

    /// Screen-space position of a jittered sample inside pixel (`row`,
    /// `col`). `u` is the jitter in `[0, 1)^2`; row 0 is the top.
    pub fn sample_pixel(&self, row: u32, col: u32, u: Vec2) -> Vec2 {
        let py_ndc = (row as f32 + u.y) / self.height as f32;
        let py = (1.0 - 2.0 * py_ndc) * self.half_height;
        let px_ndc = (col as f32 + u.x) / self.width as f32;
        let px = (2.0 * px_ndc - 1.0) * self.aspect_ratio * self.half_height;
        Vec2::new(px, py)
    }

    /// Move a camera-space ray into world space.
    pub fn view_to_world(&self, ray: &mut Ray) {
        ray.transform(&self.inv_view);
    }

    /// World-space ray through a jittered sample of pixel (`row`, `col`).
    pub fn primary_ray(&self, row: u32, col: u32, u: Vec2) -> Ray {
        let s = self.sample_pixel(row, col, u);
        let mut ray = Ray::new(Vec3::ZERO, Vec3::new(s.x, s.y, -1.0).normalize());
        self.view_to_world(&mut ray);
        ray.direction = ray.direction.normalize();
        ray
    }
}
