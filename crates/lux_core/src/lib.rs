//! Lux Core - scene description for the Lux renderer.
//!
//! This crate provides:
//!
//! - **Geometry**: `Figure` (sphere, plane, disk) with embedded `Material`
//! - **Lights**: area, point, directional and spot lights
//! - **Camera** and **Environment** (constant colour or HDR texture)
//! - **Scene loading** from JSON
//!
//! # Example
//!
//! ```ignore
//! use lux_core::load_scene;
//!
//! let scene = load_scene("cornell.json")?;
//! println!("Loaded {} figures, {} lights",
//!     scene.figures.len(),
//!     scene.lights.len());
//! ```

pub mod camera;
pub mod environment;
pub mod figure;
pub mod light;
pub mod loader;
pub mod material;
pub mod scene;

// Re-export commonly used types
pub use camera::Camera;
pub use environment::{Environment, Texture, TextureError};
pub use figure::{Figure, FigureId, Intersection, Shape};
pub use light::{
    AreaLight, Attenuation, DirectionalLight, Light, LightKind, LightSample, PointLight, SpotLight,
};
pub use loader::{load_scene, scene_from_str, SceneError, SceneResult};
pub use material::{Brdf, Material};
pub use scene::{Hit, Scene};
