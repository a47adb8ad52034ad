//! Photon-mapped render of a small scene.
//!
//! Builds a floor, a back wall, a matte sphere and a glass sphere under a
//! disk light, traces a global and a caustics photon map, and saves the
//! result in PPM format.

use lux_core::{AreaLight, Attenuation, Camera, Figure, Light, Material, Scene};
use lux_renderer::{
    color_to_rgba, emit_photons, render, Color, ImageBuffer, Integrator, PhotonMapTracer,
    RenderConfig, TracerKind, Vec3,
};
use std::fs::File;
use std::io::{BufWriter, Write};

fn main() {
    println!("Lux photon mapper - simple example");
    println!("==================================");

    let scene = build_scene();
    println!("Scene has {} figures and {} lights", scene.figures.len(), scene.lights.len());

    let config = RenderConfig {
        width: 400,
        height: 300,
        samples_per_pixel: 8,
        tracer: TracerKind::Jensen,
        photons_per_light: 200_000,
        caustics: true,
        ..Default::default()
    };
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        return;
    }

    let start = std::time::Instant::now();
    let global = emit_photons(&scene, &config.emission_settings(false)).build();
    let caustics = emit_photons(&scene, &config.emission_settings(true)).build();
    println!(
        "Traced {} global and {} caustic photons in {:?}",
        global.len(),
        caustics.len(),
        start.elapsed()
    );

    let integrator = Integrator::PhotonMap(PhotonMapTracer::new(
        config.max_depth,
        config.gather,
        global,
        Some(caustics),
    ));

    println!(
        "Rendering {}x{} @ {} spp...",
        config.width, config.height, config.samples_per_pixel
    );
    let start = std::time::Instant::now();
    let image = render(&scene, &integrator, &config);
    println!("Rendered in {:?}", start.elapsed());

    let filename = "output.ppm";
    match save_ppm(&image, filename) {
        Ok(()) => println!("Saved to {}", filename),
        Err(e) => eprintln!("Failed to save {}: {}", filename, e),
    }
}

fn build_scene() -> Scene {
    let mut scene = Scene::new();
    scene.camera = Camera::new(
        Vec3::new(0.0, 1.2, 4.5),
        Vec3::new(0.0, 0.8, 0.0),
        Vec3::Y,
        50.0,
        400,
        300,
    );

    // Floor and back wall
    scene.add_figure(Figure::plane(Vec3::ZERO, Vec3::Y, Material::diffuse(Color::splat(0.75))));
    scene.add_figure(Figure::plane(
        Vec3::new(0.0, 0.0, -2.0),
        Vec3::Z,
        Material::diffuse(Color::new(0.75, 0.25, 0.25)),
    ));

    scene.add_figure(Figure::sphere(
        Vec3::new(-0.8, 0.6, -0.4),
        0.6,
        Material {
            diffuse: Color::new(0.25, 0.25, 0.75),
            specular: Color::splat(0.3),
            shininess: 40.0,
            ..Default::default()
        },
    ));
    scene.add_figure(Figure::sphere(Vec3::new(0.8, 0.5, 0.4), 0.5, Material::glass(1.5)));

    let light = scene.add_figure(Figure::disk(
        Vec3::new(0.0, 2.8, 0.0),
        Vec3::NEG_Y,
        0.6,
        Material::emissive(Color::splat(6.0)),
    ));
    scene.add_light(Light::Area(AreaLight {
        figure: light,
        attenuation: Attenuation::default(),
    }));

    scene
}

fn save_ppm(image: &ImageBuffer, filename: &str) -> std::io::Result<()> {
    let file = File::create(filename)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "P3")?;
    writeln!(writer, "{} {}", image.width, image.height)?;
    writeln!(writer, "255")?;

    for y in 0..image.height {
        for x in 0..image.width {
            let rgba = color_to_rgba(image.get(x, y));
            writeln!(writer, "{} {} {}", rgba[0], rgba[1], rgba[2])?;
        }
    }

    Ok(())
}
