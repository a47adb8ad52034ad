//! `lux`: render a JSON scene to an image.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use lux_core::{load_scene, Scene};
use lux_renderer::{
    color_to_rgba, emit_photons, render, GatherSettings, ImageBuffer, Integrator, PathTracer,
    PhotonMap, PhotonMapTracer, PhotonStore, RenderConfig, TracerKind, WhittedTracer,
    DEFAULT_BUCKET_SIZE,
};

/// Photon-mapping global-illumination renderer.
#[derive(Parser, Debug)]
#[command(name = "lux", version, about)]
struct Args {
    /// Scene description (JSON)
    scene: PathBuf,

    /// Light-transport algorithm: whitted, monte_carlo or jensen
    #[arg(short = 't', long)]
    tracer: TracerKind,

    /// Output image; the format follows the extension
    #[arg(short = 'o', long, default_value = "output.png")]
    output: PathBuf,

    #[arg(short = 'W', long, default_value_t = 640)]
    width: u32,

    #[arg(short = 'H', long, default_value_t = 480)]
    height: u32,

    /// Samples per pixel
    #[arg(short = 's', long, default_value_t = 4)]
    samples: u32,

    /// Maximum ray and photon bounce depth
    #[arg(short = 'r', long, default_value_t = 5)]
    max_depth: u32,

    /// Vertical field of view in degrees (overrides the scene camera)
    #[arg(short = 'f', long)]
    fov: Option<f32>,

    /// Photons emitted per light
    #[arg(short = 'p', long, default_value_t = 100_000)]
    photons: usize,

    /// Initial photon search radius
    #[arg(short = 'k', long, default_value_t = 0.5)]
    radius: f32,

    /// Maximum photons per radiance estimate
    #[arg(long, default_value_t = 500)]
    max_photons: usize,

    /// Cone filter constant (>= 1)
    #[arg(long, default_value_t = 1.0)]
    cone_k: f32,

    /// Also build a caustics photon map
    #[arg(long)]
    caustics: bool,

    /// Read the global photon map from a dump instead of tracing it
    #[arg(long, value_name = "FILE")]
    load_photons: Option<PathBuf>,

    /// Read the caustics photon map from a dump instead of tracing it
    #[arg(long, value_name = "FILE")]
    load_caustics: Option<PathBuf>,

    /// Write the global photons to a dump file
    #[arg(long, value_name = "FILE")]
    dump_photons: Option<PathBuf>,

    /// Write the caustic photons to a dump file
    #[arg(long, value_name = "FILE")]
    dump_caustics: Option<PathBuf>,

    /// Seed for every random stream
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

impl Args {
    fn render_config(&self) -> RenderConfig {
        RenderConfig {
            width: self.width,
            height: self.height,
            samples_per_pixel: self.samples,
            max_depth: self.max_depth,
            fov: self.fov,
            tracer: self.tracer,
            photons_per_light: self.photons,
            gather: GatherSettings {
                radius: self.radius,
                max_photons: self.max_photons,
                cone_k: self.cone_k,
            },
            caustics: self.caustics || self.load_caustics.is_some(),
            seed: self.seed,
            bucket_size: DEFAULT_BUCKET_SIZE,
        }
    }
}

/// Load a photon dump, or trace a fresh pass and optionally dump it.
fn photon_pass(
    scene: &Scene,
    config: &RenderConfig,
    caustics: bool,
    load: Option<&Path>,
    dump: Option<&Path>,
) -> Result<PhotonMap> {
    let store = match load {
        Some(path) => {
            PhotonStore::load(path)
                .with_context(|| format!("Failed to read photon dump {}", path.display()))?
        }
        None => {
            let start = Instant::now();
            let store = emit_photons(scene, &config.emission_settings(caustics));
            log::info!("Photon pass finished in {:.2?}", start.elapsed());
            store
        }
    };

    if let Some(path) = dump {
        store
            .save(path)
            .with_context(|| format!("Failed to write photon dump {}", path.display()))?;
    }

    Ok(store.build())
}

fn build_integrator(args: &Args, scene: &Scene, config: &RenderConfig) -> Result<Integrator> {
    let integrator = match config.tracer {
        TracerKind::Whitted => Integrator::Whitted(WhittedTracer::new(config.max_depth)),
        TracerKind::MonteCarlo => Integrator::PathTracer(PathTracer::new(config.max_depth)),
        TracerKind::Jensen => {
            let global = photon_pass(
                scene,
                config,
                false,
                args.load_photons.as_deref(),
                args.dump_photons.as_deref(),
            )?;
            let caustics = if config.caustics {
                Some(photon_pass(
                    scene,
                    config,
                    true,
                    args.load_caustics.as_deref(),
                    args.dump_caustics.as_deref(),
                )?)
            } else {
                None
            };
            Integrator::PhotonMap(PhotonMapTracer::new(
                config.max_depth,
                config.gather,
                global,
                caustics,
            ))
        }
    };
    Ok(integrator)
}

/// Clamp, gamma-correct and write the image in the format of `path`.
fn save_image(image: &ImageBuffer, path: &Path) -> Result<()> {
    let rgb = image::RgbImage::from_fn(image.width, image.height, |x, y| {
        let [r, g, b, _] = color_to_rgba(image.get(x, y));
        image::Rgb([r, g, b])
    });
    rgb.save(path)
        .with_context(|| format!("Failed to write image {}", path.display()))?;
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    let config = args.render_config();
    config.validate().context("Invalid render configuration")?;

    let scene = load_scene(&args.scene)
        .with_context(|| format!("Failed to load scene {}", args.scene.display()))?;

    let integrator = build_integrator(args, &scene, &config)?;
    let image = render(&scene, &integrator, &config);
    save_image(&image, &args.output)?;

    log::info!("Saved {}", args.output.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();
    log::info!("Starting Lux ({} tracer)", args.tracer);
    run(&args)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r#"{
        "camera": { "eye": [0, 1, 3], "look": [0, 0.5, 0], "up": [0, 1, 0], "fov": 60 },
        "environment": { "color": [0.1, 0.1, 0.1] },
        "figures": [
            { "type": "plane", "point": [0, 0, 0], "normal": [0, 1, 0],
              "material": { "diffuse": [0.8, 0.8, 0.8] } },
            { "type": "sphere", "position": [0.5, 0.4, 0], "radius": 0.4,
              "material": { "transmissive": true, "ref_index": 1.5 } }
        ],
        "lights": [
            { "type": "disk_area_light", "position": [0, 2, 0], "normal": [0, -1, 0],
              "radius": 0.5, "emission": [5, 5, 5] }
        ]
    }"#;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["lux", "scene.json"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_parse_defaults() {
        let args = parse(&["-t", "whitted"]);
        assert_eq!(args.tracer, TracerKind::Whitted);
        assert_eq!(args.output, PathBuf::from("output.png"));

        let config = args.render_config();
        assert_eq!((config.width, config.height), (640, 480));
        assert_eq!(config.fov, None);
        assert!(!config.caustics);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tracer_is_required() {
        assert!(Args::try_parse_from(["lux", "scene.json"]).is_err());
        assert!(Args::try_parse_from(["lux", "scene.json", "-t", "raster"]).is_err());
    }

    #[test]
    fn test_parse_photon_options() {
        let args = parse(&[
            "--tracer",
            "jensen",
            "-W",
            "32",
            "-H",
            "24",
            "-p",
            "5000",
            "-k",
            "0.25",
            "--cone-k",
            "1.5",
            "--load-caustics",
            "caustics.txt",
        ]);
        let config = args.render_config();
        assert_eq!(config.tracer, TracerKind::Jensen);
        assert_eq!(config.photons_per_light, 5000);
        assert_eq!(config.gather.radius, 0.25);
        assert_eq!(config.gather.cone_k, 1.5);
        // A caustics dump implies a caustics map
        assert!(config.caustics);
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let args = parse(&["-t", "monte_carlo", "-s", "0"]);
        let err = run(&args).unwrap_err();
        assert!(err.to_string().contains("Invalid render configuration"));
    }

    #[test]
    fn test_missing_scene_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = parse(&["-t", "whitted", "-W", "8", "-H", "8"]);
        args.scene = dir.path().join("missing.json");
        let err = run(&args).unwrap_err();
        assert!(err.to_string().contains("Failed to load scene"));
    }

    #[test]
    fn test_render_with_photon_dumps() {
        let dir = tempfile::tempdir().unwrap();
        let scene_path = dir.path().join("scene.json");
        std::fs::write(&scene_path, SCENE).unwrap();
        let output = dir.path().join("out.png");
        let global = dir.path().join("global.txt");
        let caustics = dir.path().join("caustics.txt");

        let mut args = parse(&[
            "-t", "jensen", "-W", "16", "-H", "12", "-s", "1", "-p", "2000", "--caustics",
        ]);
        args.scene = scene_path.clone();
        args.output = output.clone();
        args.dump_photons = Some(global.clone());
        args.dump_caustics = Some(caustics.clone());
        run(&args).unwrap();

        let written = image::open(&output).unwrap();
        assert_eq!((written.width(), written.height()), (16, 12));
        assert!(global.exists() && caustics.exists());

        // Render again from the dumps
        let mut args = parse(&["-t", "jensen", "-W", "16", "-H", "12", "-s", "1"]);
        args.scene = scene_path;
        args.output = dir.path().join("reloaded.png");
        args.load_photons = Some(global);
        args.load_caustics = Some(caustics);
        run(&args).unwrap();
        assert!(args.output.exists());
    }
}
