//! orb-target CLI: locate a planar model image in one or more frames.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};
use orb_target::{DetectionConfig, DetectionResult, DetectionSession, Verdict};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "orb-target")]
#[command(about = "Locate a planar model image in camera frames")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the model in each frame.
    Detect {
        /// Model (reference) image.
        #[arg(long)]
        model: PathBuf,

        /// Frame images to search.
        #[arg(long, required = true, num_args = 1..)]
        frame: Vec<PathBuf>,

        /// Detection configuration (.toml or .json); defaults when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Preset used when no configuration file is given.
        #[arg(long, value_enum, default_value_t = Preset::Rectangle)]
        preset: Preset,

        /// Path to write the detection report (JSON).
        #[arg(long)]
        json: Option<PathBuf>,

        /// Path to write an overlay PNG; numbered per frame when several are given.
        #[arg(long)]
        overlay: Option<PathBuf>,
    },
    /// Write a preset configuration to a file (or stdout).
    Config {
        #[arg(long, value_enum, default_value_t = Preset::Rectangle)]
        preset: Preset,

        /// Output path; `.json` writes JSON, anything else TOML.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    Default,
    Rectangle,
    Cube,
    HighRecall,
}

impl Preset {
    fn config(self) -> DetectionConfig {
        match self {
            Preset::Default => DetectionConfig::new(),
            Preset::Rectangle => DetectionConfig::rectangle_overlay_preset(),
            Preset::Cube => DetectionConfig::cube_overlay_preset(),
            Preset::HighRecall => DetectionConfig::high_recall_preset(),
        }
    }
}

#[derive(Serialize)]
struct FrameReport<'a> {
    frame: String,
    width: u32,
    height: u32,
    #[serde(flatten)]
    result: &'a DetectionResult,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Detect {
            model,
            frame,
            config,
            preset,
            json,
            overlay,
        } => {
            let config = match config {
                Some(path) => DetectionConfig::load(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => preset.config(),
            };
            run_detect(&model, &frame, config, json.as_deref(), overlay.as_deref())
        }
        Commands::Config { preset, out } => run_config(preset, out.as_deref()),
    }
}

fn load_gray(path: &Path) -> Result<GrayImage> {
    let img = image::open(path).with_context(|| format!("Failed to open image {}", path.display()))?;
    Ok(img.to_luma8())
}

fn run_detect(
    model_path: &Path,
    frames: &[PathBuf],
    config: DetectionConfig,
    json_path: Option<&Path>,
    overlay_path: Option<&Path>,
) -> Result<()> {
    tracing::info!("Loading model: {}", model_path.display());
    let model = load_gray(model_path)?;
    let session = DetectionSession::new(config, &model).context("Failed to register model")?;
    tracing::info!(
        "Model {}x{} with {} keypoints",
        model.width(),
        model.height(),
        session.model().features().len()
    );

    let mut results = Vec::with_capacity(frames.len());
    for (i, frame_path) in frames.iter().enumerate() {
        let frame = load_gray(frame_path)?;
        let result = session.detect(&frame);

        match &result.verdict {
            Verdict::Matched(location) => tracing::info!(
                "{}: matched, {} of {} inliers, corners {:?}",
                frame_path.display(),
                location.n_inliers,
                location.correspondences.len(),
                location.corners
            ),
            Verdict::NotMatched(rejection) => {
                tracing::info!("{}: not matched ({})", frame_path.display(), rejection)
            }
        }

        if let Some(path) = overlay_path {
            let path = numbered(path, i, frames.len());
            draw_overlay(&frame, &result)
                .save(&path)
                .with_context(|| format!("Failed to write overlay {}", path.display()))?;
            tracing::info!("Wrote overlay {}", path.display());
        }

        results.push((frame_path.display().to_string(), frame.dimensions(), result));
    }

    if let Some(path) = json_path {
        let reports: Vec<FrameReport> = results
            .iter()
            .map(|(frame, (width, height), result)| FrameReport {
                frame: frame.clone(),
                width: *width,
                height: *height,
                result,
            })
            .collect();
        let json = serde_json::to_string_pretty(&reports)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Wrote report {}", path.display());
    }

    Ok(())
}

fn run_config(preset: Preset, out: Option<&Path>) -> Result<()> {
    let config = preset.config();
    match out {
        Some(path) => {
            config
                .save(path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote {}", path.display());
        }
        None => println!("{}", config.to_toml()?),
    }
    Ok(())
}

/// `out.png` -> `out-2.png` when writing several frames
fn numbered(path: &Path, index: usize, count: usize) -> PathBuf {
    if count <= 1 {
        return path.to_path_buf();
    }
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("overlay");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("png");
    path.with_file_name(format!("{stem}-{index}.{ext}"))
}

fn draw_overlay(frame: &GrayImage, result: &DetectionResult) -> RgbImage {
    let mut output = image::DynamicImage::ImageLuma8(frame.clone()).into_rgb8();

    for kp in &result.frame_keypoints {
        draw_hollow_circle_mut(&mut output, (kp.x.round() as i32, kp.y.round() as i32), 2, Rgb([90, 90, 255]));
    }

    if let Some(location) = result.location() {
        for m in location.inliers() {
            let kp = &result.frame_keypoints[m.train_idx];
            draw_hollow_circle_mut(&mut output, (kp.x.round() as i32, kp.y.round() as i32), 4, Rgb([0, 255, 0]));
        }

        let corners = location.corners;
        for i in 0..4 {
            if let (Some(a), Some(b)) = (corners[i], corners[(i + 1) % 4]) {
                draw_line_segment_mut(
                    &mut output,
                    (a[0] as f32, a[1] as f32),
                    (b[0] as f32, b[1] as f32),
                    Rgb([255, 0, 0]),
                );
            }
        }
    }

    output
}
