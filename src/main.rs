//! Ink Veil entry point
//!
//! Headless demo: drives the engine with a synthetic clock and scripted
//! pointer input, then writes the revealed frame over a gradient background.

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use image::{Rgba, RgbaImage};

use ink_veil::platform::{Clock, ManualClock, ManualScheduler, SystemClock};
use ink_veil::renderer::{PixelSurface, RenderSurface};
use ink_veil::{RevealConfig, RevealEngine, Viewport};

const FRAME_MS: f64 = 1000.0 / 60.0;
const WIDTH: f32 = 640.0;
const HEIGHT: f32 = 400.0;

/// Render a scripted reveal session to a PNG
#[derive(Parser, Debug)]
#[command(name = "ink-veil", version)]
struct Args {
    /// Output PNG path.
    #[arg(default_value = "ink-veil.png")]
    output: PathBuf,

    /// JSON config file (defaults are used for missing fields).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Frames to simulate at 60 fps.
    #[arg(long, default_value_t = 240)]
    frames: u32,
}

fn load_config(args: &Args) -> Result<RevealConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading config from {}", path.display());
            serde_json::from_str(&std::fs::read_to_string(path)?)?
        }
        None => RevealConfig::default(),
    };
    if config.seed.is_none() {
        config.seed = Some(7);
    }
    config.auto_start = true;
    config.min_radius = config.min_radius.min(90.0);
    config.max_radius = config.max_radius.min(150.0);
    config.idle_stroke.enabled = true;
    Ok(config)
}

/// Diagonal two-color gradient standing in for the page underneath
fn background(width: u32, height: u32) -> RgbaImage {
    let (a, b) = ([28.0, 48.0, 96.0], [214.0, 92.0, 64.0]);
    RgbaImage::from_fn(width, height, |x, y| {
        let t = (x + y) as f32 / (width + height).max(1) as f32;
        let c = |i: usize| (a[i] + (b[i] - a[i]) * t) as u8;
        Rgba([c(0), c(1), c(2), 255])
    })
}

fn run() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let config = load_config(&args)?;

    let clock = ManualClock::new(0.0);
    let scheduler = ManualScheduler::new();
    let wall = SystemClock::new();

    let mut engine = RevealEngine::new(
        config,
        PixelSurface::new(1, 1),
        scheduler.clone(),
        Viewport::new(WIDTH, HEIGHT, 1.0),
        clock.now_ms(),
    )?;

    // Scripted input: one click, one drag across the lower third
    let drag_start = 40;
    let drag_end = 90;
    for frame in 0..args.frames {
        let now = clock.now_ms();
        match frame {
            10 => {
                engine.pointer_down(WIDTH * 0.3, HEIGHT * 0.35, now);
                engine.pointer_up(WIDTH * 0.3, HEIGHT * 0.35, now);
            }
            f if f == drag_start => engine.pointer_down(80.0, HEIGHT * 0.7, now),
            f if f > drag_start && f < drag_end => {
                let t = (f - drag_start) as f32 / (drag_end - drag_start) as f32;
                let y = HEIGHT * 0.7 + (t * std::f32::consts::TAU).sin() * 30.0;
                engine.pointer_move(80.0 + t * (WIDTH - 160.0), y, now);
            }
            f if f == drag_end => engine.pointer_up(WIDTH - 80.0, HEIGHT * 0.7, now),
            120 => {
                engine.spawn_at(WIDTH * 0.72, HEIGHT * 0.3, now);
            }
            _ => {}
        }

        if scheduler.take() {
            engine.tick(now);
        }
        if frame % 60 == 0 {
            log::info!("Frame {}: {}", frame, serde_json::to_string(engine.stats())?);
        }
        clock.advance(FRAME_MS);
    }

    let stats = engine.stats().clone();
    let (w, h) = engine.surface().size();
    engine
        .surface()
        .save_reveal_png(&background(w, h), &args.output)?;
    log::info!(
        "Wrote {} ({} frames, {} entities live, {} masks, {:.1} ms wall time)",
        args.output.display(),
        stats.frame,
        stats.entities,
        stats.mask_entries,
        wall.now_ms()
    );

    engine.destroy();
    Ok(())
}

fn main() {
    env_logger::init();
    log::info!("Ink Veil (headless) starting...");
    if let Err(err) = run() {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["ink-veil"]).unwrap();
        assert_eq!(args.output, PathBuf::from("ink-veil.png"));
        assert!(args.config.is_none());
        assert_eq!(args.frames, 240);
    }

    #[test]
    fn test_args_flags_and_output() {
        let args =
            Args::try_parse_from(["ink-veil", "out.png", "--config", "veil.json", "--frames", "30"]).unwrap();
        assert_eq!(args.output, PathBuf::from("out.png"));
        assert_eq!(args.config, Some(PathBuf::from("veil.json")));
        assert_eq!(args.frames, 30);
        assert!(Args::try_parse_from(["ink-veil", "--frames", "lots"]).is_err());
    }
}
