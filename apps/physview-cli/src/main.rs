use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use physview_common::Viewport;
use physview_frame::{FrameContext, Orchestrator, TickReport, ViewerConfig};
use physview_physics::SimWorld;
use physview_render::RecordingRenderer;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "physview-cli", about = "Headless physview tool")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and the default scene layout
    Info,
    /// Run the frame loop against the recording renderer
    Simulate {
        /// Number of ticks to run
        #[arg(short, long, default_value = "120")]
        ticks: u64,
        /// Wall-clock seconds between ticks
        #[arg(long, default_value = "0.016666668")]
        dt: f32,
        /// YAML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override the number of prop layers
        #[arg(long)]
        layers: Option<u32>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the default configuration, or check a file
    Config {
        /// File to validate instead of printing defaults
        #[arg(long)]
        check: Option<PathBuf>,
    },
}

#[derive(Debug, Serialize)]
struct SimulationSummary {
    ticks: u64,
    skipped: u64,
    simulated_seconds: f32,
    bodies: usize,
    props: usize,
    camera: [f32; 3],
    /// Mean prop height after the last tick.
    mean_prop_height: f32,
    lowest_prop: f32,
    shadow_passes: u64,
    screen_passes: u64,
    presents: u64,
    texture_binds: u64,
    draws: u64,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ViewerConfig> {
    match path {
        Some(path) => ViewerConfig::load(path)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(ViewerConfig::default()),
    }
}

fn simulate(config: &ViewerConfig, ticks: u64, dt: f32) -> anyhow::Result<SimulationSummary> {
    if !(dt.is_finite() && dt > 0.0) {
        bail!("--dt must be a positive number, got {dt}");
    }

    let viewport = Viewport::new(1280, 720);
    let backend = RecordingRenderer::new(viewport);
    let physics = SimWorld::new(config.physics.sim);
    let mut orchestrator = Orchestrator::new(config, physics, backend)?;
    let mut ctx = FrameContext::new(config.timing.max_dt, viewport);

    let mut skipped = 0u64;
    let mut simulated = 0.0f32;
    let mut last: Option<TickReport> = None;
    // Tick zero primes the clock.
    for i in 0..=ticks {
        let elapsed = Duration::from_secs_f64(f64::from(dt) * i as f64);
        match orchestrator.tick(&mut ctx, elapsed)? {
            Some(report) => {
                simulated += report.dt;
                if let Some(fps) = report.fps {
                    tracing::info!(tick = report.tick, fps, "frame rate");
                }
                last = Some(report);
            }
            None if i > 0 => skipped += 1,
            None => {}
        }
    }

    let physics = orchestrator.physics();
    let heights: Vec<f32> = physics
        .props()
        .filter_map(|record| physics.body(record.handle))
        .map(|state| state.transform.position.y)
        .collect();
    let mean_prop_height = if heights.is_empty() {
        0.0
    } else {
        heights.iter().sum::<f32>() / heights.len() as f32
    };
    let lowest_prop = heights.iter().copied().fold(f32::INFINITY, f32::min);
    let camera = last.map_or(orchestrator.camera().position(), |r| r.camera);
    let stats = orchestrator.backend().stats();

    let summary = SimulationSummary {
        ticks: ctx.tick,
        skipped,
        simulated_seconds: simulated,
        bodies: physics.body_count(),
        props: heights.len(),
        camera: camera.to_array(),
        mean_prop_height,
        lowest_prop: if heights.is_empty() { 0.0 } else { lowest_prop },
        shadow_passes: stats.shadow_passes,
        screen_passes: stats.screen_passes,
        presents: stats.presents,
        texture_binds: stats.texture_binds,
        draws: stats.batch_draws + stats.instance_draws + stats.sky_draws,
    };
    tracing::debug!("{}", orchestrator.backend().summary());
    orchestrator.shutdown();
    Ok(summary)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Info => {
            let config = ViewerConfig::default();
            println!("physview-cli v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "props: {} ({} layers on a {}..{} grid, spacing {})",
                config.props.count(),
                config.props.layers,
                config.props.grid_min,
                config.props.grid_max,
                config.props.spacing
            );
            println!(
                "light: {:?} looking at {:?}, shadow map {}px",
                config.light.position, config.light.target, config.light.shadow_resolution
            );
            println!(
                "timing: max step {:.4}s, gravity {:?}",
                config.timing.max_dt, config.physics.gravity
            );
        }
        Commands::Simulate {
            ticks,
            dt,
            config,
            layers,
            json,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(layers) = layers {
                config.props.layers = layers;
            }
            let summary = simulate(&config, ticks, dt)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "Simulated {} ticks ({:.2}s, {} skipped)",
                    summary.ticks, summary.simulated_seconds, summary.skipped
                );
                println!("Bodies: {} ({} props)", summary.bodies, summary.props);
                println!(
                    "Props: mean height {:.3}, lowest {:.3}",
                    summary.mean_prop_height, summary.lowest_prop
                );
                println!(
                    "Passes: {} shadow, {} screen, {} presented",
                    summary.shadow_passes, summary.screen_passes, summary.presents
                );
                println!(
                    "Draws: {}, texture binds: {}",
                    summary.draws, summary.texture_binds
                );
            }
        }
        Commands::Config { check } => match check {
            Some(path) => {
                load_config(Some(&path))?;
                println!("{}: OK", path.display());
            }
            None => print!("{}", ViewerConfig::default().to_yaml()?),
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> ViewerConfig {
        let mut config = ViewerConfig::default();
        config.props.grid_min = -1;
        config.props.grid_max = 1;
        config.props.layers = 2;
        config
    }

    #[test]
    fn props_fall_under_gravity() {
        let config = small();
        let summary = simulate(&config, 30, 1.0 / 60.0).unwrap();
        assert_eq!(summary.ticks, 30);
        assert_eq!(summary.props, 8);
        assert_eq!(summary.presents, 30);
        assert_eq!(summary.shadow_passes, summary.screen_passes);
        // Started at 20.0 and 21.5.
        assert!(summary.mean_prop_height < 20.75);
    }

    #[test]
    fn bad_step_is_rejected() {
        assert!(simulate(&small(), 1, 0.0).is_err());
        assert!(simulate(&small(), 1, f32::NAN).is_err());
    }

    #[test]
    fn summary_serializes() {
        let summary = simulate(&small(), 2, 0.02).unwrap();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["ticks"], 2);
        assert!(json["camera"].is_array());
    }
}
