use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;
use embertrail_core::EngineConfig;
use embertrail_headless::HeadlessHost;
use embertrail_overlay::{attach, AttachOutcome};
use embertrail_platform::Viewport;
use serde::Serialize;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

mod script;
use crate::script::PointerScript;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Render the cursor trail offscreen along a scripted pointer path.
#[derive(Debug, Parser)]
#[command(name = "embertrail", version)]
struct Args {
    /// TOML trail config; defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value_t = 240)]
    frames: usize,
    /// Write a PNG every N frames (0 disables snapshots).
    #[arg(long, default_value_t = 20)]
    every: usize,
    #[arg(long, default_value = "frames")]
    out: PathBuf,
    #[arg(long, default_value_t = 640)]
    width: u32,
    #[arg(long, default_value_t = 360)]
    height: u32,
    /// Print a JSON run summary to stdout.
    #[arg(long)]
    summary: bool,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    preset: String,
    frames: usize,
    snapshots: Vec<PathBuf>,
    peak_particles: usize,
    final_particles: usize,
}

fn main() {
    // Init logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter("info")
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let args = Args::parse();
    info!("Embertrail starting");
    if let Err(e) = run(args) {
        eprintln!("Embertrail error: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let preset = config.preset.name.clone();
    let viewport = Viewport::new(args.width, args.height);
    let host = Rc::new(HeadlessHost::new(viewport));
    let mut handle = attach(Rc::clone(&host), config);
    match handle.outcome() {
        AttachOutcome::Attached => {}
        other => {
            warn!("trail did not attach: {other:?}");
            return Ok(());
        }
    }

    if args.every > 0 {
        std::fs::create_dir_all(&args.out)?;
    }
    let script = PointerScript::new(viewport, args.frames);
    let events = host.event_sender();
    let mut summary = RunSummary {
        preset,
        frames: 0,
        snapshots: Vec::new(),
        peak_particles: 0,
        final_particles: 0,
    };

    for frame in 0..args.frames {
        for event in script.events_for(frame) {
            events.send(event)?;
        }
        host.pump_events();
        host.advance_frame();
        let Some(stats) = handle.stats() else {
            warn!("trail stopped after {frame} frames");
            break;
        };
        summary.frames = frame + 1;
        summary.peak_particles = summary.peak_particles.max(stats.particles);
        summary.final_particles = stats.particles;
        if args.every > 0 && frame % args.every == 0 {
            let path = args.out.join(format!("frame_{frame:04}.png"));
            host.save_snapshot(&path)?;
            summary.snapshots.push(path);
        }
    }
    handle.detach();
    info!(
        "rendered {} frames, {} snapshots, peak {} particles",
        summary.frames,
        summary.snapshots.len(),
        summary.peak_particles
    );

    if args.summary {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}
