mod aggregate;
mod config;
mod core;
mod input;
mod render;
mod session;
mod table;
mod types;
mod ui;

use std::{
    fs::File,
    io::{self, Write},
    path::PathBuf,
    sync::Mutex,
};

use anyhow::{Context, Result};
use clap::Parser;
use rand::{SeedableRng, rngs::StdRng};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    config::PhysicsParams,
    input::ViewKind,
    session::{CloudSession, CloudStatus},
    types::{Extent, ParticleSnapshot},
};

/// Renders a webhook response as text, a structured table or a falling
/// word cloud.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Payload file, or `-` to read stdin.
    #[arg(default_value = "-")]
    payload: PathBuf,

    /// Initial view; `auto` picks one from the payload shape.
    #[arg(long, value_enum, default_value_t = ViewKind::Auto)]
    view: ViewKind,

    /// Seed for spawn jitter and palette draws.
    #[arg(long, env = "WORDFALL_SEED")]
    seed: Option<u64>,

    /// JSON file overriding physics parameters.
    #[arg(long, env = "WORDFALL_PARAMS")]
    params: Option<PathBuf>,

    /// Write logs to this file (the interactive view owns the terminal).
    #[arg(long, env = "WORDFALL_LOG")]
    log_file: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,

    /// Step the word cloud without a terminal and print the final layout.
    #[arg(long)]
    headless: bool,

    /// Ticks to run in headless mode.
    #[arg(long, default_value_t = 600)]
    ticks: u32,

    /// Headless extent width in pixels.
    #[arg(long, default_value_t = 1200.0)]
    width: f32,

    /// Headless extent height in pixels.
    #[arg(long, default_value_t = 800.0)]
    height: f32,
}

#[derive(Serialize)]
struct HeadlessReport {
    status: CloudStatus,
    ticks: u32,
    extent: Extent,
    particles: Vec<ParticleSnapshot>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args)?;

    let params = match &args.params {
        Some(path) => PhysicsParams::load(path)
            .with_context(|| format!("failed to load physics params from {}", path.display()))?,
        None => PhysicsParams::default(),
    };
    let payload = input::load(&args.payload)?;
    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut session = CloudSession::new(payload.records(), params, rng);

    if args.headless {
        return run_headless(
            &mut session,
            Extent::new(args.width, args.height),
            args.ticks,
        );
    }
    ui::run(&args.payload, &payload, args.view, session)
}

fn init_tracing(args: &Args) -> Result<()> {
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match &args.log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None if args.headless => builder.with_writer(io::stderr).init(),
        None => builder.with_writer(io::sink).init(),
    }
    Ok(())
}

fn run_headless(session: &mut CloudSession, extent: Extent, ticks: u32) -> Result<()> {
    session.measure(extent);
    let mut ran = 0;
    for _ in 0..ticks {
        if !session.tick() {
            break;
        }
        ran += 1;
    }
    info!(ticks = ran, status = ?session.status(), "headless run finished");

    let mut particles = Vec::new();
    session.snapshot(&mut particles);
    let report = HeadlessReport {
        status: session.status(),
        ticks: ran,
        extent,
        particles,
    };
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &report).context("failed to write report")?;
    writeln!(stdout)?;
    Ok(())
}
