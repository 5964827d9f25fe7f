/// stlsync - import and live-update STL exports from a folder
///
/// Usage:
///   stlsync import [DIR]     Run one import/update pass and print a summary
///   stlsync watch [DIR]      Poll the folder and update on every change
///   stlsync inspect FILE     Parse one STL file and print its size

use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result};
use stlsync_core::commands::IMPORT_OR_UPDATE;
use stlsync_core::stl::read_stl;
use stlsync_core::{Axis, CommandContext, CommandOutput, CommandTable, MemoryScene, Settings};
use stlsync_cli::{print_report, OutputFormat, WatchApp};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "stlsync",
    version,
    about = "Import and live-update STL exports from a folder"
)]
struct Cli {
    /// Settings file (JSON); flags below override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Up axis of the exporting tool
    #[arg(long, global = true, allow_hyphen_values = true)]
    up: Option<Axis>,

    /// Forward axis of the exporting tool
    #[arg(long, global = true, allow_hyphen_values = true)]
    forward: Option<Axis>,

    /// Uniform scale applied to imported points
    #[arg(long, global = true)]
    scale: Option<f32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one import/update pass
    Import {
        /// Folder to import from (defaults to the configured folder)
        dir: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Watch the folder and update on every change
    Watch {
        /// Folder to watch (defaults to the configured folder)
        dir: Option<PathBuf>,

        /// Seconds between polls
        #[arg(short, long)]
        interval: Option<u64>,

        /// Output format for pass summaries
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Parse one STL file and print face and point counts
    Inspect {
        /// STL file to read
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings(&cli)?;

    match cli.command {
        Command::Import { dir, format } => {
            if let Some(dir) = dir {
                settings.watch_dir = dir;
            }
            run_import(&settings, format)?;
        }
        Command::Watch {
            dir,
            interval,
            format,
        } => {
            if let Some(dir) = dir {
                settings.watch_dir = dir;
            }
            if let Some(interval) = interval {
                settings.poll_interval_secs = interval;
            }
            let mut app = WatchApp::new(settings, format).context("Invalid settings")?;
            let passes = app.run()?;
            eprintln!(
                "Monitor stopped after {} pass(es), {} object(s) in scene",
                passes,
                app.scene().len()
            );
        }
        Command::Inspect { file } => {
            let mesh = read_stl(&file).with_context(|| format!("Failed to read {}", file.display()))?;
            println!(
                "{}: {} faces, {} points, normals: {}",
                file.display(),
                mesh.faces.len(),
                mesh.points.len(),
                if mesh.has_normals() { "yes" } else { "no" }
            );
        }
    }

    Ok(())
}

/// Settings file (or defaults) with command-line overrides applied
fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path).context("Failed to load settings")?,
        None => Settings::default(),
    };
    if let Some(up) = cli.up {
        settings.up_axis = up;
    }
    if let Some(forward) = cli.forward {
        settings.forward_axis = forward;
    }
    if let Some(scale) = cli.scale {
        settings.scale = scale;
    }
    settings.validate().context("Invalid settings")?;
    Ok(settings)
}

/// One pass through the command table against a fresh scene
fn run_import(settings: &Settings, format: OutputFormat) -> Result<()> {
    let mut scene = MemoryScene::new();
    let mut ctx = CommandContext::new(&mut scene, settings);
    let output = CommandTable::new()
        .dispatch(IMPORT_OR_UPDATE, &mut ctx)
        .context("Import failed")?;
    if let CommandOutput::Synced(report) = output {
        print_report(&mut io::stdout(), &report, format)?;
    }
    Ok(())
}
