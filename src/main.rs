use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use gcpsweep::config::SweepConfig;
use gcpsweep::gcp::{auth, Environment, GcpClient};
use gcpsweep::resources::builtin_registry;
use gcpsweep::sweep::{locations_from, Registry, SweepOptions, Sweeper};
use gcpsweep::VERSION;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Sweep a GCP project clean
#[derive(Parser, Debug)]
#[command(name = "gcpsweep", version, about, long_about = None)]
struct Args {
    /// GCP project to sweep
    #[arg(short, long)]
    project: Option<String>,

    /// Path to the sweep configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Actually delete resources; without this flag the sweep is a dry run
    #[arg(long)]
    no_dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    yes: bool,

    /// List registered resource types and exit
    #[arg(long)]
    list_resource_types: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(
    level: LogLevel,
    log_file: Option<&PathBuf>,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let guard = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;

            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::fmt()
                .with_max_level(tracing_level)
                .with_writer(non_blocking.with_max_level(tracing_level))
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_max_level(tracing_level)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
            None
        }
    };

    tracing::info!("gcpsweep {} started with log level: {:?}", VERSION, level);
    Ok(guard)
}

fn print_resource_types(registry: &Registry) {
    println!(
        "{:<20} {:<10} {:<12} {:<28} DEPENDS ON",
        "KIND", "SCOPE", "OWNER", "API"
    );
    for registration in registry.order() {
        println!(
            "{:<20} {:<10} {:<12} {:<28} {}",
            registration.kind,
            registration.scope.to_string(),
            registration.owner.to_string(),
            registration.api,
            registration.dependencies.join(", ")
        );
    }
}

/// A destructive run must be confirmed by typing the project id back
fn confirm_sweep(project: &str) -> Result<bool> {
    println!("This will PERMANENTLY DELETE resources in project '{}'.", project);
    print!("Type the project id to continue: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim() == project)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level, args.log_file.as_ref())?;

    let registry = builtin_registry().context("Failed to assemble resource registry")?;

    if args.list_resource_types {
        print_resource_types(&registry);
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => SweepConfig::load(path)?,
        None => match SweepConfig::default_path().filter(|p| p.exists()) {
            Some(path) => SweepConfig::load(&path)?,
            None => SweepConfig::default(),
        },
    };
    config.validate_types(&registry)?;

    let project = args
        .project
        .clone()
        .or_else(auth::get_default_project)
        .context("No GCP project given. Set GOOGLE_CLOUD_PROJECT or use --project")?;
    if !auth::validate_project_id(&project) {
        bail!("'{}' is not a valid GCP project id", project);
    }

    let dry_run = !args.no_dry_run;
    if !dry_run && !args.yes && !confirm_sweep(&project)? {
        bail!("Confirmation did not match the project id, aborting");
    }

    let client = GcpClient::new().await?;
    let environment = Environment::discover(&client, &project).await?;

    let regions = config.resolve_regions(&environment)?;
    let locations = locations_from(&environment, &regions);
    let selected_types = config.selected_types(&registry);

    let sweeper = Sweeper::new(client, registry, &project)
        .with_locations(locations)
        .with_types(selected_types)
        .with_settings(config.settings.clone())
        .with_options(SweepOptions {
            dry_run,
            ..SweepOptions::default()
        });

    let cancel = sweeper.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current resource");
            cancel.cancel();
        }
    });

    let report = sweeper.run().await;
    println!("{}", report);

    if report.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}
