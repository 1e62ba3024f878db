use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use bpaf::Bpaf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use tvdesk::{Config, Pipeline, RunReport, run_with_shutdown};

/// Config file picked up from the working directory when `--config` is absent
const DEFAULT_CONFIG_FILE: &str = "tvdesk.toml";

#[derive(Bpaf, Clone, Debug)]
#[bpaf(options)]
struct Options {
    /// Perform verbose logging
    #[bpaf(short, long)]
    verbose: bool,

    /// Path to a TOML config file
    #[bpaf(short, long, argument("PATH"))]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let options = options().run();

    let env_filter = EnvFilter::builder()
        .with_default_directive(
            match options.verbose {
                true => LevelFilter::TRACE,
                _ => LevelFilter::INFO,
            }
            .into(),
        )
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter)
        .init();

    match run(&options).await {
        Ok(report) => {
            print_summary(&report);
            if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }
        Err(e) => {
            eprintln!("tvdesk: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(options: &Options) -> anyhow::Result<RunReport> {
    let config = load_config(options.config.as_deref())?;
    let output_dir = config.output_dir.clone();

    let pipeline = Pipeline::new(config).context("invalid configuration")?;
    let report = run_with_shutdown(&pipeline).await.with_context(|| {
        format!(
            "no launchers generated in {}",
            output_dir.to_string_lossy()
        )
    })?;

    Ok(report)
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    if let Some(path) = path {
        return Config::load_from_file(path)
            .with_context(|| format!("failed to load {}", path.to_string_lossy()));
    }

    let default_path = Path::new(DEFAULT_CONFIG_FILE);
    if default_path.is_file() {
        tracing::debug!(path = DEFAULT_CONFIG_FILE, "Using config from working directory");
        return Config::load_from_file(default_path)
            .with_context(|| format!("failed to load {}", DEFAULT_CONFIG_FILE));
    }

    Ok(Config::default())
}

fn print_summary(report: &RunReport) {
    eprintln!(
        "{} of {} channels: {} launchers, {} icons written",
        report.channels.len(),
        report.total_records,
        report.launchers_written(),
        report.icons_written()
    );

    for skipped in &report.skipped {
        eprintln!(
            "  skipped record #{} ({}): {}",
            skipped.position,
            skipped.descriptor.as_deref().unwrap_or("no descriptor"),
            skipped.reason.message
        );
    }

    for channel in report.failed_channels() {
        for (artifact, outcome) in [("launcher", &channel.launcher), ("icon", &channel.icon)] {
            if let Some(failure) = outcome.failure() {
                eprintln!(
                    "  {} {} failed [{}]: {}",
                    channel.descriptor, artifact, failure.kind, failure.message
                );
            }
        }
    }

    if report.cancelled {
        eprintln!("  run was cancelled before every channel was scheduled");
    }
}
