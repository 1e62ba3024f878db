//! # tvdesk
//!
//! Generates desktop launchers for the channels of the Telewebion live TV catalog.
//!
//! One run fetches the channel catalog over GraphQL, writes a freedesktop
//! `.desktop` entry per channel that opens its HLS stream in a media player,
//! and downloads each channel's icon next to it.
//!
//! ## Design Philosophy
//!
//! - **Best effort per channel** - a bad record, a missing icon, or a failed
//!   write affects only its own channel; only a catalog failure aborts the run
//! - **Bounded concurrency** - icon downloads run on a bounded pool while
//!   launchers are written in catalog order
//! - **Deterministic output** - the same catalog always produces byte-identical files
//! - **Event-driven** - consumers subscribe to events, or read the final [`RunReport`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use tvdesk::{Config, Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = Pipeline::new(Config::default())?;
//!
//!     let mut events = pipeline.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let report = pipeline.run().await?;
//!     println!(
//!         "{} launchers, {} icons",
//!         report.launchers_written(),
//!         report.icons_written()
//!     );
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Icon downloads from the asset host
pub mod assets;
/// Catalog fetching and response parsing
pub mod catalog;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Desktop entry rendering and writing
pub mod launcher;
/// Output directory layout
pub mod layout;
/// Run orchestration
pub mod pipeline;
/// Retry logic with exponential backoff
pub mod retry;
/// Record to launcher transformation
pub mod transform;
/// Core types, reports and events
pub mod types;

// Re-export commonly used types
pub use catalog::{CatalogFetcher, CatalogSource};
pub use config::{AssetConfig, CatalogConfig, Config, LauncherConfig, RetryConfig};
pub use error::{Error, MalformedRecordError, NetworkError, ProtocolError, Result};
pub use layout::OutputLayout;
pub use pipeline::Pipeline;
pub use types::{
    ArtifactOutcome, ChannelReport, Event, Failure, FailureKind, LauncherSpec, RawChannelRecord,
    RunReport, SkippedRecord,
};

pub use tokio_util::sync::CancellationToken;

/// Helper function to run the pipeline with graceful signal handling.
///
/// Runs the pipeline until it completes or a termination signal arrives.
/// On a signal, no further channels are scheduled and in-flight downloads
/// are cancelled; the partial report is still returned.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use tvdesk::{Config, Pipeline, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pipeline = Pipeline::new(Config::default())?;
///     let report = run_with_shutdown(&pipeline).await?;
///     println!("cancelled: {}", report.cancelled);
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(pipeline: &Pipeline) -> Result<RunReport> {
    let cancel = CancellationToken::new();
    let run = pipeline.run_until_cancelled(cancel.clone());
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => result,
        _ = wait_for_signal() => {
            tracing::info!("Cancelling run");
            cancel.cancel();
            run.await
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
