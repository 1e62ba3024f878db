//! Catalog-to-launcher pipeline orchestration.
//!
//! A run has three phases:
//! 1. **Fetch** - one catalog request. Failure aborts the run.
//! 2. **Per channel** - in catalog order: transform, schedule the icon
//!    download on the bounded [`icons`] pool, then write the launcher.
//!    Every failure here is contained to its channel.
//! 3. **Join** - wait for every scheduled download to settle and assemble
//!    the [`RunReport`].

mod icons;


use crate::assets::{AssetDownloader, icon_url};
use crate::catalog::{CatalogFetcher, CatalogSource};
use crate::config::Config;
use crate::error::{Error, MalformedRecordError, Result};
use crate::launcher::write_launcher;
use crate::layout::OutputLayout;
use crate::transform::transform;
use crate::types::{
    ArtifactOutcome, ChannelReport, Event, Failure, FailureKind, LauncherSpec, RawChannelRecord,
    RunReport, SkippedRecord,
};
use chrono::Utc;
use icons::{IconJob, IconPool};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Launcher generation pipeline (cloneable - all fields are Arc-wrapped or cheap)
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<Config>,
    catalog: Arc<dyn CatalogSource>,
    downloader: AssetDownloader,
    layout: OutputLayout,
    event_tx: broadcast::Sender<Event>,
}

impl Pipeline {
    /// Pipeline reading from the configured GraphQL catalog
    ///
    /// # Errors
    /// Returns a configuration error for invalid settings, or a network
    /// error if an HTTP client cannot be created
    pub fn new(config: Config) -> Result<Self> {
        let catalog = CatalogFetcher::new(config.catalog.clone(), config.retry.clone())?;
        Self::with_catalog(config, Arc::new(catalog))
    }

    /// Pipeline reading from an arbitrary catalog source
    pub fn with_catalog(config: Config, catalog: Arc<dyn CatalogSource>) -> Result<Self> {
        config.validate()?;

        let downloader = AssetDownloader::new(&config.assets, config.retry.clone())?;
        let layout = OutputLayout::new(config.output_dir.clone());
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            config: Arc::new(config),
            catalog,
            downloader,
            layout,
            event_tx,
        })
    }

    /// Subscribe to run events
    ///
    /// Slow subscribers may miss events (`RecvError::Lagged`); the
    /// [`RunReport`] returned by [`run`](Self::run) is always complete.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Output layout of this pipeline
    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Run the pipeline to completion
    pub async fn run(&self) -> Result<RunReport> {
        self.run_until_cancelled(CancellationToken::new()).await
    }

    /// Run the pipeline, stopping early when `cancel` fires
    ///
    /// The output directory is created once the catalog has been fetched, so
    /// a fatal run leaves the filesystem untouched.
    ///
    /// Cancellation before the catalog arrives returns [`Error::Cancelled`].
    /// Afterwards, no further channels are scheduled, in-flight downloads
    /// resolve as cancelled, and a partial report is returned. Either way,
    /// no download task outlives this call.
    pub async fn run_until_cancelled(&self, cancel: CancellationToken) -> Result<RunReport> {
        let started_at = Utc::now();

        let records = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            records = self.catalog.fetch() => records?,
        };

        // Only a fetched catalog touches the disk
        self.layout.ensure_root().await?;
        info!(records = records.len(), "Catalog fetched");
        self.emit(Event::CatalogFetched {
            records: records.len(),
        });

        let mut pool = IconPool::new(
            self.downloader.clone(),
            self.config.assets.max_concurrent_downloads,
            self.event_tx.clone(),
            cancel.clone(),
        );
        let mut seen = HashSet::with_capacity(records.len());
        let mut launchers: Vec<(String, ArtifactOutcome)> = Vec::with_capacity(records.len());
        let mut skipped = Vec::new();
        let mut cancelled = false;

        for (position, record) in records.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(
                    remaining = records.len() - position,
                    "Run cancelled, not scheduling remaining channels"
                );
                cancelled = true;
                break;
            }

            let spec = match self.prepare(record, &mut seen) {
                Ok(spec) => spec,
                Err(e) => {
                    warn!(position, error = %e, "Skipping catalog record");
                    let reason = Failure::from(&e);
                    self.emit(Event::RecordSkipped {
                        position,
                        descriptor: record.descriptor.clone(),
                        reason: reason.clone(),
                    });
                    skipped.push(SkippedRecord {
                        position,
                        channel_id: record.id.as_ref().map(|id| id.to_string()),
                        descriptor: record.descriptor.clone(),
                        reason,
                    });
                    continue;
                }
            };

            info!(descriptor = %spec.descriptor, name = %spec.name, "Generating channel launcher");

            let slot = launchers.len();
            pool.schedule(IconJob {
                slot,
                descriptor: spec.descriptor.clone(),
                url: icon_url(&self.config.assets.base_url, &spec.image_name),
                dest: self.layout.icon_path(&spec.descriptor),
            });

            let launcher = self.write(&spec).await;
            launchers.push((spec.descriptor, launcher));
        }

        let mut icons = pool.join().await;

        let channels: Vec<ChannelReport> = launchers
            .into_iter()
            .enumerate()
            .map(|(slot, (descriptor, launcher))| {
                let icon = icons.remove(&slot).unwrap_or_else(|| ArtifactOutcome::Failed {
                    failure: Failure {
                        kind: FailureKind::Internal,
                        message: "icon download task did not complete".to_string(),
                    },
                });
                ChannelReport {
                    descriptor,
                    launcher,
                    icon,
                }
            })
            .collect();

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            total_records: records.len(),
            channels,
            skipped,
            cancelled,
        };

        let failed_channels = report.failed_channels().count();
        info!(
            launchers = report.launchers_written(),
            icons = report.icons_written(),
            failed_channels,
            skipped = report.skipped.len(),
            "Run complete"
        );
        self.emit(Event::RunComplete {
            launchers_written: report.launchers_written(),
            icons_written: report.icons_written(),
            failed_channels,
            skipped: report.skipped.len(),
        });

        Ok(report)
    }

    /// Transform a record and claim its descriptor for this run
    fn prepare(
        &self,
        record: &RawChannelRecord,
        seen: &mut HashSet<String>,
    ) -> Result<LauncherSpec> {
        let spec = transform(record, &self.config.launcher)?;
        if !seen.insert(spec.descriptor.clone()) {
            return Err(MalformedRecordError::DuplicateDescriptor {
                descriptor: spec.descriptor,
            }
            .into());
        }
        Ok(spec)
    }

    /// Write one launcher and report the outcome
    async fn write(&self, spec: &LauncherSpec) -> ArtifactOutcome {
        let path = self.layout.launcher_path(&spec.descriptor);
        match write_launcher(spec, &path).await {
            Ok(path) => {
                self.emit(Event::LauncherWritten {
                    descriptor: spec.descriptor.clone(),
                    path: path.clone(),
                });
                ArtifactOutcome::Written { path }
            }
            Err(e) => {
                error!(descriptor = %spec.descriptor, error = %e, "Failed to write launcher");
                let failure = Failure::from(&e);
                self.emit(Event::LauncherFailed {
                    descriptor: spec.descriptor.clone(),
                    failure: failure.clone(),
                });
                ArtifactOutcome::Failed { failure }
            }
        }
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine
        self.event_tx.send(event).ok();
    }
}
