//! Core types, run reports and events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Catalog identifier of a channel (the service has used both numbers and strings)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelId {
    /// Numeric identifier
    Number(i64),
    /// Opaque string identifier
    Text(String),
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelId::Number(n) => write!(f, "{}", n),
            ChannelId::Text(s) => f.write_str(s),
        }
    }
}

/// Channel classification sub-record
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelType {
    /// Type slug
    #[serde(default)]
    pub descriptor: Option<String>,
    /// Type display name
    #[serde(default)]
    pub name: Option<String>,
}

/// One channel as returned by the catalog service
///
/// Every field is optional here. Required fields are enforced by
/// [`crate::transform::transform`] so one bad record never rejects the whole catalog.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawChannelRecord {
    /// Catalog identifier
    #[serde(rename = "ChannelID", default)]
    pub id: Option<ChannelId>,

    /// Ordering hint (the catalog is sorted by ascending priority)
    #[serde(default)]
    pub priority: Option<i64>,

    /// Localized display name
    #[serde(default)]
    pub name: Option<String>,

    /// Stable unique slug, keys every derived file name
    #[serde(default)]
    pub descriptor: Option<String>,

    /// Long description
    #[serde(default)]
    pub description: Option<String>,

    /// English display name
    #[serde(default)]
    pub name_english: Option<String>,

    /// Icon image name on the asset host
    #[serde(default)]
    pub image_name: Option<String>,

    /// Whether the channel has an archive
    #[serde(default)]
    pub has_archive: Option<bool>,

    /// Channel classification
    #[serde(rename = "type", default)]
    pub channel_type: Option<ChannelType>,
}

/// Launcher derived from one catalog record
///
/// Only lives for one pipeline pass: created by the transformer and consumed
/// by the launcher writer and the icon download.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LauncherSpec {
    /// Channel descriptor (file name key)
    pub descriptor: String,
    /// Icon image name on the asset host
    pub image_name: String,
    /// Normalized display name
    pub name: String,
    /// Player invocation with the stream URL
    pub exec: String,
    /// Icon reference (`tv-<descriptor>`)
    pub icon: String,
    /// Desktop entry categories
    pub categories: Vec<String>,
    /// Search keywords
    pub keywords: Vec<String>,
}

/// Classification of a failure, for programmatic handling
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Invalid configuration
    Config,
    /// Transport failure or non-success HTTP status
    Network,
    /// Unexpected catalog response shape
    Protocol,
    /// Catalog record missing required data
    MalformedRecord,
    /// Local disk write failure
    FileWrite,
    /// Run was cancelled before the operation finished
    Cancelled,
    /// A worker task panicked
    Internal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Config => "config",
            FailureKind::Network => "network",
            FailureKind::Protocol => "protocol",
            FailureKind::MalformedRecord => "malformed_record",
            FailureKind::FileWrite => "file_write",
            FailureKind::Cancelled => "cancelled",
            FailureKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// A contained, reportable failure
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// What went wrong
    pub kind: FailureKind,
    /// Human-readable error message
    pub message: String,
}

/// Outcome of producing one artifact (launcher file or icon)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArtifactOutcome {
    /// The artifact was written to `path`
    Written {
        /// Final location of the artifact
        path: PathBuf,
    },
    /// The artifact could not be produced
    Failed {
        /// Why it failed
        failure: Failure,
    },
}

impl ArtifactOutcome {
    /// Whether the artifact was written
    pub fn is_written(&self) -> bool {
        matches!(self, ArtifactOutcome::Written { .. })
    }

    /// The failure, if any
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            ArtifactOutcome::Written { .. } => None,
            ArtifactOutcome::Failed { failure } => Some(failure),
        }
    }
}

/// Result of processing one well-formed channel
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelReport {
    /// Channel descriptor
    pub descriptor: String,
    /// Launcher file outcome
    pub launcher: ArtifactOutcome,
    /// Icon download outcome
    pub icon: ArtifactOutcome,
}

impl ChannelReport {
    /// Both artifacts were written
    pub fn is_complete(&self) -> bool {
        self.launcher.is_written() && self.icon.is_written()
    }

    /// Neither artifact was written
    pub fn is_total_failure(&self) -> bool {
        !self.launcher.is_written() && !self.icon.is_written()
    }
}

/// A catalog record that never reached the writers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRecord {
    /// Zero-based position in the catalog response
    pub position: usize,
    /// Catalog identifier, when present
    pub channel_id: Option<String>,
    /// Descriptor, when present
    pub descriptor: Option<String>,
    /// Why it was skipped
    pub reason: Failure,
}

/// Aggregate outcome of one pipeline run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the last download settled
    pub finished_at: DateTime<Utc>,
    /// Number of records the catalog returned
    pub total_records: usize,
    /// Channels that passed the transform, in catalog order
    pub channels: Vec<ChannelReport>,
    /// Records skipped before writing, in catalog order
    pub skipped: Vec<SkippedRecord>,
    /// Whether the run was cancelled before every record was scheduled
    pub cancelled: bool,
}

impl RunReport {
    /// Number of launcher files written
    pub fn launchers_written(&self) -> usize {
        self.channels
            .iter()
            .filter(|c| c.launcher.is_written())
            .count()
    }

    /// Number of icons written
    pub fn icons_written(&self) -> usize {
        self.channels.iter().filter(|c| c.icon.is_written()).count()
    }

    /// Channels with at least one failed artifact
    pub fn failed_channels(&self) -> impl Iterator<Item = &ChannelReport> {
        self.channels.iter().filter(|c| !c.is_complete())
    }

    /// Every record produced both artifacts and nothing was skipped or cancelled
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.skipped.is_empty() && self.channels.iter().all(|c| c.is_complete())
    }
}

/// Event emitted while a run progresses
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The catalog was fetched
    CatalogFetched {
        /// Number of records returned
        records: usize,
    },

    /// A record was rejected before writing
    RecordSkipped {
        /// Zero-based position in the catalog
        position: usize,
        /// Descriptor, when present
        #[serde(skip_serializing_if = "Option::is_none")]
        descriptor: Option<String>,
        /// Why it was skipped
        reason: Failure,
    },

    /// A launcher file was written
    LauncherWritten {
        /// Channel descriptor
        descriptor: String,
        /// Launcher path
        path: PathBuf,
    },

    /// A launcher file could not be written
    LauncherFailed {
        /// Channel descriptor
        descriptor: String,
        /// Why it failed
        failure: Failure,
    },

    /// An icon was downloaded
    IconDownloaded {
        /// Channel descriptor
        descriptor: String,
        /// Icon path
        path: PathBuf,
        /// Bytes written
        bytes: u64,
    },

    /// An icon download failed
    IconFailed {
        /// Channel descriptor
        descriptor: String,
        /// Why it failed
        failure: Failure,
    },

    /// Every scheduled download has settled
    RunComplete {
        /// Launcher files written
        launchers_written: usize,
        /// Icons written
        icons_written: usize,
        /// Channels with at least one failed artifact
        failed_channels: usize,
        /// Records skipped before writing
        skipped: usize,
    },
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_deserializes_catalog_shape() {
        let json = r#"{
            "ChannelID": "0x1a",
            "priority": 3,
            "name": "شبکه یک",
            "descriptor": "tv1",
            "description": "national",
            "name_english": "channel 1",
            "image_name": "tv1_logo",
            "has_archive": true,
            "type": { "descriptor": "national", "name": "سراسری" }
        }"#;

        let record: RawChannelRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, Some(ChannelId::Text("0x1a".to_string())));
        assert_eq!(record.priority, Some(3));
        assert_eq!(record.descriptor.as_deref(), Some("tv1"));
        assert_eq!(record.name_english.as_deref(), Some("channel 1"));
        assert_eq!(record.has_archive, Some(true));
        assert_eq!(
            record.channel_type.unwrap().descriptor.as_deref(),
            Some("national")
        );
    }

    #[test]
    fn test_record_tolerates_missing_and_null_fields() {
        let record: RawChannelRecord =
            serde_json::from_str(r#"{"ChannelID": 7, "descriptor": null}"#).unwrap();
        assert_eq!(record.id, Some(ChannelId::Number(7)));
        assert!(record.descriptor.is_none());
        assert!(record.image_name.is_none());
        assert!(record.channel_type.is_none());
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = Event::IconFailed {
            descriptor: "irinn".to_string(),
            failure: Failure {
                kind: FailureKind::Network,
                message: "HTTP 404".to_string(),
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "icon_failed");
        assert_eq!(json["failure"]["kind"], "network");
    }

    fn channel(descriptor: &str, launcher_ok: bool, icon_ok: bool) -> ChannelReport {
        let outcome = |ok: bool, file: &str| {
            if ok {
                ArtifactOutcome::Written {
                    path: PathBuf::from(file),
                }
            } else {
                ArtifactOutcome::Failed {
                    failure: Failure {
                        kind: FailureKind::Network,
                        message: "boom".to_string(),
                    },
                }
            }
        };
        ChannelReport {
            descriptor: descriptor.to_string(),
            launcher: outcome(launcher_ok, "a.desktop"),
            icon: outcome(icon_ok, "icon-a.png"),
        }
    }

    #[test]
    fn test_run_report_counts() {
        let now = Utc::now();
        let report = RunReport {
            started_at: now,
            finished_at: now,
            total_records: 4,
            channels: vec![
                channel("a", true, true),
                channel("b", true, false),
                channel("c", false, false),
            ],
            skipped: vec![],
            cancelled: false,
        };

        assert_eq!(report.launchers_written(), 2);
        assert_eq!(report.icons_written(), 1);
        assert_eq!(report.failed_channels().count(), 2);
        assert!(report.channels[2].is_total_failure());
        assert!(!report.is_success());
    }

    #[test]
    fn test_run_report_success_requires_no_skips() {
        let now = Utc::now();
        let mut report = RunReport {
            started_at: now,
            finished_at: now,
            total_records: 1,
            channels: vec![channel("a", true, true)],
            skipped: vec![],
            cancelled: false,
        };
        assert!(report.is_success());

        report.skipped.push(SkippedRecord {
            position: 1,
            channel_id: None,
            descriptor: None,
            reason: Failure {
                kind: FailureKind::MalformedRecord,
                message: "missing descriptor".to_string(),
            },
        });
        assert!(!report.is_success());
    }
}
