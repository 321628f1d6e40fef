use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Record types ---

/// Reconciled lifecycle state of a record in the master partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Observed in the latest crawl.
    Ok,
    /// Absent from the latest crawl.
    Stale,
    /// Never reconciled.
    Unknown,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Ok => "ok",
            RecordStatus::Stale => "stale",
            RecordStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ok" => Ok(RecordStatus::Ok),
            "stale" => Ok(RecordStatus::Stale),
            "unknown" => Ok(RecordStatus::Unknown),
            other => Err(format!("unknown record status: {other}")),
        }
    }
}

/// One crawled record. `unique_id` is the natural key within a partition;
/// the same id may appear in partitions of different sites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub unique_id: String,
    pub record_url: String,
    pub status: RecordStatus,
    pub run_id: Option<Uuid>,
    pub extras: BTreeMap<String, String>,
}

impl Record {
    pub fn new(unique_id: impl Into<String>, record_url: impl Into<String>) -> Self {
        Self {
            unique_id: unique_id.into(),
            record_url: record_url.into(),
            status: RecordStatus::Unknown,
            run_id: None,
            extras: BTreeMap::new(),
        }
    }

    pub fn with_status(mut self, status: RecordStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_extra(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extras.insert(name.into(), value.into());
        self
    }
}

/// Partial update applied to a master record. Columns not named here are
/// left untouched; `extras` entries merge into the stored mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordPatch {
    pub status: RecordStatus,
    pub run_id: Uuid,
    pub record_url: String,
    pub extras: BTreeMap<String, String>,
}

/// Identifier/url pair for a record missing from the latest crawl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingRecord {
    pub unique_id: String,
    pub record_url: String,
}

// --- Partitions ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Daily => write!(f, "daily"),
            Frequency::Weekly => write!(f, "weekly"),
            Frequency::Monthly => write!(f, "monthly"),
        }
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            other => Err(format!("unknown frequency: {other}")),
        }
    }
}

/// Addresses one logical dataset within the store. Source partitions are
/// scoped to a single site, frequency and run date; the master partition
/// is long-lived per site. Components are carried explicitly and never
/// recovered by splitting a rendered name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Partition {
    Source {
        site: String,
        frequency: Frequency,
        date: NaiveDate,
    },
    Master {
        site: String,
    },
}

impl Partition {
    pub fn source(site: impl Into<String>, frequency: Frequency, date: NaiveDate) -> Self {
        Partition::Source {
            site: site.into(),
            frequency,
            date,
        }
    }

    pub fn master(site: impl Into<String>) -> Self {
        Partition::Master { site: site.into() }
    }

    pub fn site(&self) -> &str {
        match self {
            Partition::Source { site, .. } | Partition::Master { site } => site,
        }
    }

    /// Storage key for this partition.
    pub fn name(&self) -> String {
        match self {
            Partition::Source {
                site,
                frequency,
                date,
            } => format!("{site}_{frequency}_{}", date.format("%Y-%m-%d")),
            Partition::Master { site } => format!("{site}_master"),
        }
    }
}

// --- Diff mode ---

/// Which master ids take part in the missing-record diff. `Full` lets
/// already-stale records be rediscovered as missing; `StatusFiltered`
/// restricts the diff to records still marked ok.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMode {
    Full,
    StatusFiltered,
}

impl fmt::Display for ComparisonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonMode::Full => write!(f, "full"),
            ComparisonMode::StatusFiltered => write!(f, "status_filtered"),
        }
    }
}

impl FromStr for ComparisonMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(ComparisonMode::Full),
            "status_filtered" | "status-filtered" => Ok(ComparisonMode::StatusFiltered),
            other => Err(format!("unknown comparison mode: {other}")),
        }
    }
}

// --- Registry entries ---

/// Registry row for a URL discovered as missing from the current run.
/// The primary site's entries carry a fixed category and an empty
/// extensible field; every other site writes the bare id/url shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum RegistryEntry {
    Primary { unique_id: String, url: String },
    Other { unique_id: String, url: String },
}

/// Category attached to primary-site registry entries.
pub const PRIMARY_REGISTRY_CATEGORY: &str = "MasterDB";

impl RegistryEntry {
    pub fn new(is_primary_site: bool, unique_id: impl Into<String>, url: impl Into<String>) -> Self {
        if is_primary_site {
            RegistryEntry::Primary {
                unique_id: unique_id.into(),
                url: url.into(),
            }
        } else {
            RegistryEntry::Other {
                unique_id: unique_id.into(),
                url: url.into(),
            }
        }
    }

    pub fn unique_id(&self) -> &str {
        match self {
            RegistryEntry::Primary { unique_id, .. } | RegistryEntry::Other { unique_id, .. } => {
                unique_id
            }
        }
    }

    pub fn url(&self) -> &str {
        match self {
            RegistryEntry::Primary { url, .. } | RegistryEntry::Other { url, .. } => url,
        }
    }

    pub fn category(&self) -> Option<&'static str> {
        match self {
            RegistryEntry::Primary { .. } => Some(PRIMARY_REGISTRY_CATEGORY),
            RegistryEntry::Other { .. } => None,
        }
    }

    /// Extensible attribute payload; present but empty for primary entries.
    pub fn extra(&self) -> Option<serde_json::Value> {
        match self {
            RegistryEntry::Primary { .. } => Some(serde_json::json!({})),
            RegistryEntry::Other { .. } => None,
        }
    }
}

// --- Run summary ---

/// Per-site counters for the most recent reconciliation run.
/// One row per site, overwritten on each run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub site: String,
    pub updated: u64,
    pub new_records: u64,
    pub not_found: u64,
    pub total_records: u64,
    pub missing_count: u64,
}

// --- Queue payload ---

/// JSON body published per missing record for re-fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequeueMessage {
    pub record_url: String,
    pub unique_id: String,
}
