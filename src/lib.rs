//! # CNNVD Harvester Library
//!
//! Harvests vulnerability records from the China National Vulnerability Database
//! of Information Security (CNNVD) and stores them as one JSON file per record,
//! organised by year and month.
//!
//! ## Features
//!
//! - **Three harvest modes**: full rebuild from 1988, a single explicit
//!   year/month, or incremental from the last checkpoint
//! - **Checkpointing**: a `metadata.json` file remembers the latest identifier
//!   seen, the running record count and when the next incremental run is due
//! - **Retry**: every network call is retried up to a configured attempt count
//! - **Idempotent output**: the file path is derived from the record identifier,
//!   so re-harvesting a month rewrites the same files
//!
//! ## Quick Start
//!
//! ```no_run
//! use cnnvd_harvester::fetcher::cnnvd_http::CnnvdHttpClient;
//! use cnnvd_harvester::harvester::{HarvestConfig, HarvestExecutor, HarvestMode};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = CnnvdHttpClient::with_defaults()?;
//! let config = HarvestConfig::new("./cnnvd-data");
//! let executor = HarvestExecutor::new(source, config);
//!
//! let report = executor.run(HarvestMode::Incremental, chrono::Utc::now()).await?;
//! println!("saved {} records, latest {}", report.records_saved, report.latest);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`identifier`] - CNNVD identifier and year/month window types
//! - [`resume`] - Checkpoint store and run lock
//! - [`fetcher`] - Remote source trait, HTTP client, retry, pagination, detail expansion
//! - [`output`] - Record path layout and JSON sink
//! - [`harvester`] - Feed planning and run orchestration
//! - [`publish`] - Git commit/push of the harvested directory
//! - [`cli`] - Command line surface

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// CLI command implementations
pub mod cli;

/// Remote source access
pub mod fetcher;

/// Harvest planning and orchestration
pub mod harvester;

/// CNNVD identifier parsing and ordering
pub mod identifier;

/// Record persistence
pub mod output;

/// Git publishing of harvested data
pub mod publish;

/// Checkpoint persistence
pub mod resume;

// Re-export commonly used types
pub use identifier::{CnnvdIdentifier, Window};

/// Vulnerability as returned by the listing endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VulnSummary {
    /// Internal record id used by the detail endpoint
    #[serde(default)]
    pub id: String,
    /// Vulnerability name
    #[serde(default)]
    pub vul_name: Option<String>,
    /// CNNVD identifier string (e.g. "CNNVD-202304-0662")
    pub cnnvd_code: String,
    /// Matching CVE identifier, if any
    #[serde(default)]
    pub cve_code: Option<String>,
    /// Hazard level code (1 = critical ... 4 = low)
    #[serde(default)]
    pub hazard_level: Option<u8>,
    /// Vulnerability type code, passed back to the detail endpoint
    #[serde(default)]
    pub vul_type: String,
    /// Publish time as reported by the source
    #[serde(default)]
    pub publish_time: Option<String>,
    /// Last update time as reported by the source
    #[serde(default)]
    pub update_time: Option<String>,
    /// Remaining fields, kept verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Full vulnerability record as returned by the detail endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VulnDetail {
    /// Internal record id
    #[serde(default)]
    pub id: String,
    /// Vulnerability name
    #[serde(default)]
    pub vul_name: Option<String>,
    /// CNNVD identifier string
    pub cnnvd_code: String,
    /// Matching CVE identifier, if any
    #[serde(default)]
    pub cve_code: Option<String>,
    /// Hazard level code (1 = critical ... 4 = low)
    #[serde(default)]
    pub hazard_level: Option<u8>,
    /// Vulnerability type code
    #[serde(default)]
    pub vul_type: Option<String>,
    /// Vulnerability type label
    #[serde(default)]
    pub vul_type_name: Option<String>,
    /// Description
    #[serde(default)]
    pub vul_desc: Option<String>,
    /// Affected vendor
    #[serde(default)]
    pub affected_vendor: Option<String>,
    /// Affected product
    #[serde(default)]
    pub affected_product: Option<String>,
    /// Patch / remediation status
    #[serde(default)]
    pub patch: Option<String>,
    /// Publish time as reported by the source
    #[serde(default)]
    pub publish_time: Option<String>,
    /// Last update time as reported by the source
    #[serde(default)]
    pub update_time: Option<String>,
    /// Remaining fields, kept verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A record ready for persistence: either the list entry or its expanded detail
///
/// Serialized untagged, so the file holds exactly the payload the source sent.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Record {
    /// List entry, kept as-is
    Summary(VulnSummary),
    /// Expanded detail
    Detail(VulnDetail),
}

impl Record {
    /// Raw identifier string of the record
    pub fn cnnvd_code(&self) -> &str {
        match self {
            Record::Summary(summary) => &summary.cnnvd_code,
            Record::Detail(detail) => &detail.cnnvd_code,
        }
    }

    /// Parsed identifier of the record
    pub fn identifier(&self) -> Result<CnnvdIdentifier, identifier::IdentifierError> {
        CnnvdIdentifier::parse(self.cnnvd_code())
    }

    /// Whether the record carries the full detail payload
    pub fn is_detailed(&self) -> bool {
        matches!(self, Record::Detail(_))
    }
}

/// Label/value pair from a lookup endpoint (hazard levels, vendors, ...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Taxonomy {
    /// Human readable label
    #[serde(default)]
    pub label: String,
    /// Value to pass back as a filter (string or number depending on endpoint)
    #[serde(default)]
    pub value: serde_json::Value,
    /// Remaining fields, kept verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Taxonomy {
    /// Value rendered as plain text (strings without quotes)
    pub fn value_text(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Hazard (severity) level used by CNNVD
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HazardLevel {
    /// 超危
    Critical,
    /// 高危
    High,
    /// 中危
    Medium,
    /// 低危
    Low,
}

impl HazardLevel {
    /// Label used by the source for an optional numeric code (0 or unknown = 未知)
    pub fn label_for(code: Option<u8>) -> &'static str {
        code.and_then(Self::from_code)
            .map(|level| level.label())
            .unwrap_or("未知")
    }

    /// Level for a numeric code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(HazardLevel::Critical),
            2 => Some(HazardLevel::High),
            3 => Some(HazardLevel::Medium),
            4 => Some(HazardLevel::Low),
            _ => None,
        }
    }

    /// Numeric code the listing endpoint filters on
    pub fn code(&self) -> u8 {
        match self {
            HazardLevel::Critical => 1,
            HazardLevel::High => 2,
            HazardLevel::Medium => 3,
            HazardLevel::Low => 4,
        }
    }

    /// Label as shown by the source
    pub fn label(&self) -> &'static str {
        match self {
            HazardLevel::Critical => "超危",
            HazardLevel::High => "高危",
            HazardLevel::Medium => "中危",
            HazardLevel::Low => "低危",
        }
    }
}

impl fmt::Display for HazardLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for HazardLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "超危" | "critical" | "1" => Ok(HazardLevel::Critical),
            "高危" | "high" | "2" => Ok(HazardLevel::High),
            "中危" | "medium" | "3" => Ok(HazardLevel::Medium),
            "低危" | "low" | "4" => Ok(HazardLevel::Low),
            _ => Err(format!(
                "Invalid hazard level: {s}. Valid options: 超危, 高危, 中危, 低危 (critical, high, medium, low)"
            )),
        }
    }
}
