//! Wire types for the site backend.

use crate::fields::FieldMap;
use crate::tab::Tab;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Backend id of a site row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(pub i64);

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SiteId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(SiteId)
    }
}

/// A site record. Fields the engine does not interpret are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Site {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SiteId>,
    #[serde(default)]
    pub project_no: Option<String>,
    #[serde(default)]
    pub site_name: Option<String>,
    #[serde(flatten)]
    pub extra: FieldMap,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SitesEnvelope {
    #[serde(default)]
    pub sites: Vec<Site>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SiteEnvelope {
    pub site: Option<Site>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContactsEnvelope {
    pub contacts: Option<FieldMap>,
}

/// The products endpoint has answered both with a single row and with a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany {
    One(FieldMap),
    Many(Vec<FieldMap>),
}

impl OneOrMany {
    pub fn into_first(self) -> Option<FieldMap> {
        match self {
            OneOrMany::One(row) => Some(row),
            OneOrMany::Many(rows) => rows.into_iter().next(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProductsEnvelope {
    #[serde(default, alias = "product")]
    pub products: Option<OneOrMany>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ItemsEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// Which integrations endpoint an item list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationKind {
    Household,
    Common,
}

const HOUSEHOLD_SLOTS: &[(&str, &str)] = &[
    ("lighting", "lighting_sw"),
    ("standby", "standby_power_sw"),
    ("gas", "gas_detector"),
];

const COMMON_SLOTS: &[(&str, &str)] = &[
    ("parking", "parking_control"),
    ("metering", "remote_metering"),
    ("cctv", "cctv"),
];

impl IntegrationKind {
    pub fn for_tab(tab: Tab) -> Option<Self> {
        match tab {
            Tab::Household => Some(IntegrationKind::Household),
            Tab::Common => Some(IntegrationKind::Common),
            _ => None,
        }
    }

    pub fn path_segment(&self) -> &'static str {
        match self {
            IntegrationKind::Household => "household",
            IntegrationKind::Common => "common",
        }
    }

    /// `(field prefix, integration_type)` for every row the tab edits.
    ///
    /// A prefix `p` binds the fields `p_enabled` and `p_company`.
    pub fn slots(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            IntegrationKind::Household => HOUSEHOLD_SLOTS,
            IntegrationKind::Common => COMMON_SLOTS,
        }
    }
}

/// One household or common-area integration row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationItem {
    pub integration_type: String,
    pub enabled: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_person: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub project_no: Option<String>,
}

/// Answer of the project-number duplicate check.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectNoCheck {
    pub is_duplicate: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub existing_site: Option<Site>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkStatus {
    Todo,
    Done,
}

impl WorkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkStatus::Todo => "todo",
            WorkStatus::Done => "done",
        }
    }
}

/// A to-do or done row of the per-site work tracker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub site_id: Option<SiteId>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub alarm_date: Option<String>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub done_date: Option<String>,
    #[serde(default)]
    pub delete_flag: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alarm {
    pub id: i64,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub alarm_date: Option<String>,
    #[serde(default)]
    pub alarm_confirmed: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlarmList {
    #[serde(default)]
    pub items: Vec<Alarm>,
    #[serde(default)]
    pub count: Option<usize>,
}

impl AlarmList {
    /// Badge count: the server's figure, or the unconfirmed rows.
    pub fn unconfirmed(&self) -> usize {
        self.count
            .unwrap_or_else(|| self.items.iter().filter(|a| !a.alarm_confirmed).count())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: i64,
    #[serde(flatten)]
    pub extra: FieldMap,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoPage {
    #[serde(default)]
    pub items: Vec<Photo>,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub has_more: bool,
}

fn first_page() -> u32 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Both,
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Both => "both",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "both" => Ok(ExportFormat::Both),
            "xlsx" => Ok(ExportFormat::Xlsx),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("unknown export format: {}", other)),
        }
    }
}

/// Filters for the `/export` archive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportQuery {
    pub format: ExportFormat,
    /// Restrict to one site; `None` lets the server pick by role.
    pub site: Option<SiteId>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub include_photos: bool,
}

impl ExportQuery {
    pub fn to_query_string(&self) -> String {
        let mut params: Vec<(&str, String)> = vec![("format", self.format.as_str().to_string())];
        match self.site {
            Some(site) => {
                params.push(("scope", "site".to_string()));
                params.push(("site_id", site.to_string()));
            }
            None => params.push(("scope", "auto".to_string())),
        }
        if let Some(start) = self.start_date {
            params.push(("start_date", start.format("%Y-%m-%d").to_string()));
        }
        if let Some(end) = self.end_date {
            params.push(("end_date", end.format("%Y-%m-%d").to_string()));
        }
        if !self.include_photos {
            params.push(("include_photos", "false".to_string()));
        }
        params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}
