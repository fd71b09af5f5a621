//! The site backend, seen from the console.
//!
//! [`SiteApi`] is the seam the loaders and the final save talk to;
//! [`HttpSiteApi`] is the REST implementation.

mod http;
mod types;

pub use http::HttpSiteApi;
pub use types::{
    Alarm, AlarmList, ExportFormat, ExportQuery, IntegrationItem, IntegrationKind, Photo,
    PhotoPage, ProjectNoCheck, Site, SiteId, WorkItem, WorkStatus,
};

use crate::fields::FieldMap;
use async_trait::async_trait;

/// Error from a backend call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    /// Non-success status, with the best message the server gave.
    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("failed to write download: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Text suitable for an error dialog.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// REST operations on sites and their per-tab data.
#[async_trait]
pub trait SiteApi: Send + Sync {
    // --- Sites ---

    async fn list_sites(&self) -> Result<Vec<Site>, ApiError>;

    async fn get_site(&self, site: SiteId) -> Result<Site, ApiError>;

    async fn create_site(&self, body: &FieldMap) -> Result<Site, ApiError>;

    async fn patch_site(&self, site: SiteId, body: &FieldMap) -> Result<(), ApiError>;

    async fn check_project_no(&self, project_no: &str) -> Result<ProjectNoCheck, ApiError>;

    // --- Per-tab data ---

    /// `None` when the site has no contacts row yet.
    async fn get_contacts(&self, site: SiteId) -> Result<Option<FieldMap>, ApiError>;

    async fn save_contacts(&self, site: SiteId, body: &FieldMap) -> Result<(), ApiError>;

    async fn get_products(&self, site: SiteId) -> Result<Option<FieldMap>, ApiError>;

    async fn save_products(&self, site: SiteId, body: &FieldMap) -> Result<(), ApiError>;

    async fn get_integrations(
        &self,
        site: SiteId,
        kind: IntegrationKind,
    ) -> Result<Vec<IntegrationItem>, ApiError>;

    async fn save_integrations(
        &self,
        site: SiteId,
        kind: IntegrationKind,
        items: &[IntegrationItem],
    ) -> Result<(), ApiError>;

    // --- Work tracker ---

    async fn list_work_items(
        &self,
        site: SiteId,
        status: WorkStatus,
    ) -> Result<Vec<WorkItem>, ApiError>;

    async fn save_work_items(&self, site: SiteId, items: &[WorkItem]) -> Result<(), ApiError>;

    /// Alarms due for the current user, `today` as `YYYY-MM-DD`.
    async fn list_alarms(&self, site: SiteId, today: &str) -> Result<AlarmList, ApiError>;

    async fn confirm_alarms(&self, site: SiteId, ids: &[i64]) -> Result<(), ApiError>;

    // --- Photos ---

    async fn list_photos(
        &self,
        site: SiteId,
        page: u32,
        page_size: u32,
    ) -> Result<PhotoPage, ApiError>;

    async fn delete_photo(&self, site: SiteId, photo: i64) -> Result<(), ApiError>;
}
