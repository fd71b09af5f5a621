//! Server-first reload of a tab, with drafts filling only the gaps.
//!
//! A reload always fetches and writes the server's values before consulting
//! the draft store. A draft value lands only in a field the server left
//! empty, so a stale draft can never mask a newer server value.

use crate::api::{ApiError, IntegrationKind, SiteApi, SiteId};
use crate::draft::DraftStore;
use crate::events::{EventBus, LifecycleEvent};
use crate::fields::{format_phone, split_project_no, value_to_field, FieldMap};
use crate::form::FormBinding;
use crate::notify::Notifier;
use crate::persist::integration_fields;
use crate::tab::{Tab, PROJECT_NO_NUMBER_FIELD, PROJECT_NO_PREFIX_FIELD};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// No site is selected; nothing was fetched.
    NoSite,
    /// Server values were written, then `overlaid` empty fields were filled from the draft.
    Loaded { site: SiteId, overlaid: usize },
}

/// Reloads one tab from the server and overlays its draft.
pub struct OverlayLoader {
    tab: Tab,
    form: Arc<dyn FormBinding>,
    drafts: Arc<DraftStore>,
    api: Arc<dyn SiteApi>,
    notifier: Arc<dyn Notifier>,
}

impl OverlayLoader {
    pub fn new(
        tab: Tab,
        form: Arc<dyn FormBinding>,
        drafts: Arc<DraftStore>,
        api: Arc<dyn SiteApi>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            tab,
            form,
            drafts,
            api,
            notifier,
        }
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    /// Fetch, write every bound field, then fill the remaining empty ones from the draft.
    ///
    /// On a fetch error the user is notified and the form is left as it was.
    pub async fn reload(&self) -> Result<ReloadOutcome, ApiError> {
        let Some(site) = self.form.selected_site() else {
            debug!("[{}] No site selected, skipping reload", self.tab);
            return Ok(ReloadOutcome::NoSite);
        };

        let server = match self.fetch(site).await {
            Ok(server) => server,
            Err(e) => {
                warn!("[{}] Failed to load site {}: {}", self.tab, site, e);
                self.notifier.error(
                    "오류",
                    &format!(
                        "{}을(를) 불러오지 못했습니다. {}",
                        self.tab.display_name(),
                        e.user_message()
                    ),
                );
                return Err(e);
            }
        };

        self.form.write(self.tab, &server.fields);
        if let Some(ref project_no) = server.project_no {
            // Empty clears the previous site's number from every tab.
            self.form.broadcast_project_no(project_no);
        }

        let overlaid = match self.drafts.load(self.tab) {
            Some(draft) => self.form.fill_empty(self.tab, &draft),
            None => 0,
        };
        if overlaid > 0 {
            info!(
                "[{}] Filled {} empty field(s) from draft {}",
                self.tab,
                overlaid,
                self.drafts.current_key()
            );
        }
        Ok(ReloadOutcome::Loaded { site, overlaid })
    }

    async fn fetch(&self, site: SiteId) -> Result<ServerFields, ApiError> {
        match self.tab {
            Tab::Basic => {
                let record = self.api.get_site(site).await?;
                let project_no = record
                    .project_no
                    .as_deref()
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string);
                let mut row = record.extra.clone();
                if let Some(ref name) = record.site_name {
                    row.insert("site_name".into(), json!(name));
                }
                let mut fields = bound_fields(Tab::Basic, Some(&row), |_, v| v);
                if let Some(ref p) = project_no {
                    let (prefix, number) = split_project_no(p);
                    fields.insert(PROJECT_NO_PREFIX_FIELD.into(), json!(prefix));
                    fields.insert(PROJECT_NO_NUMBER_FIELD.into(), json!(number));
                }
                Ok(ServerFields {
                    fields,
                    project_no: Some(project_no.unwrap_or_default()),
                })
            }
            Tab::Contacts => {
                let row = self.api.get_contacts(site).await?;
                let fields = bound_fields(Tab::Contacts, row.as_ref(), |field, v| {
                    if field.ends_with("_phone") {
                        format_phone(&v)
                    } else {
                        v
                    }
                });
                Ok(ServerFields::new(fields))
            }
            Tab::Products => {
                let row = self.api.get_products(site).await?;
                Ok(ServerFields::new(bound_fields(
                    Tab::Products,
                    row.as_ref(),
                    |_, v| v,
                )))
            }
            Tab::Household | Tab::Common => {
                let kind = IntegrationKind::for_tab(self.tab).ok_or_else(|| {
                    ApiError::Decode(format!("{} has no integration endpoint", self.tab))
                })?;
                let items = self.api.get_integrations(site, kind).await?;
                Ok(ServerFields::new(integration_fields(kind, &items)))
            }
        }
    }
}

/// What the server says a tab should show.
struct ServerFields {
    fields: FieldMap,
    /// Project number to show on every tab. Only the basic tab sets it.
    project_no: Option<String>,
}

impl ServerFields {
    fn new(fields: FieldMap) -> Self {
        Self {
            fields,
            project_no: None,
        }
    }
}

/// Every drafted field of `tab`, taken from `row`. Absent values become `""`
/// so the server clears what it does not have.
fn bound_fields(
    tab: Tab,
    row: Option<&FieldMap>,
    shape: impl Fn(&str, String) -> String,
) -> FieldMap {
    tab.draft_fields()
        .map(|field| {
            let text = row
                .and_then(|r| r.get(field))
                .and_then(value_to_field)
                .map(|v| shape(field, v))
                .unwrap_or_default();
            (field.to_string(), Value::String(text))
        })
        .collect()
}

/// One loader per tab.
pub struct OverlaySet {
    loaders: Vec<OverlayLoader>,
}

impl OverlaySet {
    pub fn new(
        form: Arc<dyn FormBinding>,
        drafts: Arc<DraftStore>,
        api: Arc<dyn SiteApi>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let loaders = Tab::ALL
            .iter()
            .map(|tab| {
                OverlayLoader::new(
                    *tab,
                    form.clone(),
                    drafts.clone(),
                    api.clone(),
                    notifier.clone(),
                )
            })
            .collect();
        Self { loaders }
    }

    pub fn loader(&self, tab: Tab) -> Option<&OverlayLoader> {
        self.loaders.iter().find(|l| l.tab == tab)
    }

    pub async fn reload(&self, tab: Tab) -> Result<ReloadOutcome, ApiError> {
        match self.loader(tab) {
            Some(loader) => loader.reload().await,
            None => Ok(ReloadOutcome::NoSite),
        }
    }

    /// Reload every tab, basic first so the project number is in place
    /// before the other tabs resolve their draft key. A failing tab does not
    /// stop the others.
    pub async fn reload_all(&self) -> Vec<(Tab, Result<ReloadOutcome, ApiError>)> {
        let mut results = Vec::with_capacity(self.loaders.len());
        for loader in &self.loaders {
            results.push((loader.tab, loader.reload().await));
        }
        results
    }

    /// Reload on lifecycle events until the bus closes.
    ///
    /// `AuthReady` and `SiteSelected` reload every tab; `TabActivated`
    /// reloads the activated tab. The subscription is taken before this
    /// returns, so no event published afterwards is missed.
    pub fn spawn_listener(self: Arc<Self>, bus: &EventBus) -> JoinHandle<()> {
        let mut subscription = bus.subscribe();
        tokio::spawn(async move {
            debug!("[overlay] Listening for lifecycle events ({})", subscription.id);
            loop {
                match subscription.recv().await {
                    Ok(LifecycleEvent::AuthReady) | Ok(LifecycleEvent::SiteSelected(_)) => {
                        self.reload_all().await;
                    }
                    Ok(LifecycleEvent::TabActivated(tab)) => {
                        let _ = self.reload(tab).await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("[overlay] Missed {} lifecycle event(s)", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("[overlay] Event bus closed");
        })
    }
}
