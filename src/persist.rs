//! Per-tab persistence: payload shaping and the save call for each tab.
//!
//! The same functions serve the individual save button of a tab and the
//! final save. In a batch, [`SaveContext::quiet`] suppresses the per-tab
//! success notice so the user sees a single one at the end.

use crate::api::{ApiError, IntegrationItem, IntegrationKind, Site, SiteApi, SiteId};
use crate::fields::{format_phone, value_to_field, FieldMap, InvalidProjectNo, ProjectNo};
use crate::form::FormBinding;
use crate::notify::{Notice, NoticeLevel, Notifier};
use crate::tab::{Tab, PROJECT_NO_FIELD, PROJECT_NO_NUMBER_FIELD, PROJECT_NO_PREFIX_FIELD};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where and how a tab is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveContext {
    pub site: SiteId,
    /// Project number stamped on every per-tab row.
    pub project_no: Option<String>,
    /// Suppress the per-tab success notice.
    pub quiet: bool,
}

/// A save refused before any network call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error(transparent)]
    InvalidProjectNo(#[from] InvalidProjectNo),
    #[error("이미 등록된 프로젝트 번호입니다: {project_no} ({message})")]
    DuplicateProjectNo { project_no: String, message: String },
    #[error("먼저 상단의 \"현장 선택\"에서 현장을 선택하세요.")]
    NoSiteSelected,
}

/// A backend call for one tab failed.
#[derive(Debug, thiserror::Error)]
#[error("{} 저장 실패: {source}", .tab.display_name())]
pub struct PersistError {
    pub tab: Tab,
    #[source]
    pub source: ApiError,
}

impl PersistError {
    pub fn new(tab: Tab, source: ApiError) -> Self {
        Self { tab, source }
    }

    /// Text for the error dialog, naming the tab.
    pub fn user_message(&self) -> String {
        format!(
            "{} 저장 중 오류가 발생했습니다. {}",
            self.tab.display_name(),
            self.source.user_message()
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TabSaveError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Trimmed text of a field, or `None` when blank or absent.
fn text(data: &FieldMap, field: &str) -> Option<String> {
    data.get(field)
        .and_then(value_to_field)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn text_or_null(data: &FieldMap, field: &str) -> Value {
    text(data, field).map(Value::String).unwrap_or(Value::Null)
}

/// Leading integer of a field, as `parseInt` would read it. Blank or unparsable is 0.
fn int_or_zero(data: &FieldMap, field: &str) -> i64 {
    match data.get(field) {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(other) => value_to_field(other)
            .map(|s| {
                let s = s.trim();
                let end = s
                    .char_indices()
                    .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && c == '-')))
                    .map(|(i, _)| i)
                    .unwrap_or(s.len());
                s[..end].parse().unwrap_or(0)
            })
            .unwrap_or(0),
        None => 0,
    }
}

/// The project number the basic tab's prefix and digits fields spell, if any.
pub fn combined_project_no(data: &FieldMap) -> Option<String> {
    let prefix = text(data, PROJECT_NO_PREFIX_FIELD).unwrap_or_default();
    let number = text(data, PROJECT_NO_NUMBER_FIELD).unwrap_or_default();
    let combined = format!("{}{}", prefix, number);
    if combined.is_empty() {
        None
    } else {
        Some(combined)
    }
}

/// Body of `POST /sites` and `PATCH /sites/:id`.
pub fn basic_payload(data: &FieldMap) -> FieldMap {
    let mut body = FieldMap::new();
    body.insert(
        "project_no".into(),
        combined_project_no(data)
            .map(Value::String)
            .unwrap_or(Value::Null),
    );
    for field in ["construction_company", "site_name", "address", "detail_address"] {
        body.insert(field.into(), json!(text(data, field).unwrap_or_default()));
    }
    body.insert(
        "household_count".into(),
        json!(int_or_zero(data, "household_count")),
    );
    for field in ["registration_date", "delivery_date", "completion_date"] {
        body.insert(field.into(), text_or_null(data, field));
    }
    for field in ["certification_audit", "home_iot"] {
        body.insert(
            field.into(),
            json!(text(data, field).unwrap_or_else(|| "N".to_string())),
        );
    }
    body.insert("product_bi".into(), text_or_null(data, "product_bi"));
    body
}

/// Body of `POST /sites/:id/contacts`. Phones are sent hyphenated.
pub fn contacts_payload(data: &FieldMap, project_no: Option<&str>) -> FieldMap {
    let mut body = FieldMap::new();
    body.insert("project_no".into(), json!(project_no));
    for field in Tab::Contacts.draft_fields() {
        let value = match text(data, field) {
            Some(phone) if field.ends_with("_phone") => {
                let formatted = format_phone(&phone);
                if formatted.is_empty() {
                    Value::Null
                } else {
                    Value::String(formatted)
                }
            }
            Some(name) => Value::String(name),
            None => Value::Null,
        };
        body.insert(field.into(), value);
    }
    body
}

/// Body of `POST /sites/:id/products`. Blank quantities are sent as 0.
pub fn products_payload(data: &FieldMap, project_no: Option<&str>) -> FieldMap {
    let mut body = FieldMap::new();
    body.insert("project_no".into(), json!(project_no));
    for field in Tab::Products.draft_fields() {
        let value = if field.ends_with("_qty") {
            json!(int_or_zero(data, field))
        } else {
            text_or_null(data, field)
        };
        body.insert(field.into(), value);
    }
    body
}

/// One row per integration slot of the tab. A blank switch is sent as `N`.
pub fn integration_items(
    kind: IntegrationKind,
    data: &FieldMap,
    project_no: Option<&str>,
) -> Vec<IntegrationItem> {
    kind.slots()
        .iter()
        .map(|(prefix, integration_type)| IntegrationItem {
            integration_type: integration_type.to_string(),
            enabled: text(data, &format!("{}_enabled", prefix)).unwrap_or_else(|| "N".to_string()),
            company_name: text(data, &format!("{}_company", prefix)),
            contact_person: None,
            contact_phone: None,
            notes: None,
            project_no: project_no.map(str::to_string),
        })
        .collect()
}

/// Form values for the server's integration rows. A slot without a row shows `Y`.
pub fn integration_fields(kind: IntegrationKind, items: &[IntegrationItem]) -> FieldMap {
    let mut data = FieldMap::new();
    for (prefix, integration_type) in kind.slots() {
        let row = items
            .iter()
            .find(|item| item.integration_type == *integration_type);
        let enabled = row
            .map(|r| r.enabled.trim())
            .filter(|e| !e.is_empty())
            .unwrap_or("Y");
        let company = row.and_then(|r| r.company_name.clone()).unwrap_or_default();
        data.insert(format!("{}_enabled", prefix), json!(enabled));
        data.insert(format!("{}_company", prefix), json!(company));
    }
    data
}

/// Create a site and return its id. A response without an id is an error.
pub async fn create_site(api: &dyn SiteApi, body: &FieldMap) -> Result<Site, ApiError> {
    let site = api.create_site(body).await?;
    if site.id.is_none() {
        return Err(ApiError::Decode("created site has no id".to_string()));
    }
    info!(
        "Created site {:?} ({})",
        site.id,
        site.project_no.as_deref().unwrap_or("-")
    );
    Ok(site)
}

/// Persist one tab's data against `ctx.site`.
pub async fn persist_tab(
    api: &dyn SiteApi,
    ctx: &SaveContext,
    tab: Tab,
    data: &FieldMap,
    notifier: &dyn Notifier,
) -> Result<(), PersistError> {
    let project_no = ctx.project_no.as_deref();
    let result = match tab {
        Tab::Basic => api.patch_site(ctx.site, &basic_payload(data)).await,
        Tab::Contacts => {
            api.save_contacts(ctx.site, &contacts_payload(data, project_no))
                .await
        }
        Tab::Products => {
            api.save_products(ctx.site, &products_payload(data, project_no))
                .await
        }
        Tab::Household | Tab::Common => match IntegrationKind::for_tab(tab) {
            Some(kind) => {
                let items = integration_items(kind, data, project_no);
                api.save_integrations(ctx.site, kind, &items).await
            }
            None => Ok(()),
        },
    };
    result.map_err(|e| PersistError::new(tab, e))?;

    debug!("Persisted {} for site {}", tab, ctx.site);
    if !ctx.quiet {
        notifier.success(&format!("{} 저장 완료", tab.display_name()), "");
    }
    Ok(())
}

/// The individual save button of each tab.
pub struct TabSaver {
    form: Arc<dyn FormBinding>,
    api: Arc<dyn SiteApi>,
    notifier: Arc<dyn Notifier>,
}

impl TabSaver {
    pub fn new(
        form: Arc<dyn FormBinding>,
        api: Arc<dyn SiteApi>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            form,
            api,
            notifier,
        }
    }

    /// Save what the form shows for `tab`. Returns the site it was saved to.
    ///
    /// Every failure has already been shown to the user when this returns.
    pub async fn save_tab(&self, tab: Tab) -> Result<SiteId, TabSaveError> {
        let result = match tab {
            Tab::Basic => self.save_basic().await,
            _ => self.save_detail(tab).await,
        };
        if let Err(ref e) = result {
            match e {
                TabSaveError::Validation(ValidationError::DuplicateProjectNo { .. }) => {
                    self.notifier.notify(Notice::new(
                        NoticeLevel::Warning,
                        "중복된 프로젝트 번호",
                        e.to_string(),
                    ))
                }
                TabSaveError::Validation(v) => self.notifier.info("안내", &v.to_string()),
                TabSaveError::Persist(p) => self.notifier.error("오류", &p.user_message()),
            }
        }
        result
    }

    async fn save_basic(&self) -> Result<SiteId, TabSaveError> {
        let data = self.form.read(Tab::Basic);
        let raw = combined_project_no(&data).unwrap_or_default();
        let project_no = ProjectNo::parse(&raw).map_err(ValidationError::from)?;
        let mut body = basic_payload(&data);
        body.insert("project_no".into(), json!(project_no.to_string()));

        match self.form.selected_site() {
            Some(site) => {
                self.api
                    .patch_site(site, &body)
                    .await
                    .map_err(|e| PersistError::new(Tab::Basic, e))?;
                self.form.broadcast_project_no(&project_no.to_string());
                self.notifier.success("기본정보 수정 완료", "");
                Ok(site)
            }
            None => {
                self.check_duplicate(&project_no).await?;
                let site = create_site(self.api.as_ref(), &body)
                    .await
                    .map_err(|e| PersistError::new(Tab::Basic, e))?;
                let id = site
                    .id
                    .ok_or_else(|| {
                        PersistError::new(Tab::Basic, ApiError::Decode("missing id".into()))
                    })?;
                self.form.select_site(Some(id));
                let shown = site.project_no.unwrap_or_else(|| project_no.to_string());
                self.form.broadcast_project_no(&shown);
                self.notifier.success("현장 등록 완료", "");
                Ok(id)
            }
        }
    }

    async fn check_duplicate(&self, project_no: &ProjectNo) -> Result<(), TabSaveError> {
        let raw = project_no.to_string();
        let check = self
            .api
            .check_project_no(&raw)
            .await
            .map_err(|e| PersistError::new(Tab::Basic, e))?;
        if check.is_duplicate {
            let existing = check
                .existing_site
                .and_then(|s| s.site_name)
                .unwrap_or_default();
            warn!("Project number {} already used by {:?}", raw, existing);
            return Err(ValidationError::DuplicateProjectNo {
                project_no: raw,
                message: check.message,
            }
            .into());
        }
        Ok(())
    }

    async fn save_detail(&self, tab: Tab) -> Result<SiteId, TabSaveError> {
        let site = self
            .form
            .selected_site()
            .ok_or(ValidationError::NoSiteSelected)?;
        let project_no = self
            .form
            .value(tab, PROJECT_NO_FIELD)
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        let ctx = SaveContext {
            site,
            project_no,
            quiet: false,
        };
        let data = self.form.read(tab);
        persist_tab(
            self.api.as_ref(),
            &ctx,
            tab,
            &data,
            self.notifier.as_ref(),
        )
        .await?;
        Ok(site)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(value: Value) -> FieldMap {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_basic_payload_defaults() {
        let body = basic_payload(&map(json!({
            "project_no_prefix": "NA/",
            "project_no_number": "1234",
            "site_name": " Tower A ",
            "household_count": "120세대",
            "delivery_date": "2024-09-01"
        })));
        assert_eq!(body["project_no"], "NA/1234");
        assert_eq!(body["site_name"], "Tower A");
        assert_eq!(body["address"], "");
        assert_eq!(body["household_count"], 120);
        assert_eq!(body["registration_date"], Value::Null);
        assert_eq!(body["delivery_date"], "2024-09-01");
        assert_eq!(body["certification_audit"], "N");
        assert_eq!(body["home_iot"], "N");
        assert_eq!(body["product_bi"], Value::Null);

        let empty = basic_payload(&FieldMap::new());
        assert_eq!(empty["project_no"], Value::Null);
        assert_eq!(empty["household_count"], 0);
    }

    #[test]
    fn test_contacts_payload_formats_phones() {
        let body = contacts_payload(
            &map(json!({"pm_name": " Kim ", "pm_phone": "01012345678", "installer_phone": "---"})),
            Some("NA/1234"),
        );
        assert_eq!(body["project_no"], "NA/1234");
        assert_eq!(body["pm_name"], "Kim");
        assert_eq!(body["pm_phone"], "010-1234-5678");
        assert_eq!(body["installer_phone"], Value::Null);
        assert_eq!(body["sales_manager_name"], Value::Null);
        assert!(!body.contains_key("project_no_prefix"));
    }

    #[test]
    fn test_products_payload_quantities() {
        let body = products_payload(
            &map(json!({"wallpad_model": "HN-1000", "wallpad_qty": "12", "opener_qty": ""})),
            None,
        );
        assert_eq!(body["project_no"], Value::Null);
        assert_eq!(body["wallpad_model"], "HN-1000");
        assert_eq!(body["wallpad_qty"], 12);
        assert_eq!(body["opener_qty"], 0);
        assert_eq!(body["doorphone_model"], Value::Null);
    }

    #[test]
    fn test_integration_rows() {
        let items = integration_items(
            IntegrationKind::Household,
            &map(json!({"lighting_enabled": "Y", "lighting_company": "Acme"})),
            Some("NE/0001"),
        );
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].integration_type, "lighting_sw");
        assert_eq!(items[0].enabled, "Y");
        assert_eq!(items[0].company_name.as_deref(), Some("Acme"));
        assert_eq!(items[1].integration_type, "standby_power_sw");
        assert_eq!(items[1].enabled, "N");
        assert_eq!(items[2].project_no.as_deref(), Some("NE/0001"));

        let fields = integration_fields(IntegrationKind::Common, &[items[0].clone()]);
        assert_eq!(fields["parking_enabled"], "Y");
        assert_eq!(fields["parking_company"], "");
        assert_eq!(fields.len(), 6);
    }
}
