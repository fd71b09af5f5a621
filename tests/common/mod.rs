#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use site_drafts::api::{
    AlarmList, IntegrationItem, IntegrationKind, PhotoPage, ProjectNoCheck, Site, WorkItem,
    WorkStatus,
};
use site_drafts::draft::MemoryStorage;
use site_drafts::{
    ApiError, DraftStore, EventBus, FieldMap, FinalSaveOrchestrator, FormBinding, KeyResolver,
    MemoryForm, OverlaySet, RecordingNotifier, SiteApi, SiteId, TabController, TabSaver,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

/// A backend that records every call in order and answers from canned data.
#[derive(Default)]
pub struct MockApi {
    calls: Mutex<Vec<String>>,
    bodies: Mutex<Vec<(String, Value)>>,
    failing: Mutex<HashSet<&'static str>>,
    site: Mutex<Option<Site>>,
    contacts: Mutex<Option<FieldMap>>,
    products: Mutex<Option<FieldMap>>,
    integrations: Mutex<HashMap<&'static str, Vec<IntegrationItem>>>,
    duplicates: Mutex<HashSet<String>>,
    next_id: AtomicI64,
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(100),
            ..Default::default()
        }
    }

    /// Every call so far, by method name.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Bodies sent to `method`, in order.
    pub fn bodies(&self, method: &str) -> Vec<Value> {
        self.bodies
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, b)| b.clone())
            .collect()
    }

    /// Make `method` answer HTTP 500.
    pub fn fail_on(&self, method: &'static str) {
        self.failing.lock().unwrap().insert(method);
    }

    pub fn set_site(&self, site: Value) {
        *self.site.lock().unwrap() = Some(serde_json::from_value(site).unwrap());
    }

    pub fn set_contacts(&self, row: Value) {
        *self.contacts.lock().unwrap() = row.as_object().cloned();
    }

    pub fn set_products(&self, row: Value) {
        *self.products.lock().unwrap() = row.as_object().cloned();
    }

    pub fn set_integrations(&self, kind: IntegrationKind, items: Value) {
        let items: Vec<IntegrationItem> = serde_json::from_value(items).unwrap();
        self.integrations
            .lock()
            .unwrap()
            .insert(kind.path_segment(), items);
    }

    pub fn mark_duplicate(&self, project_no: &str) {
        self.duplicates
            .lock()
            .unwrap()
            .insert(project_no.to_string());
    }

    fn record(&self, method: &'static str, body: Option<Value>) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(method.to_string());
        if let Some(body) = body {
            self.bodies.lock().unwrap().push((method.to_string(), body));
        }
        if self.failing.lock().unwrap().contains(method) {
            return Err(ApiError::Status {
                status: 500,
                message: format!("{} failed", method),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SiteApi for MockApi {
    async fn list_sites(&self) -> Result<Vec<Site>, ApiError> {
        self.record("list_sites", None)?;
        Ok(self.site.lock().unwrap().clone().into_iter().collect())
    }

    async fn get_site(&self, site: SiteId) -> Result<Site, ApiError> {
        self.record("get_site", None)?;
        self.site
            .lock()
            .unwrap()
            .clone()
            .ok_or(ApiError::Status {
                status: 404,
                message: format!("site {} not found", site),
            })
    }

    async fn create_site(&self, body: &FieldMap) -> Result<Site, ApiError> {
        self.record("create_site", Some(Value::Object(body.clone())))?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut site = body.clone();
        site.insert("id".into(), json!(id));
        Ok(serde_json::from_value(Value::Object(site)).unwrap())
    }

    async fn patch_site(&self, _site: SiteId, body: &FieldMap) -> Result<(), ApiError> {
        self.record("patch_site", Some(Value::Object(body.clone())))
    }

    async fn check_project_no(&self, project_no: &str) -> Result<ProjectNoCheck, ApiError> {
        self.record("check_project_no", Some(json!({ "project_no": project_no })))?;
        let is_duplicate = self.duplicates.lock().unwrap().contains(project_no);
        Ok(serde_json::from_value(json!({
            "is_duplicate": is_duplicate,
            "message": if is_duplicate { "이미 사용 중입니다." } else { "사용 가능합니다." },
            "existing_site": if is_duplicate { json!({"id": 1, "site_name": "Old Tower"}) } else { Value::Null },
        }))
        .unwrap())
    }

    async fn get_contacts(&self, _site: SiteId) -> Result<Option<FieldMap>, ApiError> {
        self.record("get_contacts", None)?;
        Ok(self.contacts.lock().unwrap().clone())
    }

    async fn save_contacts(&self, _site: SiteId, body: &FieldMap) -> Result<(), ApiError> {
        self.record("save_contacts", Some(Value::Object(body.clone())))
    }

    async fn get_products(&self, _site: SiteId) -> Result<Option<FieldMap>, ApiError> {
        self.record("get_products", None)?;
        Ok(self.products.lock().unwrap().clone())
    }

    async fn save_products(&self, _site: SiteId, body: &FieldMap) -> Result<(), ApiError> {
        self.record("save_products", Some(Value::Object(body.clone())))
    }

    async fn get_integrations(
        &self,
        _site: SiteId,
        kind: IntegrationKind,
    ) -> Result<Vec<IntegrationItem>, ApiError> {
        self.record("get_integrations", None)?;
        Ok(self
            .integrations
            .lock()
            .unwrap()
            .get(kind.path_segment())
            .cloned()
            .unwrap_or_default())
    }

    async fn save_integrations(
        &self,
        _site: SiteId,
        kind: IntegrationKind,
        items: &[IntegrationItem],
    ) -> Result<(), ApiError> {
        let method = match kind {
            IntegrationKind::Household => "save_household",
            IntegrationKind::Common => "save_common",
        };
        self.record(method, Some(json!({ "items": items })))
    }

    async fn list_work_items(
        &self,
        _site: SiteId,
        _status: WorkStatus,
    ) -> Result<Vec<WorkItem>, ApiError> {
        self.record("list_work_items", None)?;
        Ok(Vec::new())
    }

    async fn save_work_items(&self, _site: SiteId, items: &[WorkItem]) -> Result<(), ApiError> {
        self.record("save_work_items", Some(json!({ "items": items })))
    }

    async fn list_alarms(&self, _site: SiteId, _today: &str) -> Result<AlarmList, ApiError> {
        self.record("list_alarms", None)?;
        Ok(AlarmList::default())
    }

    async fn confirm_alarms(&self, _site: SiteId, ids: &[i64]) -> Result<(), ApiError> {
        self.record("confirm_alarms", Some(json!({ "ids": ids })))
    }

    async fn list_photos(
        &self,
        _site: SiteId,
        page: u32,
        _page_size: u32,
    ) -> Result<PhotoPage, ApiError> {
        self.record("list_photos", None)?;
        Ok(serde_json::from_value(json!({ "items": [], "page": page })).unwrap())
    }

    async fn delete_photo(&self, _site: SiteId, _photo: i64) -> Result<(), ApiError> {
        self.record("delete_photo", None)
    }
}

/// Every component of the console wired to in-memory collaborators.
pub struct Console {
    pub form: Arc<MemoryForm>,
    pub drafts: Arc<DraftStore>,
    pub bus: EventBus,
    pub api: Arc<MockApi>,
    pub notifier: Arc<RecordingNotifier>,
    pub controller: Arc<TabController>,
    pub overlays: Arc<OverlaySet>,
    pub final_save: FinalSaveOrchestrator,
    pub saver: TabSaver,
}

impl Console {
    pub fn new() -> Self {
        Self::with_form(MemoryForm::new())
    }

    pub fn with_form(form: MemoryForm) -> Self {
        let form = Arc::new(form);
        let binding: Arc<dyn FormBinding> = form.clone();
        let drafts = Arc::new(DraftStore::new(
            Box::new(MemoryStorage::new()),
            KeyResolver::new(binding.clone()),
        ));
        let bus = EventBus::new();
        let api = Arc::new(MockApi::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let controller = Arc::new(TabController::new(
            binding.clone(),
            drafts.clone(),
            bus.clone(),
        ));
        let overlays = Arc::new(OverlaySet::new(
            binding.clone(),
            drafts.clone(),
            api.clone(),
            notifier.clone(),
        ));
        let final_save = FinalSaveOrchestrator::new(
            binding.clone(),
            drafts.clone(),
            api.clone(),
            notifier.clone(),
            controller.clone(),
        );
        let saver = TabSaver::new(binding, api.clone(), notifier.clone());
        Self {
            form,
            drafts,
            bus,
            api,
            notifier,
            controller,
            overlays,
            final_save,
            saver,
        }
    }
}

/// Build a [`FieldMap`] from a JSON object literal.
pub fn fields(value: Value) -> FieldMap {
    value.as_object().cloned().unwrap_or_default()
}
