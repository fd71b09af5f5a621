//! The final save: every drafted tab of the current project, in one action.
//!
//! Stages run strictly in sequence. The site record must exist before any
//! per-tab call, since every per-tab endpoint is addressed by site id. A
//! failure at any stage stops the run and leaves the drafts untouched so a
//! retry resumes from the same data.

use crate::api::{ApiError, SiteApi, SiteId};
use crate::controller::TabController;
use crate::draft::{ContextKey, DraftStore};
use crate::fields::FieldMap;
use crate::form::FormBinding;
use crate::notify::Notifier;
use crate::persist::{
    basic_payload, combined_project_no, create_site, persist_tab, PersistError, SaveContext,
};
use crate::tab::{Tab, PROJECT_NO_FIELD};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStage {
    Idle,
    CapturingCurrentTab,
    EnsuringSiteRecord,
    SequentialTabPersist,
    Clearing,
    /// The last run failed. The next run starts over from capture.
    Failed,
}

impl fmt::Display for SaveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SaveStage::Idle => "idle",
            SaveStage::CapturingCurrentTab => "capturing current tab",
            SaveStage::EnsuringSiteRecord => "ensuring site record",
            SaveStage::SequentialTabPersist => "persisting tabs",
            SaveStage::Clearing => "clearing drafts",
            SaveStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Everything was persisted and the project's drafts were cleared.
    Saved { site: SiteId, tabs: Vec<Tab> },
    /// No drafts and no selected site. No network call was made.
    NothingToSave,
    /// The user declined the confirmation dialog.
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("{source} ({stage})")]
    Api {
        stage: SaveStage,
        #[source]
        source: ApiError,
    },
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("현장 생성 또는 선택에 실패했습니다.")]
    SiteNotResolved,
}

impl SaveError {
    /// Text for the error dialog.
    pub fn user_message(&self) -> String {
        match self {
            SaveError::Api { source, .. } => {
                format!("현장 저장 중 오류가 발생했습니다. {}", source.user_message())
            }
            SaveError::Persist(e) => e.user_message(),
            SaveError::SiteNotResolved => self.to_string(),
        }
    }
}

/// Runs the final save.
pub struct FinalSaveOrchestrator {
    form: Arc<dyn FormBinding>,
    drafts: Arc<DraftStore>,
    api: Arc<dyn SiteApi>,
    notifier: Arc<dyn Notifier>,
    controller: Arc<TabController>,
    stage: Mutex<SaveStage>,
}

impl FinalSaveOrchestrator {
    pub fn new(
        form: Arc<dyn FormBinding>,
        drafts: Arc<DraftStore>,
        api: Arc<dyn SiteApi>,
        notifier: Arc<dyn Notifier>,
        controller: Arc<TabController>,
    ) -> Self {
        Self {
            form,
            drafts,
            api,
            notifier,
            controller,
            stage: Mutex::new(SaveStage::Idle),
        }
    }

    pub fn stage(&self) -> SaveStage {
        *self.stage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter(&self, stage: SaveStage) {
        debug!("[final-save] {}", stage);
        *self.stage.lock().unwrap_or_else(PoisonError::into_inner) = stage;
    }

    pub async fn run(&self) -> Result<SaveOutcome, SaveError> {
        self.enter(SaveStage::CapturingCurrentTab);
        self.controller.capture_active();

        // The key is pinned here: creating the site changes what the
        // resolver returns, but the drafts to clear are the ones read now.
        let key = self.drafts.current_key();
        let drafts = self.drafts.get_all_in(&key);
        let selected = self.form.selected_site();

        if drafts.is_empty() && selected.is_none() {
            self.enter(SaveStage::Idle);
            self.notifier.info("안내", "저장할 데이터가 없습니다.");
            return Ok(SaveOutcome::NothingToSave);
        }

        let items: Vec<String> = drafts
            .keys()
            .map(|t| t.display_name().to_string())
            .collect();
        if !self.notifier.confirm("최종 저장", &items).await {
            self.enter(SaveStage::Idle);
            return Ok(SaveOutcome::Cancelled);
        }

        match self.persist_all(&key, &drafts, selected).await {
            Ok((site, tabs)) => {
                self.enter(SaveStage::Clearing);
                self.drafts.clear_context_of(&key);
                self.enter(SaveStage::Idle);
                info!(
                    "[final-save] Saved {} tab(s) of {} to site {}",
                    tabs.len(),
                    key,
                    site
                );
                self.notifier
                    .success("최종 저장 완료", "모든 데이터가 저장되었습니다.");
                Ok(SaveOutcome::Saved { site, tabs })
            }
            Err(e) => {
                error!("[final-save] Aborted during {}: {}", self.stage(), e);
                self.enter(SaveStage::Failed);
                self.notifier.error("오류", &e.user_message());
                Err(e)
            }
        }
    }

    async fn persist_all(
        &self,
        key: &ContextKey,
        drafts: &BTreeMap<Tab, FieldMap>,
        selected: Option<SiteId>,
    ) -> Result<(SiteId, Vec<Tab>), SaveError> {
        self.enter(SaveStage::EnsuringSiteRecord);
        let mut saved = Vec::new();
        let basic_draft = drafts.get(&Tab::Basic);
        let basic = basic_draft
            .cloned()
            .unwrap_or_else(|| self.form.read(Tab::Basic));
        let body = basic_payload(&basic);
        let mut project_no = combined_project_no(&basic).or_else(|| self.displayed_project_no());

        let site = match selected {
            Some(site) => {
                if basic_draft.is_some() {
                    self.api
                        .patch_site(site, &body)
                        .await
                        .map_err(|source| SaveError::Api {
                            stage: SaveStage::EnsuringSiteRecord,
                            source,
                        })?;
                    saved.push(Tab::Basic);
                }
                site
            }
            None => {
                let created = create_site(self.api.as_ref(), &body)
                    .await
                    .map_err(|source| SaveError::Api {
                        stage: SaveStage::EnsuringSiteRecord,
                        source,
                    })?;
                let id = created.id.ok_or(SaveError::SiteNotResolved)?;
                self.form.select_site(Some(id));
                if created.project_no.is_some() {
                    project_no = created.project_no;
                }
                saved.push(Tab::Basic);
                id
            }
        };
        if let Some(ref p) = project_no {
            self.form.broadcast_project_no(p);
        }
        debug!("[final-save] Site {} ready for {}", site, key);

        self.enter(SaveStage::SequentialTabPersist);
        let ctx = SaveContext {
            site,
            project_no,
            quiet: true,
        };
        for tab in Tab::PERSIST_ORDER {
            let Some(data) = drafts.get(&tab) else {
                continue;
            };
            persist_tab(
                self.api.as_ref(),
                &ctx,
                tab,
                data,
                self.notifier.as_ref(),
            )
            .await?;
            saved.push(tab);
        }
        Ok((site, saved))
    }

    /// Project number shown on the other tabs, when basic has none.
    fn displayed_project_no(&self) -> Option<String> {
        Tab::PERSIST_ORDER.iter().find_map(|tab| {
            self.form
                .value(*tab, PROJECT_NO_FIELD)
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
        })
    }
}
