//! The tab state machine.
//!
//! Exactly one tab is active at a time. Panel visibility is derived from the
//! active tab, never read back from the form.

use crate::draft::DraftStore;
use crate::events::{EventBus, LifecycleEvent};
use crate::form::FormBinding;
use crate::tab::Tab;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

pub struct TabController {
    form: Arc<dyn FormBinding>,
    drafts: Arc<DraftStore>,
    bus: EventBus,
    active: Mutex<Option<Tab>>,
}

impl TabController {
    pub fn new(form: Arc<dyn FormBinding>, drafts: Arc<DraftStore>, bus: EventBus) -> Self {
        Self {
            form,
            drafts,
            bus,
            active: Mutex::new(None),
        }
    }

    /// Activate the initial tab.
    pub fn start(&self) -> usize {
        self.activate(Tab::Basic)
    }

    pub fn active(&self) -> Option<Tab> {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Switch to `tab`. Returns the number of fields restored from its draft.
    ///
    /// The departing tab is captured first, then visibility changes, then
    /// `TabActivated` is published, and only then is the draft applied to
    /// fields that are still empty.
    pub fn activate(&self, tab: Tab) -> usize {
        let previous = {
            let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
            active.replace(tab)
        };
        if let Some(previous) = previous {
            self.capture(previous);
        }

        for other in Tab::ALL {
            self.form.set_panel_visible(other, other == tab);
        }

        self.bus.publish(LifecycleEvent::TabActivated(tab));

        let restored = match self.drafts.load(tab) {
            Some(draft) => self.form.fill_empty(tab, &draft),
            None => 0,
        };
        debug!(
            "[tabs] Activated {} (from {:?}), restored {} field(s)",
            tab, previous, restored
        );
        restored
    }

    /// Store a tab's non-empty field values as its draft.
    ///
    /// A tab with nothing filled in keeps its previous draft.
    pub fn capture(&self, tab: Tab) -> bool {
        let data = self.form.read(tab);
        if data.is_empty() {
            debug!("[tabs] Nothing to capture on {}", tab);
            return false;
        }
        self.drafts.save(tab, data)
    }

    /// Capture whatever tab is active, if any.
    pub fn capture_active(&self) -> bool {
        match self.active() {
            Some(tab) => self.capture(tab),
            None => false,
        }
    }
}
