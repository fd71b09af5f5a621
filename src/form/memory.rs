use super::FormBinding;
use crate::api::SiteId;
use crate::tab::Tab;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct FormState {
    values: HashMap<(Tab, String), String>,
    selected_site: Option<SiteId>,
    visible: HashSet<Tab>,
}

/// An in-process form holding every bound field of every tab.
///
/// All fields start rendered and empty. Use [`MemoryForm::without_field`] to
/// model a page where an element is missing.
#[derive(Debug)]
pub struct MemoryForm {
    state: Mutex<FormState>,
}

impl MemoryForm {
    pub fn new() -> Self {
        let mut state = FormState::default();
        for tab in Tab::ALL {
            for field in tab.fields() {
                state.values.insert((tab, field.to_string()), String::new());
            }
        }
        Self {
            state: Mutex::new(state),
        }
    }

    /// Remove a field from the rendered page.
    pub fn without_field(self, tab: Tab, field: &str) -> Self {
        self.lock().values.remove(&(tab, field.to_string()));
        self
    }

    /// Tabs whose panel is currently shown.
    pub fn visible_panels(&self) -> Vec<Tab> {
        let mut tabs: Vec<Tab> = self.lock().visible.iter().copied().collect();
        tabs.sort();
        tabs
    }

    fn lock(&self) -> MutexGuard<'_, FormState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryForm {
    fn default() -> Self {
        Self::new()
    }
}

impl FormBinding for MemoryForm {
    fn value(&self, tab: Tab, field: &str) -> Option<String> {
        self.lock().values.get(&(tab, field.to_string())).cloned()
    }

    fn set_value(&self, tab: Tab, field: &str, value: &str) -> bool {
        match self.lock().values.get_mut(&(tab, field.to_string())) {
            Some(slot) => {
                *slot = value.to_string();
                true
            }
            None => false,
        }
    }

    fn selected_site(&self) -> Option<SiteId> {
        self.lock().selected_site
    }

    fn select_site(&self, site: Option<SiteId>) {
        self.lock().selected_site = site;
    }

    fn set_panel_visible(&self, tab: Tab, visible: bool) {
        let mut state = self.lock();
        if visible {
            state.visible.insert(tab);
        } else {
            state.visible.remove(&tab);
        }
    }
}
