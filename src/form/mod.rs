//! The boundary between the draft engine and whatever renders the form.
//!
//! The engine never touches UI elements directly. It reads and writes field
//! values by `(tab, field id)` through [`FormBinding`], which makes every
//! algorithm here testable against [`MemoryForm`].

mod memory;

pub use memory::MemoryForm;

use crate::api::SiteId;
use crate::fields::{is_blank, value_to_field, FieldMap};
use crate::tab::{Tab, PROJECT_NO_FIELD};
use serde_json::Value;

/// Read/write access to the visible form fields.
///
/// Methods take `&self`; implementations provide their own interior
/// mutability so a binding can be shared between the controller, loaders and
/// the final-save orchestrator.
pub trait FormBinding: Send + Sync {
    /// Current value of a field, or `None` if the field is not rendered.
    fn value(&self, tab: Tab, field: &str) -> Option<String>;

    /// Overwrite a field. Returns `false` (and does nothing) if the field is not rendered.
    fn set_value(&self, tab: Tab, field: &str, value: &str) -> bool;

    /// Site currently chosen in the site selector.
    fn selected_site(&self) -> Option<SiteId>;

    /// Change the site selector.
    fn select_site(&self, site: Option<SiteId>);

    /// Show or hide a tab panel and its button.
    fn set_panel_visible(&self, tab: Tab, visible: bool);

    /// Capture every non-blank drafted field of a tab.
    fn read(&self, tab: Tab) -> FieldMap {
        tab.draft_fields()
            .filter_map(|field| {
                let value = self.value(tab, field)?;
                if value.trim().is_empty() {
                    None
                } else {
                    Some((field.to_string(), Value::String(value)))
                }
            })
            .collect()
    }

    /// Write every entry of `data`, overwriting what is displayed.
    ///
    /// Null values clear the field. Returns the number of fields written.
    fn write(&self, tab: Tab, data: &FieldMap) -> usize {
        data.iter()
            .filter(|(field, value)| {
                let text = value_to_field(value).unwrap_or_default();
                self.set_value(tab, field, &text)
            })
            .count()
    }

    /// Whether a rendered field holds nothing. Unrendered fields are never empty.
    fn is_field_empty(&self, tab: Tab, field: &str) -> bool {
        self.value(tab, field)
            .map(|v| v.trim().is_empty())
            .unwrap_or(false)
    }

    /// Write entries of `data` only into fields that are currently empty.
    ///
    /// Returns the number of fields filled.
    fn fill_empty(&self, tab: Tab, data: &FieldMap) -> usize {
        data.iter()
            .filter(|(field, value)| {
                if is_blank(value) || !self.is_field_empty(tab, field) {
                    return false;
                }
                match value_to_field(value) {
                    Some(text) => self.set_value(tab, field, &text),
                    None => false,
                }
            })
            .count()
    }

    /// Show a project number on every tab that carries a project-number display.
    fn broadcast_project_no(&self, project_no: &str) {
        for tab in Tab::ALL.iter().filter(|t| t.has_project_no_display()) {
            self.set_value(*tab, PROJECT_NO_FIELD, project_no);
        }
    }
}
