//! Which project's draft bucket the user is currently editing.

use crate::form::FormBinding;
use crate::tab::{Tab, PROJECT_NO_FIELD, PROJECT_NO_NUMBER_FIELD, PROJECT_NO_PREFIX_FIELD};
use std::fmt;
use std::sync::Arc;

/// Partition key for drafts: a project number, or the draft sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextKey(String);

impl ContextKey {
    /// Sentinel for sites that have no project number yet.
    pub const DRAFT_SENTINEL: &'static str = "_draft";

    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn draft() -> Self {
        Self(Self::DRAFT_SENTINEL.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_draft(&self) -> bool {
        self.0 == Self::DRAFT_SENTINEL
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContextKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// Derives the context key from the visible form.
///
/// Never cached: the project-number fields can change between two reads.
#[derive(Clone)]
pub struct KeyResolver {
    form: Arc<dyn FormBinding>,
}

impl KeyResolver {
    pub fn new(form: Arc<dyn FormBinding>) -> Self {
        Self { form }
    }

    pub fn resolve(&self) -> ContextKey {
        resolve_from(self.form.as_ref())
    }
}

/// First match wins:
/// 1. basic-tab prefix + digits, if at least 3 characters long;
/// 2. the first non-empty project-number display on the other tabs;
/// 3. the draft sentinel.
pub fn resolve_from(form: &dyn FormBinding) -> ContextKey {
    let prefix = form
        .value(Tab::Basic, PROJECT_NO_PREFIX_FIELD)
        .unwrap_or_default();
    let number = form
        .value(Tab::Basic, PROJECT_NO_NUMBER_FIELD)
        .unwrap_or_default();
    let combined = format!("{}{}", prefix.trim(), number.trim());
    if combined.chars().count() >= 3 {
        return ContextKey(combined);
    }

    Tab::ALL
        .iter()
        .filter(|t| t.has_project_no_display())
        .filter_map(|t| form.value(*t, PROJECT_NO_FIELD))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
        .map(ContextKey)
        .unwrap_or_else(ContextKey::draft)
}
