//! Persisted shape of the draft store.
//!
//! ```json
//! { "NA/1234": { "basic": { "data": { "site_name": "Tower A" }, "timestamp": "2024-08-12T09:00:00Z" } } }
//! ```

use super::key::ContextKey;
use crate::fields::{strip_blank, FieldMap};
use crate::tab::Tab;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One tab's captured values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftEntry {
    pub data: FieldMap,
    pub timestamp: DateTime<Utc>,
}

impl DraftEntry {
    pub fn now(data: FieldMap) -> Self {
        Self {
            data,
            timestamp: Utc::now(),
        }
    }
}

/// Tab name to draft, for one context.
pub type DraftBucket = BTreeMap<String, DraftEntry>;

/// Why a stored blob was not usable.
#[derive(Debug, thiserror::Error)]
pub enum DocumentIssue {
    /// Flat `{ tab: {...} }` layout written before drafts were keyed by project.
    #[error("legacy flat layout (top-level key {0:?})")]
    Legacy(String),
    #[error("malformed draft document: {0}")]
    Malformed(String),
}

/// Context key to bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DraftDocument {
    contexts: BTreeMap<String, DraftBucket>,
}

impl DraftDocument {
    /// Parse a stored blob, rejecting legacy and malformed layouts.
    pub fn from_json(raw: &str) -> Result<Self, DocumentIssue> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| DocumentIssue::Malformed(e.to_string()))?;

        let object = value
            .as_object()
            .ok_or_else(|| DocumentIssue::Malformed("top level is not an object".to_string()))?;

        // Context keys are project numbers or the sentinel, never tab names.
        if let Some(key) = object.keys().find(|k| k.parse::<Tab>().is_ok()) {
            return Err(DocumentIssue::Legacy(key.clone()));
        }

        let mut doc: DraftDocument =
            serde_json::from_value(value).map_err(|e| DocumentIssue::Malformed(e.to_string()))?;

        for bucket in doc.contexts.values_mut() {
            for entry in bucket.values_mut() {
                entry.data = strip_blank(std::mem::take(&mut entry.data));
            }
        }
        Ok(doc)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn bucket(&self, key: &ContextKey) -> Option<&DraftBucket> {
        self.contexts.get(key.as_str())
    }

    pub fn entry(&self, key: &ContextKey, tab: Tab) -> Option<&DraftEntry> {
        self.bucket(key)?.get(tab.as_str())
    }

    /// Replace one tab's draft, creating the bucket if needed.
    pub fn insert(&mut self, key: &ContextKey, tab: Tab, entry: DraftEntry) {
        self.contexts
            .entry(key.as_str().to_string())
            .or_default()
            .insert(tab.as_str().to_string(), entry);
    }

    /// Remove one tab's draft. An emptied bucket is dropped.
    pub fn remove_tab(&mut self, key: &ContextKey, tab: Tab) -> bool {
        let Some(bucket) = self.contexts.get_mut(key.as_str()) else {
            return false;
        };
        let removed = bucket.remove(tab.as_str()).is_some();
        if bucket.is_empty() {
            self.contexts.remove(key.as_str());
        }
        removed
    }

    pub fn remove_context(&mut self, key: &ContextKey) -> bool {
        self.contexts.remove(key.as_str()).is_some()
    }

    pub fn context_keys(&self) -> Vec<ContextKey> {
        self.contexts.keys().map(|k| ContextKey::new(k.as_str())).collect()
    }
}
