//! The per-project draft store.

use super::document::{DocumentIssue, DraftDocument, DraftEntry};
use super::key::{ContextKey, KeyResolver};
use super::storage::LocalStorage;
use crate::fields::{strip_blank, FieldMap};
use crate::tab::Tab;
use std::collections::BTreeMap;
use tracing::{debug, error, warn};

/// Storage key the whole draft document lives under.
pub const DEFAULT_STORAGE_KEY: &str = "hn_temp_site_data";

/// Keyed two-level draft mapping: context key, then tab, then `{data, timestamp}`.
///
/// Every operation without an explicit key resolves the current context key
/// first. All operations are best-effort: storage failures are logged and the
/// form stays the source of truth for the session.
pub struct DraftStore {
    storage: Box<dyn LocalStorage>,
    resolver: KeyResolver,
    storage_key: String,
}

impl DraftStore {
    pub fn new(storage: Box<dyn LocalStorage>, resolver: KeyResolver) -> Self {
        Self::with_storage_key(storage, resolver, DEFAULT_STORAGE_KEY)
    }

    pub fn with_storage_key(
        storage: Box<dyn LocalStorage>,
        resolver: KeyResolver,
        storage_key: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            resolver,
            storage_key: storage_key.into(),
        }
    }

    /// Context key the next operation would use.
    pub fn current_key(&self) -> ContextKey {
        self.resolver.resolve()
    }

    // --- Current context ---

    /// Store a tab's draft under the current key, replacing any previous one.
    ///
    /// Returns whether the draft was persisted.
    pub fn save(&self, tab: Tab, data: FieldMap) -> bool {
        self.save_in(&self.current_key(), tab, data)
    }

    pub fn load(&self, tab: Tab) -> Option<FieldMap> {
        self.load_in(&self.current_key(), tab)
    }

    /// Every tab's data for the current key, without timestamps.
    pub fn get_all(&self) -> BTreeMap<Tab, FieldMap> {
        self.get_all_in(&self.current_key())
    }

    pub fn clear_tab(&self, tab: Tab) {
        self.clear_tab_of(&self.current_key(), tab);
    }

    /// Drop the current key's bucket. Other projects' drafts are untouched.
    pub fn clear_context(&self) {
        self.clear_context_of(&self.current_key());
    }

    pub fn has_draft(&self, tab: Tab) -> bool {
        self.load(tab).is_some()
    }

    /// Whether the current key has any draft at all.
    pub fn has_any(&self) -> bool {
        !self.get_all().is_empty()
    }

    // --- Explicit context ---

    /// A draft whose values are all blank is not stored; any earlier draft stays.
    pub fn save_in(&self, key: &ContextKey, tab: Tab, data: FieldMap) -> bool {
        let data = strip_blank(data);
        if data.is_empty() {
            debug!("Skipped empty {} draft in {}", tab, key);
            return false;
        }
        let saved = self.modify(
            |doc| {
                doc.insert(key, tab, DraftEntry::now(data.clone()));
                true
            },
            || format!("save {} draft in {}", tab, key),
        );
        if saved {
            debug!("Saved {} draft in {}", tab, key);
        }
        saved
    }

    pub fn load_in(&self, key: &ContextKey, tab: Tab) -> Option<FieldMap> {
        let doc = self.read_document();
        let data = doc.entry(key, tab).map(|e| e.data.clone());
        if data.is_some() {
            debug!("Loaded {} draft from {}", tab, key);
        }
        data
    }

    pub fn get_all_in(&self, key: &ContextKey) -> BTreeMap<Tab, FieldMap> {
        self.entries_in(key)
            .into_iter()
            .map(|(tab, entry)| (tab, entry.data))
            .collect()
    }

    /// Every tab's entry for `key`, with timestamps. Unknown tab names are skipped.
    pub fn entries_in(&self, key: &ContextKey) -> BTreeMap<Tab, DraftEntry> {
        let doc = self.read_document();
        let Some(bucket) = doc.bucket(key) else {
            return BTreeMap::new();
        };
        bucket
            .iter()
            .filter_map(|(name, entry)| match name.parse::<Tab>() {
                Ok(tab) => Some((tab, entry.clone())),
                Err(e) => {
                    debug!("Skipping draft entry in {}: {}", key, e);
                    None
                }
            })
            .collect()
    }

    pub fn clear_tab_of(&self, key: &ContextKey, tab: Tab) {
        self.modify(
            |doc| doc.remove_tab(key, tab),
            || format!("clear {} draft in {}", tab, key),
        );
    }

    pub fn clear_context_of(&self, key: &ContextKey) {
        self.modify(
            |doc| doc.remove_context(key),
            || format!("clear drafts of {}", key),
        );
    }

    // --- Whole store ---

    /// Every context that currently holds drafts.
    pub fn contexts(&self) -> Vec<ContextKey> {
        self.read_document().context_keys()
    }

    /// Wipe every context.
    pub fn clear_all(&self) {
        if let Err(e) = self.storage.remove_item(&self.storage_key) {
            error!("Failed to clear all drafts: {}", e);
        }
    }

    /// Load the persisted document, degrading to empty on any problem.
    fn read_document(&self) -> DraftDocument {
        match self.storage.get_item(&self.storage_key) {
            Ok(raw) => parse_document(raw),
            Err(e) => {
                warn!("Failed to read drafts: {}", e);
                DraftDocument::default()
            }
        }
    }

    /// Apply `change` to the stored document under the storage's write lock.
    ///
    /// `change` returns whether it altered the document; an unaltered
    /// document is not written back.
    fn modify(
        &self,
        mut change: impl FnMut(&mut DraftDocument) -> bool,
        what: impl FnOnce() -> String,
    ) -> bool {
        let result = self.storage.update(&self.storage_key, &mut |raw| {
            let mut doc = parse_document(raw);
            if !change(&mut doc) {
                return Ok(None);
            }
            Ok(Some(doc.to_json()?))
        });
        match result {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to {}: {}", what(), e);
                false
            }
        }
    }
}

fn parse_document(raw: Option<String>) -> DraftDocument {
    let Some(raw) = raw else {
        return DraftDocument::default();
    };
    match DraftDocument::from_json(&raw) {
        Ok(doc) => doc,
        Err(DocumentIssue::Legacy(key)) => {
            warn!(
                "Ignoring drafts in legacy flat layout (found top-level {:?}); they will be replaced on next save",
                key
            );
            DraftDocument::default()
        }
        Err(e) => {
            warn!("Ignoring unreadable drafts: {}", e);
            DraftDocument::default()
        }
    }
}
