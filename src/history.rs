use crate::error::HistoryError;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default cap on stored history entries
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: String,
    pub query: String,
    #[serde(default)]
    pub starred: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub operation_name: Option<String>, // e.g. "GetUsers", shown next to the query
}

impl HistoryItem {
    pub fn new(id: impl Into<String>, query: impl Into<String>, starred: bool) -> Self {
        Self {
            id: id.into(),
            query: query.into(),
            starred,
            created_at: Utc::now(),
            operation_name: None,
        }
    }

    /// Derive a short stable id from the query text, creation time and a salt
    pub fn derive_id(query: &str, created_at: &DateTime<Utc>, salt: u64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(query.as_bytes());
        hasher.update(created_at.to_rfc3339().as_bytes());
        hasher.update(salt.to_le_bytes());
        let digest = format!("{:x}", hasher.finalize());
        digest[..16].to_string()
    }

    /// First line of the query, used as the list label
    pub fn title(&self) -> &str {
        self.query
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("")
    }
}

/// Ordered id -> item mapping. Iteration follows insertion order and ids are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<HistoryItem>", into = "Vec<HistoryItem>")]
pub struct HistoryCollection {
    items: Vec<HistoryItem>,
    index: HashMap<String, usize>,
}

impl HistoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from items in order. A repeated id replaces the
    /// earlier value but keeps the earlier position.
    pub fn from_items(items: impl IntoIterator<Item = HistoryItem>) -> Self {
        let mut collection = Self::new();
        for item in items {
            collection.insert(item);
        }
        collection
    }

    /// Append an item, or replace in place when the id already exists
    pub fn insert(&mut self, item: HistoryItem) {
        match self.index.get(&item.id) {
            Some(&pos) => self.items[pos] = item,
            None => {
                self.index.insert(item.id.clone(), self.items.len());
                self.items.push(item);
            }
        }
    }

    /// Put an item at the front; an existing item with the same id is moved there
    pub fn prepend(&mut self, item: HistoryItem) {
        self.items.retain(|existing| existing.id != item.id);
        self.items.insert(0, item);
        self.reindex();
    }

    /// Keep only the first `len` items
    pub fn truncate(&mut self, len: usize) {
        if self.items.len() > len {
            self.items.truncate(len);
            self.reindex();
        }
    }

    pub fn get(&self, id: &str) -> Option<&HistoryItem> {
        self.index.get(id).map(|&pos| &self.items[pos])
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut HistoryItem> {
        match self.index.get(id) {
            Some(&pos) => self.items.get_mut(pos),
            None => None,
        }
    }

    pub fn first_id(&self) -> Option<&str> {
        self.items.first().map(|item| item.id.as_str())
    }

    pub fn first(&self) -> Option<&HistoryItem> {
        self.items.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HistoryItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn reindex(&mut self) {
        self.index = self
            .items
            .iter()
            .enumerate()
            .map(|(pos, item)| (item.id.clone(), pos))
            .collect();
    }
}

impl From<Vec<HistoryItem>> for HistoryCollection {
    fn from(items: Vec<HistoryItem>) -> Self {
        Self::from_items(items)
    }
}

impl From<HistoryCollection> for Vec<HistoryItem> {
    fn from(collection: HistoryCollection) -> Self {
        collection.items
    }
}

impl<'a> IntoIterator for &'a HistoryCollection {
    type Item = &'a HistoryItem;
    type IntoIter = std::slice::Iter<'a, HistoryItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Canonical history owned by the host. Newest queries come first.
pub struct HistoryStore {
    items: HistoryCollection,
    history_file: Option<PathBuf>,
    max_entries: usize,
    sequence: u64,
}

impl HistoryStore {
    pub fn in_memory(max_entries: usize) -> Self {
        Self {
            items: HistoryCollection::new(),
            history_file: None,
            max_entries,
            sequence: 0,
        }
    }

    /// Seed an in-memory store with an existing collection
    pub fn with_items(items: HistoryCollection, max_entries: usize) -> Self {
        let mut store = Self::in_memory(max_entries);
        store.items = items;
        store.items.truncate(max_entries);
        store
    }

    /// Open a file backed store. A missing or blank file gives an empty history.
    pub fn load(path: impl AsRef<Path>, max_entries: usize) -> Result<Self> {
        let path = path.as_ref();
        let mut store = Self::in_memory(max_entries);
        store.history_file = Some(path.to_path_buf());

        if path.exists() {
            let content = fs::read_to_string(path)?;
            if !content.trim().is_empty() {
                let items: HistoryCollection = serde_json::from_str(&content)?;
                store.items = items;
                store.items.truncate(max_entries);
            }
        }

        info!(
            "Loaded {} history items from {}",
            store.items.len(),
            path.display()
        );
        Ok(store)
    }

    /// Record an executed query. Blank queries and repeats of the newest one are skipped.
    pub fn add_query(
        &mut self,
        query: String,
        operation_name: Option<String>,
    ) -> Result<Option<String>> {
        if query.trim().is_empty() {
            return Ok(None);
        }

        if let Some(newest) = self.items.first() {
            if newest.query == query {
                debug!("Skipping repeated query {}", newest.id);
                return Ok(None);
            }
        }

        let created_at = Utc::now();
        self.sequence += 1;
        let id = HistoryItem::derive_id(&query, &created_at, self.sequence);
        let item = HistoryItem {
            id: id.clone(),
            query,
            starred: false,
            created_at,
            operation_name,
        };

        let mut next = self.items.clone();
        next.prepend(item);
        next.truncate(self.max_entries);
        self.commit(next)?;
        Ok(Some(id))
    }

    /// Flip the starred flag of an item and persist the new snapshot.
    /// On a failed write the previous snapshot stays in place.
    pub fn toggle_starring(&mut self, id: &str) -> Result<bool> {
        let mut next = self.items.clone();
        let starred = {
            let item = next
                .get_mut(id)
                .ok_or_else(|| HistoryError::UnknownItem(id.to_string()))?;
            item.starred = !item.starred;
            item.starred
        };
        self.commit(next)?;
        Ok(starred)
    }

    pub fn items(&self) -> &HistoryCollection {
        &self.items
    }

    /// Persist `next` and only then make it the current snapshot
    fn commit(&mut self, next: HistoryCollection) -> Result<()> {
        self.write_items(&next)?;
        self.items = next;
        Ok(())
    }

    fn write_items(&self, items: &HistoryCollection) -> Result<()> {
        let Some(path) = &self.history_file else {
            return Ok(());
        };

        let content = serde_json::to_string_pretty(items)?;
        let written = match path.parent() {
            Some(parent) => fs::create_dir_all(parent).and_then(|_| fs::write(path, content)),
            None => fs::write(path, content),
        };
        if let Err(e) = written {
            warn!("Failed to write history to {}: {}", path.display(), e);
            return Err(e.into());
        }
        Ok(())
    }
}
