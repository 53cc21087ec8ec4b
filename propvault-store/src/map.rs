//! Ordered, scoped property maps.

use propvault_crypto::EncryptionAlgorithm;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity a property map belongs to: an owner (tenant, container, user...)
/// plus a category name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PropertyScope {
    pub owner: String,
    pub category: String,
}

impl PropertyScope {
    pub fn new(owner: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            category: category.into(),
        }
    }
}

impl fmt::Display for PropertyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.category)
    }
}

/// Ordered `name -> value` map for one scope.
///
/// Entries keep insertion order; replacing a value keeps its position. Every
/// value in the map is stored under the same [`EncryptionAlgorithm`].
/// `Debug` output lists names only, never values.
#[derive(Clone)]
pub struct PropertyMap {
    scope: PropertyScope,
    set_id: Option<i64>,
    encryption: EncryptionAlgorithm,
    entries: Vec<(String, Option<String>)>,
    removed: Vec<String>,
    modified: bool,
}

impl PropertyMap {
    /// Creates an empty, never-saved map.
    pub fn new(scope: PropertyScope, encryption: EncryptionAlgorithm) -> Self {
        Self {
            scope,
            set_id: None,
            encryption,
            entries: Vec::new(),
            removed: Vec::new(),
            modified: false,
        }
    }

    /// Creates an empty map bound to a persisted set, ready to be populated.
    pub(crate) fn persisted(
        scope: PropertyScope,
        set_id: i64,
        encryption: EncryptionAlgorithm,
    ) -> Self {
        Self {
            set_id: Some(set_id),
            ..Self::new(scope, encryption)
        }
    }

    pub fn scope(&self) -> &PropertyScope {
        &self.scope
    }

    /// Row-set id in the backing table, `None` until first save.
    pub fn set_id(&self) -> Option<i64> {
        self.set_id
    }

    pub fn encryption(&self) -> EncryptionAlgorithm {
        self.encryption
    }

    /// Whether the map changed since it was loaded or last saved.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name)
            .and_then(|idx| self.entries[idx].1.as_deref())
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Inserts or replaces a value, returning the previous one.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: Option<String>,
    ) -> Option<Option<String>> {
        let name = name.into();
        self.modified = true;
        self.removed.retain(|removed| removed != &name);
        match self.position(&name) {
            Some(idx) => Some(std::mem::replace(&mut self.entries[idx].1, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    /// Removes a value, returning it if present.
    pub fn remove(&mut self, name: &str) -> Option<Option<String>> {
        let idx = self.position(name)?;
        let (name, value) = self.entries.remove(idx);
        self.modified = true;
        if self.set_id.is_some() {
            self.removed.push(name);
        }
        Some(value)
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        let names: Vec<String> = self.entries.iter().map(|(name, _)| name.clone()).collect();
        for name in names {
            self.remove(&name);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Names removed since the map was loaded, pending deletion on save.
    pub(crate) fn removed(&self) -> &[String] {
        &self.removed
    }

    /// Appends a row read from storage without marking the map modified.
    pub(crate) fn load_entry(&mut self, name: String, value: Option<String>) {
        match self.position(&name) {
            Some(idx) => self.entries[idx].1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub(crate) fn mark_saved(&mut self, set_id: i64) {
        self.set_id = Some(set_id);
        self.removed.clear();
        self.modified = false;
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n == name)
    }
}

impl fmt::Debug for PropertyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyMap")
            .field("scope", &self.scope)
            .field("set_id", &self.set_id)
            .field("encryption", &self.encryption)
            .field("names", &self.names().collect::<Vec<_>>())
            .field("modified", &self.modified)
            .finish()
    }
}
