//! Generic CRUD over repeated record elements.
//!
//! Every declared setting node is scanned for child elements that look like
//! records (they hold child elements or attributes). Records are grouped by
//! tag into collections addressed as `(module, tag)`, where `module` is the
//! context name. Entries are materialized from the live tree on demand and
//! mutations are applied to the tree directly, so a later save persists them.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;
use xml_config_core::XmlNode;

use crate::error::{ConfigError, Result};
use crate::store::ConfigStore;

/// Value of one entry field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(Option<String>),
    Nested(GenericEntry),
}

/// One record element as tag, attributes, own text and ordered fields.
///
/// Repeated child tags (`<member>` in a group) stay separate fields with
/// the same name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenericEntry {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub text: Option<String>,
    pub fields: Vec<(String, FieldValue)>,
}

impl GenericEntry {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            text: None,
            fields: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_text(mut self, name: &str, value: &str) -> Self {
        self.fields.push((
            name.to_string(),
            FieldValue::Text(Some(value.to_string()).filter(|v| !v.is_empty())),
        ));
        self
    }

    pub fn with_nested(mut self, entry: GenericEntry) -> Self {
        self.fields
            .push((entry.tag.clone(), FieldValue::Nested(entry)));
        self
    }

    pub fn from_element(node: &XmlNode) -> Self {
        let fields = node
            .children
            .iter()
            .map(|child| {
                let value = if child.is_leaf() && child.attributes.is_empty() {
                    FieldValue::Text(child.text.clone())
                } else {
                    FieldValue::Nested(GenericEntry::from_element(child))
                };
                (child.tag.clone(), value)
            })
            .collect();

        Self {
            tag: node.tag.clone(),
            attributes: node.attributes.clone(),
            text: node.text.clone(),
            fields,
        }
    }

    pub fn to_element(&self) -> XmlNode {
        let mut node = XmlNode::new(&self.tag);
        node.attributes = self.attributes.clone();
        node.set_text(self.text.as_deref());
        for (name, value) in &self.fields {
            let child = match value {
                FieldValue::Text(text) => XmlNode::leaf(name, text.as_deref()),
                FieldValue::Nested(entry) => {
                    let mut child = entry.to_element();
                    child.tag = name.clone();
                    child
                }
            };
            node.children.push(child);
        }
        node
    }

    /// First field named `name`.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Text of the first leaf field named `name`; absent and nested fields give `None`.
    pub fn text_field(&self, name: &str) -> Option<&str> {
        match self.field(name)? {
            FieldValue::Text(text) => text.as_deref(),
            FieldValue::Nested(_) => None,
        }
    }

    /// True when every criterion names a leaf field with exactly that text.
    pub fn matches(&self, criteria: &[(&str, &str)]) -> bool {
        criteria
            .iter()
            .all(|(name, value)| self.text_field(name) == Some(*value))
    }

    /// Overwrite attributes, text and every field named in `other`.
    ///
    /// All existing fields sharing a name are replaced by the incoming group
    /// at the position of the first one; new names are appended.
    pub fn merge_from(&mut self, other: &GenericEntry) {
        self.attributes
            .extend(other.attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
        if other.text.is_some() {
            self.text = other.text.clone();
        }

        let mut names: Vec<&str> = Vec::new();
        for (name, _) in &other.fields {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }

        for name in names {
            let incoming = other
                .fields
                .iter()
                .filter(|(field, _)| field == name)
                .cloned();
            match self.fields.iter().position(|(field, _)| field == name) {
                Some(at) => {
                    self.fields.retain(|(field, _)| field != name);
                    let tail = self.fields.split_off(at);
                    self.fields.extend(incoming);
                    self.fields.extend(tail);
                }
                None => self.fields.extend(incoming),
            }
        }
    }
}

/// Outcome of [`ModelRegistry::create_or_update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Created,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Collection {
    module: String,
    tag: String,
    container: String,
}

/// Repeated-record collections discovered over a store's contexts.
#[derive(Debug)]
pub struct ModelRegistry {
    store: ConfigStore,
    collections: Vec<Collection>,
}

impl ModelRegistry {
    pub fn new(store: ConfigStore) -> Self {
        let collections = discover(&store);
        Self { store, collections }
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn into_store(self) -> ConfigStore {
        self.store
    }

    /// `(module, tag, container path)` for every collection, in discovery order.
    pub fn collections(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.collections
            .iter()
            .map(|c| (c.module.as_str(), c.tag.as_str(), c.container.as_str()))
    }

    fn lookup(&self, module: &str, tag: &str) -> Result<&Collection> {
        self.collections
            .iter()
            .find(|c| c.module == module && c.tag == tag)
            .ok_or_else(|| ConfigError::RegistryLookup {
                module: module.to_string(),
                tag: tag.to_string(),
            })
    }

    /// Materialized entries of one collection.
    pub fn entries(&self, module: &str, tag: &str) -> Result<Vec<GenericEntry>> {
        let collection = self.lookup(module, tag)?;
        Ok(self
            .store
            .tree()
            .find_path(&collection.container)
            .map(|container| {
                container
                    .get_children(tag)
                    .into_iter()
                    .map(GenericEntry::from_element)
                    .collect()
            })
            .unwrap_or_default())
    }

    /// First entry across all collections whose fields equal `criteria`.
    pub fn find(&self, criteria: &[(&str, &str)]) -> Option<GenericEntry> {
        self.collections.iter().find_map(|collection| {
            let container = self.store.tree().find_path(&collection.container)?;
            container
                .get_children(&collection.tag)
                .into_iter()
                .map(GenericEntry::from_element)
                .find(|entry| entry.matches(criteria))
        })
    }

    /// Merge into the first entry with the same `uniqueness` field, or append.
    pub fn create_or_update(
        &mut self,
        module: &str,
        entry: &GenericEntry,
        uniqueness: &str,
    ) -> Result<Upsert> {
        let container_path = self.lookup(module, &entry.tag)?.container.clone();
        let key = entry.text_field(uniqueness);
        let container = self.container_mut(module, &entry.tag, &container_path)?;

        let existing = key.and_then(|key| {
            container.children.iter_mut().find(|child| {
                child.tag == entry.tag
                    && GenericEntry::from_element(child).text_field(uniqueness) == Some(key)
            })
        });

        match existing {
            Some(child) => {
                let mut merged = GenericEntry::from_element(child);
                merged.merge_from(entry);
                *child = merged.to_element();
                debug!(module, tag = %entry.tag, uniqueness, "updated entry");
                Ok(Upsert::Updated)
            }
            None => {
                container.children.push(entry.to_element());
                debug!(module, tag = %entry.tag, "created entry");
                Ok(Upsert::Created)
            }
        }
    }

    /// Remove the first entry structurally equal to `entry`.
    pub fn delete(&mut self, module: &str, tag: &str, entry: &GenericEntry) -> Result<bool> {
        let container_path = self.lookup(module, tag)?.container.clone();
        let container = self.container_mut(module, tag, &container_path)?;

        let position = container
            .children
            .iter()
            .position(|child| child.tag == tag && GenericEntry::from_element(child) == *entry);
        match position {
            Some(at) => {
                container.children.remove(at);
                debug!(module, tag, "deleted entry");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn changed(&self) -> Result<bool> {
        self.store.changed()
    }

    /// Save the store and rediscover collections from the reloaded tree.
    pub fn save(&mut self) -> Result<bool> {
        let saved = self.store.save()?;
        if saved {
            self.collections = discover(&self.store);
        }
        Ok(saved)
    }

    fn container_mut(&mut self, module: &str, tag: &str, path: &str) -> Result<&mut XmlNode> {
        self.store
            .tree_mut()
            .find_path_mut(path)
            .ok_or_else(|| ConfigError::RegistryLookup {
                module: module.to_string(),
                tag: tag.to_string(),
            })
    }
}

/// Collections declared by the schema come first, so an empty container
/// stays addressable. Any other child with children or attributes under a
/// setting's node is picked up from the tree.
fn discover(store: &ConfigStore) -> Vec<Collection> {
    let mut collections: Vec<Collection> = Vec::new();
    let mut add = |module: &str, tag: &str, container: &str| {
        let known = collections
            .iter()
            .any(|c| c.module == module && c.tag == tag);
        if !known {
            collections.push(Collection {
                module: module.to_string(),
                tag: tag.to_string(),
                container: container.to_string(),
            });
        }
    };

    for (module, context) in store.schema().contexts() {
        for (setting, tags) in context.collections.iter() {
            if let Some(path) = context.settings.get(setting) {
                for tag in tags {
                    add(module, tag.as_str(), path.as_str());
                }
            }
        }

        for (_, path) in context.settings.iter() {
            let Some(node) = store.tree().find_path(path) else {
                continue;
            };
            for child in &node.children {
                if !child.children.is_empty() || !child.attributes.is_empty() {
                    add(module, child.tag.as_str(), path.as_str());
                }
            }
        }
    }
    collections
}
