//! Interface assignments (`<interfaces><lan>...</lan></interfaces>`).

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;
use xml_config_core::{parse_file, XmlNode};

use crate::error::{ConfigError, Result};
use crate::store::{ConfigStore, OpenOptions};

pub const MODULE: &str = "interfaces_assignments";
pub const INTERFACES_SETTING: &str = "interfaces";

/// One assigned interface; the element tag is its identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceAssignment {
    pub identifier: String,
    pub device: Option<String>,
    pub description: Option<String>,
    pub enabled: bool,
    /// Every other child element, untouched on save.
    #[serde(skip)]
    pub extra: Vec<XmlNode>,
}

impl InterfaceAssignment {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            device: None,
            description: None,
            enabled: false,
            extra: Vec::new(),
        }
    }

    pub fn from_element(node: &XmlNode) -> Self {
        Self {
            identifier: node.tag.clone(),
            device: node.get_text(&["if"]).map(str::to_string),
            description: node.get_text(&["descr"]).map(str::to_string),
            enabled: node.get_text(&["enable"]) == Some("1"),
            extra: node
                .children
                .iter()
                .filter(|c| !matches!(c.tag.as_str(), "if" | "descr" | "enable"))
                .cloned()
                .collect(),
        }
    }

    /// Patch `if`, `descr` and `enable` in `node`, leaving other children in place.
    pub fn write_into(&self, node: &mut XmlNode) {
        match &self.device {
            Some(device) => node.upsert_child_text("if", Some(device.as_str())),
            None => {
                node.remove_children("if");
            }
        }
        match &self.description {
            Some(descr) => node.upsert_child_text("descr", Some(descr.as_str())),
            None => {
                node.remove_children("descr");
            }
        }
        if self.enabled {
            node.upsert_child_text("enable", Some("1"));
        } else {
            node.remove_children("enable");
        }
    }

    /// True when `name` is this interface's description or identifier.
    pub fn answers_to(&self, name: &str) -> bool {
        self.description.as_deref() == Some(name) || self.identifier == name
    }
}

/// Assignments below the store's `interfaces` setting.
pub fn load_assignments(store: &ConfigStore) -> Result<Vec<InterfaceAssignment>> {
    Ok(store
        .get(INTERFACES_SETTING)?
        .map(assignments_in)
        .unwrap_or_default())
}

fn assignments_in(container: &XmlNode) -> Vec<InterfaceAssignment> {
    container
        .children
        .iter()
        .map(InterfaceAssignment::from_element)
        .collect()
}

/// Editable view of the interface assignments of one config file.
#[derive(Debug)]
pub struct InterfacesSet {
    store: ConfigStore,
    assignments: Vec<InterfaceAssignment>,
}

impl InterfacesSet {
    pub fn open(path: impl Into<PathBuf>, version: &str, schema_dir: Option<&Path>) -> Result<Self> {
        let store = ConfigStore::open(
            path,
            version,
            MODULE,
            OpenOptions {
                schema_dir,
                ..OpenOptions::default()
            },
        )?;
        Self::from_store(store)
    }

    pub fn from_store(store: ConfigStore) -> Result<Self> {
        let assignments = load_assignments(&store)?;
        Ok(Self { store, assignments })
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn assignments(&self) -> &[InterfaceAssignment] {
        &self.assignments
    }

    pub fn find(&self, identifier: &str) -> Option<&InterfaceAssignment> {
        self.assignments.iter().find(|a| a.identifier == identifier)
    }

    /// Replace device, description and enable state of a known identifier.
    pub fn update(&mut self, assignment: InterfaceAssignment) -> Result<()> {
        let existing = self
            .assignments
            .iter_mut()
            .find(|a| a.identifier == assignment.identifier)
            .ok_or_else(|| ConfigError::InterfaceNotFound {
                name: assignment.identifier.clone(),
            })?;

        existing.device = assignment.device;
        existing.description = assignment.description;
        existing.enabled = assignment.enabled;
        Ok(())
    }

    /// Compare against the assignments currently in the file.
    pub fn changed(&self) -> Result<bool> {
        let path = self.store.path();
        let on_disk = parse_file(path).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let setting_path = self.store.resolve(INTERFACES_SETTING)?;
        let disk = on_disk
            .find_path(setting_path)
            .map(assignments_in)
            .unwrap_or_default();
        Ok(disk != self.assignments)
    }

    pub fn save(&mut self) -> Result<bool> {
        if !self.changed()? {
            return Ok(false);
        }

        let setting_path = self.store.resolve(INTERFACES_SETTING)?.to_string();
        let container = self.store.get_mut(INTERFACES_SETTING)?.ok_or_else(|| {
            ConfigError::StructuralWrite {
                path: setting_path,
                reason: "interfaces section is missing".to_string(),
            }
        })?;
        for assignment in &self.assignments {
            if let Some(node) = container.get_child_mut(&assignment.identifier) {
                assignment.write_into(node);
            }
        }

        let saved = self.store.save()?;
        self.assignments = load_assignments(&self.store)?;
        debug!(saved, "saved interface assignments");
        Ok(saved)
    }
}
