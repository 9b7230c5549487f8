//! File-backed config store addressed by logical setting names.
//!
//! The in-memory tree is compared against a fresh parse of the file whenever
//! change state is needed, so edits made to the file by someone else between
//! calls show up as well. Nothing is written unless [`ConfigStore::save`] is
//! called; dropping a modified store discards its changes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};
use xml_config_core::{
    diff_with_options, parse_file, split_parent, trees_equal, write_file, DiffEntry, DiffOptions,
    XmlNode,
};

use crate::apply::{ApplyPlan, ConfigureOutput, SettingsApplier};
use crate::error::{ConfigError, Result};
use crate::schema::{load_version_schema, VersionedSchema};
use crate::version::VersionProvider;

/// Default location of the appliance configuration.
pub const DEFAULT_CONFIG_PATH: &str = "/conf/config.xml";

/// Before/after text of every declared setting, keyed by resolved path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SettingsDiff {
    pub before: BTreeMap<String, Option<String>>,
    pub after: BTreeMap<String, Option<String>>,
}

impl SettingsDiff {
    /// Paths whose text differs between disk and memory.
    pub fn changed_paths(&self) -> Vec<&str> {
        self.after
            .iter()
            .filter(|(path, after)| self.before.get(*path) != Some(*after))
            .map(|(path, _)| path.as_str())
            .collect()
    }
}

/// Options locating the schema for a store.
#[derive(Debug, Clone, Default)]
pub struct OpenOptions<'a> {
    /// Extra contexts searched after the module's own context.
    pub contexts: &'a [&'a str],
    /// Directory with `<version>.toml` overrides.
    pub schema_dir: Option<&'a Path>,
}

#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    schema: VersionedSchema,
    tree: XmlNode,
}

impl ConfigStore {
    /// Open `path` for `module` using the schema of `version`.
    pub fn open(
        path: impl Into<PathBuf>,
        version: &str,
        module: &str,
        options: OpenOptions<'_>,
    ) -> Result<Self> {
        let loaded = load_version_schema(version, options.schema_dir)?;
        let schema = VersionedSchema::resolve(&loaded, version, module, options.contexts)?;
        Self::with_schema(path, schema)
    }

    /// Like [`ConfigStore::open`], asking `provider` for the appliance version.
    pub fn open_detected(
        path: impl Into<PathBuf>,
        provider: &dyn VersionProvider,
        module: &str,
        options: OpenOptions<'_>,
    ) -> Result<Self> {
        let version = provider.opnsense_version()?;
        Self::open(path, &version, module, options)
    }

    pub fn with_schema(path: impl Into<PathBuf>, schema: VersionedSchema) -> Result<Self> {
        let path = path.into();
        let tree = read_tree(&path)?;
        debug!(
            path = %path.display(),
            module = schema.module(),
            schema = schema.source(),
            "opened config"
        );
        Ok(Self { path, schema, tree })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema(&self) -> &VersionedSchema {
        &self.schema
    }

    pub fn tree(&self) -> &XmlNode {
        &self.tree
    }

    pub(crate) fn tree_mut(&mut self) -> &mut XmlNode {
        &mut self.tree
    }

    /// Resolved path of `setting`.
    pub fn resolve(&self, setting: &str) -> Result<&str> {
        Ok(self.schema.resolve_setting(setting)?)
    }

    /// Node for `setting`, `None` when the path is absent from the tree.
    pub fn get(&self, setting: &str) -> Result<Option<&XmlNode>> {
        let path = self.schema.resolve_setting(setting)?;
        Ok(self.tree.find_path(path))
    }

    pub fn get_text(&self, setting: &str) -> Result<Option<&str>> {
        Ok(self.get(setting)?.and_then(|node| node.text.as_deref()))
    }

    pub(crate) fn get_mut(&mut self, setting: &str) -> Result<Option<&mut XmlNode>> {
        let path = self.schema.resolve_setting(setting)?.to_string();
        Ok(self.tree.find_path_mut(&path))
    }

    /// Write `value` to the leaf behind `setting`.
    ///
    /// A missing leaf is created under its parent. Containers and paths
    /// without a parent are rejected. An empty value clears the text.
    pub fn set(&mut self, value: &str, setting: &str) -> Result<()> {
        let path = self.schema.resolve_setting(setting)?.to_string();

        if let Some(node) = self.tree.find_path_mut(&path) {
            if !node.is_leaf() {
                return Err(ConfigError::StructuralWrite {
                    path,
                    reason: "target holds child elements".to_string(),
                });
            }
            node.set_text(Some(value));
            return Ok(());
        }

        let Some((parent_path, tag)) = split_parent(&path) else {
            return Err(ConfigError::StructuralWrite {
                path,
                reason: "empty path".to_string(),
            });
        };
        let Some(parent) = self.tree.find_path_mut(&parent_path) else {
            return Err(ConfigError::StructuralWrite {
                reason: format!("parent '{parent_path}' does not exist"),
                path,
            });
        };
        parent.children.push(XmlNode::leaf(tag, Some(value)));
        Ok(())
    }

    /// True when memory differs from a fresh parse of the file.
    pub fn changed(&self) -> Result<bool> {
        let on_disk = read_tree(&self.path)?;
        Ok(!trees_equal(&on_disk, &self.tree))
    }

    /// Text of every declared setting on disk and in memory.
    pub fn diff(&self) -> Result<SettingsDiff> {
        let on_disk = read_tree(&self.path)?;
        let mut diff = SettingsDiff::default();
        for (_, _, path) in self.schema.settings() {
            diff.before.insert(path.to_string(), node_text(&on_disk, path));
            diff.after.insert(path.to_string(), node_text(&self.tree, path));
        }
        Ok(diff)
    }

    /// Structural differences between the file and memory.
    pub fn tree_diff(&self) -> Result<Vec<DiffEntry>> {
        let on_disk = read_tree(&self.path)?;
        Ok(diff_with_options(&on_disk, &self.tree, &store_diff_options()))
    }

    /// Overwrite the file with the in-memory tree if it changed, then reload.
    pub fn save(&mut self) -> Result<bool> {
        if !self.changed()? {
            debug!(path = %self.path.display(), "no changes to save");
            return Ok(false);
        }

        write_file(&self.tree, &self.path).map_err(|source| ConfigError::Write {
            path: self.path.clone(),
            source,
        })?;
        self.reload()?;
        info!(path = %self.path.display(), module = self.schema.module(), "saved config");
        Ok(true)
    }

    /// Replace the in-memory tree with the file contents.
    pub fn reload(&mut self) -> Result<()> {
        self.tree = read_tree(&self.path)?;
        Ok(())
    }

    /// PHP requirements and configure functions for the module.
    pub fn apply_plan(&self) -> Result<ApplyPlan> {
        ApplyPlan::from_schema(&self.schema)
    }

    pub fn apply_settings(&self, applier: &dyn SettingsApplier) -> Result<Vec<ConfigureOutput>> {
        let plan = self.apply_plan()?;
        info!(
            module = self.schema.module(),
            functions = plan.functions.len(),
            "applying settings"
        );
        applier.apply(&plan)
    }
}

fn read_tree(path: &Path) -> Result<XmlNode> {
    parse_file(path).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn node_text(tree: &XmlNode, path: &str) -> Option<String> {
    tree.find_path(path).and_then(|node| node.text.clone())
}

pub(crate) fn store_diff_options() -> DiffOptions {
    DiffOptions::default()
        .with_strict_text()
        .with_key_field("alias", "name")
        .with_key_field("group", "name")
        .with_key_field("user", "name")
}
