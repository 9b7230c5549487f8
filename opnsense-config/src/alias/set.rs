use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use xml_config_core::{diff_with_options, parse_file, DiffEntry, DiffOptions, XmlNode};

use crate::alias::model::{FirewallAlias, FirewallAliasType};
use crate::alias::validate;
use crate::apply::{ConfigureOutput, SettingsApplier};
use crate::error::{ConfigError, Result};
use crate::groups::{find_group, load_groups};
use crate::interfaces::load_assignments;
use crate::registry::Upsert;
use crate::store::{ConfigStore, OpenOptions};
use crate::version::VersionProvider;

pub const MODULE: &str = "firewall_alias";
/// Contexts needed for cross-reference checks.
pub const CONTEXTS: &[&str] = &["system_access_users", "interfaces_assignments"];
pub const ALIAS_SETTING: &str = "alias";

/// In-memory alias list of one config file.
///
/// [`FirewallAliasSet::add_or_update`] and [`FirewallAliasSet::delete`] only
/// touch the list. [`FirewallAliasSet::save`] replaces every `<alias>` element
/// in the file with the current list.
#[derive(Debug)]
pub struct FirewallAliasSet {
    store: ConfigStore,
    aliases: Vec<FirewallAlias>,
}

impl FirewallAliasSet {
    pub fn open(path: impl Into<PathBuf>, version: &str, schema_dir: Option<&Path>) -> Result<Self> {
        let store = ConfigStore::open(path, version, MODULE, open_options(schema_dir))?;
        Self::from_store(store)
    }

    pub fn open_detected(
        path: impl Into<PathBuf>,
        provider: &dyn VersionProvider,
        schema_dir: Option<&Path>,
    ) -> Result<Self> {
        let store = ConfigStore::open_detected(path, provider, MODULE, open_options(schema_dir))?;
        Self::from_store(store)
    }

    pub fn from_store(store: ConfigStore) -> Result<Self> {
        let aliases = aliases_in(store.get(ALIAS_SETTING)?)?;
        debug!(count = aliases.len(), "loaded aliases");
        Ok(Self { store, aliases })
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn aliases(&self) -> &[FirewallAlias] {
        &self.aliases
    }

    /// Check every content entry against the predicate for `alias_type`.
    ///
    /// Stops at the first failing entry.
    pub fn validate_content(&self, alias_type: FirewallAliasType, content: &[String]) -> Result<()> {
        let predicate: fn(&str) -> bool = match alias_type {
            FirewallAliasType::Url
            | FirewallAliasType::UrlTable
            | FirewallAliasType::GeoIp
            | FirewallAliasType::Internal
            | FirewallAliasType::External => return Ok(()),
            FirewallAliasType::OpnVpnGroup => return self.validate_groups(content),
            FirewallAliasType::NetworkGroup => return self.validate_group_members(content),
            FirewallAliasType::Host => validate::is_host,
            FirewallAliasType::Network => validate::is_network,
            FirewallAliasType::Port => validate::is_port,
            FirewallAliasType::Mac => validate::is_mac,
            FirewallAliasType::BgpAsn => validate::is_bgp_asn,
            FirewallAliasType::DynIpv6Host => validate::is_dynipv6_host,
        };

        match content.iter().find(|entry| !predicate(entry)) {
            Some(entry) => Err(content_error(alias_type, entry)),
            None => Ok(()),
        }
    }

    fn validate_group_members(&self, content: &[String]) -> Result<()> {
        for entry in content {
            let known = self
                .aliases
                .iter()
                .any(|a| a.name == *entry && a.alias_type.is_group_member());
            if !known {
                return Err(content_error(FirewallAliasType::NetworkGroup, entry));
            }
        }
        Ok(())
    }

    fn validate_groups(&self, content: &[String]) -> Result<()> {
        let groups = load_groups(&self.store)?;
        for entry in content {
            if let Err(err) = find_group(&groups, entry) {
                warn!(group = %entry, "alias references unknown group");
                return Err(err);
            }
        }
        Ok(())
    }

    /// Require an interface assignment whose description (`LAN`) or identifier
    /// (`lan`) is `name`.
    ///
    /// The identifier is accepted as well as the description the web UI
    /// shows, since both name the same assignment. Device names such as
    /// `em1` are not.
    pub fn check_interface(&self, name: &str) -> Result<()> {
        let assignments = load_assignments(&self.store)?;
        if assignments.iter().any(|a| a.answers_to(name)) {
            Ok(())
        } else {
            warn!(interface = %name, "alias references unknown interface");
            Err(ConfigError::InterfaceNotFound {
                name: name.to_string(),
            })
        }
    }

    /// Validate, then merge into the alias with the same name or append.
    ///
    /// An update keeps the stored uuid. Nothing changes when validation fails.
    pub fn add_or_update(&mut self, alias: FirewallAlias) -> Result<Upsert> {
        self.validate_content(alias.alias_type, &alias.content)?;
        if let Some(interface) = alias.interface.as_deref() {
            self.check_interface(interface)?;
        }

        match self.aliases.iter_mut().find(|a| a.name == alias.name) {
            Some(existing) => {
                existing.merge_from(alias);
                Ok(Upsert::Updated)
            }
            None => {
                self.aliases.push(alias);
                Ok(Upsert::Created)
            }
        }
    }

    /// First alias whose stored field text equals every criterion.
    pub fn find(&self, criteria: &[(&str, &str)]) -> Result<Option<&FirewallAlias>> {
        for alias in &self.aliases {
            let mut matched = true;
            for (field, value) in criteria {
                if alias.field(field)?.as_deref() != Some(*value) {
                    matched = false;
                    break;
                }
            }
            if matched {
                return Ok(Some(alias));
            }
        }
        Ok(None)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&FirewallAlias> {
        self.aliases.iter().find(|a| a.name == name)
    }

    /// Remove the alias named `name`; `false` when there is none.
    pub fn delete(&mut self, name: &str) -> bool {
        match self.aliases.iter().position(|a| a.name == name) {
            Some(at) => {
                self.aliases.remove(at);
                true
            }
            None => false,
        }
    }

    /// Compare the list against the aliases currently in the file.
    pub fn changed(&self) -> Result<bool> {
        Ok(self.disk_aliases()? != self.aliases)
    }

    /// Per-alias differences between the file and the list, keyed by alias name.
    pub fn diff(&self) -> Result<Vec<DiffEntry>> {
        let before = self.disk_container()?;
        let mut after = before.clone();
        replace_aliases(&mut after, &self.aliases);
        let opts = DiffOptions::default().with_key_field("alias", "name");
        Ok(diff_with_options(&before, &after, &opts))
    }

    /// Replace all `<alias>` elements with the list if it changed, commit and reload.
    pub fn save(&mut self) -> Result<bool> {
        if !self.changed()? {
            return Ok(false);
        }

        let path = self.store.resolve(ALIAS_SETTING)?.to_string();
        let container =
            self.store
                .get_mut(ALIAS_SETTING)?
                .ok_or_else(|| ConfigError::StructuralWrite {
                    path,
                    reason: "alias container is missing".to_string(),
                })?;
        replace_aliases(container, &self.aliases);

        let saved = self.store.save()?;
        self.aliases = aliases_in(self.store.get(ALIAS_SETTING)?)?;
        info!(count = self.aliases.len(), "saved aliases");
        Ok(saved)
    }

    pub fn apply_settings(&self, applier: &dyn SettingsApplier) -> Result<Vec<ConfigureOutput>> {
        self.store.apply_settings(applier)
    }

    fn disk_container(&self) -> Result<XmlNode> {
        let path = self.store.path();
        let on_disk = parse_file(path).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let setting_path = self.store.resolve(ALIAS_SETTING)?;
        Ok(on_disk
            .find_path(setting_path)
            .cloned()
            .unwrap_or_else(|| XmlNode::new("aliases")))
    }

    fn disk_aliases(&self) -> Result<Vec<FirewallAlias>> {
        let container = self.disk_container()?;
        aliases_in(Some(&container))
    }
}

fn open_options(schema_dir: Option<&Path>) -> OpenOptions<'_> {
    OpenOptions {
        contexts: CONTEXTS,
        schema_dir,
    }
}

fn aliases_in(container: Option<&XmlNode>) -> Result<Vec<FirewallAlias>> {
    container
        .map(|node| {
            node.get_children("alias")
                .into_iter()
                .map(FirewallAlias::from_element)
                .collect()
        })
        .unwrap_or_else(|| Ok(Vec::new()))
}

fn replace_aliases(container: &mut XmlNode, aliases: &[FirewallAlias]) {
    container.remove_children("alias");
    container
        .children
        .extend(aliases.iter().map(FirewallAlias::to_element));
}

fn content_error(alias_type: FirewallAliasType, entry: &str) -> ConfigError {
    let message = match alias_type {
        FirewallAliasType::Host => {
            format!("Entry {entry} is not a valid hostname, IP address or range.")
        }
        FirewallAliasType::Network => format!("Entry {entry} is not a network."),
        FirewallAliasType::NetworkGroup => {
            format!("Entry {entry} is not a type NetworkAlias or InternalAlias.")
        }
        FirewallAliasType::Port => format!("Entry {entry} is not a valid port number."),
        FirewallAliasType::Mac => format!("Entry {entry} is not a valid (partial) MAC address."),
        FirewallAliasType::BgpAsn => format!("Entry {entry} is not a valid ASN."),
        FirewallAliasType::DynIpv6Host => format!(
            "Entry {entry} is not a valid partial IPv6 address definition (e.g. ::1000)."
        ),
        other => format!("Entry {entry} is not valid for alias type {other}."),
    };
    warn!(%entry, alias_type = %alias_type, "alias content rejected");
    ConfigError::ContentValidation {
        entry: entry.to_string(),
        alias_type,
        message,
    }
}
