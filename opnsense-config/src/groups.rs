//! User groups declared under `<system>`.

use serde::Serialize;
use xml_config_core::XmlNode;

use crate::error::{ConfigError, Result};
use crate::store::ConfigStore;

/// Setting that resolves to the `<system>` node.
pub const SYSTEM_SETTING: &str = "system";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub name: String,
    pub description: Option<String>,
    pub scope: Option<String>,
    pub gid: Option<String>,
    pub members: Vec<String>,
    pub privileges: Vec<String>,
}

impl Group {
    /// Decode a `<group>` element; groups without a name are skipped.
    pub fn from_element(node: &XmlNode) -> Option<Self> {
        let text = |tag: &str| node.get_text(&[tag]).map(str::to_string);
        let all = |tag: &str| {
            node.get_children(tag)
                .into_iter()
                .filter_map(|child| child.text.clone())
                .collect::<Vec<_>>()
        };

        Some(Self {
            name: text("name")?,
            description: text("description"),
            scope: text("scope"),
            gid: text("gid"),
            members: all("member"),
            privileges: all("priv"),
        })
    }
}

/// Groups of the store's `system` setting; empty when the node is absent.
pub fn load_groups(store: &ConfigStore) -> Result<Vec<Group>> {
    Ok(store
        .get(SYSTEM_SETTING)?
        .map(|system| {
            system
                .get_children("group")
                .into_iter()
                .filter_map(Group::from_element)
                .collect()
        })
        .unwrap_or_default())
}

pub fn find_group<'a>(groups: &'a [Group], name: &str) -> Result<&'a Group> {
    groups
        .iter()
        .find(|group| group.name == name)
        .ok_or_else(|| ConfigError::GroupNotFound {
            name: name.to_string(),
        })
}
