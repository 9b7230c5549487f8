use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use xml_config_core::XmlNode;

use crate::error::{ConfigError, Result};

/// Kind of a firewall alias, stored as its `<type>` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FirewallAliasType {
    #[serde(rename = "host")]
    Host,
    #[serde(rename = "network")]
    Network,
    #[serde(rename = "port")]
    Port,
    #[serde(rename = "url")]
    Url,
    #[serde(rename = "urltable")]
    UrlTable,
    #[serde(rename = "geoip")]
    GeoIp,
    #[serde(rename = "networkgroup")]
    NetworkGroup,
    #[serde(rename = "mac", alias = "macaddress")]
    Mac,
    #[serde(rename = "bgpasn")]
    BgpAsn,
    #[serde(rename = "dynipv6host", alias = "dynamicipv6host")]
    DynIpv6Host,
    #[serde(rename = "opnvpngroup")]
    OpnVpnGroup,
    #[serde(rename = "internal")]
    Internal,
    #[serde(rename = "external")]
    External,
}

impl FirewallAliasType {
    pub const ALL: [FirewallAliasType; 13] = [
        FirewallAliasType::Host,
        FirewallAliasType::Network,
        FirewallAliasType::Port,
        FirewallAliasType::Url,
        FirewallAliasType::UrlTable,
        FirewallAliasType::GeoIp,
        FirewallAliasType::NetworkGroup,
        FirewallAliasType::Mac,
        FirewallAliasType::BgpAsn,
        FirewallAliasType::DynIpv6Host,
        FirewallAliasType::OpnVpnGroup,
        FirewallAliasType::Internal,
        FirewallAliasType::External,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FirewallAliasType::Host => "host",
            FirewallAliasType::Network => "network",
            FirewallAliasType::Port => "port",
            FirewallAliasType::Url => "url",
            FirewallAliasType::UrlTable => "urltable",
            FirewallAliasType::GeoIp => "geoip",
            FirewallAliasType::NetworkGroup => "networkgroup",
            FirewallAliasType::Mac => "mac",
            FirewallAliasType::BgpAsn => "bgpasn",
            FirewallAliasType::DynIpv6Host => "dynipv6host",
            FirewallAliasType::OpnVpnGroup => "opnvpngroup",
            FirewallAliasType::Internal => "internal",
            FirewallAliasType::External => "external",
        }
    }

    /// Parse a user-facing type name, accepting `macaddress` and `dynamicipv6host`.
    pub fn from_param(value: &str) -> Result<Self> {
        match value {
            "macaddress" => Ok(FirewallAliasType::Mac),
            "dynamicipv6host" => Ok(FirewallAliasType::DynIpv6Host),
            other => other.parse(),
        }
    }

    /// Types that a `networkgroup` alias may reference.
    pub fn is_group_member(self) -> bool {
        matches!(
            self,
            FirewallAliasType::Network
                | FirewallAliasType::NetworkGroup
                | FirewallAliasType::Internal
        )
    }
}

impl FromStr for FirewallAliasType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        FirewallAliasType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownAliasType(s.to_string()))
    }
}

impl Display for FirewallAliasType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IpProtocol {
    IPv4,
    IPv6,
}

impl IpProtocol {
    pub fn as_str(self) -> &'static str {
        match self {
            IpProtocol::IPv4 => "IPv4",
            IpProtocol::IPv6 => "IPv6",
        }
    }
}

impl FromStr for IpProtocol {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "IPv4" => Ok(IpProtocol::IPv4),
            "IPv6" => Ok(IpProtocol::IPv6),
            other => Err(ConfigError::InvalidField {
                field: "proto".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Known child elements, in the order they are written.
pub const ALIAS_FIELDS: &[&str] = &[
    "uuid",
    "enabled",
    "name",
    "type",
    "proto",
    "interface",
    "counters",
    "updatefreq",
    "content",
    "description",
];

/// A firewall alias record.
///
/// Children not listed in [`ALIAS_FIELDS`] are kept in `extra` and written
/// back after the known fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FirewallAlias {
    pub uuid: String,
    pub enabled: bool,
    pub name: String,
    #[serde(rename = "type")]
    pub alias_type: FirewallAliasType,
    pub proto: Vec<IpProtocol>,
    pub interface: Option<String>,
    pub counters: bool,
    pub updatefreq: Option<u32>,
    pub content: Vec<String>,
    pub description: Option<String>,
    #[serde(skip)]
    pub extra: Vec<XmlNode>,
}

impl FirewallAlias {
    /// New enabled alias with a fresh uuid.
    pub fn new(name: impl Into<String>, alias_type: FirewallAliasType) -> Self {
        Self {
            uuid: Uuid::new_v4().to_string(),
            enabled: true,
            name: name.into(),
            alias_type,
            proto: Vec::new(),
            interface: None,
            counters: false,
            updatefreq: None,
            content: Vec::new(),
            description: None,
            extra: Vec::new(),
        }
    }

    pub fn with_content<I, S>(mut self, content: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.content = content.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Decode an `<alias>` element. Missing booleans read as `false`.
    pub fn from_element(node: &XmlNode) -> Result<Self> {
        let text = |tag: &str| {
            node.get_text(&[tag])
                .map(str::trim)
                .filter(|t| !t.is_empty())
        };

        let name = text("name").ok_or_else(|| ConfigError::InvalidField {
            field: "name".to_string(),
            value: String::new(),
        })?;
        let alias_type: FirewallAliasType = text("type")
            .ok_or_else(|| ConfigError::InvalidField {
                field: "type".to_string(),
                value: String::new(),
            })?
            .parse()?;

        let proto = text("proto")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::parse::<IpProtocol>)
                    .collect::<Result<Vec<IpProtocol>>>()
            })
            .transpose()?
            .unwrap_or_default();

        let updatefreq = text("updatefreq")
            .map(|raw| {
                raw.parse::<u32>().map_err(|_| ConfigError::InvalidField {
                    field: "updatefreq".to_string(),
                    value: raw.to_string(),
                })
            })
            .transpose()?;

        let extra = node
            .children
            .iter()
            .filter(|child| !ALIAS_FIELDS.contains(&child.tag.as_str()))
            .cloned()
            .collect();

        Ok(Self {
            uuid: node.attributes.get("uuid").cloned().unwrap_or_default(),
            enabled: parse_bool("enabled", text("enabled"))?,
            name: name.to_string(),
            alias_type,
            proto,
            interface: text("interface").map(str::to_string),
            counters: parse_bool("counters", text("counters"))?,
            updatefreq,
            content: text("content").map(split_content).unwrap_or_default(),
            description: text("description").map(str::to_string),
            extra,
        })
    }

    /// Encode as an `<alias>` element; uuid goes to the attribute only.
    pub fn to_element(&self) -> XmlNode {
        let mut node = XmlNode::new("alias");
        if !self.uuid.is_empty() {
            node.attributes.insert("uuid".to_string(), self.uuid.clone());
        }

        let proto = self
            .proto
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let updatefreq = self.updatefreq.map(|f| f.to_string());
        let content = join_content(&self.content);

        node.children.extend([
            XmlNode::leaf("enabled", Some(bool_text(self.enabled))),
            XmlNode::leaf("name", Some(self.name.as_str())),
            XmlNode::leaf("type", Some(self.alias_type.as_str())),
            XmlNode::leaf("proto", Some(proto.as_str())),
            XmlNode::leaf("interface", self.interface.as_deref()),
            XmlNode::leaf("counters", Some(bool_text(self.counters))),
            XmlNode::leaf("updatefreq", updatefreq.as_deref()),
            XmlNode::leaf("content", content.as_deref()),
            XmlNode::leaf("description", self.description.as_deref()),
        ]);
        node.children.extend(self.extra.iter().cloned());
        node
    }

    /// Build an alias from caller parameters; unset values keep their defaults.
    pub fn from_params(params: AliasParams) -> Self {
        let mut alias = FirewallAlias::new(params.name, params.alias_type);
        if let Some(enabled) = params.enabled {
            alias.enabled = enabled;
        }
        if let Some(content) = params.content {
            alias.content = content.into_lines();
        }
        if let Some(statistics) = params.statistics {
            alias.counters = statistics;
        }
        if alias.alias_type == FirewallAliasType::DynIpv6Host {
            alias.interface = params.interface;
        }
        alias.description = params.description;
        alias.updatefreq = params.refreshfrequency;
        alias
    }

    /// Stored textual form of every known field, as queried by `find`.
    pub fn fields(&self) -> Vec<(&'static str, Option<String>)> {
        ALIAS_FIELDS
            .iter()
            .map(|name| (*name, self.text_of(name)))
            .collect()
    }

    /// Stored textual form of `name`; `None` when the field is empty.
    pub fn field(&self, name: &str) -> Result<Option<String>> {
        if !ALIAS_FIELDS.contains(&name) {
            return Err(ConfigError::UnknownField(name.to_string()));
        }
        Ok(self.text_of(name))
    }

    fn text_of(&self, name: &str) -> Option<String> {
        let value = match name {
            "uuid" => self.uuid.clone(),
            "enabled" => bool_text(self.enabled).to_string(),
            "name" => self.name.clone(),
            "type" => self.alias_type.as_str().to_string(),
            "proto" => self
                .proto
                .iter()
                .map(|p| p.as_str())
                .collect::<Vec<_>>()
                .join(","),
            "interface" => self.interface.clone()?,
            "counters" => bool_text(self.counters).to_string(),
            "updatefreq" => self.updatefreq?.to_string(),
            "content" => self.content.join("\n"),
            "description" => self.description.clone()?,
            _ => return None,
        };
        Some(value).filter(|v| !v.is_empty())
    }

    /// Copy every field from `other` except the uuid.
    pub(crate) fn merge_from(&mut self, other: FirewallAlias) {
        let uuid = std::mem::take(&mut self.uuid);
        let extra = std::mem::take(&mut self.extra);
        *self = FirewallAlias {
            uuid,
            extra,
            ..other
        };
    }
}

/// Alias content as a newline-separated blob or a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AliasContent {
    Text(String),
    List(Vec<String>),
}

impl AliasContent {
    fn into_lines(self) -> Vec<String> {
        match self {
            AliasContent::Text(blob) => split_content(&blob),
            AliasContent::List(items) => items
                .iter()
                .map(|item| item.trim())
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Caller parameters for creating or updating an alias.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AliasParams {
    pub name: String,
    #[serde(rename = "type")]
    pub alias_type: FirewallAliasType,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub content: Option<AliasContent>,
    #[serde(default)]
    pub statistics: Option<bool>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub refreshfrequency: Option<u32>,
    #[serde(default)]
    pub interface: Option<String>,
}

impl AliasParams {
    pub fn new(name: impl Into<String>, alias_type: FirewallAliasType) -> Self {
        Self {
            name: name.into(),
            alias_type,
            enabled: None,
            content: None,
            statistics: None,
            description: None,
            refreshfrequency: None,
            interface: None,
        }
    }
}

fn parse_bool(field: &str, value: Option<&str>) -> Result<bool> {
    match value {
        None | Some("0") => Ok(false),
        Some("1") => Ok(true),
        Some(other) => Err(ConfigError::InvalidField {
            field: field.to_string(),
            value: other.to_string(),
        }),
    }
}

fn bool_text(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

/// Trimmed, non-empty lines in order.
pub fn split_content(blob: &str) -> Vec<String> {
    blob.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn join_content(content: &[String]) -> Option<String> {
    if content.is_empty() {
        return None;
    }
    Some(format!("\n{}\n", content.join("\n")))
}

#[cfg(test)]
mod tests {
    use super::{AliasParams, FirewallAlias, FirewallAliasType, IpProtocol};
    use crate::error::ConfigError;
    use pretty_assertions::assert_eq;
    use xml_config_core::{parse_str, trees_equal};

    const ALIAS_XML: &str = r#"<alias uuid="ad0fd5d4-6797-4521-9ee4-df3e16de31d0">
  <enabled>1</enabled>
  <name>host_test</name>
  <type>host</type>
  <proto>IPv4,IPv6</proto>
  <interface/>
  <counters>0</counters>
  <updatefreq/>
  <content>
10.0.0.1
  10.0.0.2

</content>
  <description>host_test</description>
  <categories/>
</alias>"#;

    #[test]
    fn parses_alias_element() {
        let node = parse_str(ALIAS_XML).expect("parse");
        let alias = FirewallAlias::from_element(&node).expect("alias");

        assert_eq!(alias.uuid, "ad0fd5d4-6797-4521-9ee4-df3e16de31d0");
        assert!(alias.enabled);
        assert!(!alias.counters);
        assert_eq!(alias.alias_type, FirewallAliasType::Host);
        assert_eq!(alias.proto, vec![IpProtocol::IPv4, IpProtocol::IPv6]);
        assert_eq!(alias.content, vec!["10.0.0.1", "10.0.0.2"]);
        assert_eq!(alias.interface, None);
        assert_eq!(alias.updatefreq, None);
        assert_eq!(alias.extra.len(), 1);
        assert_eq!(alias.extra[0].tag, "categories");
    }

    #[test]
    fn element_round_trips_for_every_type() {
        for alias_type in FirewallAliasType::ALL {
            let mut alias = FirewallAlias::new("rt", alias_type)
                .with_content(["a", "b"])
                .with_description("round trip");
            alias.counters = true;
            alias.updatefreq = Some(2);
            alias.proto = vec![IpProtocol::IPv6];
            if alias_type == FirewallAliasType::DynIpv6Host {
                alias.interface = Some("lan".to_string());
            }

            let element = alias.to_element();
            assert!(!element.children.iter().any(|c| c.tag == "uuid"));
            assert_eq!(element.get_text(&["type"]), Some(alias_type.as_str()));

            let parsed = FirewallAlias::from_element(&element).expect("parse");
            assert_eq!(parsed, alias);
            assert!(trees_equal(&parsed.to_element(), &element));
        }
    }

    #[test]
    fn serializing_parsed_element_is_tree_equal() {
        let node = parse_str(ALIAS_XML).expect("parse");
        let alias = FirewallAlias::from_element(&node).expect("alias");
        let reserialized = alias.to_element();

        assert_eq!(reserialized.get_text(&["content"]), Some("\n10.0.0.1\n10.0.0.2\n"));
        assert_eq!(
            reserialized.attributes.get("uuid").map(String::as_str),
            Some("ad0fd5d4-6797-4521-9ee4-df3e16de31d0")
        );
        let fresh = FirewallAlias::from_element(&reserialized).expect("reparse");
        assert_eq!(fresh, alias);
    }

    #[test]
    fn empty_content_is_an_empty_element() {
        let alias = FirewallAlias::new("empty", FirewallAliasType::Url);
        let element = alias.to_element();
        let content = element.get_child("content").expect("content");
        assert!(content.text.is_none());
        assert!(content.is_leaf());
    }

    #[test]
    fn unknown_type_and_bad_updatefreq_are_rejected() {
        let node = parse_str("<alias><name>x</name><type>hosts</type></alias>").expect("parse");
        assert!(matches!(
            FirewallAlias::from_element(&node),
            Err(ConfigError::UnknownAliasType(t)) if t == "hosts"
        ));

        let node = parse_str(
            "<alias><name>x</name><type>url</type><updatefreq>daily</updatefreq></alias>",
        )
        .expect("parse");
        assert!(matches!(
            FirewallAlias::from_element(&node),
            Err(ConfigError::InvalidField { field, .. }) if field == "updatefreq"
        ));
    }

    #[test]
    fn params_apply_legacy_names_and_interface_rule() {
        let params: AliasParams = serde_json::from_str(
            r#"{"name": "mac_alias", "type": "macaddress", "content": "00:11:22:33:44:55\n", "interface": "lan"}"#,
        )
        .expect("params");
        let alias = FirewallAlias::from_params(params);
        assert_eq!(alias.alias_type, FirewallAliasType::Mac);
        assert_eq!(alias.content, vec!["00:11:22:33:44:55"]);
        assert_eq!(alias.interface, None);
        assert!(alias.enabled);

        let alias_type = FirewallAliasType::from_param("dynamicipv6host").expect("type");
        let mut params = AliasParams::new("v6", alias_type);
        params.interface = Some("LAN".to_string());
        params.statistics = Some(true);
        params.refreshfrequency = Some(1);
        let alias = FirewallAlias::from_params(params);
        assert_eq!(alias.alias_type, FirewallAliasType::DynIpv6Host);
        assert_eq!(alias.interface.as_deref(), Some("LAN"));
        assert!(alias.counters);
        assert_eq!(alias.updatefreq, Some(1));
    }

    #[test]
    fn params_reject_unknown_keys() {
        let err = serde_json::from_str::<AliasParams>(
            r#"{"name": "a", "type": "host", "colour": "red"}"#,
        )
        .expect_err("unknown key");
        assert!(err.to_string().contains("colour"));
    }

    #[test]
    fn fields_expose_stored_text() {
        let alias = FirewallAlias::new("f", FirewallAliasType::Port).with_content(["80", "443"]);
        assert_eq!(alias.field("enabled").expect("enabled").as_deref(), Some("1"));
        assert_eq!(alias.field("content").expect("content").as_deref(), Some("80\n443"));
        assert_eq!(alias.field("description").expect("description"), None);
        assert!(matches!(alias.field("colour"), Err(ConfigError::UnknownField(_))));
        assert_eq!(alias.fields().len(), 10);
    }
}
