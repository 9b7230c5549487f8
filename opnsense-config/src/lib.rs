//! Versioned access to the OPNsense `config.xml`.
//!
//! Logical setting names are mapped to paths in the config tree by a schema
//! chosen for the appliance version. On top of that sit generic CRUD over
//! repeated records and the firewall alias domain.
//!
//! # Layout
//!
//! - [`schema`]: per-version TOML schemas and setting resolution
//! - [`version`]: appliance version detection
//! - [`store`]: get/set/diff/save over the parsed file
//! - [`registry`]: generic find/create_or_update/delete on record collections
//! - [`alias`]: firewall alias model, validators and [`alias::FirewallAliasSet`]
//! - [`interfaces`]: interface assignments
//! - [`groups`]: user groups used by `opnvpngroup` aliases
//! - [`apply`]: apply plans and the PHP applier
//! - [`report`]: terminal rendering of diffs
//!
//! # Example
//!
//! ```ignore
//! use opnsense_config::alias::{FirewallAlias, FirewallAliasSet, FirewallAliasType};
//!
//! let mut aliases = FirewallAliasSet::open("/conf/config.xml", "OPNsense 24.1", None)?;
//! let alias = FirewallAlias::new("dns", FirewallAliasType::Host)
//!     .with_content(["9.9.9.9", "149.112.112.112"]);
//! aliases.add_or_update(alias)?;
//! aliases.save()?;
//! ```

pub mod alias;
pub mod apply;
pub mod error;
pub mod groups;
pub mod interfaces;
pub mod registry;
pub mod report;
pub mod schema;
pub mod store;
pub mod version;

pub use error::{ConfigError, Result, SchemaError};
pub use store::{ConfigStore, OpenOptions, SettingsDiff};
