//! Firewall aliases: the record model, content validation and the alias set.

pub mod model;
pub mod set;
pub mod validate;

pub use model::{AliasContent, AliasParams, FirewallAlias, FirewallAliasType, IpProtocol};
pub use set::FirewallAliasSet;
