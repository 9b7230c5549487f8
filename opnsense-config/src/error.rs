use std::path::PathBuf;

use thiserror::Error;
use xml_config_core::{ParseError, WriteError};

use crate::alias::FirewallAliasType;

/// Failures while locating or interpreting a version schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// No schema exists for the appliance version.
    #[error("OPNsense version '{version}' is not supported")]
    UnsupportedVersion { version: String },
    /// A requested context is not declared for the version.
    #[error("Config context '{context}' not supported for OPNsense version '{version}'.")]
    UnsupportedContext { context: String, version: String },
    /// None of the resolved contexts defines the setting.
    #[error("Setting '{setting}' is not supported in module '{module}' for OPNsense version '{version}'")]
    UnsupportedSetting {
        setting: String,
        module: String,
        version: String,
    },
    /// The module context lacks `php_requirements` or `configure_functions`.
    #[error("Module '{module}' has no {definition} defined for OPNsense version '{version}'")]
    MissingDefinition {
        module: String,
        definition: &'static str,
        version: String,
    },
    /// Schema text did not have the expected shape.
    #[error("schema {origin} is misconfigured: {message}")]
    Misconfigured { origin: String, message: String },
    /// Override schema file exists but could not be read.
    #[error("failed to read schema {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the configuration store and the domains built on it.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: WriteError,
    },
    /// Values may only be written to leaves below an existing parent.
    #[error("cannot write a value at '{path}': {reason}")]
    StructuralWrite { path: String, reason: String },
    /// An alias content entry failed the predicate for its type.
    #[error("{message}")]
    ContentValidation {
        entry: String,
        alias_type: FirewallAliasType,
        message: String,
    },
    #[error("interface {name} was not found on the device")]
    InterfaceNotFound { name: String },
    #[error("Group {name} was not found on the Instance.")]
    GroupNotFound { name: String },
    #[error("no '{tag}' entries are registered for module '{module}'")]
    RegistryLookup { module: String, tag: String },
    #[error("unknown alias type '{0}'")]
    UnknownAliasType(String),
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("invalid value '{value}' for field '{field}'")]
    InvalidField { field: String, value: String },
    #[error("failed to detect OPNsense version: {0}")]
    VersionDetection(String),
    #[error("failed to apply settings: {0}")]
    Apply(String),
}

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
