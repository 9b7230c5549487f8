//! Version schemas mapping logical setting names to config paths.
//!
//! One TOML file per appliance version declares named contexts. Each context
//! lists its settings (`name = "slash/separated/path"`), the PHP includes
//! needed to apply it and the configure functions to run afterwards. Files
//! are embedded in the binary and can be overridden from a directory holding
//! `<version>.toml`.

use std::fmt;
use std::marker::PhantomData;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::SchemaError;

/// Versions with an embedded schema.
pub const EMBEDDED_VERSIONS: &[&str] = &["23.7", "24.1", "24.7", "25.1"];

static NUMERIC_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d+)+").expect("valid version regex"));

/// String-keyed table that keeps declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedMap<V>(Vec<(String, V)>);

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<V> OrderedMap<V> {
    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.0.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V> FromIterator<(String, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a table")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries: Vec<(String, V)> = Vec::new();
                while let Some((key, value)) = map.next_entry::<String, V>()? {
                    if entries.iter().any(|(k, _)| *k == key) {
                        return Err(serde::de::Error::custom(format!("duplicate key '{key}'")));
                    }
                    entries.push((key, value));
                }
                Ok(OrderedMap(entries))
            }
        }

        deserializer.deserialize_map(OrderedVisitor(PhantomData))
    }
}

/// A function the appliance runs after a commit, with its string parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigureFunction {
    pub name: String,
    #[serde(default)]
    pub configure_params: Vec<String>,
}

/// One named group of settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContextSchema {
    #[serde(default)]
    pub settings: OrderedMap<String>,
    #[serde(default)]
    pub php_requirements: Option<Vec<String>>,
    #[serde(default)]
    pub configure_functions: Option<OrderedMap<ConfigureFunction>>,
    /// Record tags held by a setting's node, keyed by setting name.
    #[serde(default)]
    pub collections: OrderedMap<Vec<String>>,
}

/// Parsed schema file for one appliance version.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VersionSchema {
    #[serde(default)]
    pub contexts: OrderedMap<ContextSchema>,
}

/// A schema together with the lookup candidate that matched and where it came from.
#[derive(Debug, Clone)]
pub struct LoadedSchema {
    pub matched: String,
    pub source: String,
    pub schema: VersionSchema,
}

/// Lookup candidates for a version string, most specific first.
///
/// `"OPNsense 24.1.2_1"` yields the trimmed string, `24.1.2` and `24.1`.
pub fn version_candidates(version: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut push = |name: String| {
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    };

    let trimmed = version.trim();
    push(trimmed.to_string());
    if let Some(found) = NUMERIC_VERSION.find(trimmed) {
        let numeric = found.as_str();
        push(numeric.to_string());
        let mut parts = numeric.split('.');
        if let (Some(major), Some(minor)) = (parts.next(), parts.next()) {
            push(format!("{major}.{minor}"));
        }
    }
    names
}

/// Load the schema for `version`, trying the override directory before the embedded set.
pub fn load_version_schema(
    version: &str,
    schema_dir: Option<&Path>,
) -> Result<LoadedSchema, SchemaError> {
    for candidate in version_candidates(version) {
        if let Some(dir) = schema_dir {
            let path = dir.join(format!("{candidate}.toml"));
            match std::fs::read_to_string(&path) {
                Ok(raw) => {
                    let source = format!("file:{}", path.display());
                    let schema = parse_schema(&raw, &source)?;
                    debug!(%candidate, %source, "loaded schema");
                    return Ok(LoadedSchema {
                        matched: candidate,
                        source,
                        schema,
                    });
                }
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(SchemaError::Io { path, source }),
            }
        }
        if let Some(raw) = embedded_schema(&candidate) {
            let schema = parse_schema(raw, &format!("embedded:{candidate}"))?;
            debug!(%candidate, "loaded embedded schema");
            return Ok(LoadedSchema {
                matched: candidate,
                source: "embedded".to_string(),
                schema,
            });
        }
    }

    Err(SchemaError::UnsupportedVersion {
        version: version.trim().to_string(),
    })
}

fn embedded_schema(candidate: &str) -> Option<&'static str> {
    match candidate {
        "23.7" => Some(include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/schemas/23.7.toml"
        ))),
        "24.1" => Some(include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/schemas/24.1.toml"
        ))),
        "24.7" => Some(include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/schemas/24.7.toml"
        ))),
        "25.1" => Some(include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/schemas/25.1.toml"
        ))),
        _ => None,
    }
}

/// Parse schema TOML; shape errors become [`SchemaError::Misconfigured`].
pub fn parse_schema(raw: &str, origin: &str) -> Result<VersionSchema, SchemaError> {
    let schema =
        toml::from_str::<VersionSchema>(raw).map_err(|err| SchemaError::Misconfigured {
            origin: origin.to_string(),
            message: err.message().to_string(),
        })?;

    for (name, context) in schema.contexts.iter() {
        if let Some(setting) = context
            .collections
            .keys()
            .find(|setting| context.settings.get(setting).is_none())
        {
            return Err(SchemaError::Misconfigured {
                origin: origin.to_string(),
                message: format!(
                    "context '{name}' declares a collection on unknown setting '{setting}'"
                ),
            });
        }
    }
    Ok(schema)
}

/// Setting resolution for one module over its declared contexts.
#[derive(Debug, Clone)]
pub struct VersionedSchema {
    version: String,
    module: String,
    source: String,
    contexts: Vec<(String, ContextSchema)>,
}

impl VersionedSchema {
    /// Select `module` and `contexts` from a loaded schema.
    ///
    /// The module's own context is always searched first. Every named context
    /// must exist for the version.
    pub fn resolve(
        loaded: &LoadedSchema,
        version: &str,
        module: &str,
        contexts: &[&str],
    ) -> Result<Self, SchemaError> {
        let mut names: Vec<&str> = vec![module];
        names.extend(contexts.iter().copied().filter(|c| *c != module));

        let mut resolved = Vec::with_capacity(names.len());
        for name in names {
            if resolved.iter().any(|(n, _): &(String, ContextSchema)| n == name) {
                continue;
            }
            let context = loaded.schema.contexts.get(name).ok_or_else(|| {
                SchemaError::UnsupportedContext {
                    context: name.to_string(),
                    version: version.to_string(),
                }
            })?;
            resolved.push((name.to_string(), context.clone()));
        }

        Ok(Self {
            version: version.to_string(),
            module: module.to_string(),
            source: loaded.source.clone(),
            contexts: resolved,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// `embedded` or `file:<path>`.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Contexts in search order.
    pub fn contexts(&self) -> impl Iterator<Item = (&str, &ContextSchema)> {
        self.contexts.iter().map(|(name, ctx)| (name.as_str(), ctx))
    }

    /// Path of `setting` in the first context that declares it.
    pub fn resolve_setting(&self, setting: &str) -> Result<&str, SchemaError> {
        self.contexts
            .iter()
            .find_map(|(_, ctx)| ctx.settings.get(setting))
            .map(String::as_str)
            .ok_or_else(|| SchemaError::UnsupportedSetting {
                setting: setting.to_string(),
                module: self.module.clone(),
                version: self.version.clone(),
            })
    }

    /// Every `(context, setting, path)` triple in declaration order.
    pub fn settings(&self) -> Vec<(&str, &str, &str)> {
        self.contexts
            .iter()
            .flat_map(|(ctx_name, ctx)| {
                ctx.settings
                    .iter()
                    .map(move |(name, path)| (ctx_name.as_str(), name, path.as_str()))
            })
            .collect()
    }

    fn module_context(&self) -> &ContextSchema {
        // resolve() always places the module context first
        &self.contexts[0].1
    }

    pub fn php_requirements(&self) -> Result<&[String], SchemaError> {
        self.module_context()
            .php_requirements
            .as_deref()
            .ok_or_else(|| self.missing("php_requirements"))
    }

    pub fn configure_functions(&self) -> Result<&OrderedMap<ConfigureFunction>, SchemaError> {
        self.module_context()
            .configure_functions
            .as_ref()
            .ok_or_else(|| self.missing("configure_functions"))
    }

    fn missing(&self, definition: &'static str) -> SchemaError {
        SchemaError::MissingDefinition {
            module: self.module.clone(),
            definition,
            version: self.version.clone(),
        }
    }
}
