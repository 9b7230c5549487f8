//! Apply requests: PHP includes plus ordered configure functions.
//!
//! The store only decides what to request. A [`SettingsApplier`] runs it on
//! the appliance; [`PhpApplier`] does so through `php -r`.

use std::process::Command;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ConfigError, Result};
use crate::schema::{ConfigureFunction, VersionedSchema};

/// What to run after a commit for one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyPlan {
    pub php_requirements: Vec<String>,
    pub functions: Vec<ConfigureFunction>,
}

impl ApplyPlan {
    /// Build the plan from the module context; both definitions are required.
    pub fn from_schema(schema: &VersionedSchema) -> Result<Self> {
        let php_requirements = schema.php_requirements()?.to_vec();
        let functions = schema.configure_functions()?.values().cloned().collect();
        Ok(Self {
            php_requirements,
            functions,
        })
    }

    /// PHP snippet that loads every requirement and calls `function`.
    pub fn php_script(&self, function: &ConfigureFunction) -> String {
        let mut script = String::new();
        for requirement in &self.php_requirements {
            script.push_str(&format!("require_once '{requirement}'; "));
        }
        script.push_str(&format!(
            "{}({});",
            function.name,
            function.configure_params.join(", ")
        ));
        script
    }
}

/// Result of one configure function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigureOutput {
    pub function: String,
    pub params: Vec<String>,
    pub rc: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Executes an [`ApplyPlan`] on the appliance.
pub trait SettingsApplier {
    fn apply(&self, plan: &ApplyPlan) -> Result<Vec<ConfigureOutput>>;
}

/// Runs each configure function in its own `php -r` process, in plan order.
#[derive(Debug, Clone)]
pub struct PhpApplier {
    php: String,
}

impl Default for PhpApplier {
    fn default() -> Self {
        Self {
            php: "php".to_string(),
        }
    }
}

impl PhpApplier {
    pub fn with_interpreter(php: impl Into<String>) -> Self {
        Self { php: php.into() }
    }
}

impl SettingsApplier for PhpApplier {
    fn apply(&self, plan: &ApplyPlan) -> Result<Vec<ConfigureOutput>> {
        let mut outputs = Vec::with_capacity(plan.functions.len());
        for function in &plan.functions {
            let script = plan.php_script(function);
            let output = Command::new(&self.php)
                .arg("-r")
                .arg(&script)
                .output()
                .map_err(|err| ConfigError::Apply(format!("{}: {err}", self.php)))?;

            let rc = output.status.code().unwrap_or(-1);
            if rc == 0 {
                info!(function = %function.name, "configure function finished");
            } else {
                warn!(function = %function.name, rc, "configure function failed");
            }
            outputs.push(ConfigureOutput {
                function: function.name.clone(),
                params: function.configure_params.clone(),
                rc,
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }
        Ok(outputs)
    }
}
