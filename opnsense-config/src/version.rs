//! Appliance version detection.

use std::process::Command;

use tracing::debug;

use crate::error::{ConfigError, Result};

/// Source of the appliance version string used for schema lookup.
pub trait VersionProvider {
    fn opnsense_version(&self) -> Result<String>;
}

/// Runs `opnsense-version` and returns its trimmed stdout, e.g. `OPNsense 24.1.2_1`.
#[derive(Debug, Clone)]
pub struct OpnsenseVersionCommand {
    program: String,
}

impl Default for OpnsenseVersionCommand {
    fn default() -> Self {
        Self {
            program: "opnsense-version".to_string(),
        }
    }
}

impl OpnsenseVersionCommand {
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl VersionProvider for OpnsenseVersionCommand {
    fn opnsense_version(&self) -> Result<String> {
        let output = Command::new(&self.program)
            .output()
            .map_err(|err| ConfigError::VersionDetection(format!("{}: {err}", self.program)))?;

        if !output.status.success() {
            return Err(ConfigError::VersionDetection(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(%version, "detected appliance version");
        Ok(version)
    }
}

/// A version known up front, for tests and for callers passing `--opnsense-version`.
#[derive(Debug, Clone)]
pub struct FixedVersion(pub String);

impl VersionProvider for FixedVersion {
    fn opnsense_version(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::{FixedVersion, OpnsenseVersionCommand, VersionProvider};
    use crate::error::ConfigError;

    #[test]
    fn fixed_version_is_returned_verbatim() {
        let provider = FixedVersion("OPNsense 24.1".to_string());
        assert_eq!(provider.opnsense_version().expect("version"), "OPNsense 24.1");
    }

    #[test]
    fn missing_program_is_a_detection_error() {
        let provider = OpnsenseVersionCommand::with_program("/nonexistent/opnsense-version");
        let err = provider.opnsense_version().expect_err("no such program");
        assert!(matches!(err, ConfigError::VersionDetection(_)));
    }
}
