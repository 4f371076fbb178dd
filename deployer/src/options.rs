//! Deployment options.

use serde::Deserialize;

/// How `Deployer::deploy` treats missing objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeployOptions {
    /// Never issue DDL; report missing objects instead.
    pub validate_only: bool,
    /// Log structural problems and continue instead of failing.
    pub ignore_validation_errors: bool,
}

impl DeployOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_validate_only(mut self, enabled: bool) -> Self {
        self.validate_only = enabled;
        self
    }

    pub fn with_ignore_validation_errors(mut self, enabled: bool) -> Self {
        self.ignore_validation_errors = enabled;
        self
    }
}
