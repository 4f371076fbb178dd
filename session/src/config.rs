//! Engine configuration.

use crate::SessionResult;
use serde::Deserialize;
use tessera_deployer::DeployOptions;
use tessera_query::LoadingMode;

/// Deployment and loading defaults of an `Engine`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub deploy: DeployOptions,
    /// Loading of references not named by a read by id.
    pub default_read_loading: LoadingMode,
    /// Loading of references not named by a query.
    pub default_query_loading: LoadingMode,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> SessionResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_deploy(mut self, deploy: DeployOptions) -> Self {
        self.deploy = deploy;
        self
    }

    pub fn with_read_loading(mut self, mode: LoadingMode) -> Self {
        self.default_read_loading = mode;
        self
    }

    pub fn with_query_loading(mut self, mode: LoadingMode) -> Self {
        self.default_query_loading = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_config_from_json() {
        let config = EngineConfig::from_json(
            r#"{"deploy": {"validate_only": true}, "default_query_loading": "lazy"}"#,
        )
        .unwrap();

        assert!(config.deploy.validate_only);
        assert!(!config.deploy.ignore_validation_errors);
        assert_eq!(config.default_read_loading, LoadingMode::Eager);
        assert_eq!(config.default_query_loading, LoadingMode::Lazy);
    }

    #[test]
    fn test_config_rejects_unknown_mode() {
        let result = EngineConfig::from_json(r#"{"default_read_loading": "sometimes"}"#);

        assert!(matches!(result, Err(crate::SessionError::Config(_))));
    }
}
