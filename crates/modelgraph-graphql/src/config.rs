//! GraphQL configuration.
//!
//! This module provides configuration options for the generated schema.
//! Configuration can be specified in a TOML file under the `[graphql]` section.
//!
//! # Example Configuration
//!
//! ```toml
//! [graphql]
//! max_depth = 15
//! max_complexity = 500
//! introspection = true
//! max_batch_size = 100
//! warn_on_unfiltered_writes = true
//! ```

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// GraphQL schema configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQLConfig {
    /// Maximum query depth allowed.
    /// Default: 15
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Maximum query complexity allowed.
    /// Default: 500
    #[serde(default = "default_max_complexity")]
    pub max_complexity: usize,

    /// Enable GraphQL introspection queries.
    /// Default: true
    #[serde(default = "default_introspection")]
    pub introspection: bool,

    /// Upper bound on the number of items one `create<Model>s` call may carry.
    /// 0 disables the check.
    /// Default: 100
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Log a warning whenever an update or delete runs without filters and
    /// therefore touches every row.
    /// Default: true
    #[serde(default = "default_warn_on_unfiltered_writes")]
    pub warn_on_unfiltered_writes: bool,
}

fn default_max_depth() -> usize {
    15
}

fn default_max_complexity() -> usize {
    500
}

fn default_introspection() -> bool {
    true
}

fn default_max_batch_size() -> usize {
    100
}

fn default_warn_on_unfiltered_writes() -> bool {
    true
}

impl Default for GraphQLConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_complexity: default_max_complexity(),
            introspection: default_introspection(),
            max_batch_size: default_max_batch_size(),
            warn_on_unfiltered_writes: default_warn_on_unfiltered_writes(),
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    #[serde(default)]
    graphql: GraphQLConfig,
}

impl GraphQLConfig {
    /// Parses the `[graphql]` section of a TOML document and validates it.
    ///
    /// A document without the section yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::InvalidConfig` for malformed TOML or invalid values.
    pub fn from_toml_str(source: &str) -> Result<Self, SchemaError> {
        let file: ConfigFile =
            toml::from_str(source).map_err(|e| SchemaError::InvalidConfig(e.to_string()))?;
        file.graphql.validate()?;
        Ok(file.graphql)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration values are invalid.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.max_depth == 0 {
            return Err(SchemaError::InvalidConfig(
                "graphql.max_depth must be > 0".into(),
            ));
        }
        if self.max_complexity == 0 {
            return Err(SchemaError::InvalidConfig(
                "graphql.max_complexity must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Converts this config to a SchemaBuilderConfig.
    #[must_use]
    pub fn to_schema_builder_config(&self) -> crate::SchemaBuilderConfig {
        crate::SchemaBuilderConfig {
            max_depth: self.max_depth,
            max_complexity: self.max_complexity,
            introspection_enabled: self.introspection,
            max_batch_size: self.max_batch_size,
            warn_on_unfiltered_writes: self.warn_on_unfiltered_writes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GraphQLConfig::default();
        assert_eq!(config.max_depth, 15);
        assert_eq!(config.max_complexity, 500);
        assert!(config.introspection);
        assert_eq!(config.max_batch_size, 100);
        assert!(config.warn_on_unfiltered_writes);
    }

    #[test]
    fn test_valid_config() {
        let config = GraphQLConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_max_depth() {
        let config = GraphQLConfig {
            max_depth: 0,
            ..GraphQLConfig::default()
        };
        assert!(matches!(config.validate(), Err(SchemaError::InvalidConfig(_))));
    }

    #[test]
    fn test_invalid_max_complexity() {
        let config = GraphQLConfig {
            max_complexity: 0,
            ..GraphQLConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_batch_size_disables_check() {
        let config = GraphQLConfig {
            max_batch_size: 0,
            ..GraphQLConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_from_toml() {
        let toml = r#"
            max_depth = 20
            max_complexity = 1000
            introspection = false
        "#;

        let config: GraphQLConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.max_depth, 20);
        assert_eq!(config.max_complexity, 1000);
        assert!(!config.introspection);
        assert_eq!(config.max_batch_size, 100);
    }

    #[test]
    fn test_from_toml_section() {
        let config = GraphQLConfig::from_toml_str(
            r#"
            [server]
            port = 8080

            [graphql]
            max_batch_size = 5
            warn_on_unfiltered_writes = false
            "#,
        )
        .unwrap();
        assert_eq!(config.max_batch_size, 5);
        assert!(!config.warn_on_unfiltered_writes);

        let config = GraphQLConfig::from_toml_str("").unwrap();
        assert_eq!(config.max_depth, 15);

        let err = GraphQLConfig::from_toml_str("[graphql]\nmax_depth = 0").unwrap_err();
        assert!(err.to_string().contains("max_depth"));
    }

    #[test]
    fn test_to_schema_builder_config() {
        let config = GraphQLConfig {
            introspection: false,
            ..GraphQLConfig::default()
        };
        let builder_config = config.to_schema_builder_config();
        assert!(!builder_config.introspection_enabled);
        assert_eq!(builder_config.max_depth, 15);
    }
}
