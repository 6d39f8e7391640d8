use crate::error::{Result, SensormeshError};
use crate::models::schema::CalendarGranularity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Set programmatically by the embedding application
    Override,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Override => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has equal or higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() >= self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered configuration for the feature engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Neighbour count of the training builder
    pub k: ConfigValue<usize>,
    /// Neighbour count of the query-point constructor
    pub query_k: ConfigValue<usize>,
    pub variables: ConfigValue<Vec<String>>,
    pub granularity: ConfigValue<CalendarGranularity>,
    pub line_categories: ConfigValue<Vec<String>>,
    pub point_categories: ConfigValue<Vec<String>>,
    /// Suffix merged into linear categories ("primary" also matches "primary_link")
    pub link_suffix: ConfigValue<String>,
    /// Separator after which a variable label carries a suffix to strip
    pub variable_separator: ConfigValue<char>,
    pub parallel: ConfigValue<bool>,
}

impl EngineConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            k: ConfigValue::new(5, ConfigSource::Default),
            query_k: ConfigValue::new(5, ConfigSource::Default),
            variables: ConfigValue::new(Vec::new(), ConfigSource::Default),
            granularity: ConfigValue::new(CalendarGranularity::Daily, ConfigSource::Default),
            line_categories: ConfigValue::new(Vec::new(), ConfigSource::Default),
            point_categories: ConfigValue::new(Vec::new(), ConfigSource::Default),
            link_suffix: ConfigValue::new("_link".to_string(), ConfigSource::Default),
            variable_separator: ConfigValue::new('.', ConfigSource::Default),
            parallel: ConfigValue::new(true, ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| SensormeshError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| SensormeshError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(k) = file_config.k {
            self.k.update(k, ConfigSource::File);
        }
        if let Some(query_k) = file_config.query_k {
            self.query_k.update(query_k, ConfigSource::File);
        }
        if let Some(variables) = file_config.variables {
            self.variables.update(variables, ConfigSource::File);
        }
        if let Some(granularity) = file_config.granularity {
            self.granularity.update(granularity, ConfigSource::File);
        }
        if let Some(lines) = file_config.line_categories {
            self.line_categories.update(lines, ConfigSource::File);
        }
        if let Some(points) = file_config.point_categories {
            self.point_categories.update(points, ConfigSource::File);
        }
        if let Some(suffix) = file_config.link_suffix {
            self.link_suffix.update(suffix, ConfigSource::File);
        }
        if let Some(separator) = file_config.variable_separator {
            self.variable_separator.update(separator, ConfigSource::File);
        }
        if let Some(parallel) = file_config.parallel {
            self.parallel.update(parallel, ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        if let Ok(k_str) = env::var("SENSORMESH_K") {
            match k_str.parse::<usize>() {
                Ok(k) => self.k.update(k, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid SENSORMESH_K value '{}': expected a positive integer",
                    k_str
                ),
            }
        }

        if let Ok(k_str) = env::var("SENSORMESH_QUERY_K") {
            match k_str.parse::<usize>() {
                Ok(k) => self.query_k.update(k, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid SENSORMESH_QUERY_K value '{}': expected a positive integer",
                    k_str
                ),
            }
        }

        if let Ok(variables) = env::var("SENSORMESH_VARIABLES") {
            self.variables.update(parse_list(&variables), ConfigSource::Environment);
        }

        if let Ok(granularity_str) = env::var("SENSORMESH_GRANULARITY") {
            match parse_granularity(&granularity_str) {
                Ok(granularity) => self.granularity.update(granularity, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid SENSORMESH_GRANULARITY value '{}': expected hourly or daily",
                    granularity_str
                ),
            }
        }

        if let Ok(parallel_str) = env::var("SENSORMESH_PARALLEL") {
            match parallel_str.to_lowercase().parse::<bool>() {
                Ok(parallel) => self.parallel.update(parallel, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid SENSORMESH_PARALLEL value '{}': expected true or false",
                    parallel_str
                ),
            }
        }

        self
    }

    /// Apply programmatic overrides
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(k) = overrides.k {
            self.k.update(k, ConfigSource::Override);
        }
        if let Some(query_k) = overrides.query_k {
            self.query_k.update(query_k, ConfigSource::Override);
        }
        if let Some(variables) = overrides.variables {
            self.variables.update(variables, ConfigSource::Override);
        }
        if let Some(granularity) = overrides.granularity {
            self.granularity.update(granularity, ConfigSource::Override);
        }
        if let Some(lines) = overrides.line_categories {
            self.line_categories.update(lines, ConfigSource::Override);
        }
        if let Some(points) = overrides.point_categories {
            self.point_categories.update(points, ConfigSource::Override);
        }
        if let Some(suffix) = overrides.link_suffix {
            self.link_suffix.update(suffix, ConfigSource::Override);
        }
        if let Some(separator) = overrides.variable_separator {
            self.variable_separator.update(separator, ConfigSource::Override);
        }
        if let Some(parallel) = overrides.parallel {
            self.parallel.update(parallel, ConfigSource::Override);
        }
    }

    /// Reject configurations that cannot produce a usable schema
    pub fn validate(&self) -> Result<()> {
        if self.variables.value.is_empty() {
            return Err(SensormeshError::ConfigMissing { key: "variables".to_string() });
        }
        if self.k.value == 0 {
            return Err(SensormeshError::ConfigInvalid {
                key: "k".to_string(),
                reason: "neighbour count must be at least 1".to_string(),
            });
        }
        if self.query_k.value == 0 {
            return Err(SensormeshError::ConfigInvalid {
                key: "query_k".to_string(),
                reason: "neighbour count must be at least 1".to_string(),
            });
        }
        if self.k.value != self.query_k.value {
            tracing::warn!(
                k = self.k.value,
                query_k = self.query_k.value,
                "Training and query neighbour counts differ; query tables will not match training schemas"
            );
        }
        Ok(())
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert("k".to_string(), (self.k.value.to_string(), self.k.source));
        map.insert("query_k".to_string(), (self.query_k.value.to_string(), self.query_k.source));
        map.insert(
            "variables".to_string(),
            (self.variables.value.join(","), self.variables.source),
        );
        map.insert(
            "granularity".to_string(),
            (format!("{:?}", self.granularity.value), self.granularity.source),
        );
        map.insert(
            "line_categories".to_string(),
            (self.line_categories.value.join(","), self.line_categories.source),
        );
        map.insert(
            "point_categories".to_string(),
            (self.point_categories.value.join(","), self.point_categories.source),
        );
        map.insert(
            "link_suffix".to_string(),
            (self.link_suffix.value.clone(), self.link_suffix.source),
        );
        map.insert(
            "variable_separator".to_string(),
            (self.variable_separator.value.to_string(), self.variable_separator.source),
        );
        map.insert("parallel".to_string(), (self.parallel.value.to_string(), self.parallel.source));

        map
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    k: Option<usize>,
    query_k: Option<usize>,
    variables: Option<Vec<String>>,
    granularity: Option<CalendarGranularity>,
    line_categories: Option<Vec<String>>,
    point_categories: Option<Vec<String>>,
    link_suffix: Option<String>,
    variable_separator: Option<char>,
    parallel: Option<bool>,
}

/// Programmatic configuration overrides
#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub k: Option<usize>,
    pub query_k: Option<usize>,
    pub variables: Option<Vec<String>>,
    pub granularity: Option<CalendarGranularity>,
    pub line_categories: Option<Vec<String>>,
    pub point_categories: Option<Vec<String>>,
    pub link_suffix: Option<String>,
    pub variable_separator: Option<char>,
    pub parallel: Option<bool>,
}

/// Parse calendar granularity from string
pub fn parse_granularity(s: &str) -> Result<CalendarGranularity> {
    match s.to_lowercase().as_str() {
        "hourly" | "hour" | "h" => Ok(CalendarGranularity::Hourly),
        "daily" | "day" | "d" => Ok(CalendarGranularity::Daily),
        _ => Err(SensormeshError::ConfigInvalid {
            key: "granularity".to_string(),
            reason: format!("Invalid granularity: {}. Use hourly or daily", s),
        }),
    }
}

/// Split a comma-separated list, trimming blanks
pub fn parse_list(s: &str) -> Vec<String> {
    s.split(',').map(str::trim).filter(|item| !item.is_empty()).map(String::from).collect()
}
