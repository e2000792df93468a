use crate::domain::model::LookupOptions;
use crate::utils::error::{ResolverError, Result};
use crate::utils::validation::{
    validate_database_url, validate_non_empty_string, validate_positive_number, validate_range,
    validate_required_field, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub cache: CacheConfig,
    pub database: DatabaseConfig,
    pub geocoding: GeocodingConfig,
    pub lookup: LookupConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_size: 1000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub query_timeout_ms: u64,
    /// Fuzzy rows scoring below this are discarded.
    pub min_similarity: f64,
    pub candidate_limit: usize,
    pub create_schema: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 5,
            query_timeout_ms: 2000,
            min_similarity: 0.75,
            candidate_limit: 20,
            create_schema: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodingConfig {
    pub enabled: bool,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
    /// Used when the provider does not expose a relevance score.
    pub default_confidence: f64,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            api_key: None,
            timeout_seconds: 5,
            default_confidence: 0.6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    pub prefer_metro: bool,
    pub fuzzy: bool,
    pub max_results: usize,
}

impl Default for LookupConfig {
    fn default() -> Self {
        let options = LookupOptions::default();
        Self {
            prefer_metro: options.prefer_metro,
            fuzzy: options.fuzzy,
            max_results: options.max_results,
        }
    }
}

impl LookupConfig {
    pub fn to_options(&self) -> LookupOptions {
        LookupOptions {
            prefer_metro: self.prefer_metro,
            fuzzy: self.fuzzy,
            max_results: self.max_results,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl ResolverConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ResolverError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${GEOCODER_API_KEY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ResolverError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_positive_number("cache.max_size", self.cache.max_size, 1)?;

        validate_database_url("database.url", &self.database.url)?;
        validate_positive_number("database.max_connections", self.database.max_connections as usize, 1)?;
        validate_positive_number("database.query_timeout_ms", self.database.query_timeout_ms as usize, 1)?;
        validate_positive_number("database.candidate_limit", self.database.candidate_limit, 1)?;
        if self.database.min_similarity <= 0.0 {
            return Err(ResolverError::InvalidConfigValueError {
                field: "database.min_similarity".to_string(),
                value: self.database.min_similarity.to_string(),
                reason: "Value must be greater than 0".to_string(),
            });
        }
        validate_range("database.min_similarity", self.database.min_similarity, 0.0, 1.0)?;

        if self.geocoding.enabled {
            let endpoint = validate_required_field("geocoding.endpoint", &self.geocoding.endpoint)?;
            validate_url("geocoding.endpoint", endpoint)?;
            validate_positive_number("geocoding.timeout_seconds", self.geocoding.timeout_seconds as usize, 1)?;
        }
        if self.geocoding.default_confidence <= 0.0 {
            return Err(ResolverError::InvalidConfigValueError {
                field: "geocoding.default_confidence".to_string(),
                value: self.geocoding.default_confidence.to_string(),
                reason: "Value must be greater than 0".to_string(),
            });
        }
        validate_range("geocoding.default_confidence", self.geocoding.default_confidence, 0.0, 1.0)?;

        self.lookup.to_options().validate()?;

        validate_non_empty_string("logging.level", &self.logging.level)?;
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(ResolverError::InvalidConfigValueError {
                field: "logging.level".to_string(),
                value: self.logging.level.clone(),
                reason: format!("Unsupported level. Valid levels: {}", valid_levels.join(", ")),
            });
        }

        Ok(())
    }
}

impl Validate for ResolverConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ResolverConfig::from_toml_str("").unwrap();
        assert_eq!(config.cache.max_size, 1000);
        assert_eq!(config.database.url, "sqlite::memory:");
        assert!(!config.geocoding.enabled);
        assert_eq!(config.lookup.to_options(), LookupOptions::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[cache]
max_size = 250

[database]
url = "sqlite://airports.db"
query_timeout_ms = 500
min_similarity = 0.8

[geocoding]
enabled = true
endpoint = "https://geo.example.com/v1/locations"
timeout_seconds = 3

[lookup]
prefer_metro = false
max_results = 3
"#;

        let config = ResolverConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.cache.max_size, 250);
        assert_eq!(config.database.query_timeout_ms, 500);
        assert_eq!(config.database.candidate_limit, 20);
        assert!(config.geocoding.enabled);
        assert!(!config.lookup.prefer_metro);
        assert!(config.lookup.fuzzy);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TEST_GEOCODER_KEY", "abc123");

        let toml_content = r#"
[geocoding]
api_key = "${TEST_GEOCODER_KEY}"
"#;

        let config = ResolverConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.geocoding.api_key.as_deref(), Some("abc123"));

        std::env::remove_var("TEST_GEOCODER_KEY");
    }

    #[test]
    fn test_config_validation() {
        let enabled_without_endpoint = ResolverConfig::from_toml_str("[geocoding]\nenabled = true\n").unwrap();
        assert!(enabled_without_endpoint.validate().is_err());

        let bad_endpoint = ResolverConfig::from_toml_str(
            "[geocoding]\nenabled = true\nendpoint = \"invalid-url\"\n",
        )
        .unwrap();
        assert!(bad_endpoint.validate().is_err());

        let zero_cache = ResolverConfig::from_toml_str("[cache]\nmax_size = 0\n").unwrap();
        assert!(zero_cache.validate().is_err());

        let too_many = ResolverConfig::from_toml_str("[lookup]\nmax_results = 500\n").unwrap();
        assert!(too_many.validate().is_err());

        let postgres = ResolverConfig::from_toml_str("[database]\nurl = \"postgres://x\"\n").unwrap();
        assert!(postgres.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = ResolverConfig::from_toml_str("[cache\nmax_size = ").unwrap_err();
        assert!(matches!(err, ResolverError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[cache]\nmax_size = 42\n\n[logging]\nlevel = \"debug\"\n")
            .unwrap();

        let config = ResolverConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.cache.max_size, 42);
        assert_eq!(config.logging.level, "debug");
    }
}
