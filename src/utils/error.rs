use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("No airport or metro area found for \"{query}\"")]
    NotFound { query: String },

    #[error("Upstream {tier} failure: {message}")]
    Upstream { tier: String, message: String },

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    NotFound,
    Upstream,
    Configuration,
    Internal,
}

impl ResolverError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn upstream(tier: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Upstream {
            tier: tier.into(),
            message: message.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidInput { .. } => ErrorCategory::Input,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Upstream { .. } | Self::DatabaseError(_) | Self::ApiError(_) => {
                ErrorCategory::Upstream
            }
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::CsvError(_) | Self::IoError(_) | Self::SerializationError(_) => {
                ErrorCategory::Internal
            }
        }
    }

    pub fn is_upstream(&self) -> bool {
        self.category() == ErrorCategory::Upstream
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::NotFound { query } => format!("Could not resolve \"{}\" to an airport", query),
            Self::InvalidInput { message } => format!("Invalid request: {}", message),
            Self::Upstream { tier, .. } => format!("The {} lookup service is unavailable", tier),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => "Provide a non-empty city name, airport name or IATA code",
            ErrorCategory::NotFound => "Check the spelling or try the 3-letter IATA code",
            ErrorCategory::Upstream => "Retry the lookup; the store or provider may be temporarily down",
            ErrorCategory::Configuration => "Check the TOML configuration file and environment variables",
            ErrorCategory::Internal => "Check file paths and input file formats",
        }
    }

    /// Process exit code used by the CLI.
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Input | ErrorCategory::Configuration => 1,
            ErrorCategory::NotFound => 2,
            ErrorCategory::Upstream | ErrorCategory::Internal => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, ResolverError>;
