use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing, unreadable or unparseable persisted configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The incident source rejected the credentials
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The account is not a member of any team, so no incidents can be listed
    #[error("this PagerDuty account ({user}) is not part of any teams. To use this function, the account must be part of at least one team")]
    NoTeams { user: String },

    /// Some per-incident sub-resource fetches failed during a batch
    #[error("Partial fetch: {failed} of {total} {resource} fetches failed: {}", .errors.join("; "))]
    PartialFetch {
        resource: String,
        failed: usize,
        total: usize,
        errors: Vec<String>,
    },

    /// Incident paging was stopped before the last page
    #[error("Interrupted: {0}")]
    Interrupted(String),

    /// A timestamp from the incident source could not be parsed
    #[error("Malformed time in {field}: {value:?}")]
    MalformedTime { field: String, value: String },

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Network errors
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success response from the incident source
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Report template errors
    #[error("Template error: {0}")]
    Template(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn malformed_time(field: impl Into<String>, value: impl Into<String>) -> Self {
        AppError::MalformedTime {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether the error leaves already collected data usable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AppError::PartialFetch { .. })
    }

    /// Process exit code used by the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Configuration(_) => 78,
            AppError::Authentication(_) => 77,
            AppError::NoTeams { .. } => 3,
            AppError::PartialFetch { .. } => 2,
            AppError::Interrupted(_) => 130,
            AppError::MalformedTime { .. } => 65,
            AppError::Validation(_) => 64,
            AppError::NotFound(_) => 4,
            AppError::Network(_) | AppError::Api { .. } => 69,
            AppError::Io(_) => 74,
            AppError::Serialization(_) | AppError::Template(_) | AppError::Internal(_) => 70,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Authentication(_) => "AUTHENTICATION_ERROR",
            AppError::NoTeams { .. } => "NO_TEAMS",
            AppError::PartialFetch { .. } => "PARTIAL_FETCH",
            AppError::Interrupted(_) => "INTERRUPTED",
            AppError::MalformedTime { .. } => "MALFORMED_TIME",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Network(_) => "NETWORK_ERROR",
            AppError::Api { .. } => "API_ERROR",
            AppError::Template(_) => "TEMPLATE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Conversion from serde_json::Error
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Conversion from serde_yaml::Error
impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::Serialization(err.to_string())
        } else {
            AppError::Network(err.to_string())
        }
    }
}

impl From<handlebars::RenderError> for AppError {
    fn from(err: handlebars::RenderError) -> Self {
        AppError::Template(err.to_string())
    }
}

impl From<handlebars::TemplateError> for AppError {
    fn from(err: handlebars::TemplateError) -> Self {
        AppError::Template(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;
