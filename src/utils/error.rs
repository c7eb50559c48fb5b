use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parsing error: {message}")]
    Parse { message: String },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Timed out: {operation}")]
    Timeout { operation: String },

    #[error("Element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Notification error: {0}")]
    Notification(String),
}

impl AppError {
    /// Short, stable name of the failure class, used in observation notes.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Http(_) => "Http",
            AppError::Config(_) => "Config",
            AppError::Serialization(_) => "Serialization",
            AppError::Toml(_) => "Toml",
            AppError::Io(_) => "Io",
            AppError::Parse { .. } => "Parse",
            AppError::Browser(_) => "Browser",
            AppError::Navigation { .. } => "Navigation",
            AppError::Timeout { .. } => "Timeout",
            AppError::ElementNotFound { .. } => "ElementNotFound",
            AppError::Validation(_) => "Validation",
            AppError::Notification(_) => "Notification",
        }
    }
}

// Implement conversion from validation errors
impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(format!("{}", err))
    }
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
