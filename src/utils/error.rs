use thiserror::Error;

#[derive(Error, Debug)]
pub enum HousesError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Image encoding error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("API response had no results")]
    EmptyApiResponse,

    #[error("No results in community boundaries")]
    EmptyFilteredResult,

    #[error("Invalid PIN '{pin}': {reason}")]
    InvalidPin { pin: String, reason: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration field '{field}' is invalid: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl HousesError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            HousesError::ApiError(_) => ErrorSeverity::Medium,
            HousesError::InvalidPin { .. }
            | HousesError::EmptyApiResponse
            | HousesError::EmptyFilteredResult
            | HousesError::CsvError(_)
            | HousesError::SerializationError(_)
            | HousesError::ProcessingError { .. }
            | HousesError::ConfigError { .. }
            | HousesError::ConfigValidationError { .. }
            | HousesError::InvalidConfigValueError { .. }
            | HousesError::MissingConfigError { .. } => ErrorSeverity::High,
            HousesError::IoError(_) | HousesError::ZipError(_) | HousesError::ImageError(_) => {
                ErrorSeverity::Critical
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            HousesError::ApiError(e) => format!("無法連線到資料來源: {}", e),
            HousesError::EmptyApiResponse => {
                "The property records API returned no rows for these areas".to_string()
            }
            HousesError::EmptyFilteredResult => {
                "No properties fall inside the requested community areas".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            HousesError::ApiError(_) => "Check network access and the endpoint URLs, then retry",
            HousesError::EmptyApiResponse => {
                "Check the area names are spelled as the city publishes them, or widen the year range"
            }
            HousesError::EmptyFilteredResult => {
                "Raise the results limit; the box query may have been capped before reaching the areas"
            }
            HousesError::InvalidPin { .. } => "PINs must be numeric with at least 8 digits",
            HousesError::ConfigError { .. }
            | HousesError::ConfigValidationError { .. }
            | HousesError::InvalidConfigValueError { .. }
            | HousesError::MissingConfigError { .. } => "Fix the configuration file or CLI flags",
            HousesError::IoError(_) | HousesError::ZipError(_) | HousesError::ImageError(_) => {
                "Check the output path is writable and has free space"
            }
            _ => "Re-run with --verbose for details",
        }
    }
}

pub type Result<T> = std::result::Result<T, HousesError>;
