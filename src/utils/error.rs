use thiserror::Error;

#[derive(Error, Debug)]
pub enum SatLinkError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

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

    #[error("Failed to parse file {file} at line {line}: {reason}")]
    ScheduleParseError {
        file: String,
        line: usize,
        reason: String,
    },

    #[error("No schedule data found: {message}")]
    NoScheduleDataError { message: String },

    #[error("Result integrity check failed: {message}")]
    IntegrityError { message: String },

    #[error("Archive assembly failed: {message}")]
    ArchiveError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Integrity,
    Storage,
    Archive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl SatLinkError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            Self::ScheduleParseError { .. } | Self::NoScheduleDataError { .. } => {
                ErrorCategory::Input
            }
            Self::IntegrityError { .. } => ErrorCategory::Integrity,
            Self::IoError(_) | Self::CsvError(_) | Self::SerializationError(_) => {
                ErrorCategory::Storage
            }
            Self::ZipError(_) | Self::ArchiveError { .. } => ErrorCategory::Archive,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration => ErrorSeverity::Medium,
            ErrorCategory::Input | ErrorCategory::Integrity => ErrorSeverity::High,
            ErrorCategory::Storage | ErrorCategory::Archive => ErrorSeverity::Critical,
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ConfigError { message } => format!("Configuration problem: {}", message),
            Self::ConfigValidationError { field, message } => {
                format!("Setting '{}' is invalid: {}", field, message)
            }
            Self::InvalidConfigValueError { field, value, reason } => {
                format!("Setting '{}' has invalid value '{}': {}", field, value, reason)
            }
            Self::ScheduleParseError { file, line, .. } => {
                format!("Could not read access report {} (line {})", file, line)
            }
            Self::NoScheduleDataError { message } => format!("Nothing to schedule: {}", message),
            Self::IntegrityError { message } => {
                format!("The computed plan is inconsistent: {}", message)
            }
            Self::IoError(e) => format!("File operation failed: {}", e),
            Self::CsvError(e) => format!("Failed to write statistics: {}", e),
            Self::SerializationError(e) => format!("Failed to write run summary: {}", e),
            Self::ZipError(e) => format!("Archive could not be processed: {}", e),
            Self::ArchiveError { message } => format!("Archive could not be built: {}", message),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::ConfigError { .. } | Self::ConfigValidationError { .. } => {
                "Check satlink.toml syntax or pass --config with a valid file"
            }
            Self::InvalidConfigValueError { .. } => {
                "Fix the reported setting in satlink.toml and run again"
            }
            Self::ScheduleParseError { .. } => {
                "Make sure the report was exported with the configured date format and fixed-width columns"
            }
            Self::NoScheduleDataError { .. } => {
                "Verify the input directories and file name prefixes in the [input] section"
            }
            Self::IntegrityError { .. } => {
                "Remove duplicated or overlapping windows from the input reports"
            }
            Self::IoError(_) | Self::CsvError(_) | Self::SerializationError(_) => {
                "Check that output directories are writable and the disk is not full"
            }
            Self::ZipError(_) | Self::ArchiveError { .. } => {
                "Check that every bundle input exists and archives are valid zip files"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, SatLinkError>;

/// Exit code for an error reaching the binary edge. Context added on the way
/// up is looked through; errors from outside the crate exit with 1.
pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<SatLinkError>()
        .map_or(1, SatLinkError::exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_drives_exit_code() {
        let config = SatLinkError::ConfigError {
            message: "bad".to_string(),
        };
        assert_eq!(config.category(), ErrorCategory::Configuration);
        assert_eq!(config.exit_code(), 2);

        let integrity = SatLinkError::IntegrityError {
            message: "overlap".to_string(),
        };
        assert_eq!(integrity.severity(), ErrorSeverity::High);
        assert_eq!(integrity.exit_code(), 1);

        let io = SatLinkError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(io.category(), ErrorCategory::Storage);
        assert_eq!(io.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_for_wrapped_errors() {
        use anyhow::Context;

        let bundled: std::result::Result<(), SatLinkError> =
            Err(SatLinkError::ZipError(zip::result::ZipError::FileNotFound));
        let err = bundled
            .with_context(|| "failed to add deps/lib.jar".to_string())
            .unwrap_err();
        assert_eq!(exit_code_for(&err), 3);

        let config = anyhow::Error::from(SatLinkError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: "expected `]`".to_string(),
        });
        assert_eq!(exit_code_for(&config), 2);
        assert_eq!(exit_code_for(&config.context("loading satlink.toml")), 2);

        assert_eq!(exit_code_for(&anyhow::anyhow!("unexpected")), 1);
    }

    #[test]
    fn test_parse_error_message_names_file_and_line() {
        let err = SatLinkError::ScheduleParseError {
            file: "Facility-Anadyr1.txt".to_string(),
            line: 12,
            reason: "bad date".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to parse file Facility-Anadyr1.txt at line 12: bad date"
        );
        assert!(err.user_friendly_message().contains("line 12"));
    }
}
