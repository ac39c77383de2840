//! Error handling for the Annox CLI

use annox_core::{AlignError, DnaError};
use thiserror::Error;

/// Main error type for Annox CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Input/Output error: {message}")]
    Io { message: String },

    #[error("Invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("Cannot decode alignment string: {message}")]
    Decode { message: String },

    #[error("Cannot apply variation: {message}")]
    Variation { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },
}

impl CliError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io { message: message.into() }
    }

    pub fn invalid_argument<S: Into<String>>(name: S, message: S) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into() }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("TOML parsing error: {}", err))
    }
}

impl From<toml::ser::Error> for CliError {
    fn from(err: toml::ser::Error) -> Self {
        Self::config(format!("TOML serialization error: {}", err))
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::io(format!("JSON serialization error: {}", err))
    }
}

impl From<AlignError> for CliError {
    fn from(err: AlignError) -> Self {
        Self::Decode { message: err.to_string() }
    }
}

impl From<DnaError> for CliError {
    fn from(err: DnaError) -> Self {
        Self::Variation { message: err.to_string() }
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Provide helpful error messages and suggestions
pub fn format_error_with_suggestions(error: &CliError) -> String {
    let mut message = error.to_string();

    match error {
        CliError::Decode { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Check that --format matches the string's dialect\n\
                 • BAM CIGAR hard clips (H) cannot be projected onto coordinates\n\
                 • Use 'annox convert' to see how the string canonicalises",
            );
        }

        CliError::Variation { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Edits are written old>new, e.g. AC>A, >AT or G>-\n\
                 • Insertions span the two bases either side of the insertion point\n\
                 • Substitutions and deletions must span exactly the replaced bases",
            );
        }

        CliError::Config { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Check your annox.toml configuration file\n\
                 • Use 'annox config --example' to generate a sample configuration\n\
                 • Verify that all configuration values are valid",
            );
        }

        _ => {}
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = CliError::config("test message");
        assert!(matches!(err, CliError::Config { .. }));
        assert_eq!(err.to_string(), "Configuration error: test message");
    }

    #[test]
    fn test_error_suggestions() {
        let err: CliError = AlignError::HardClip.into();
        let formatted = format_error_with_suggestions(&err);
        assert!(formatted.contains("Suggestions:"));
        assert!(formatted.contains("hard clips"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err: CliError = io_err.into();
        assert!(matches!(cli_err, CliError::Io { .. }));
    }
}
