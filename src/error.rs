use std::path::PathBuf;

use thiserror::Error;

/// Main application error type that encompasses all possible failure modes
#[derive(Error, Debug)]
pub enum SanitizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML document error: {0}")]
    Document(#[from] DocumentError),

    #[error("structural precondition violated: {details}")]
    StructuralPrecondition { details: String },

    #[error("checker error: {0}")]
    Checker(#[from] CheckError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("report generation error: {details}")]
    Report { details: String },

    #[error("concurrent operation error: {details}")]
    Concurrency { details: String },
}

impl SanitizeError {
    /// Shorthand for a structural precondition failure.
    ///
    /// These are the fatal-for-one-document assertions of the rule set:
    /// missing `bibliography`, a matched `terms` wrapper that vanished,
    /// more than one surviving `layout`, and the like.
    pub fn precondition(details: impl Into<String>) -> Self {
        SanitizeError::StructuralPrecondition {
            details: details.into(),
        }
    }
}

/// Document-model error types (parsing and serialization)
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("malformed XML: {0}")]
    Malformed(#[from] quick_xml::Error),

    #[error("malformed XML attribute: {0}")]
    MalformedAttribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("XML write error: {0}")]
    Write(#[from] std::io::Error),

    #[error("document has no root element")]
    NoRoot,

    #[error("document has more than one root element")]
    MultipleRoots,

    #[error("unexpected closing tag </{tag}>")]
    UnexpectedClose { tag: String },

    #[error("non UTF-8 content: {details}")]
    Encoding { details: String },
}

/// Checker-specific error types
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("failed to run checker `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("checker produced non UTF-8 output")]
    NonUtf8Output,

    #[error("checker rejected the style but produced no diagnostic line")]
    MissingDiagnostic,
}

/// Configuration-specific error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("invalid configuration value: {field} = {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

impl From<ConfigError> for SanitizeError {
    fn from(err: ConfigError) -> Self {
        SanitizeError::Config(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, SanitizeError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_display() {
        let err = SanitizeError::precondition("missing <bibliography>");
        assert!(err.to_string().contains("structural precondition violated"));
        assert!(err.to_string().contains("missing <bibliography>"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SanitizeError = io_error.into();

        match err {
            SanitizeError::Io(_) => (),
            _ => panic!("Expected SanitizeError::Io"),
        }
    }

    #[test]
    fn test_document_error_conversion() {
        let err: SanitizeError = DocumentError::NoRoot.into();
        match err {
            SanitizeError::Document(DocumentError::NoRoot) => (),
            _ => panic!("Expected SanitizeError::Document"),
        }
        assert!(err.to_string().contains("no root element"));
    }

    #[test]
    fn test_check_error_conversion() {
        let err: SanitizeError = CheckError::MissingDiagnostic.into();
        match err {
            SanitizeError::Checker(_) => (),
            _ => panic!("Expected SanitizeError::Checker"),
        }
    }

    #[test]
    fn test_config_error_conversion() {
        let config_error = ConfigError::InvalidValue {
            field: "threads".to_string(),
            value: "0".to_string(),
            reason: "must be positive".to_string(),
        };
        let err: SanitizeError = config_error.into();
        match err {
            SanitizeError::Config(msg) => {
                assert!(msg.contains("threads"));
                assert!(msg.contains("must be positive"));
            }
            _ => panic!("Expected SanitizeError::Config"),
        }
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error;

        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = SanitizeError::Io(io_error);

        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "file not found");
    }
}
