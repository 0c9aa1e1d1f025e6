use thiserror::Error;

/// Classifies geo-IP data errors for programmatic matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoErrorKind {
    /// File open/read/write failure
    FileError,
    /// Data format error (missing column, unusable record, etc.)
    InvalidData,
}

/// Haconf error types
#[derive(Error, Debug)]
pub enum HaconfError {
    #[error("Parse error at row {row}: {message}")]
    ParseErrorAtRow { row: usize, message: String },

    #[error("Inconsistent ACL definition at row {row}: Accept and Reject both contain ALL")]
    ConflictingWildcards { row: usize },

    #[error("Redirect target at row {row} has no SNI value")]
    MissingRedirectSni { row: usize },

    #[error("Redirect target at row {row} needs an http frontend, port {port} is '{service_type}'")]
    RedirectOnTcpFrontend {
        row: usize,
        port: u16,
        service_type: String,
    },

    #[error("ACL name {name} already names '{existing}', cannot reuse it for '{requested}'")]
    AclNameCollision {
        name: String,
        existing: String,
        requested: String,
    },

    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("GeoIP data error: {message}")]
    GeoDataError { kind: GeoErrorKind, message: String },

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

impl HaconfError {
    /// True for errors raised while folding service rows into the model.
    ///
    /// These invalidate the whole run: nothing is written.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            HaconfError::ConflictingWildcards { .. }
                | HaconfError::MissingRedirectSni { .. }
                | HaconfError::RedirectOnTcpFrontend { .. }
                | HaconfError::AclNameCollision { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, HaconfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_error_kind_is_matchable() {
        let err = HaconfError::GeoDataError {
            kind: GeoErrorKind::FileError,
            message: "Failed to open blocks file".into(),
        };
        match &err {
            HaconfError::GeoDataError { kind, .. } => {
                assert!(matches!(kind, GeoErrorKind::FileError));
            }
            _ => panic!("expected GeoDataError"),
        }
    }

    #[test]
    fn test_conflict_display_names_row() {
        let err = HaconfError::ConflictingWildcards { row: 7 };
        let display = format!("{}", err);
        assert!(display.contains("row 7"), "got: {}", display);
    }

    #[test]
    fn test_validation_classification() {
        assert!(HaconfError::ConflictingWildcards { row: 0 }.is_validation());
        assert!(HaconfError::MissingRedirectSni { row: 1 }.is_validation());
        assert!(!HaconfError::UnsupportedInput("x.xlsx".into()).is_validation());
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(!HaconfError::from(io).is_validation());
    }
}
