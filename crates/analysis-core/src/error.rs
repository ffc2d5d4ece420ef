use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Missing data: {0}")]
    MissingData(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Target {0} could not be resolved to a registry id")]
    TargetUnresolved(String),

    #[error("Target {target} did not survive validation: {reason}")]
    TargetRejected { target: String, reason: String },

    #[error("No company survived extraction and validation")]
    NoSurvivors,

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification used to decide whether a failure excludes one
/// company or aborts the whole request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Transient,
    MissingData,
    InvalidData,
    Structural,
    Input,
}

impl AnalysisError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AnalysisError::Network(_) => ErrorCategory::Transient,
            AnalysisError::MissingData(_) => ErrorCategory::MissingData,
            AnalysisError::InvalidData(_) => ErrorCategory::InvalidData,
            AnalysisError::Archive(_)
            | AnalysisError::TargetUnresolved(_)
            | AnalysisError::TargetRejected { .. }
            | AnalysisError::NoSurvivors
            | AnalysisError::MissingColumn(_)
            | AnalysisError::Io(_) => ErrorCategory::Structural,
            AnalysisError::InvalidInput(_) | AnalysisError::Config(_) => ErrorCategory::Input,
        }
    }

    /// Whether the failure only concerns a single company of a batch.
    pub fn is_per_company(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::MissingData | ErrorCategory::InvalidData
        )
    }
}

pub type Result<T, E = AnalysisError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert!(AnalysisError::MissingData("x".into()).is_per_company());
        assert!(AnalysisError::InvalidData("NaN".into()).is_per_company());
        assert!(!AnalysisError::Archive("bad header".into()).is_per_company());
        assert!(!AnalysisError::Network("down".into()).is_per_company());
        assert_eq!(AnalysisError::NoSurvivors.category(), ErrorCategory::Structural);
        assert_eq!(
            AnalysisError::MissingColumn("Sector Average".into()).category(),
            ErrorCategory::Structural
        );
    }
}
