use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
///
/// Failures inside a pipeline step are reported as envelope errors instead;
/// these variants stop the command before an envelope exists.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] brentscope_core::ValidationError),

    #[error(transparent)]
    Config(#[from] brentscope_core::CoreError),

    #[error("strict mode failed: warnings={warning_count}, errors={error_count}")]
    StrictModeViolation {
        warning_count: usize,
        error_count: usize,
    },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Config(_) => 2,
            Self::Serialization(_) => 4,
            Self::StrictModeViolation { .. } => 5,
            Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        let strict = CliError::StrictModeViolation {
            warning_count: 1,
            error_count: 0,
        };
        assert_eq!(strict.exit_code(), 5);
        assert_eq!(
            CliError::from(brentscope_core::ValidationError::NoIndicators).exit_code(),
            2
        );
        assert_eq!(
            CliError::from(brentscope_core::CoreError::Config("bad".into())).exit_code(),
            2
        );
    }
}
