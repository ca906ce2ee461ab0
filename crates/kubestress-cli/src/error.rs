//! Error types for the CLI

/// CLI Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Exit code for a bad invocation or configuration
pub const EXIT_VALIDATION: u8 = 2;
/// Exit code when the client or templates could not be set up
pub const EXIT_CONSTRUCTION: u8 = 3;
/// Exit code when the load run itself failed
pub const EXIT_EXECUTION: u8 = 4;

/// CLI errors, one variant per exit code
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid invocation: {message}")]
    Validation { message: String },

    #[error("setup failed: {source}")]
    Construction {
        #[source]
        source: kubestress_common::Error,
    },

    #[error("load failed: {message}")]
    Execution { message: String },
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    pub fn construction(source: kubestress_common::Error) -> Self {
        Error::Construction { source }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Error::Execution {
            message: message.into(),
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Validation { .. } => EXIT_VALIDATION,
            Error::Construction { .. } => EXIT_CONSTRUCTION,
            Error::Execution { .. } => EXIT_EXECUTION,
        }
    }
}
