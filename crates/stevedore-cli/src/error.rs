//! CLI error types with exit code handling

use miette::Diagnostic;
use stevedore_convert::ConvertError;
use stevedore_core::CoreError;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Conversion failed
    #[error(transparent)]
    #[diagnostic(transparent)]
    Convert(#[from] ConvertError),

    /// `stevedore labels <name>` with a name outside the vocabulary
    #[error("Unknown label: {name}")]
    #[diagnostic(code(stevedore::cli::unknown_label))]
    UnknownLabel {
        name: String,
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Convert(err) => convert_exit_code(err),
            CliError::UnknownLabel { .. } => exit_codes::ERROR,
        }
    }
}

fn convert_exit_code(err: &ConvertError) -> i32 {
    match err {
        ConvertError::Io(_)
        | ConvertError::FileRead { .. }
        | ConvertError::Core(CoreError::Io(_))
        | ConvertError::Core(CoreError::ComposeNotFound { .. }) => exit_codes::IO_ERROR,
        ConvertError::OutputExists(_) => exit_codes::ERROR,
        err if err.is_internal() => exit_codes::ERROR,
        _ => exit_codes::CONFIG_ERROR,
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
