//! Error types for wgconf

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for wgconf
#[derive(Error, Debug)]
pub enum WgConfError {
    /// Malformed configuration text
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Document missing a required field at write time
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Provisioning and document management errors
    #[error("Provision error: {0}")]
    Provision(#[from] ProvisionError),

    /// System I/O errors
    #[error("System error: {0}")]
    System(#[from] std::io::Error),
}

/// Configuration text that could not be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {message}: \"{content}\"")]
pub struct ParseError {
    /// 1-indexed line number
    pub line: usize,
    /// The offending line, trimmed
    pub content: String,
    pub message: String,
}

impl ParseError {
    pub(crate) fn new(line: usize, content: &str, message: impl Into<String>) -> Self {
        Self {
            line,
            content: content.to_string(),
            message: message.into(),
        }
    }
}

/// Document rejected before any text is produced
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} field cannot be empty in {section}")]
    MissingField { section: String, field: &'static str },
}

/// Failures of the external key-generation collaborator
#[derive(Error, Debug)]
pub enum KeygenError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    Exit {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("`{command}` produced no usable output")]
    EmptyOutput { command: String },

    #[error("`{command}` did not finish within {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("Invalid base64 key: expected 32 bytes")]
    InvalidKey,
}

/// Provisioning and document management errors
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("interface configuration file {} does not exist or is not a readable file", path.display())]
    NotFound { path: PathBuf },

    #[error("interface configuration file {} already exists", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("key generation failed: {0}")]
    KeygenFailed(#[from] KeygenError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid network CIDR: {value}")]
    InvalidNetwork { value: String },

    #[error("no peer matches {selector}")]
    PeerNotFound { selector: String },

    #[error("{count} peers match {selector}, refusing to remove")]
    AmbiguousPeer { selector: String, count: usize },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WgConfError {
    /// Get a user-friendly error message with suggested action
    pub fn user_message(&self) -> String {
        match self {
            Self::Provision(ProvisionError::NotFound { path }) => {
                format!(
                    "Configuration file not found: {}\n  Check the path and try again.",
                    path.display()
                )
            }

            Self::Provision(ProvisionError::AlreadyExists { path }) => {
                format!(
                    "Configuration file already exists: {}\n  \
                    Remove it first or choose another path.",
                    path.display()
                )
            }

            Self::Provision(ProvisionError::KeygenFailed(KeygenError::Spawn { command, .. })) => {
                format!(
                    "Could not run `{}`.\n  \
                    Install wireguard-tools, pass --wg <path>, or use --native-keys.",
                    command
                )
            }

            Self::Provision(ProvisionError::Parse(e)) | Self::Parse(e) => {
                format!("Invalid configuration at line {}: {}\n  {}", e.line, e.message, e.content)
            }

            _ => format!("{}", self),
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Parse(_) | Self::Validation(_) => 1,
            Self::Provision(ProvisionError::Parse(_) | ProvisionError::Validation(_)) => 1,
            Self::Provision(ProvisionError::NotFound { .. }) => 2,
            Self::Provision(ProvisionError::KeygenFailed(_)) => 3,
            Self::Provision(ProvisionError::Io { .. }) | Self::System(_) => 5,
            Self::Provision(_) => 4,
        }
    }
}

/// Result type alias for wgconf operations
pub type Result<T> = std::result::Result<T, WgConfError>;
