use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Cannot reach target {url}: {reason}")]
    Connectivity { url: String, reason: String },

    #[error("Target returned HTTP {status} for {url}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("Failed to decode profile: {0}")]
    Decode(String),

    #[error("Symbolization failed: {0}")]
    Symbolization(String),

    #[error("Missing symbol table in {path}")]
    MissingSymbols { path: String },

    #[error("Invalid filter '{pattern}': {reason}")]
    InvalidFilter { pattern: String, reason: String },

    #[error("Unknown profile kind: {0}")]
    UnknownKind(String),

    #[error("Graph layout failed: {0}")]
    Render(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INVALID_ARGUMENTS: i32 = 2;
    pub const TARGET_UNREACHABLE: i32 = 3;
    pub const BAD_PROFILE: i32 = 4;
    pub const RENDER_FAILED: i32 = 5;
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Connectivity { .. } | Error::Status { .. } => exit_code::TARGET_UNREACHABLE,
            Error::Decode(_) | Error::Symbolization(_) => exit_code::BAD_PROFILE,
            Error::InvalidFilter { .. } | Error::InvalidArgument(_) | Error::UnknownKind(_) => {
                exit_code::INVALID_ARGUMENTS
            }
            Error::Render(_) => exit_code::RENDER_FAILED,
            _ => exit_code::GENERAL_ERROR,
        }
    }

    /// Whether retrying the same command or request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Connectivity { .. } | Error::Status { .. })
    }
}
