//! Error types shared across Clipforge crates.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level error type for Clipforge operations.
#[derive(Debug, thiserror::Error)]
pub enum ClipforgeError {
    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },

    #[error("Not initialized: {message}")]
    NotInitialized { message: String },

    #[error("Invalid file {path}: {message}")]
    InvalidFile { path: PathBuf, message: String },

    #[error("Decode failed: {message}")]
    DecodeFailed { message: String },

    #[error("Encode failed: {message}")]
    EncodeFailed { message: String },

    #[error("Out of memory: {message}")]
    OutOfMemory { message: String },

    #[error("Export failed: {message}")]
    ExportFailed { message: String },

    #[error("Export cancelled")]
    Cancelled,

    #[error("Unknown error: {message}")]
    Unknown { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ClipforgeError.
pub type ClipforgeResult<T> = Result<T, ClipforgeError>;

/// Closed status enumeration reported across the host boundary.
///
/// The integer values are part of the external contract and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,
    InvalidParameter = -1,
    NotInitialized = -2,
    InvalidFile = -3,
    DecodeFailed = -4,
    EncodeFailed = -5,
    OutOfMemory = -6,
    ExportFailed = -7,
    Unknown = -99,
}

impl ErrorCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            -1 => Some(Self::InvalidParameter),
            -2 => Some(Self::NotInitialized),
            -3 => Some(Self::InvalidFile),
            -4 => Some(Self::DecodeFailed),
            -5 => Some(Self::EncodeFailed),
            -6 => Some(Self::OutOfMemory),
            -7 => Some(Self::ExportFailed),
            -99 => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Status for a completed operation.
    pub fn of<T>(result: &ClipforgeResult<T>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(e) => e.code(),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.as_i32())
    }
}

impl ClipforgeError {
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: msg.into(),
        }
    }

    pub fn not_initialized(msg: impl Into<String>) -> Self {
        Self::NotInitialized {
            message: msg.into(),
        }
    }

    pub fn invalid_file(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::InvalidFile {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::DecodeFailed {
            message: msg.into(),
        }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::EncodeFailed {
            message: msg.into(),
        }
    }

    pub fn out_of_memory(msg: impl Into<String>) -> Self {
        Self::OutOfMemory {
            message: msg.into(),
        }
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::ExportFailed {
            message: msg.into(),
        }
    }

    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown {
            message: msg.into(),
        }
    }

    /// Host-facing status code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidParameter { .. } => ErrorCode::InvalidParameter,
            Self::NotInitialized { .. } => ErrorCode::NotInitialized,
            Self::InvalidFile { .. } | Self::Io(_) | Self::Json(_) => ErrorCode::InvalidFile,
            Self::DecodeFailed { .. } => ErrorCode::DecodeFailed,
            Self::EncodeFailed { .. } => ErrorCode::EncodeFailed,
            Self::OutOfMemory { .. } => ErrorCode::OutOfMemory,
            Self::ExportFailed { .. } | Self::Cancelled => ErrorCode::ExportFailed,
            Self::Unknown { .. } | Self::Other(_) => ErrorCode::Unknown,
        }
    }
}
