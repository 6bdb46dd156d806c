//! 容器操作错误定义

use dgn_core::CodecError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DgnError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("File already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Duplicate layer name: {0}")]
    DuplicateName(String),

    #[error("Seed file {} is unavailable: {source}", .path.display())]
    SeedUnavailable {
        path: PathBuf,
        #[source]
        source: Box<DgnError>,
    },

    #[error("Unsupported geometry: {0}")]
    UnsupportedGeometry(String),

    #[error("Unsupported symbology: {0}")]
    UnsupportedSymbology(String),

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("Failed to write {}: {source}", .path.display())]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Element ids are exhausted")]
    IdExhausted,

    #[error("Container is opened read-only: {0}")]
    ReadOnly(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("MessagePack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<CodecError> for DgnError {
    fn from(error: CodecError) -> Self {
        match error {
            CodecError::UnsupportedGeometry(msg) => DgnError::UnsupportedGeometry(msg),
            CodecError::UnsupportedSymbology(msg) => DgnError::UnsupportedSymbology(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, DgnError>;
