use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid count: {0}")]
    InvalidCount(i32),

    #[error("Invalid string length prefix")]
    InvalidStringLength,

    #[error("Invalid UTF-8 string")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("Invalid filter pattern `{pattern}`: {source}")]
    InvalidFilter {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Unable to decode object: {0}")]
    Decode(String),

    #[error("Unable to load {}: {message}", path.display())]
    ContainerLoad { path: PathBuf, message: String },

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Character {0:?} cannot be written to XML")]
    InvalidXmlCharacter(char),

    #[error("MessagePack serialization failed: {0}")]
    MessagePack(String),

    #[error("Location map `{0}` could not be loaded")]
    MapUnavailable(String),

    #[error("{0} identifiers not found")]
    UnresolvedIdentifiers(usize),

    #[error("Build cancelled")]
    Cancelled,

    #[error("Export worker terminated abnormally")]
    ExportWorker,
}

impl From<rmp_serde::encode::Error> for MapError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        MapError::MessagePack(e.to_string())
    }
}

impl From<rmp::encode::ValueWriteError> for MapError {
    fn from(e: rmp::encode::ValueWriteError) -> Self {
        MapError::MessagePack(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MapError>;
