use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("schema error: {path}: {reason}")]
    Schema { path: String, reason: String },

    #[error("not found: {what} '{id}'")]
    NotFound { what: &'static str, id: String },
}

pub type Result<T> = std::result::Result<T, Error>;
