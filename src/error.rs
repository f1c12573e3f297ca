use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    ConfigValidation(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("authentication required: {0}")]
    AuthRequired(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("remote read failed: {0}")]
    RemoteRead(String),

    #[error("remote write failed: {0}")]
    RemoteWrite(String),

    #[error("http {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("session error: {0}")]
    Session(String),
}

impl Error {
    /// True for HTTP responses that mean the credentials are missing or stale.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::HttpStatus { status: 401 | 403, .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
