use derive_more::{Display, From};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Display, From)]
pub enum Error {
    #[from]
    #[display("{_0}")]
    Custom(String),

    #[display("configuration error: {_0}")]
    Config(String),

    #[display("credential error ({label}): {message}")]
    Credential { label: String, message: String },

    #[display("{service} quota exceeded: {message}")]
    QuotaExceeded {
        service: &'static str,
        message: String,
    },

    #[display("{service} request failed with status {status}: {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    // -- Externals
    #[from]
    #[display("io error: {_0}")]
    Io(std::io::Error),

    #[from]
    #[display("json error: {_0}")]
    Json(serde_json::Error),

    #[from]
    #[display("config parse error: {_0}")]
    Toml(toml::de::Error),

    #[from]
    #[display("http error: {_0}")]
    Http(reqwest::Error),
}

/// Coarse classification the archive driver matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    QuotaExceeded,
    Credential,
    Config,
    Transient,
}

impl Error {
    pub fn custom(val: impl std::fmt::Display) -> Self {
        Self::Custom(val.to_string())
    }

    pub fn config(val: impl std::fmt::Display) -> Self {
        Self::Config(val.to_string())
    }

    pub fn credential(label: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Credential {
            label: label.into(),
            message: message.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::QuotaExceeded { .. } => ErrorKind::QuotaExceeded,
            Self::Credential { .. } => ErrorKind::Credential,
            Self::Config(_) | Self::Toml(_) => ErrorKind::Config,
            _ => ErrorKind::Transient,
        }
    }

    pub fn is_quota_exceeded(&self) -> bool {
        self.kind() == ErrorKind::QuotaExceeded
    }
}

impl std::error::Error for Error {}

impl From<&str> for Error {
    fn from(val: &str) -> Self {
        Self::Custom(val.to_string())
    }
}
