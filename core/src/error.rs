//! Error types for the IRC daemon

use thiserror::Error;

/// Main error type for the IRC daemon
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Configuration serialization error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Message parsing error: {0}")]
    MessageParse(String),

    #[error("Module error: {0}")]
    Module(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("User error: {0}")]
    User(String),

    #[error("Mode letter for {name} is invalid: {letter}")]
    InvalidModeLetter { name: String, letter: char },

    #[error("Mode letter for {name} already used by {other} from {creator}: {letter}")]
    DuplicateModeLetter {
        name: String,
        letter: char,
        other: String,
        creator: String,
    },

    #[error("Mode name {name} already used by {letter} from {creator}")]
    DuplicateModeName {
        name: String,
        letter: char,
        creator: String,
    },

    #[error("Mode prefix for {name} is invalid: {prefix}")]
    InvalidPrefix { name: String, prefix: char },

    #[error("Mode prefix for {name} already used by {other} from {creator}: {prefix}")]
    DuplicatePrefix {
        name: String,
        prefix: char,
        other: String,
        creator: String,
    },

    #[error("Out of mode ids for {0} modes")]
    OutOfModeIds(&'static str),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Generic(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Generic(s)
    }
}
