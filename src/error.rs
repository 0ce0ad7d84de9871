//! Top-level error type. Fatal startup faults (§7) propagate through this
//! type up to `main`; per-datagram and per-message faults are logged and
//! swallowed at the point they occur and never reach here.

use std::fmt;
use std::io;

use crate::codec::CodecError;

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Codec(CodecError),
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "i/o error: {e}"),
            Self::Codec(e) => write!(f, "codec error: {e}"),
            Self::Config(e) => write!(f, "configuration error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Codec(e) => Some(e),
            Self::Config(e) => Some(e),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    InvalidImpNumber(String),
    NameTooLong(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "could not read topology file: {e}"),
            Self::InvalidImpNumber(s) => write!(f, "invalid IMP number in topology line: {s:?}"),
            Self::NameTooLong(s) => write!(f, "IMP name longer than 31 bytes: {s:?}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
