use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// The error taxonomy from the error-handling design: transport failures,
/// protocol violations, the no-leader case, persistence failures, and
/// fatal configuration errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("leader not found, please retry after election")]
    NoLeader,

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("fatal configuration error: {0}")]
    FatalConfig(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn transport(msg: impl Into<String>) -> Self {
        Error::Transport(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Error::Protocol(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Error::Persistence(msg.into())
    }

    /// Transport failures are the ones worth a retry or a dead-peer mark;
    /// everything else is surfaced to the caller as-is.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Io(_))
    }
}
