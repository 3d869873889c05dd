use serde::{Serialize, Serializer};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("PTY error: {0}")]
    Pty(String),

    #[error("No session running for tool: {0}")]
    NotRunning(String),
}

impl Error {
    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Error::Json {
            path: path.into(),
            source,
        }
    }

    /// True for errors that only mean the process or its pipe was already gone.
    pub fn is_teardown_race(&self) -> bool {
        match self {
            Error::Io(err) => is_closed_pipe(err),
            _ => false,
        }
    }
}

pub(crate) fn is_closed_pipe(err: &io::Error) -> bool {
    if matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe | io::ErrorKind::NotConnected | io::ErrorKind::UnexpectedEof
    ) {
        return true;
    }
    #[cfg(unix)]
    {
        if err.raw_os_error() == Some(libc::ESRCH) {
            return true;
        }
    }
    false
}

// Tauri commands return errors to the frontend as plain strings.
impl Serialize for Error {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<Error> for String {
    fn from(error: Error) -> Self {
        error.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broken_pipe_is_a_teardown_race() {
        let err = Error::from(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
        assert!(err.is_teardown_race());
    }

    #[test]
    fn permission_denied_is_not_a_teardown_race() {
        let err = Error::from(io::Error::new(io::ErrorKind::PermissionDenied, "nope"));
        assert!(!err.is_teardown_race());
        assert!(!Error::NotRunning("Foo".into()).is_teardown_race());
    }

    #[cfg(unix)]
    #[test]
    fn missing_process_is_a_teardown_race() {
        let err = Error::from(io::Error::from_raw_os_error(libc::ESRCH));
        assert!(err.is_teardown_race());
    }

    #[test]
    fn serializes_as_display_string() {
        let err = Error::NotRunning("Foo".into());
        assert_eq!(
            serde_json::to_string(&err).unwrap(),
            "\"No session running for tool: Foo\""
        );
    }
}
