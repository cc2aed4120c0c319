//! Unified error type.

use std::fmt;

/// The error type returned by metron's fallible operations.
///
/// Application-level errors (404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, and the access logger never fails
/// at all: a field it cannot resolve is rendered empty. This type surfaces
/// infrastructure failures only, such as binding to a port.
#[derive(Debug)]
pub enum Error {
    /// Socket-level failure while binding or accepting.
    Io(std::io::Error),
    /// The address given to [`Server::bind`](crate::Server::bind) is not a
    /// valid `host:port` pair.
    InvalidAddr(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e)           => write!(f, "io: {e}"),
            Self::InvalidAddr(a)  => write!(f, "invalid socket address `{a}`"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e)          => Some(e),
            Self::InvalidAddr(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_bad_address() {
        let err = Error::InvalidAddr("nope".to_owned());
        assert_eq!(err.to_string(), "invalid socket address `nope`");
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn io_errors_keep_their_source() {
        let err = Error::from(std::io::Error::other("boom"));
        assert_eq!(err.to_string(), "io: boom");
        assert!(std::error::Error::source(&err).is_some());
    }
}
