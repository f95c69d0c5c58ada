use thiserror::Error;

/// Failure of a single remote call, classified so callers can tell
/// transient problems from ones that need the user.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("no network connection")]
    Offline,

    #[error("not authorized, sign in again")]
    Unauthorized,

    #[error("account limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("not found")]
    NotFound,
}

impl RemoteError {
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => RemoteError::Unauthorized,
            404 => RemoteError::NotFound,
            // Used by the social provider for VIP-only limits (e.g. note count).
            420 => RemoteError::LimitExceeded(message),
            _ => RemoteError::Http { status, message },
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, RemoteError::Unauthorized)
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            RemoteError::Offline
        } else if e.is_decode() {
            RemoteError::Parse(e.to_string())
        } else if let Some(status) = e.status() {
            RemoteError::from_status(status.as_u16(), e.to_string())
        } else {
            RemoteError::Http {
                status: 0,
                message: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(RemoteError::from_status(401, String::new()), RemoteError::Unauthorized);
        assert_eq!(RemoteError::from_status(403, String::new()), RemoteError::Unauthorized);
        assert_eq!(RemoteError::from_status(404, String::new()), RemoteError::NotFound);
        assert!(matches!(
            RemoteError::from_status(420, "notes".to_string()),
            RemoteError::LimitExceeded(_)
        ));
        assert!(matches!(
            RemoteError::from_status(502, String::new()),
            RemoteError::Http { status: 502, .. }
        ));
    }
}
