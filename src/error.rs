use {
    crate::constants::*,
    chrono::{DateTime, Utc},
    http::status::StatusCode,
    scratchstack_errors::ServiceError,
    std::{
        error::Error,
        fmt::{Display, Formatter, Result as FmtResult},
    },
};

/// Error returned when a signed URL cannot be produced or fails verification.
///
/// The first four variants are verification failures; use
/// [`is_invalid_signature`][SignedUrlError::is_invalid_signature] to tell them apart from the
/// infrastructure errors, which the boolean convenience wrappers never swallow.
#[derive(Debug)]
#[non_exhaustive]
pub enum SignedUrlError {
    /// The signature parameter is absent, malformed, or does not match the canonical URL.
    SignatureMismatch {
        /// The URL that failed verification.
        url: String,
    },

    /// The signature is valid but the embedded expiration instant is in the past.
    Expired {
        /// The URL that failed verification.
        url: String,

        /// When the URL expired.
        expired_at: DateTime<Utc>,
    },

    /// The issuer and the verifier disagree on whether the URL is single-use. This is an
    /// integration error rather than a replay.
    SingleUseMismatch {
        /// The URL that failed verification.
        url: String,

        /// Which side of the disagreement was encountered.
        message: &'static str,
    },

    /// The supplied single-use token no longer matches the digest embedded in the URL; the URL has
    /// already been used.
    SingleUseReplayed {
        /// The URL that failed verification.
        url: String,
    },

    /// The current request was requested but none is available.
    RequestUnavailable,

    /// The URL handed in for signing already carries a reserved query parameter.
    ReservedParameter {
        /// The URL that was to be signed.
        url: String,

        /// The reserved parameter that was found.
        parameter: &'static str,
    },
}

impl SignedUrlError {
    /// Indicates whether this is one of the verification failures (as opposed to an
    /// infrastructure error).
    pub fn is_invalid_signature(&self) -> bool {
        matches!(
            self,
            Self::SignatureMismatch { .. }
                | Self::Expired { .. }
                | Self::SingleUseMismatch { .. }
                | Self::SingleUseReplayed { .. }
        )
    }

    /// The URL this error refers to, if any.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::SignatureMismatch { url }
            | Self::Expired { url, .. }
            | Self::SingleUseMismatch { url, .. }
            | Self::SingleUseReplayed { url }
            | Self::ReservedParameter { url, .. } => Some(url),
            Self::RequestUnavailable => None,
        }
    }

    /// The expiration instant of an [`Expired`][SignedUrlError::Expired] error.
    pub fn expired_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Expired { expired_at, .. } => Some(*expired_at),
            _ => None,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::SignatureMismatch { .. } => ERR_CODE_SIGNATURE_DOES_NOT_MATCH,
            Self::Expired { .. } => ERR_CODE_EXPIRED_URL,
            Self::SingleUseMismatch { .. } => ERR_CODE_SINGLE_USE_URL_MISMATCH,
            Self::SingleUseReplayed { .. } => ERR_CODE_SINGLE_USE_URL_ALREADY_USED,
            Self::RequestUnavailable => ERR_CODE_INTERNAL_FAILURE,
            Self::ReservedParameter { .. } => ERR_CODE_RESERVED_QUERY_PARAMETER,
        }
    }

    fn http_status(&self) -> StatusCode {
        match self {
            Self::RequestUnavailable | Self::ReservedParameter { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::FORBIDDEN,
        }
    }
}

impl ServiceError for SignedUrlError {
    fn error_code(&self) -> &'static str {
        SignedUrlError::error_code(self)
    }

    fn http_status(&self) -> StatusCode {
        SignedUrlError::http_status(self)
    }
}

impl Display for SignedUrlError {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::SignatureMismatch { .. } => f.write_str(MSG_URL_SIGNATURE_MISMATCH),
            Self::Expired { expired_at, .. } => write!(f, "{}{}", MSG_URL_EXPIRED, expired_at.to_rfc3339()),
            Self::SingleUseMismatch { message, .. } => f.write_str(message),
            Self::SingleUseReplayed { .. } => f.write_str(MSG_SINGLE_USE_URL_ALREADY_USED),
            Self::RequestUnavailable => f.write_str(MSG_CURRENT_REQUEST_UNAVAILABLE),
            Self::ReservedParameter { parameter, .. } => {
                write!(f, "Query parameter '{}' is reserved and cannot be signed", parameter)
            }
        }
    }
}

impl Error for SignedUrlError {}

/// Error returned when constructing a [`SigningSecret`][crate::SigningSecret] from unusable key
/// material.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SecretError {
    /// The key is empty.
    Empty,
}

impl Display for SecretError {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            SecretError::Empty => f.write_str(MSG_SECRET_EMPTY),
        }
    }
}

impl Error for SecretError {}

#[cfg(test)]
mod tests {
    use {
        crate::{SecretError, SignedUrlError},
        chrono::{DateTime, Utc},
        scratchstack_errors::ServiceError,
    };

    #[test_log::test]
    fn test_error_codes() {
        let e = SignedUrlError::SignatureMismatch {
            url: "https://example.com/".to_string(),
        };
        assert_eq!(e.error_code(), "SignatureDoesNotMatch");
        assert_eq!(e.http_status(), 403);
        assert_eq!(e.to_string(), "URL signature does not match.");
        assert_eq!(e.url(), Some("https://example.com/"));
        assert!(e.expired_at().is_none());
        assert!(e.is_invalid_signature());

        let expired_at = DateTime::<Utc>::from_timestamp(1_600_000_000, 0).unwrap();
        let e = SignedUrlError::Expired {
            url: "https://example.com/".to_string(),
            expired_at,
        };
        assert_eq!(e.error_code(), "ExpiredUrl");
        assert_eq!(e.to_string(), "URL has expired: 2020-09-13T12:26:40+00:00");
        assert_eq!(e.expired_at(), Some(expired_at));
        assert!(e.is_invalid_signature());

        let e = SignedUrlError::SingleUseMismatch {
            url: "/a".to_string(),
            message: "URL is single-use but no token was supplied.",
        };
        assert_eq!(e.error_code(), "SingleUseUrlMismatch");
        assert_eq!(e.to_string(), "URL is single-use but no token was supplied.");
        assert!(e.is_invalid_signature());

        let e = SignedUrlError::SingleUseReplayed {
            url: "/a".to_string(),
        };
        assert_eq!(e.error_code(), "SingleUseUrlAlreadyUsed");
        assert_eq!(e.http_status(), 403);
        assert_eq!(e.to_string(), "Single-use URL has already been used.");
        assert!(e.is_invalid_signature());

        let e = SignedUrlError::RequestUnavailable;
        assert_eq!(e.error_code(), "InternalFailure");
        assert_eq!(e.http_status(), 500);
        assert!(e.url().is_none());
        assert!(!e.is_invalid_signature());

        let e = SignedUrlError::ReservedParameter {
            url: "/a?_hash=1".to_string(),
            parameter: "_hash",
        };
        assert_eq!(e.error_code(), "ReservedQueryParameter");
        assert_eq!(e.http_status(), 500);
        assert_eq!(e.to_string(), "Query parameter '_hash' is reserved and cannot be signed");
        assert!(!e.is_invalid_signature());
    }

    #[test_log::test]
    fn test_secret_error() {
        assert_eq!(SecretError::Empty.to_string(), "Secret is empty");
        assert_eq!(format!("{:?}", SecretError::Empty), "Empty");
    }
}
