//! Common constants used throughout the crate.
//!
//! Tests that are testing the content of an error code or message should not use these constants;
//! they should use hard-coded strings so the tests are also testing for misspellings.
//!
//! Please keep this file organized alphabetically.

/// Default HTTP scheme used when rebuilding a URL from an origin-form request.
pub(crate) const DEFAULT_SCHEME: &str = "https";

/// Error code: ExpiredUrl
pub(crate) const ERR_CODE_EXPIRED_URL: &str = "ExpiredUrl";

/// Error code: InternalFailure
pub(crate) const ERR_CODE_INTERNAL_FAILURE: &str = "InternalFailure";

/// Error code: ReservedQueryParameter
pub(crate) const ERR_CODE_RESERVED_QUERY_PARAMETER: &str = "ReservedQueryParameter";

/// Error code: SignatureDoesNotMatch
pub(crate) const ERR_CODE_SIGNATURE_DOES_NOT_MATCH: &str = "SignatureDoesNotMatch";

/// Error code: SingleUseUrlAlreadyUsed
pub(crate) const ERR_CODE_SINGLE_USE_URL_ALREADY_USED: &str = "SingleUseUrlAlreadyUsed";

/// Error code: SingleUseUrlMismatch
pub(crate) const ERR_CODE_SINGLE_USE_URL_MISMATCH: &str = "SingleUseUrlMismatch";

/// Uppercase hex digits.
pub(crate) const HEX_DIGITS_UPPER: [u8; 16] =
    [b'0', b'1', b'2', b'3', b'4', b'5', b'6', b'7', b'8', b'9', b'A', b'B', b'C', b'D', b'E', b'F'];

/// Error message: `"The current request is not available."`
pub(crate) const MSG_CURRENT_REQUEST_UNAVAILABLE: &str = "The current request is not available.";

/// Error message: `"Expected a single-use URL but the URL carries no token."`
pub(crate) const MSG_EXPECTED_SINGLE_USE_URL: &str = "Expected a single-use URL but the URL carries no token.";

/// Error message: `"Secret is empty"`
pub(crate) const MSG_SECRET_EMPTY: &str = "Secret is empty";

/// Error message: `"URL is single-use but no token was supplied."`
pub(crate) const MSG_SINGLE_USE_TOKEN_NOT_SUPPLIED: &str = "URL is single-use but no token was supplied.";

/// Error message: `"Single-use URL has already been used."`
pub(crate) const MSG_SINGLE_USE_URL_ALREADY_USED: &str = "Single-use URL has already been used.";

/// Error message prefix: `"URL has expired: "`
pub(crate) const MSG_URL_EXPIRED: &str = "URL has expired: ";

/// Error message: `"URL signature does not match."`
pub(crate) const MSG_URL_SIGNATURE_MISMATCH: &str = "URL signature does not match.";

/// Query parameter carrying the expiration timestamp of a signed URL
pub(crate) const QP_EXPIRES: &str = "_expires";

/// Query parameter carrying the URL signature; always appended last.
pub(crate) const QP_HASH: &str = "_hash";

/// Query parameter carrying the digest of the single-use token
pub(crate) const QP_TOKEN: &str = "_token";

/// Query parameters callers may not supply themselves.
pub(crate) const RESERVED_QUERY_PARAMETERS: [&str; 3] = [QP_EXPIRES, QP_HASH, QP_TOKEN];

/// The length of a SHA-256 digest in bytes.
pub(crate) const SHA256_OUTPUT_LEN: usize = 32;
