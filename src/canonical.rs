//! Canonicalization functionality for signature generation and validation.
//!
//! A URL is split into its components without decoding or reordering anything; the signature is
//! computed over those components exactly as they were received.
//!
//! **Stability of this module is not guaranteed except for items exposed at the crate root**.
//! The functions are subject to change in minor/patch versions. Enable the `unstable` feature to
//! expose them for testing.

use {
    crate::constants::*,
    derive_builder::Builder,
    http::{
        header::{HeaderMap, HOST},
        request::Parts,
        uri::Uri,
        Request,
    },
    lazy_static::lazy_static,
    qualifier_attr::qualifiers,
    regex::Regex,
    std::{
        borrow::Cow,
        fmt::{Display, Formatter, Result as FmtResult},
    },
};

lazy_static! {
    /// URI reference splitter from RFC 3986, appendix B.
    static ref URI_REFERENCE: Regex =
        Regex::new(r"(?s)^(?:([^:/?#]+):)?(?://([^/?#]*))?([^?#]*)(?:\?([^#]*))?(?:#(.*))?$").unwrap();
}

/// The components of a URL that take part in its signature.
///
/// Parsing a string into `UrlParts` is lossless except that an empty path after a host becomes `/`
/// (RFC 3986, section 6.2.3), as it does for an HTTP request target. The query string is kept raw;
/// it is never decoded or reordered.
#[derive(Builder, Clone, Debug, Default, Eq, PartialEq)]
#[builder(default)]
pub struct UrlParts {
    /// The scheme (`https`), without the trailing colon.
    #[builder(setter(into, strip_option))]
    scheme: Option<String>,

    /// The authority (`example.com:8443`).
    #[builder(setter(into, strip_option))]
    host: Option<String>,

    /// The path prefix under which the application is mounted, if any.
    #[builder(setter(into))]
    base_path: String,

    /// The path relative to the base path.
    #[builder(setter(into))]
    path_info: String,

    /// The raw query string, without the leading `?`.
    #[builder(setter(into, strip_option))]
    query: Option<String>,

    /// The fragment, without the leading `#`. This never takes part in the signature.
    #[builder(setter(into, strip_option))]
    fragment: Option<String>,
}

impl UrlParts {
    /// Create a [UrlPartsBuilder] to construct a [UrlParts].
    #[inline]
    pub fn builder() -> UrlPartsBuilder {
        UrlPartsBuilder::default()
    }

    /// Split a URL string (absolute or relative) into its components.
    pub fn parse(url: &str) -> Self {
        let Some(cap) = URI_REFERENCE.captures(url) else {
            // The splitter matches every string; keep the whole thing as a path just in case.
            return Self {
                path_info: url.to_string(),
                ..Default::default()
            };
        };

        let get = |i: usize| cap.get(i).map(|m| m.as_str().to_string());
        let host = get(2);
        let mut path_info = get(3).unwrap_or_default();
        if host.is_some() && path_info.is_empty() {
            path_info.push('/');
        }

        Self {
            scheme: get(1),
            host,
            base_path: String::new(),
            path_info,
            query: get(4),
            fragment: get(5),
        }
    }

    /// Rebuild the URL of an HTTP request.
    ///
    /// The scheme and host are taken from the request URI when it is in absolute form. Otherwise
    /// the host comes from the `Host` header and the scheme is `default_scheme`.
    pub fn from_request_parts(parts: &Parts, default_scheme: &str) -> Self {
        Self::from_uri_and_headers(&parts.uri, &parts.headers, default_scheme)
    }

    fn from_uri_and_headers(uri: &Uri, headers: &HeaderMap, default_scheme: &str) -> Self {
        let scheme = uri.scheme_str().unwrap_or(default_scheme).to_string();
        let host = match uri.authority() {
            Some(authority) => Some(authority.as_str().to_string()),
            None => headers.get(HOST).and_then(|h| h.to_str().ok()).map(|h| h.to_string()),
        };

        Self {
            scheme: Some(scheme),
            host,
            base_path: String::new(),
            path_info: uri.path().to_string(),
            query: uri.query().map(|q| q.to_string()),
            fragment: None,
        }
    }

    /// Retrieve the scheme.
    #[inline]
    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// Retrieve the host (authority).
    #[inline]
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Retrieve the base path.
    #[inline]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Retrieve the path relative to the base path.
    #[inline]
    pub fn path_info(&self) -> &str {
        &self.path_info
    }

    /// Retrieve the raw query string.
    #[inline]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Retrieve the fragment.
    #[inline]
    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// Return a copy of these parts with the query string replaced.
    pub(crate) fn with_query(&self, query: String) -> Self {
        Self {
            query: Some(query),
            ..self.clone()
        }
    }

    /// Get the string the signature is computed over: scheme, host, base path, path info, and the
    /// raw query string (if not empty). The fragment is excluded.
    pub fn canonical_string(&self) -> String {
        let mut result = self.prefix();

        if let Some(query) = self.query() {
            if !query.is_empty() {
                result.push('?');
                result.push_str(query);
            }
        }

        result
    }

    /// Everything before the query string.
    fn prefix(&self) -> String {
        let mut result = String::new();

        if let Some(scheme) = self.scheme() {
            result.push_str(scheme);
            result.push(':');
        }

        if let Some(host) = self.host() {
            result.push_str("//");
            result.push_str(host);
        }

        result.push_str(self.base_path());
        result.push_str(self.path_info());
        result
    }
}

impl Display for UrlParts {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        f.write_str(&self.prefix())?;

        if let Some(query) = self.query() {
            write!(f, "?{}", query)?;
        }

        if let Some(fragment) = self.fragment() {
            write!(f, "#{}", fragment)?;
        }

        Ok(())
    }
}

/// A URL or request that can be checked for a signature.
///
/// HTTP-layer collaborators adapt their native request type by producing the [`UrlParts`] the
/// request was received on.
pub trait SignedRequest {
    /// The components of the URL as received.
    fn url_parts(&self) -> Cow<'_, UrlParts>;
}

impl SignedRequest for UrlParts {
    fn url_parts(&self) -> Cow<'_, UrlParts> {
        Cow::Borrowed(self)
    }
}

impl SignedRequest for str {
    fn url_parts(&self) -> Cow<'_, UrlParts> {
        Cow::Owned(UrlParts::parse(self))
    }
}

impl SignedRequest for String {
    fn url_parts(&self) -> Cow<'_, UrlParts> {
        Cow::Owned(UrlParts::parse(self))
    }
}

/// Requests in origin form are assumed to have arrived over `https`. Use
/// [`UrlParts::from_request_parts`] to choose another scheme.
impl SignedRequest for Parts {
    fn url_parts(&self) -> Cow<'_, UrlParts> {
        Cow::Owned(UrlParts::from_request_parts(self, DEFAULT_SCHEME))
    }
}

impl<B> SignedRequest for Request<B> {
    fn url_parts(&self) -> Cow<'_, UrlParts> {
        Cow::Owned(UrlParts::from_uri_and_headers(self.uri(), self.headers(), DEFAULT_SCHEME))
    }
}

/// Append `key=value` to a raw query string. Neither is escaped; the caller is responsible for
/// passing encoded values.

#[cfg_attr(any(doc, feature = "unstable"), qualifiers(pub))]
#[cfg_attr(not(any(doc, feature = "unstable")), qualifiers(pub(crate)))]
fn append_query_parameter(query: Option<&str>, key: &str, value: &str) -> String {
    let mut result = String::with_capacity(query.map(str::len).unwrap_or(0) + key.len() + value.len() + 2);

    if let Some(query) = query {
        if !query.is_empty() {
            result.push_str(query);
            result.push('&');
        }
    }

    result.push_str(key);
    result.push('=');
    result.push_str(value);
    result
}

/// Split a raw query string into its `key=value` pairs as raw slices. Empty components are kept
/// so the original string can be rebuilt byte for byte.

#[cfg_attr(any(doc, feature = "unstable"), qualifiers(pub))]
#[cfg_attr(not(any(doc, feature = "unstable")), qualifiers(pub(crate)))]
fn query_pairs(query: &str) -> impl Iterator<Item = (&str, &str)> {
    query.split('&').map(|component| component.split_once('=').unwrap_or((component, "")))
}

/// Remove the signature parameter from a raw query string.
///
/// Returns the remaining query string, in its original order, and the raw (still encoded)
/// signature. If the signature parameter is missing or appears more than once, `None` is returned.

#[cfg_attr(any(doc, feature = "unstable"), qualifiers(pub))]
#[cfg_attr(not(any(doc, feature = "unstable")), qualifiers(pub(crate)))]
fn split_signature(query: &str) -> Option<(String, &str)> {
    let mut signature = None;
    let mut remaining = Vec::new();

    for component in query.split('&') {
        match component.split_once('=') {
            Some((QP_HASH, value)) => {
                if signature.replace(value).is_some() {
                    return None;
                }
            }
            _ => remaining.push(component),
        }
    }

    signature.map(|signature| (remaining.join("&"), signature))
}

/// Remove every signature parameter from a raw query string, keeping the other components in
/// their original order.

#[cfg_attr(any(doc, feature = "unstable"), qualifiers(pub))]
#[cfg_attr(not(any(doc, feature = "unstable")), qualifiers(pub(crate)))]
fn remove_signature(query: &str) -> String {
    query
        .split('&')
        .filter(|component| !matches!(component.split_once('='), Some((QP_HASH, _))))
        .collect::<Vec<_>>()
        .join("&")
}

/// Return the decoded value of the last occurrence of `key` in a raw query string. Keys are
/// compared after decoding. Values that cannot be decoded are skipped.

#[cfg_attr(any(doc, feature = "unstable"), qualifiers(pub))]
#[cfg_attr(not(any(doc, feature = "unstable")), qualifiers(pub(crate)))]
fn query_parameter(query: &str, key: &str) -> Option<String> {
    query_pairs(query)
        .filter(|(k, _)| unescape_form_encoding(k).as_deref() == Some(key))
        .filter_map(|(_, v)| unescape_form_encoding(v))
        .last()
}

/// Return the first reserved parameter present in a raw query string.

#[cfg_attr(any(doc, feature = "unstable"), qualifiers(pub))]
#[cfg_attr(not(any(doc, feature = "unstable")), qualifiers(pub(crate)))]
fn find_reserved_parameter(query: &str) -> Option<&'static str> {
    query_pairs(query).find_map(|(k, _)| {
        let key = unescape_form_encoding(k)?;
        RESERVED_QUERY_PARAMETERS.iter().find(|reserved| **reserved == key).copied()
    })
}

/// Indicates whether the given byte is in the RFC 3986 unreserved set.

#[cfg_attr(any(doc, feature = "unstable"), qualifiers(pub))]
#[cfg_attr(not(any(doc, feature = "unstable")), qualifiers(pub(crate)))]
#[inline(always)]
fn is_rfc3986_unreserved(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'-' || c == b'.' || c == b'_' || c == b'~'
}

/// Percent-encode every byte outside of the RFC 3986 unreserved set using uppercase hex digits.

#[cfg_attr(any(doc, feature = "unstable"), qualifiers(pub))]
#[cfg_attr(not(any(doc, feature = "unstable")), qualifiers(pub(crate)))]
fn escape_uri_encoding(s: &str) -> String {
    let mut result = String::with_capacity(s.len());

    for c in s.bytes() {
        if is_rfc3986_unreserved(c) {
            result.push(c as char);
        } else {
            let hex = u8_to_upper_hex(c);
            result.push('%');
            result.push(hex[0] as char);
            result.push(hex[1] as char);
        }
    }

    result
}

/// Decode a form-encoded query string element: `+` becomes a space and percent escapes are
/// decoded.
///
/// Returns `None` on an incomplete or non-hex escape, or if the result is not valid UTF-8.

#[cfg_attr(any(doc, feature = "unstable"), qualifiers(pub))]
#[cfg_attr(not(any(doc, feature = "unstable")), qualifiers(pub(crate)))]
fn unescape_form_encoding(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex_digits = bytes.get(i + 1..i + 3)?;
                result.push(hex_value(hex_digits[0])? << 4 | hex_value(hex_digits[1])?);
                i += 3;
            }
            b'+' => {
                result.push(b' ');
                i += 1;
            }
            c => {
                result.push(c);
                i += 1;
            }
        }
    }

    String::from_utf8(result).ok()
}

/// Convert a single hex digit to its value.
#[inline(always)]
const fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Convert a byte to uppercase hex representation.
#[inline(always)]
const fn u8_to_upper_hex(b: u8) -> [u8; 2] {
    [HEX_DIGITS_UPPER[((b >> 4) & 0xf) as usize], HEX_DIGITS_UPPER[(b & 0xf) as usize]]
}
