use {
    crate::{
        canonical::query_parameter, constants::*, SignedRequest, SignedUrlError, SingleUseToken, UrlParts, UrlSigner,
    },
    chrono::{DateTime, Utc},
    log::trace,
    std::{
        fmt::{Debug, Formatter, Result as FmtResult},
        sync::Arc,
    },
    subtle::ConstantTimeEq,
};

/// Supplies the request currently being served, for [`Verifier::verify_current`].
pub trait CurrentRequest: Send + Sync {
    /// Return the URL of the request currently being served, if there is one.
    fn current_request(&self) -> Option<UrlParts>;
}

/// Verifies signed URLs: the signature first, then the expiration, then the single-use token.
///
/// Verification stops at the first failing check; each failure is reported as its own
/// [`SignedUrlError`] variant:
///
/// | embedded `_token` | supplied token | outcome |
/// |---|---|---|
/// | no | no | accepted |
/// | yes | no | [`SingleUseMismatch`][SignedUrlError::SingleUseMismatch] |
/// | no | yes | [`SingleUseMismatch`][SignedUrlError::SingleUseMismatch] |
/// | yes | yes | accepted if `hash(token)` matches, else [`SingleUseReplayed`][SignedUrlError::SingleUseReplayed] |
#[derive(Clone)]
pub struct Verifier {
    signer: UrlSigner,
    current_request: Option<Arc<dyn CurrentRequest>>,
}

impl Verifier {
    /// Create a new `Verifier` that checks signatures with the given signer.
    pub fn new(signer: UrlSigner) -> Self {
        Self {
            signer,
            current_request: None,
        }
    }

    /// Install the source of the current request used by [`verify_current`][Self::verify_current].
    pub fn with_current_request<C>(mut self, current_request: C) -> Self
    where
        C: CurrentRequest + 'static,
    {
        self.current_request = Some(Arc::new(current_request));
        self
    }

    /// Retrieve the signer used to check signatures and hash tokens.
    #[inline]
    pub fn signer(&self) -> &UrlSigner {
        &self.signer
    }

    /// Verify a URL or request against the current time.
    ///
    /// `token` is the caller's current single-use token; pass `None` if the URL is not expected to
    /// be single-use.
    pub fn verify<R>(&self, request: &R, token: Option<SingleUseToken>) -> Result<(), SignedUrlError>
    where
        R: SignedRequest + ?Sized,
    {
        self.verify_at(request, token, Utc::now())
    }

    /// Verify a URL or request as of `server_timestamp`.
    ///
    /// # Errors
    /// * [`SignatureMismatch`][SignedUrlError::SignatureMismatch] if the signature is missing,
    ///   malformed, or wrong.
    /// * [`Expired`][SignedUrlError::Expired] if `_expires` is set, nonzero, and earlier than
    ///   `server_timestamp`.
    /// * [`SingleUseMismatch`][SignedUrlError::SingleUseMismatch] if exactly one of the embedded
    ///   token digest and `token` is present.
    /// * [`SingleUseReplayed`][SignedUrlError::SingleUseReplayed] if `token` no longer hashes to
    ///   the embedded digest.
    pub fn verify_at<R>(
        &self,
        request: &R,
        token: Option<SingleUseToken>,
        server_timestamp: DateTime<Utc>,
    ) -> Result<(), SignedUrlError>
    where
        R: SignedRequest + ?Sized,
    {
        let parts = request.url_parts();

        if !self.signer.check(&*parts) {
            return Err(SignedUrlError::SignatureMismatch {
                url: parts.to_string(),
            });
        }

        let query = parts.query().unwrap_or_default();

        let expires = query_parameter(query, QP_EXPIRES).map(|v| parse_leading_int(&v)).unwrap_or(0);
        if expires != 0 && server_timestamp.timestamp() > expires {
            trace!("verify: URL expired at {}; now {}", expires, server_timestamp.timestamp());
            return Err(SignedUrlError::Expired {
                url: parts.to_string(),
                expired_at: DateTime::<Utc>::from_timestamp(expires, 0).unwrap_or_default(),
            });
        }

        let embedded = query_parameter(query, QP_TOKEN).filter(|digest| !digest.is_empty());
        let token = token.filter(|token| !token.is_empty());

        match (embedded, token) {
            (None, None) => Ok(()),
            (Some(_), None) => Err(SignedUrlError::SingleUseMismatch {
                url: parts.to_string(),
                message: MSG_SINGLE_USE_TOKEN_NOT_SUPPLIED,
            }),
            (None, Some(_)) => Err(SignedUrlError::SingleUseMismatch {
                url: parts.to_string(),
                message: MSG_EXPECTED_SINGLE_USE_URL,
            }),
            (Some(embedded), Some(token)) => {
                let expected = self.signer.hash(&token);
                let is_equal: bool = expected.as_bytes().ct_eq(embedded.as_bytes()).into();
                if is_equal {
                    Ok(())
                } else {
                    trace!("verify: single-use token does not match");
                    Err(SignedUrlError::SingleUseReplayed {
                        url: parts.to_string(),
                    })
                }
            }
        }
    }

    /// Verify a URL or request, returning `false` instead of a verification failure.
    pub fn is_verified<R>(&self, request: &R, token: Option<SingleUseToken>) -> bool
    where
        R: SignedRequest + ?Sized,
    {
        self.verify(request, token).is_ok()
    }

    /// Verify the request currently being served.
    ///
    /// # Errors
    /// Returns [`RequestUnavailable`][SignedUrlError::RequestUnavailable] if no
    /// [`CurrentRequest`] is installed or it has no request, and otherwise the errors of
    /// [`verify`][Self::verify].
    pub fn verify_current(&self, token: Option<SingleUseToken>) -> Result<(), SignedUrlError> {
        let request = self
            .current_request
            .as_ref()
            .and_then(|current| current.current_request())
            .ok_or(SignedUrlError::RequestUnavailable)?;

        self.verify(&request, token)
    }

    /// Verify the request currently being served, returning `Ok(false)` instead of a verification
    /// failure.
    ///
    /// # Errors
    /// Returns [`RequestUnavailable`][SignedUrlError::RequestUnavailable] if there is no current
    /// request; this is never converted to `false`.
    pub fn is_current_verified(&self, token: Option<SingleUseToken>) -> Result<bool, SignedUrlError> {
        match self.verify_current(token) {
            Ok(()) => Ok(true),
            Err(e) if e.is_invalid_signature() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Parse the leading integer of a string: optional whitespace, an optional sign, then digits.
/// Anything after the digits is ignored; a string without leading digits is 0. Out of range values
/// saturate.
fn parse_leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut value: i64 = 0;
    for c in digits.bytes().take_while(u8::is_ascii_digit) {
        let digit = i64::from(c - b'0');
        value = if negative {
            value.saturating_mul(10).saturating_sub(digit)
        } else {
            value.saturating_mul(10).saturating_add(digit)
        };
    }

    value
}

impl Debug for Verifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Verifier")
            .field("signer", &self.signer)
            .field("current_request", &self.current_request.is_some())
            .finish()
    }
}
