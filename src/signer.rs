use {
    crate::{
        canonical::{
            append_query_parameter, escape_uri_encoding, find_reserved_parameter, remove_signature,
            split_signature, unescape_form_encoding,
        },
        constants::*,
        crypto::hmac_sha256_base64,
        SignedRequest, SignedUrlError, SigningSecret, SingleUseToken, UrlParts,
    },
    chrono::{DateTime, Duration, Utc},
    derive_builder::Builder,
    log::trace,
    subtle::ConstantTimeEq,
};

/// When a signed URL stops being valid.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Expiration {
    /// At an absolute instant.
    At(DateTime<Utc>),

    /// After a duration, measured from the moment the URL is signed.
    After(Duration),
}

impl Expiration {
    /// Resolve this expiration to an absolute instant relative to `now`.
    pub fn resolve(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::At(instant) => *instant,
            Self::After(duration) => now.checked_add_signed(*duration).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }
}

impl From<DateTime<Utc>> for Expiration {
    fn from(instant: DateTime<Utc>) -> Self {
        Self::At(instant)
    }
}

impl From<Duration> for Expiration {
    fn from(duration: Duration) -> Self {
        Self::After(duration)
    }
}

/// Policy parameters to embed in a URL when signing it.
///
/// SignOptions structs are immutable. Use [SignOptionsBuilder] to construct them.
#[derive(Builder, Clone, Debug, Default)]
#[builder(default)]
pub struct SignOptions {
    /// When the URL expires. If unset, the URL never expires.
    #[builder(setter(into, strip_option))]
    expires: Option<Expiration>,

    /// The single-use token the URL is bound to, if any.
    #[builder(setter(into, strip_option))]
    single_use_token: Option<SingleUseToken>,
}

impl SignOptions {
    /// Create a [SignOptionsBuilder] to construct a [SignOptions].
    #[inline]
    pub fn builder() -> SignOptionsBuilder {
        SignOptionsBuilder::default()
    }

    /// Retrieve the expiration.
    #[inline]
    pub fn expires(&self) -> Option<Expiration> {
        self.expires
    }

    /// Retrieve the single-use token.
    #[inline]
    pub fn single_use_token(&self) -> Option<&SingleUseToken> {
        self.single_use_token.as_ref()
    }
}

/// Signs URLs and checks URL signatures with a shared secret.
///
/// The signature is `base64(HMAC-SHA256(secret, canonical URL))`, percent-encoded and appended as
/// the last query parameter, `_hash`. See [`UrlParts::canonical_string`] for the canonical form.
///
/// `UrlSigner` holds no state other than the secret; clones share it and may be used from any
/// number of threads.
#[derive(Clone, Debug)]
pub struct UrlSigner {
    secret: SigningSecret,
}

impl UrlSigner {
    /// Create a new `UrlSigner` using the given secret.
    pub fn new(secret: SigningSecret) -> Self {
        Self {
            secret,
        }
    }

    /// Sign a fully assembled URL.
    ///
    /// Any policy parameters (`_expires`, `_token`) must already be present in the URL; see
    /// [`sign_with`][Self::sign_with] to add them. An existing signature is replaced.
    pub fn sign(&self, url: &str) -> String {
        let mut parts = UrlParts::parse(url);
        if let Some(query) = parts.query() {
            parts = parts.with_query(remove_signature(query));
        }

        let signature = self.compute_hash(&parts.canonical_string());
        let query = append_query_parameter(parts.query(), QP_HASH, &escape_uri_encoding(&signature));
        parts.with_query(query).to_string()
    }

    /// Embed the policy parameters from `options` in the URL and sign it, resolving relative
    /// expirations against the current time.
    ///
    /// # Errors
    /// Returns [`SignedUrlError::ReservedParameter`] if the URL already carries `_expires`,
    /// `_token`, or `_hash`.
    pub fn sign_with(&self, url: &str, options: &SignOptions) -> Result<String, SignedUrlError> {
        self.sign_with_at(url, options, Utc::now())
    }

    /// Embed the policy parameters from `options` in the URL and sign it, resolving relative
    /// expirations against `now`.
    ///
    /// # Errors
    /// Returns [`SignedUrlError::ReservedParameter`] if the URL already carries `_expires`,
    /// `_token`, or `_hash`.
    pub fn sign_with_at(
        &self,
        url: &str,
        options: &SignOptions,
        now: DateTime<Utc>,
    ) -> Result<String, SignedUrlError> {
        let parts = UrlParts::parse(url);

        if let Some(parameter) = parts.query().and_then(find_reserved_parameter) {
            return Err(SignedUrlError::ReservedParameter {
                url: url.to_string(),
                parameter,
            });
        }

        let mut query = parts.query().map(|q| q.to_string());

        if let Some(expires) = options.expires() {
            let timestamp = expires.resolve(now).timestamp();
            query = Some(append_query_parameter(query.as_deref(), QP_EXPIRES, &timestamp.to_string()));
        }

        if let Some(token) = options.single_use_token().filter(|token| !token.is_empty()) {
            let digest = escape_uri_encoding(&self.hash(token));
            query = Some(append_query_parameter(query.as_deref(), QP_TOKEN, &digest));
        }

        let parts = match query {
            Some(query) => parts.with_query(query),
            None => parts,
        };

        Ok(self.sign(&parts.to_string()))
    }

    /// Check the signature of a URL or request.
    ///
    /// This returns `false` if the signature parameter is missing, appears more than once, or
    /// cannot be decoded, or if it does not match the URL. Expiration and single-use tokens are
    /// not examined here; see [`Verifier`][crate::Verifier].
    pub fn check<R>(&self, request: &R) -> bool
    where
        R: SignedRequest + ?Sized,
    {
        let parts = request.url_parts();
        let Some(query) = parts.query() else {
            trace!("check: URL has no query string");
            return false;
        };

        let Some((unsigned_query, signature)) = split_signature(query) else {
            trace!("check: URL does not carry exactly one {} parameter", QP_HASH);
            return false;
        };

        let Some(signature) = unescape_form_encoding(signature) else {
            trace!("check: signature is not properly encoded");
            return false;
        };

        let canonical = parts.with_query(unsigned_query).canonical_string();
        trace!("String to sign: {}", canonical);

        let expected = self.compute_hash(&canonical);
        let is_equal: bool = signature.as_bytes().ct_eq(expected.as_bytes()).into();
        if !is_equal {
            trace!("check: signature mismatch");
        }

        is_equal
    }

    /// Hash a single-use token: `base64(HMAC-SHA256(secret, token))`.
    ///
    /// Deferred tokens are resolved here, exactly once per call.
    pub fn hash(&self, token: &SingleUseToken) -> String {
        self.compute_hash(&token.resolve())
    }

    fn compute_hash(&self, value: &str) -> String {
        hmac_sha256_base64(self.secret.as_ref(), value.as_bytes())
    }
}
