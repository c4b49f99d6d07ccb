use {
    crate::{constants::*, SigningSecret, StatusErrorMapper, UrlSigner, Verifier},
    derive_builder::Builder,
    http::status::StatusCode,
};

/// Settings shared by the signer, the verifier, and the HTTP adapter.
///
/// SignedUrlConfig structs are immutable. Use [SignedUrlConfigBuilder] to construct them.
#[derive(Builder, Clone, Debug)]
pub struct SignedUrlConfig {
    /// The secret used to sign URLs and hash single-use tokens.
    secret: SigningSecret,

    /// Whether [`SignedUrlVerifierService`][crate::SignedUrlVerifierService] verifies requests. When
    /// disabled, requests are passed through unchecked.
    #[builder(default)]
    route_verification: bool,

    /// The scheme assumed for requests received in origin form.
    #[builder(default = "DEFAULT_SCHEME.to_string()", setter(into))]
    default_scheme: String,

    /// The status returned for requests that fail verification.
    #[builder(default = "StatusCode::FORBIDDEN")]
    failure_status: StatusCode,
}

impl SignedUrlConfig {
    /// Create a [SignedUrlConfigBuilder] to construct a [SignedUrlConfig].
    #[inline]
    pub fn builder() -> SignedUrlConfigBuilder {
        SignedUrlConfigBuilder::default()
    }

    /// Retrieve the signing secret.
    #[inline]
    pub fn secret(&self) -> &SigningSecret {
        &self.secret
    }

    /// Indicates whether route-level verification is enabled.
    #[inline]
    pub fn route_verification(&self) -> bool {
        self.route_verification
    }

    /// Retrieve the scheme assumed for origin-form requests.
    #[inline]
    pub fn default_scheme(&self) -> &str {
        &self.default_scheme
    }

    /// Retrieve the status returned for requests that fail verification.
    #[inline]
    pub fn failure_status(&self) -> StatusCode {
        self.failure_status
    }

    /// Create a signer using the configured secret.
    pub fn signer(&self) -> UrlSigner {
        UrlSigner::new(self.secret.clone())
    }

    /// Create a verifier using the configured secret.
    pub fn verifier(&self) -> Verifier {
        Verifier::new(self.signer())
    }

    /// Create an error mapper that answers failed verifications with the configured status.
    pub fn error_mapper(&self) -> StatusErrorMapper {
        StatusErrorMapper::new(self.failure_status)
    }
}
