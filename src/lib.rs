//! The `signed_url` crate produces and verifies tamper-evident URLs.
//!
//! A signed URL carries an HMAC-SHA256 signature over its scheme, host, path, and query string in
//! a `_hash` query parameter. Any change to those components invalidates the signature. Two
//! optional policies can be embedded before signing:
//!
//! * an expiration instant (`_expires`), after which the URL is rejected even though its signature
//!   is intact, and
//! * a single-use token digest (`_token`), which binds the URL to a caller-supplied value (such as
//!   a password hash). Once that value changes, every URL minted with the old value is rejected.
//!
//! The secret is never embedded in a URL, and only a keyed digest of the single-use token is.
//!
//! # Workflow
//! 1. Create a [`SigningSecret`] and a [`UrlSigner`] (or a [`SignedUrlConfig`] for the HTTP
//!    adapter).
//! 2. Sign URLs with [`UrlSigner::sign`], or with [`UrlSigner::sign_with`] to embed an
//!    expiration or single-use token.
//! 3. Verify incoming URLs with a [`Verifier`], or wrap a Tower service with
//!    [`SignedUrlVerifierService`] to verify every request routed to it.
//!
//! ## Example
//! ```rust
//! use chrono::{DateTime, Duration, Utc};
//! use signed_url::{SignOptions, SignedUrlError, SigningSecret, UrlSigner, Verifier};
//! use std::str::FromStr;
//!
//! let signer = UrlSigner::new(SigningSecret::from_str("S3CRET").unwrap());
//!
//! // Normally you would use `sign_with` instead of `sign_with_at`.
//! // We're pinning this to a specific time for testing purposes.
//! let now = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
//! let options = SignOptions::builder()
//!     .expires(Duration::seconds(3600))
//!     .single_use_token("hash_v1")
//!     .build()
//!     .unwrap();
//! let url = signer.sign_with_at("https://example.com/reset?id=42", &options, now).unwrap();
//!
//! let verifier = Verifier::new(signer);
//! verifier.verify_at(url.as_str(), Some("hash_v1".into()), now).unwrap();
//!
//! // Once the password hash changes, the link is dead.
//! assert!(matches!(
//!     verifier.verify_at(url.as_str(), Some("hash_v2".into()), now),
//!     Err(SignedUrlError::SingleUseReplayed { .. })
//! ));
//! ```
#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod canonical;
mod config;
mod constants;
mod crypto;
mod error;
mod secret;
mod service;
mod signer;
mod token;
mod verifier;

pub use {
    canonical::{SignedRequest, UrlParts, UrlPartsBuilder, UrlPartsBuilderError},
    config::{SignedUrlConfig, SignedUrlConfigBuilder, SignedUrlConfigBuilderError},
    error::{SecretError, SignedUrlError},
    secret::SigningSecret,
    service::{ErrorMapper, SignedUrlVerifierService, StatusErrorMapper, TokenExtractor, VerifiedUrl},
    signer::{Expiration, SignOptions, SignOptionsBuilder, SignOptionsBuilderError, UrlSigner},
    token::SingleUseToken,
    verifier::{CurrentRequest, Verifier},
};
