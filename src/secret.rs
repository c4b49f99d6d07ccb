use {
    crate::SecretError,
    std::{
        fmt::{Debug, Display, Formatter, Result as FmtResult},
        str::FromStr,
        sync::Arc,
    },
};

/// The shared secret used to sign and verify URLs.
///
/// The key is immutable once created and is shared cheaply between clones. Rotating it
/// invalidates every URL issued under the previous key, including those not yet expired.
///
/// The key material is never printed: both `Debug` and `Display` render as `SigningSecret`.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret {
    /// The raw key.
    key: Arc<[u8]>,
}

impl SigningSecret {
    /// Create a new `SigningSecret` from raw key material.
    pub fn new(key: impl AsRef<[u8]>) -> Result<Self, SecretError> {
        let key = key.as_ref();
        if key.is_empty() {
            return Err(SecretError::Empty);
        }

        Ok(Self {
            key: Arc::from(key),
        })
    }
}

impl AsRef<[u8]> for SigningSecret {
    fn as_ref(&self) -> &[u8] {
        &self.key
    }
}

impl Debug for SigningSecret {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("SigningSecret")
    }
}

impl Display for SigningSecret {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("SigningSecret")
    }
}

impl FromStr for SigningSecret {
    type Err = SecretError;

    /// Create a new `SigningSecret` from a string secret.
    fn from_str(raw: &str) -> Result<Self, SecretError> {
        Self::new(raw.as_bytes())
    }
}

impl TryFrom<Vec<u8>> for SigningSecret {
    type Error = SecretError;

    fn try_from(raw: Vec<u8>) -> Result<Self, SecretError> {
        Self::new(raw)
    }
}
