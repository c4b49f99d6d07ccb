use std::{
    borrow::Cow,
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
};

/// A single-use token supplied by the caller.
///
/// The token is usually tied to mutable state of the protected resource (for example, the current
/// password hash of the user a reset link was issued for), so a change of that state invalidates
/// every URL minted with the old value.
///
/// A [`Deferred`][SingleUseToken::Deferred] token is only materialized when it is hashed, and the
/// producer is invoked exactly once per hash.
#[derive(Clone)]
pub enum SingleUseToken {
    /// A literal token value.
    Literal(String),

    /// A producer invoked at the moment of use.
    Deferred(Arc<dyn Fn() -> String + Send + Sync>),
}

impl SingleUseToken {
    /// Create a token from a literal value.
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    /// Create a token whose value is produced when it is used.
    pub fn deferred<F>(producer: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self::Deferred(Arc::new(producer))
    }

    /// Indicates whether this is an empty literal. An empty token is treated as no token at all.
    /// Deferred tokens are never empty here since they are not resolved.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Literal(value) if value.is_empty())
    }

    /// Resolve the token to its string form, invoking the producer if this token is deferred.
    pub fn resolve(&self) -> Cow<'_, str> {
        match self {
            Self::Literal(value) => Cow::Borrowed(value.as_str()),
            Self::Deferred(producer) => Cow::Owned(producer()),
        }
    }
}

impl Debug for SingleUseToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Literal(_) => f.write_str("SingleUseToken::Literal"),
            Self::Deferred(_) => f.write_str("SingleUseToken::Deferred"),
        }
    }
}

impl From<&str> for SingleUseToken {
    fn from(value: &str) -> Self {
        Self::literal(value)
    }
}

impl From<String> for SingleUseToken {
    fn from(value: String) -> Self {
        Self::Literal(value)
    }
}

#[cfg(test)]
mod tests {
    use {
        crate::SingleUseToken,
        std::sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
    };

    #[test_log::test]
    fn test_literal() {
        let token = SingleUseToken::from("hash_v1");
        assert_eq!(token.resolve(), "hash_v1");
        assert_eq!(SingleUseToken::from("hash_v1".to_string()).resolve(), "hash_v1");
        assert_eq!(format!("{:?}", token), "SingleUseToken::Literal");
        assert!(!token.is_empty());
        assert!(SingleUseToken::from("").is_empty());
    }

    #[test_log::test]
    fn test_deferred_is_invoked_per_resolve() {
        let calls = Arc::new(AtomicUsize::new(0));
        let producer_calls = calls.clone();
        let token = SingleUseToken::deferred(move || {
            let n = producer_calls.fetch_add(1, Ordering::SeqCst);
            format!("hash_v{}", n + 1)
        });

        assert!(!token.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(token.resolve(), "hash_v1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(token.clone().resolve(), "hash_v2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(format!("{:?}", token), "SingleUseToken::Deferred");
    }
}
