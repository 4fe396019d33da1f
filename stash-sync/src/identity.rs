//! Caller-supplied authentication.

use std::future::Future;

use async_trait::async_trait;

/// Resolves the identity sent to the remote mirror.
///
/// Every sync operation resolves the identity first and fails with
/// [`SyncError::NotAuthenticated`](crate::SyncError::NotAuthenticated)
/// when there is none.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The current opaque identity, or `None` when signed out.
    async fn identity(&self) -> Option<String>;
}

#[async_trait]
impl<F, Fut> IdentityProvider for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Option<String>> + Send,
{
    async fn identity(&self) -> Option<String> {
        (self)().await
    }
}

/// A fixed identity, or a fixed absence of one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticIdentity(Option<String>);

impl StaticIdentity {
    /// Always resolve to `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    /// Never resolve.
    pub fn anonymous() -> Self {
        Self(None)
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn identity(&self) -> Option<String> {
        self.0.clone()
    }
}
