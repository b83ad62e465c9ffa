//! Context creation from transport credentials.
//!
//! The provider never sees HTTP types: the transport extracts opaque
//! [`Credentials`] and hands them to a [`SessionResolver`]. The resolver has
//! three outcomes, and they stay distinct:
//!
//! - `Ok(Some(session))` - authenticated context
//! - `Ok(None)` - no session, a valid anonymous context
//! - `Err(ResolveError)` - provider unreachable, `AuthenticationUnavailable`
//!
//! # Example
//!
//! ```
//! use procwire_router::context::{ContextProvider, Credentials, Identity, Session, StaticSessions};
//!
//! # block_on(async {
//! let sessions = StaticSessions::new()
//!     .with_session("token-1", Session::new(Identity::new("u-1")));
//! let provider = ContextProvider::new(sessions);
//!
//! let ctx = provider.create_context(&Credentials::bearer("token-1")).await.unwrap();
//! assert!(ctx.is_authenticated());
//!
//! let ctx = provider.create_context(&Credentials::none()).await.unwrap();
//! assert!(!ctx.is_authenticated());
//! # });
//! # fn block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt};
use thiserror::Error;
use tracing::{debug, warn};

use super::{Context, Session};
use crate::error::{Result, RpcError};

/// Opaque credentials extracted by the transport.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    token: Option<String>,
}

impl Credentials {
    /// No credentials presented.
    pub fn none() -> Self {
        Self::default()
    }

    /// Credentials carrying a session or bearer token.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// The presented token, if any.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Identity provider failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ResolveError(pub String);

/// Result of a session lookup.
pub type ResolveResult = std::result::Result<Option<Session>, ResolveError>;

/// Resolves credentials to a session.
pub trait SessionResolver: Send + Sync + 'static {
    /// Look up the session for the given credentials.
    fn resolve<'a>(&'a self, credentials: &'a Credentials) -> BoxFuture<'a, ResolveResult>;
}

/// Creates a [`Context`] per request from transport credentials.
#[derive(Clone)]
pub struct ContextProvider {
    resolver: Arc<dyn SessionResolver>,
}

impl ContextProvider {
    /// Create a provider backed by the given resolver.
    pub fn new(resolver: impl SessionResolver) -> Self {
        Self {
            resolver: Arc::new(resolver),
        }
    }

    /// Create the context for one request.
    ///
    /// # Errors
    ///
    /// `AuthenticationUnavailable` when the resolver fails. A missing session
    /// is not an error.
    pub async fn create_context(&self, credentials: &Credentials) -> Result<Context> {
        match self.resolver.resolve(credentials).await {
            Ok(session) => {
                let ctx = Context::from_session(session);
                debug!(
                    request_id = %ctx.request_id(),
                    authenticated = ctx.is_authenticated(),
                    "Context created"
                );
                Ok(ctx)
            }
            Err(e) => {
                warn!("Session lookup failed: {}", e);
                Err(RpcError::AuthenticationUnavailable(e.0))
            }
        }
    }
}

impl fmt::Debug for ContextProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextProvider").finish_non_exhaustive()
    }
}

/// In-memory token table.
///
/// Unknown tokens and expired sessions resolve to "no session".
#[derive(Debug, Clone, Default)]
pub struct StaticSessions {
    sessions: HashMap<String, Session>,
}

impl StaticSessions {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session (builder style).
    pub fn with_session(mut self, token: impl Into<String>, session: Session) -> Self {
        self.insert(token, session);
        self
    }

    /// Add a session.
    pub fn insert(&mut self, token: impl Into<String>, session: Session) {
        self.sessions.insert(token.into(), session);
    }

    /// Number of known tokens.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn lookup(&self, credentials: &Credentials) -> Option<Session> {
        let session = self.sessions.get(credentials.token()?)?;
        if session.is_expired_at(Utc::now()) {
            debug!("Ignoring expired session for {}", session.user.id);
            return None;
        }
        Some(session.clone())
    }
}

impl SessionResolver for StaticSessions {
    fn resolve<'a>(&'a self, credentials: &'a Credentials) -> BoxFuture<'a, ResolveResult> {
        let session = self.lookup(credentials);
        async move { Ok(session) }.boxed()
    }
}

/// Adapter turning an async closure into a [`SessionResolver`].
pub struct FnResolver<F> {
    resolve: F,
}

impl<F, Fut> FnResolver<F>
where
    F: Fn(Credentials) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ResolveResult> + Send + 'static,
{
    /// Wrap a closure.
    pub fn new(resolve: F) -> Self {
        Self { resolve }
    }
}

impl<F, Fut> SessionResolver for FnResolver<F>
where
    F: Fn(Credentials) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ResolveResult> + Send + 'static,
{
    fn resolve<'a>(&'a self, credentials: &'a Credentials) -> BoxFuture<'a, ResolveResult> {
        (self.resolve)(credentials.clone()).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Identity;
    use chrono::Duration;

    fn ada() -> Session {
        Session::new(Identity::new("u-1").with_name("Ada"))
    }

    #[tokio::test]
    async fn test_known_token_is_authenticated() {
        let provider = ContextProvider::new(StaticSessions::new().with_session("t", ada()));

        let ctx = provider
            .create_context(&Credentials::bearer("t"))
            .await
            .unwrap();
        assert_eq!(ctx.identity().unwrap().name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn test_missing_session_is_not_an_error() {
        let provider = ContextProvider::new(StaticSessions::new().with_session("t", ada()));

        let ctx = provider.create_context(&Credentials::none()).await.unwrap();
        assert!(!ctx.is_authenticated());

        let ctx = provider
            .create_context(&Credentials::bearer("other"))
            .await
            .unwrap();
        assert!(!ctx.is_authenticated());
    }

    #[tokio::test]
    async fn test_expired_session_is_anonymous() {
        let expired = ada().expires_at(Utc::now() - Duration::minutes(5));
        let provider = ContextProvider::new(StaticSessions::new().with_session("t", expired));

        let ctx = provider
            .create_context(&Credentials::bearer("t"))
            .await
            .unwrap();
        assert!(!ctx.is_authenticated());
    }

    #[tokio::test]
    async fn test_resolver_failure_is_authentication_unavailable() {
        let provider = ContextProvider::new(FnResolver::new(|_creds: Credentials| async {
            Err(ResolveError("identity provider timed out".to_string()))
        }));

        let err = provider
            .create_context(&Credentials::bearer("t"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RpcError::AuthenticationUnavailable("identity provider timed out".to_string())
        );
    }

    #[tokio::test]
    async fn test_fn_resolver_sees_credentials() {
        let provider = ContextProvider::new(FnResolver::new(|creds: Credentials| async move {
            Ok(creds
                .token()
                .map(|t| Session::new(Identity::new(t.to_string()))))
        }));

        let ctx = provider
            .create_context(&Credentials::bearer("u-42"))
            .await
            .unwrap();
        assert_eq!(ctx.identity().unwrap().id, "u-42");
    }

    #[test]
    fn test_credentials_debug_redacts_token() {
        let debug = format!("{:?}", Credentials::bearer("secret"));
        assert!(!debug.contains("secret"));
        assert!(debug.contains("redacted"));
    }
}
