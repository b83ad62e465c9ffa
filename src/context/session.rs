//! Session and per-request context values.

use std::sync::Arc;

use axum::http::Extensions;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authenticated user identity as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider-assigned user id.
    pub id: String,
    /// Display name.
    pub name: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Avatar reference (URL).
    pub image: Option<String>,
}

impl Identity {
    /// Create an identity with only an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            email: None,
            image: None,
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the avatar reference.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

/// A resolved session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// The signed-in user.
    pub user: Identity,
    /// Expiry, if the provider reports one.
    pub expires: Option<DateTime<Utc>>,
}

impl Session {
    /// Create a session without expiry.
    pub fn new(user: Identity) -> Self {
        Self {
            user,
            expires: None,
        }
    }

    /// Set the expiry.
    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires = Some(at);
        self
    }

    /// Check whether the session is expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|at| at <= now)
    }
}

/// Per-request context passed through middleware to handlers.
///
/// Created once per inbound request by the
/// [`ContextProvider`](super::ContextProvider) (or directly, for server-side
/// callers and tests). `Context` is cheap to clone; every call of a batch
/// gets its own clone.
///
/// Middleware passes an augmented context down the chain by deriving it from
/// the one it received ([`with_session`](Context::with_session),
/// [`with_extension`](Context::with_extension)). Derived contexts keep the
/// request id and a passed authentication check.
#[derive(Debug, Clone)]
pub struct Context {
    request_id: Uuid,
    session: Option<Arc<Session>>,
    /// Set by the authentication check once the session has been verified.
    authorized: bool,
    extensions: Extensions,
}

impl Context {
    /// Context without a session.
    pub fn anonymous() -> Self {
        Self::from_session(None)
    }

    /// Context carrying the given session.
    pub fn authenticated(session: Session) -> Self {
        Self::from_session(Some(session))
    }

    /// Context from an optional session.
    pub fn from_session(session: Option<Session>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            session: session.map(Arc::new),
            authorized: false,
            extensions: Extensions::new(),
        }
    }

    /// Same request with `session` attached in place of the current one.
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(Arc::new(session));
        self
    }

    /// Same request without a session. Protected handlers further down the
    /// chain reject it.
    pub fn without_session(mut self) -> Self {
        self.session = None;
        self.authorized = false;
        self
    }

    /// Same request with `value` stored in the typed extension slot.
    pub fn with_extension<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.insert(value);
        self
    }

    /// Store `value`, returning the previous value of the same type.
    pub fn insert<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.extensions.insert(value)
    }

    /// Value of type `T` stored by an earlier middleware.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    /// Unique id of the request this context belongs to.
    #[inline]
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// The session, if any.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_deref()
    }

    /// The signed-in user, if any.
    pub fn identity(&self) -> Option<&Identity> {
        self.session().map(|s| &s.user)
    }

    /// Check if a session is present.
    #[inline]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// Check if the authentication check already ran and passed.
    #[inline]
    pub fn is_authorized(&self) -> bool {
        self.authorized && self.session.is_some()
    }

    /// Narrow to an [`AuthContext`].
    ///
    /// Returns `None` unless the authentication check has passed for this
    /// context.
    pub fn auth(&self) -> Option<AuthContext> {
        if !self.authorized {
            return None;
        }
        self.session.as_ref().map(|session| AuthContext {
            request_id: self.request_id,
            session: Arc::clone(session),
            extensions: self.extensions.clone(),
        })
    }

    /// Mark the context as verified. No-op without a session.
    pub(crate) fn into_authorized(mut self) -> Self {
        self.authorized = self.session.is_some();
        self
    }
}

/// Context with a guaranteed session, handed to protected handlers.
#[derive(Debug, Clone)]
pub struct AuthContext {
    request_id: Uuid,
    session: Arc<Session>,
    extensions: Extensions,
}

impl AuthContext {
    /// Unique id of the request.
    #[inline]
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// The verified session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The verified user.
    pub fn user(&self) -> &Identity {
        &self.session.user
    }

    /// Value of type `T` stored by middleware.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }
}
