//! Authentication check for protected procedures.
//!
//! ```text
//!            session present
//! Pending ───────────────────► Authorized ─► next link / handler
//!    │
//!    │ no session
//!    ▼
//! Rejected ─► Unauthorized, handler never invoked
//! ```

use futures::future::{ready, BoxFuture, FutureExt};
use tracing::debug;

use super::{Middleware, Next};
use crate::context::Context;
use crate::error::RpcError;
use crate::procedure::HandlerResult;

/// State of the authentication check for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// Not evaluated yet.
    Pending,
    /// Context carries a session.
    Authorized,
    /// Context carries no session.
    Rejected,
}

impl AuthState {
    /// Evaluate a context. Only `Pending` moves; terminal states stay put.
    pub fn evaluate(self, ctx: &Context) -> AuthState {
        match self {
            AuthState::Pending if ctx.is_authenticated() => AuthState::Authorized,
            AuthState::Pending => AuthState::Rejected,
            terminal => terminal,
        }
    }

    /// Check if the state is final.
    pub fn is_terminal(self) -> bool {
        self != AuthState::Pending
    }
}

/// Rejects contexts without a session; marks the rest as authorized.
///
/// The dispatcher puts this in front of every protected procedure.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireAuth;

impl Middleware for RequireAuth {
    fn name(&self) -> &'static str {
        "require_auth"
    }

    fn intercept<'a>(&'a self, ctx: Context, next: Next<'a>) -> BoxFuture<'a, HandlerResult> {
        match AuthState::Pending.evaluate(&ctx) {
            AuthState::Authorized => next.run(ctx.into_authorized()),
            _ => {
                debug!(
                    path = next.path(),
                    request_id = %ctx.request_id(),
                    "Rejected unauthenticated call"
                );
                ready(Err(RpcError::Unauthorized)).boxed()
            }
        }
    }
}
