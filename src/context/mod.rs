//! Context module - per-request authentication context.
//!
//! Provides:
//! - [`Context`] / [`AuthContext`] - what handlers receive
//! - [`ContextProvider`] - builds a context from [`Credentials`]
//! - [`SessionResolver`] - injected identity provider capability

mod provider;
mod session;

pub use provider::{
    ContextProvider, Credentials, FnResolver, ResolveError, ResolveResult, SessionResolver,
    StaticSessions,
};
pub use session::{AuthContext, Context, Identity, Session};
