//! # procwire-router
//!
//! Typed remote-procedure layer for a web backend.
//!
//! Procedures are registered by dot-path (`"user.getProfile"`) as queries or
//! mutations, public or protected. Every call gets a per-request context
//! derived from the caller's session, passes through an ordered middleware
//! chain and ends in the handler. Every failure comes back as a structured
//! error envelope.
//!
//! ## Architecture
//!
//! ```text
//! ContextProvider ─► Dispatcher ─► Middleware chain ─► handler ─► RpcResponse
//!                                                        │
//!                       safe_call / batch_calls ◄────────┘  (server-side callers)
//! ```
//!
//! - [`context`] - sessions, per-request [`Context`], [`ContextProvider`]
//! - [`procedure`] - descriptors, the [`ProcedureRegistry`] and the fluent [`Router`]
//! - [`middleware`] - the [`Middleware`] trait, auth check and request logging
//! - [`Dispatcher`] - path resolution, input validation, chain execution
//! - [`safe_call`], [`batch_calls`], [`batch!`], [`Caller`] - server-side calls
//! - [`http`] - axum transport (JSON and MessagePack bodies)
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use procwire_router::context::{Context, Identity, Session};
//! use procwire_router::procedures::{app_router, Profile};
//! use procwire_router::{safe_call, Caller, Dispatcher, ResultEnvelope};
//!
//! # async fn demo() {
//! let dispatcher = Arc::new(Dispatcher::new(app_router().build().unwrap()));
//!
//! let session = Session::new(Identity::new("u1").with_name("Ada"));
//! let caller = Caller::new(dispatcher.clone(), Context::authenticated(session));
//!
//! let profile = safe_call(|| caller.query::<Profile>("user.getProfile")).await;
//! assert!(profile.is_success());
//!
//! let anonymous = Caller::new(dispatcher, Context::anonymous());
//! let denied = safe_call(|| anonymous.query::<String>("hello")).await;
//! assert_eq!(
//!     denied,
//!     ResultEnvelope::Failure("You must be logged in to access this resource.".into())
//! );
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod logging;
pub mod middleware;
pub mod procedure;
pub mod procedures;

mod caller;
mod dispatch;
mod envelope;

pub use caller::{batch_calls, safe_call, Caller};
pub use config::{ConfigError, ServerConfig};
pub use context::{AuthContext, Context, ContextProvider, Credentials, SessionResolver};
pub use dispatch::{Dispatcher, DispatcherBuilder, Invocation};
pub use envelope::{ErrorShape, ResultEnvelope, RpcResponse};
pub use error::{ErrorCode, RegistryError, Result, RpcError};
pub use middleware::Middleware;
pub use procedure::{Procedure, ProcedureRegistry, Router};

#[doc(hidden)]
pub mod __private {
    pub use futures::join;
}
