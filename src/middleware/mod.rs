//! Middleware module - interceptors run before a procedure handler.
//!
//! A chain is a plain ordered slice of [`Middleware`] objects. [`Next`] holds
//! the remainder of the slice plus the prepared handler call; each link
//! either calls [`Next::run`] (possibly with an augmented context) or returns
//! an error without calling it.
//!
//! ```text
//! dispatcher-wide ─► RequireAuth (protected only) ─► router-level ─► procedure ─► handler
//! ```
//!
//! Every link is timed. The measurement is only logged and never influences
//! the result.
//!
//! # Example
//!
//! ```
//! use futures::future::{BoxFuture, FutureExt};
//! use procwire_router::context::Context;
//! use procwire_router::middleware::{Middleware, Next};
//! use procwire_router::procedure::HandlerResult;
//! use procwire_router::RpcError;
//!
//! /// Rejects every call to paths under `admin.`.
//! struct NoAdmin;
//!
//! impl Middleware for NoAdmin {
//!     fn name(&self) -> &'static str {
//!         "no_admin"
//!     }
//!
//!     fn intercept<'a>(&'a self, ctx: Context, next: Next<'a>) -> BoxFuture<'a, HandlerResult> {
//!         if next.path().starts_with("admin.") {
//!             return futures::future::ready(Err(RpcError::Unauthorized)).boxed();
//!         }
//!         next.run(ctx)
//!     }
//! }
//! ```

mod auth;
mod logging;

pub use auth::{AuthState, RequireAuth};
pub use logging::RequestLog;

use std::sync::Arc;
use std::time::Instant;

use futures::future::{BoxFuture, FutureExt};
use tracing::debug;

use crate::context::Context;
use crate::procedure::{HandlerResult, PreparedCall, ProcedureKind};

/// An interceptor in a procedure's middleware chain.
pub trait Middleware: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Handle one invocation. Call `next.run(ctx)` to continue the chain.
    fn intercept<'a>(&'a self, ctx: Context, next: Next<'a>) -> BoxFuture<'a, HandlerResult>;
}

/// Remainder of a middleware chain.
pub struct Next<'a> {
    path: &'a str,
    kind: ProcedureKind,
    chain: &'a [Arc<dyn Middleware>],
    endpoint: PreparedCall,
}

impl<'a> Next<'a> {
    /// Start of a chain ending in `endpoint`.
    pub(crate) fn new(
        path: &'a str,
        kind: ProcedureKind,
        chain: &'a [Arc<dyn Middleware>],
        endpoint: PreparedCall,
    ) -> Self {
        Self {
            path,
            kind,
            chain,
            endpoint,
        }
    }

    /// Path of the procedure being invoked.
    #[inline]
    pub fn path(&self) -> &'a str {
        self.path
    }

    /// Kind of the procedure being invoked.
    #[inline]
    pub fn kind(&self) -> ProcedureKind {
        self.kind
    }

    /// Number of links left before the handler.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.chain.len()
    }

    /// Run the rest of the chain, ending with the handler.
    pub fn run(self, ctx: Context) -> BoxFuture<'a, HandlerResult> {
        let Next {
            path,
            kind,
            chain,
            endpoint,
        } = self;

        let Some((link, rest)) = chain.split_first() else {
            return endpoint(ctx);
        };

        let next = Next {
            path,
            kind,
            chain: rest,
            endpoint,
        };

        async move {
            let start = Instant::now();
            let result = link.intercept(ctx, next).await;
            debug!(
                path,
                middleware = link.name(),
                elapsed_us = start.elapsed().as_micros() as u64,
                ok = result.is_ok(),
                "Middleware finished"
            );
            result
        }
        .boxed()
    }
}
