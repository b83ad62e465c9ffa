//! Dispatcher: resolves a path, checks the input, runs the middleware chain
//! and the handler, and turns every outcome into a response.
//!
//! The dispatcher owns the registry. Building one consumes the
//! [`ProcedureRegistry`], so the set of procedures is fixed from then on.
//!
//! # Example
//!
//! ```
//! use procwire_router::context::Context;
//! use procwire_router::procedure::{NoInput, Router};
//! use procwire_router::{Dispatcher, Invocation};
//!
//! # async fn demo() {
//! let registry = Router::new()
//!     .query("health", |_: NoInput, _ctx: Context| async { Ok("ok") })
//!     .build()
//!     .unwrap();
//! let dispatcher = Dispatcher::new(registry);
//!
//! let response = dispatcher
//!     .dispatch(Invocation::new("health"), Context::anonymous())
//!     .await;
//! assert!(response.is_ok());
//! # }
//! ```

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::{join_all, FutureExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::Context;
use crate::envelope::RpcResponse;
use crate::error::{Result, RpcError};
use crate::middleware::{Middleware, Next, RequireAuth};
use crate::procedure::{Procedure, ProcedureRegistry};

/// One procedure call: a path and its raw input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    /// Dot-separated procedure path.
    pub path: String,
    /// Raw input. Missing input is `null`.
    #[serde(default)]
    pub input: Value,
}

impl Invocation {
    /// Invocation without input.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            input: Value::Null,
        }
    }

    /// Set the input.
    pub fn with_input(mut self, input: Value) -> Self {
        self.input = input;
        self
    }
}

struct Route {
    procedure: Arc<Procedure>,
    /// Full chain: dispatcher-wide, auth check, router-level, procedure's own.
    chain: Vec<Arc<dyn Middleware>>,
}

/// Builder for a [`Dispatcher`] with dispatcher-wide middleware.
#[derive(Default)]
pub struct DispatcherBuilder {
    middleware: Vec<Arc<dyn Middleware>>,
}

impl DispatcherBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add middleware that runs first for every procedure.
    pub fn middleware(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Seal `registry` into a dispatcher.
    pub fn build(self, registry: ProcedureRegistry) -> Dispatcher {
        let auth: Arc<dyn Middleware> = Arc::new(RequireAuth);

        let routes = registry
            .iter()
            .map(|(path, procedure)| {
                let mut chain = self.middleware.clone();
                if procedure.requires_auth() {
                    chain.push(Arc::clone(&auth));
                }
                chain.extend(procedure.middleware().iter().cloned());

                let route = Route {
                    procedure: Arc::clone(procedure),
                    chain,
                };
                (path.to_string(), route)
            })
            .collect::<HashMap<_, _>>();

        tracing::debug!(procedures = routes.len(), "Dispatcher ready");
        Dispatcher { routes }
    }
}

/// Routes invocations to registered procedures.
pub struct Dispatcher {
    routes: HashMap<String, Route>,
}

impl Dispatcher {
    /// Dispatcher without dispatcher-wide middleware.
    pub fn new(registry: ProcedureRegistry) -> Self {
        DispatcherBuilder::new().build(registry)
    }

    /// Create a builder.
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Look up a procedure.
    pub fn procedure(&self, path: &str) -> Option<&Arc<Procedure>> {
        self.routes.get(path).map(|route| &route.procedure)
    }

    /// All callable paths, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<_> = self.routes.keys().map(|s| s.as_str()).collect();
        paths.sort_unstable();
        paths
    }

    /// Names of the middleware that run for `path`, in order.
    pub fn chain(&self, path: &str) -> Option<Vec<&'static str>> {
        self.routes
            .get(path)
            .map(|route| route.chain.iter().map(|m| m.name()).collect())
    }

    /// Run one invocation and return the handler's serialized output.
    ///
    /// # Errors
    ///
    /// - `ProcedureNotFound` for an unknown path
    /// - `InvalidInput` when the input breaks the contract (no middleware ran)
    /// - `Unauthorized` for a protected procedure without a session
    /// - whatever a middleware or the handler returned
    /// - `HandlerFailure("internal error")` when something panicked
    pub async fn invoke(&self, invocation: Invocation, ctx: Context) -> Result<Value> {
        let request_id = ctx.request_id();
        let path = invocation.path.clone();

        match AssertUnwindSafe(self.run(invocation, ctx))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(path = %path, request_id = %request_id, "Procedure panicked");
                Err(RpcError::handler("internal error"))
            }
        }
    }

    async fn run(&self, invocation: Invocation, ctx: Context) -> Result<Value> {
        let Invocation { path, input } = invocation;

        let route = self
            .routes
            .get(&path)
            .ok_or_else(|| RpcError::ProcedureNotFound(path.clone()))?;

        tracing::debug!(
            path = %path,
            request_id = %ctx.request_id(),
            kind = ?route.procedure.kind(),
            "Dispatching"
        );

        let call = route.procedure.prepare(input)?;
        Next::new(&path, route.procedure.kind(), &route.chain, call)
            .run(ctx)
            .await
    }

    /// Run one invocation and wrap the outcome in a response.
    pub async fn dispatch(&self, invocation: Invocation, ctx: Context) -> RpcResponse {
        self.invoke(invocation, ctx).await.into()
    }

    /// Run invocations concurrently, each with its own copy of `ctx`.
    ///
    /// Responses are in input order. A failed slot never affects the others.
    pub async fn dispatch_batch(
        &self,
        invocations: Vec<Invocation>,
        ctx: Context,
    ) -> Vec<RpcResponse> {
        tracing::debug!(
            size = invocations.len(),
            request_id = %ctx.request_id(),
            "Dispatching batch"
        );

        join_all(
            invocations
                .into_iter()
                .map(|invocation| self.dispatch(invocation, ctx.clone())),
        )
        .await
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("paths", &self.paths())
            .finish()
    }
}
