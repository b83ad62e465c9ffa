//! Fluent router builder.
//!
//! [`Router`] collects procedures, nested routers, aliases and router-level
//! middleware, then [`build`](Router::build)s a [`ProcedureRegistry`].
//!
//! # Example
//!
//! ```
//! use procwire_router::context::{AuthContext, Context};
//! use procwire_router::procedure::{NoInput, Router};
//!
//! let user = Router::new()
//!     .protected_query("getProfile", |_: NoInput, auth: AuthContext| async move {
//!         Ok(auth.user().name.clone())
//!     });
//!
//! let registry = Router::new()
//!     .query("health", |_: NoInput, _ctx: Context| async { Ok("ok") })
//!     .nest("user", user)
//!     .alias("profile", "user.getProfile")
//!     .build()
//!     .unwrap();
//!
//! assert!(registry.contains("user.getProfile"));
//! assert!(registry.contains("profile"));
//! ```

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;

use super::{Input, Procedure, ProcedureRegistry};
use crate::context::{AuthContext, Context};
use crate::error::{RegistryError, Result};
use crate::middleware::Middleware;

enum Entry {
    Procedure(String, Procedure),
    Nested(String, Router),
    Alias(String, String),
}

/// Builder for composing procedures into a registry.
///
/// Router-level middleware applies to every procedure of the router,
/// including nested ones, and runs before the procedure's own middleware.
#[derive(Default)]
pub struct Router {
    entries: Vec<Entry>,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Router {
    /// Create an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a procedure under `name`.
    pub fn procedure(mut self, name: &str, procedure: Procedure) -> Self {
        self.entries
            .push(Entry::Procedure(name.to_string(), procedure));
        self
    }

    /// Add a public query.
    pub fn query<F, I, O, Fut>(self, name: &str, handler: F) -> Self
    where
        F: Fn(I, Context) -> Fut + Send + Sync + 'static,
        I: Input,
        O: Serialize + 'static,
        Fut: Future<Output = Result<O>> + Send + 'static,
    {
        self.procedure(name, Procedure::query(handler))
    }

    /// Add a public mutation.
    pub fn mutation<F, I, O, Fut>(self, name: &str, handler: F) -> Self
    where
        F: Fn(I, Context) -> Fut + Send + Sync + 'static,
        I: Input,
        O: Serialize + 'static,
        Fut: Future<Output = Result<O>> + Send + 'static,
    {
        self.procedure(name, Procedure::mutation(handler))
    }

    /// Add a query that requires a session.
    pub fn protected_query<F, I, O, Fut>(self, name: &str, handler: F) -> Self
    where
        F: Fn(I, AuthContext) -> Fut + Send + Sync + 'static,
        I: Input,
        O: Serialize + 'static,
        Fut: Future<Output = Result<O>> + Send + 'static,
    {
        self.procedure(name, Procedure::protected_query(handler))
    }

    /// Add a mutation that requires a session.
    pub fn protected_mutation<F, I, O, Fut>(self, name: &str, handler: F) -> Self
    where
        F: Fn(I, AuthContext) -> Fut + Send + Sync + 'static,
        I: Input,
        O: Serialize + 'static,
        Fut: Future<Output = Result<O>> + Send + 'static,
    {
        self.procedure(name, Procedure::protected_mutation(handler))
    }

    /// Nest another router under `prefix`.
    pub fn nest(mut self, prefix: &str, router: Router) -> Self {
        self.entries.push(Entry::Nested(prefix.to_string(), router));
        self
    }

    /// Make `target` reachable under `alias` too.
    ///
    /// Both paths are relative to this router. Aliases are resolved after all
    /// procedures and nested routers, so the target may be declared later.
    pub fn alias(mut self, alias: &str, target: &str) -> Self {
        self.entries
            .push(Entry::Alias(alias.to_string(), target.to_string()));
        self
    }

    /// Add router-level middleware.
    pub fn middleware(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Build the registry.
    ///
    /// # Errors
    ///
    /// The first [`RegistryError`] met while registering, in declaration
    /// order.
    pub fn build(self) -> std::result::Result<ProcedureRegistry, RegistryError> {
        self.build_with(&[])
    }

    fn build_with(
        self,
        inherited: &[Arc<dyn Middleware>],
    ) -> std::result::Result<ProcedureRegistry, RegistryError> {
        let mut outer = inherited.to_vec();
        outer.extend(self.middleware.iter().cloned());

        let mut registry = ProcedureRegistry::new();
        let mut aliases = Vec::new();

        for entry in self.entries {
            match entry {
                Entry::Procedure(name, mut procedure) => {
                    procedure.inherit(&outer);
                    registry.register(&name, procedure)?;
                }
                Entry::Nested(prefix, router) => {
                    let nested = router.build_with(&outer)?;
                    registry.merge(&prefix, nested)?;
                }
                Entry::Alias(alias, target) => aliases.push((alias, target)),
            }
        }

        for (alias, target) in aliases {
            registry.alias(&alias, &target)?;
        }

        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{Next, RequestLog};
    use crate::procedure::{HandlerResult, NoInput};
    use futures::future::{BoxFuture, FutureExt};

    struct Tag(&'static str);

    impl Middleware for Tag {
        fn name(&self) -> &'static str {
            self.0
        }

        fn intercept<'a>(&'a self, ctx: Context, next: Next<'a>) -> BoxFuture<'a, HandlerResult> {
            next.run(ctx).boxed()
        }
    }

    fn ok() -> Procedure {
        Procedure::query(|_: NoInput, _ctx: Context| async { Ok(()) })
    }

    #[test]
    fn test_builder_method_chaining() {
        let registry = Router::new()
            .query("health", |_: NoInput, _ctx: Context| async { Ok("ok") })
            .mutation("ping", |_: NoInput, _ctx: Context| async { Ok("pong") })
            .protected_query("me", |_: NoInput, auth: AuthContext| async move {
                Ok(auth.user().id.clone())
            })
            .protected_mutation("rename", |name: String, _auth: AuthContext| async move {
                Ok(name)
            })
            .build()
            .unwrap();

        let paths: Vec<_> = registry.paths().collect();
        assert_eq!(paths, vec!["health", "me", "ping", "rename"]);
        assert!(registry.get("me").unwrap().requires_auth());
        assert!(!registry.get("ping").unwrap().requires_auth());
    }

    #[test]
    fn test_nested_and_alias() {
        let general = Router::new().procedure("hello", ok());
        let registry = Router::new()
            .alias("hello", "general.hello")
            .nest("general", general)
            .build()
            .unwrap();

        assert!(Arc::ptr_eq(
            registry.get("hello").unwrap(),
            registry.get("general.hello").unwrap()
        ));
    }

    #[test]
    fn test_duplicate_is_reported() {
        let err = Router::new()
            .procedure("a", ok())
            .procedure("a", ok())
            .build()
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateProcedure("a".into()));
    }

    #[test]
    fn test_nested_collision_is_reported() {
        let err = Router::new()
            .procedure("user.get", ok())
            .nest("user", Router::new().procedure("get", ok()))
            .build()
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateProcedure("user.get".into()));
    }

    #[test]
    fn test_middleware_inheritance_order() {
        let inner = Router::new()
            .middleware(Tag("inner"))
            .procedure("get", ok().with(Tag("own")));

        let registry = Router::new()
            .middleware(Tag("outer"))
            .middleware(RequestLog)
            .nest("user", inner)
            .build()
            .unwrap();

        let names: Vec<_> = registry
            .get("user.get")
            .unwrap()
            .middleware()
            .iter()
            .map(|m| m.name())
            .collect();
        assert_eq!(names, vec!["outer", "request_log", "inner", "own"]);
    }
}
