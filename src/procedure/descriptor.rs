//! Procedure descriptors.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::handler::{Handler, Input, PreparedCall, ProtectedHandler, PublicHandler};
use crate::context::{AuthContext, Context};
use crate::error::Result;
use crate::middleware::Middleware;

/// Whether a procedure reads or changes state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcedureKind {
    /// Read-only call.
    Query,
    /// State-changing call.
    Mutation,
}

/// Authentication requirement of a procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    /// Callable without a session.
    Public,
    /// Requires an authenticated session.
    Protected,
}

/// A registered procedure: handler plus its declared requirements.
///
/// Immutable once registered; shared through `Arc` so aliases point at the
/// same descriptor.
pub struct Procedure {
    kind: ProcedureKind,
    access: Access,
    input_contract: Option<&'static str>,
    handler: Box<dyn Handler>,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Procedure {
    fn from_handler<I: Input>(kind: ProcedureKind, access: Access, handler: impl Handler) -> Self {
        Self {
            kind,
            access,
            input_contract: I::contract(),
            handler: Box::new(handler),
            middleware: Vec::new(),
        }
    }

    /// Public query.
    pub fn query<F, I, O, Fut>(handler: F) -> Self
    where
        F: Fn(I, Context) -> Fut + Send + Sync + 'static,
        I: Input,
        O: Serialize + 'static,
        Fut: Future<Output = Result<O>> + Send + 'static,
    {
        Self::from_handler::<I>(ProcedureKind::Query, Access::Public, PublicHandler::new(handler))
    }

    /// Public mutation.
    pub fn mutation<F, I, O, Fut>(handler: F) -> Self
    where
        F: Fn(I, Context) -> Fut + Send + Sync + 'static,
        I: Input,
        O: Serialize + 'static,
        Fut: Future<Output = Result<O>> + Send + 'static,
    {
        Self::from_handler::<I>(
            ProcedureKind::Mutation,
            Access::Public,
            PublicHandler::new(handler),
        )
    }

    /// Query that requires a session.
    pub fn protected_query<F, I, O, Fut>(handler: F) -> Self
    where
        F: Fn(I, AuthContext) -> Fut + Send + Sync + 'static,
        I: Input,
        O: Serialize + 'static,
        Fut: Future<Output = Result<O>> + Send + 'static,
    {
        Self::from_handler::<I>(
            ProcedureKind::Query,
            Access::Protected,
            ProtectedHandler::new(handler),
        )
    }

    /// Mutation that requires a session.
    pub fn protected_mutation<F, I, O, Fut>(handler: F) -> Self
    where
        F: Fn(I, AuthContext) -> Fut + Send + Sync + 'static,
        I: Input,
        O: Serialize + 'static,
        Fut: Future<Output = Result<O>> + Send + 'static,
    {
        Self::from_handler::<I>(
            ProcedureKind::Mutation,
            Access::Protected,
            ProtectedHandler::new(handler),
        )
    }

    /// Append a procedure-specific middleware.
    pub fn with(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Query or mutation.
    #[inline]
    pub fn kind(&self) -> ProcedureKind {
        self.kind
    }

    /// Declared access level.
    #[inline]
    pub fn access(&self) -> Access {
        self.access
    }

    /// Check if the procedure rejects anonymous contexts.
    #[inline]
    pub fn requires_auth(&self) -> bool {
        self.access == Access::Protected
    }

    /// Type name of the input contract, if one is declared.
    pub fn input_contract(&self) -> Option<&'static str> {
        self.input_contract
    }

    /// Middleware attached to this procedure, in run order.
    pub fn middleware(&self) -> &[Arc<dyn Middleware>] {
        &self.middleware
    }

    /// Put router-level middleware in front of the procedure's own.
    pub(crate) fn inherit(&mut self, outer: &[Arc<dyn Middleware>]) {
        if outer.is_empty() {
            return;
        }
        let mut chain = outer.to_vec();
        chain.append(&mut self.middleware);
        self.middleware = chain;
    }

    pub(crate) fn prepare(&self, input: Value) -> Result<PreparedCall> {
        self.handler.prepare(input)
    }
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Procedure")
            .field("kind", &self.kind)
            .field("access", &self.access)
            .field("input_contract", &self.input_contract)
            .field(
                "middleware",
                &self.middleware.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
