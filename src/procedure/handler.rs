//! Type-erased procedure handlers and input contracts.
//!
//! A handler is called in two steps so the dispatcher can check the input
//! before any middleware runs:
//!
//! 1. [`Handler::prepare`] parses and validates the raw JSON input and binds
//!    it to the handler, producing a [`PreparedCall`].
//! 2. The last link of the middleware chain runs the prepared call with the
//!    (possibly augmented) context.

use std::any::type_name;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::context::{AuthContext, Context};
use crate::error::{InputIssues, Result, RpcError};

/// Result type for handler invocations: the serialized output.
pub type HandlerResult = Result<Value>;

/// Handler bound to its validated input, waiting for a context.
pub type PreparedCall = Box<dyn FnOnce(Context) -> BoxFuture<'static, HandlerResult> + Send>;

/// Trait for type-erased handlers.
pub trait Handler: Send + Sync + 'static {
    /// Check the raw input and bind it to the handler.
    ///
    /// # Errors
    ///
    /// `InvalidInput` when the payload does not satisfy the input contract.
    fn prepare(&self, input: Value) -> Result<PreparedCall>;
}

/// Semantic checks run after an input has been deserialized.
///
/// Implement this for every input type. The default accepts everything, so
/// `impl Validate for MyInput {}` is enough when the shape alone is the
/// contract.
pub trait Validate {
    /// Whether the type declares an input contract at all.
    const DECLARED: bool = true;

    /// Check field-level rules.
    fn validate(&self) -> std::result::Result<(), InputIssues> {
        Ok(())
    }
}

/// Input of a procedure. Implemented for every `DeserializeOwned + Validate`.
pub trait Input: Sized + Send + 'static {
    /// Parse and validate a raw payload.
    fn parse(raw: Value) -> std::result::Result<Self, InputIssues>;

    /// Name of the declared contract, `None` when the procedure takes no input.
    fn contract() -> Option<&'static str>;
}

impl<T> Input for T
where
    T: DeserializeOwned + Validate + Send + 'static,
{
    fn parse(raw: Value) -> std::result::Result<Self, InputIssues> {
        let value: T =
            serde_json::from_value(raw).map_err(|e| InputIssues::payload(e.to_string()))?;
        value.validate()?;
        Ok(value)
    }

    fn contract() -> Option<&'static str> {
        T::DECLARED.then(type_name::<T>)
    }
}

/// Marker for procedures without an input contract. Accepts any payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoInput;

impl<'de> Deserialize<'de> for NoInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        IgnoredAny::deserialize(deserializer)?;
        Ok(NoInput)
    }
}

impl Validate for NoInput {
    const DECLARED: bool = false;
}

impl Validate for String {}
impl Validate for bool {}
impl Validate for i64 {}
impl Validate for u64 {}
impl Validate for f64 {}
impl Validate for Value {}

fn to_output<O: Serialize>(output: &O) -> HandlerResult {
    serde_json::to_value(output)
        .map_err(|e| RpcError::handler(format!("Failed to serialize output: {}", e)))
}

/// Handler receiving the plain [`Context`].
pub struct PublicHandler<F, I, O, Fut> {
    handler: Arc<F>,
    _phantom: PhantomData<fn(I) -> (O, Fut)>,
}

impl<F, I, O, Fut> PublicHandler<F, I, O, Fut>
where
    F: Fn(I, Context) -> Fut + Send + Sync + 'static,
    I: Input,
    O: Serialize + 'static,
    Fut: Future<Output = Result<O>> + Send + 'static,
{
    /// Wrap a handler function.
    pub fn new(handler: F) -> Self {
        Self {
            handler: Arc::new(handler),
            _phantom: PhantomData,
        }
    }
}

impl<F, I, O, Fut> Handler for PublicHandler<F, I, O, Fut>
where
    F: Fn(I, Context) -> Fut + Send + Sync + 'static,
    I: Input,
    O: Serialize + 'static,
    Fut: Future<Output = Result<O>> + Send + 'static,
{
    fn prepare(&self, input: Value) -> Result<PreparedCall> {
        let input = I::parse(input).map_err(RpcError::InvalidInput)?;
        let handler = Arc::clone(&self.handler);

        Ok(Box::new(move |ctx: Context| {
            async move {
                let output = handler(input, ctx).await?;
                to_output(&output)
            }
            .boxed()
        }))
    }
}

/// Handler receiving an [`AuthContext`] with a guaranteed session.
pub struct ProtectedHandler<F, I, O, Fut> {
    handler: Arc<F>,
    _phantom: PhantomData<fn(I) -> (O, Fut)>,
}

impl<F, I, O, Fut> ProtectedHandler<F, I, O, Fut>
where
    F: Fn(I, AuthContext) -> Fut + Send + Sync + 'static,
    I: Input,
    O: Serialize + 'static,
    Fut: Future<Output = Result<O>> + Send + 'static,
{
    /// Wrap a handler function.
    pub fn new(handler: F) -> Self {
        Self {
            handler: Arc::new(handler),
            _phantom: PhantomData,
        }
    }
}

impl<F, I, O, Fut> Handler for ProtectedHandler<F, I, O, Fut>
where
    F: Fn(I, AuthContext) -> Fut + Send + Sync + 'static,
    I: Input,
    O: Serialize + 'static,
    Fut: Future<Output = Result<O>> + Send + 'static,
{
    fn prepare(&self, input: Value) -> Result<PreparedCall> {
        let input = I::parse(input).map_err(RpcError::InvalidInput)?;
        let handler = Arc::clone(&self.handler);

        Ok(Box::new(move |ctx: Context| {
            async move {
                // Only reachable without the auth check if the chain was
                // composed by hand.
                let auth = ctx.auth().ok_or(RpcError::Unauthorized)?;
                let output = handler(input, auth).await?;
                to_output(&output)
            }
            .boxed()
        }))
    }
}
