//! Server-side calling helpers.
//!
//! [`safe_call`] turns any fallible future into a [`ResultEnvelope`] and never
//! lets an error or a panic escape. [`batch_calls`] (homogeneous) and
//! [`batch!`](crate::batch) (heterogeneous) run several such calls at once.
//! [`Caller`] binds a dispatcher to one context so procedures can be called by
//! path from server code.
//!
//! # Example
//!
//! ```
//! use procwire_router::{batch_calls, safe_call, ResultEnvelope};
//!
//! # async fn demo() {
//! let ok = safe_call(|| async { Ok::<_, String>(1) }).await;
//! assert_eq!(ok, ResultEnvelope::Success(1));
//!
//! let all = batch_calls([1, 0, 3].map(|n| {
//!     move || async move {
//!         if n == 0 {
//!             Err("boom".to_string())
//!         } else {
//!             Ok(n)
//!         }
//!     }
//! }))
//! .await;
//! assert_eq!(all[1].error(), Some("boom"));
//! assert_eq!(all[2].data(), Some(&3));
//! # }
//! ```

use std::any::Any;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::{join_all, FutureExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::context::{Context, ContextProvider, Credentials};
use crate::dispatch::{Dispatcher, Invocation};
use crate::envelope::ResultEnvelope;
use crate::error::{Result, RpcError};

const UNKNOWN_ERROR: &str = "Unknown error";

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        UNKNOWN_ERROR.to_string()
    }
}

/// Run a call and wrap its outcome.
///
/// An error becomes `Failure` with the error's display message; a panic
/// becomes `Failure` with the panic message, or `"Unknown error"` when the
/// payload is not a string.
pub async fn safe_call<T, E, F, Fut>(call: F) -> ResultEnvelope<T>
where
    E: Display,
    F: FnOnce() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
{
    let outcome = AssertUnwindSafe(async move { call().await })
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(data)) => ResultEnvelope::Success(data),
        Ok(Err(e)) => {
            let message = e.to_string();
            tracing::warn!(error = %message, "Server call failed");
            ResultEnvelope::Failure(message)
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::warn!(error = %message, "Server call panicked");
            ResultEnvelope::Failure(message)
        }
    }
}

/// Run calls concurrently through [`safe_call`].
///
/// Output order equals input order; one failure never affects the others.
pub async fn batch_calls<T, E, F, Fut, I>(calls: I) -> Vec<ResultEnvelope<T>>
where
    I: IntoIterator<Item = F>,
    E: Display,
    F: FnOnce() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
{
    join_all(calls.into_iter().map(safe_call)).await
}

/// Run heterogeneous calls concurrently through [`safe_call`].
///
/// Each argument is a future resolving to `Result<T, E>` with `E: Display`;
/// the output is a tuple of [`ResultEnvelope`]s in argument order.
///
/// ```
/// use procwire_router::batch;
///
/// # async fn demo() {
/// let (a, b) = batch!(
///     async { Ok::<_, String>(1u8) },
///     async { Err::<&str, _>("boom".to_string()) },
/// );
/// assert!(a.is_success());
/// assert_eq!(b.error(), Some("boom"));
/// # }
/// ```
#[macro_export]
macro_rules! batch {
    ($($call:expr),+ $(,)?) => {
        $crate::__private::join!($($crate::safe_call(|| $call)),+)
    };
}

/// Calls procedures by path with a fixed context.
#[derive(Clone)]
pub struct Caller {
    dispatcher: Arc<Dispatcher>,
    ctx: Context,
}

impl Caller {
    /// Caller using `ctx` for every call.
    pub fn new(dispatcher: Arc<Dispatcher>, ctx: Context) -> Self {
        Self { dispatcher, ctx }
    }

    /// Caller whose context is built from `credentials`.
    ///
    /// # Errors
    ///
    /// `AuthenticationUnavailable` when the session lookup fails.
    pub async fn from_credentials(
        dispatcher: Arc<Dispatcher>,
        provider: &ContextProvider,
        credentials: &Credentials,
    ) -> Result<Self> {
        let ctx = provider.create_context(credentials).await?;
        Ok(Self::new(dispatcher, ctx))
    }

    /// Context used for every call.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Call a procedure with raw input and return its raw output.
    pub async fn call_value(&self, path: &str, input: Value) -> Result<Value> {
        let invocation = Invocation::new(path).with_input(input);
        self.dispatcher.invoke(invocation, self.ctx.clone()).await
    }

    /// Call a procedure and deserialize its output.
    pub async fn call<O: DeserializeOwned>(&self, path: &str, input: impl Serialize) -> Result<O> {
        let input = serde_json::to_value(input)?;
        let output = self.call_value(path, input).await?;
        serde_json::from_value(output).map_err(RpcError::from)
    }

    /// Call a procedure that takes no input.
    pub async fn query<O: DeserializeOwned>(&self, path: &str) -> Result<O> {
        let output = self.call_value(path, Value::Null).await?;
        serde_json::from_value(output).map_err(RpcError::from)
    }
}

impl std::fmt::Debug for Caller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Caller")
            .field("request_id", &self.ctx.request_id())
            .field("authenticated", &self.ctx.is_authenticated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_safe_call_success() {
        let envelope = safe_call(|| async { Ok::<_, RpcError>("hi") }).await;
        assert_eq!(envelope, ResultEnvelope::Success("hi"));
    }

    #[tokio::test]
    async fn test_safe_call_error_message() {
        let envelope = safe_call(|| async { Err::<(), _>(RpcError::handler("boom")) }).await;
        assert_eq!(envelope, ResultEnvelope::Failure("boom".into()));
    }

    #[tokio::test]
    async fn test_safe_call_panics() {
        let str_panic = safe_call(|| async {
            if true {
                panic!("exploded");
            }
            Ok::<(), String>(())
        })
        .await;
        assert_eq!(str_panic.error(), Some("exploded"));

        let formatted = safe_call(|| async {
            if true {
                panic!("code {}", 7);
            }
            Ok::<(), String>(())
        })
        .await;
        assert_eq!(formatted.error(), Some("code 7"));

        let opaque = safe_call(|| async {
            if true {
                std::panic::panic_any(42_u32);
            }
            Ok::<(), String>(())
        })
        .await;
        assert_eq!(opaque.error(), Some(UNKNOWN_ERROR));
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_calls_run_concurrently_in_order() {
        let calls = [30_u64, 10, 20].map(|ms| {
            move || async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                if ms == 10 {
                    Err(format!("slow {}", ms))
                } else {
                    Ok(ms)
                }
            }
        });

        let start = tokio::time::Instant::now();
        let results = batch_calls(calls).await;

        assert!(start.elapsed() < Duration::from_millis(60));
        assert_eq!(results[0], ResultEnvelope::Success(30));
        assert_eq!(results[1], ResultEnvelope::Failure("slow 10".into()));
        assert_eq!(results[2], ResultEnvelope::Success(20));
    }

    #[tokio::test]
    async fn test_batch_macro_mixed_types() {
        let (a, b, c) = crate::batch!(
            async { Ok::<_, String>(1_u8) },
            async { Err::<String, _>(RpcError::Unauthorized) },
            async { Ok::<_, String>(vec!["x"]) },
        );

        assert_eq!(a, ResultEnvelope::Success(1));
        assert_eq!(
            b.error(),
            Some("You must be logged in to access this resource.")
        );
        assert_eq!(c.data(), Some(&vec!["x"]));
    }
}
