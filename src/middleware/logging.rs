//! Request logging middleware.

use std::time::Instant;

use futures::future::{BoxFuture, FutureExt};
use tracing::{info, warn};

use super::{Middleware, Next};
use crate::context::Context;
use crate::procedure::HandlerResult;

/// Logs every invocation with its outcome and duration.
///
/// Successful calls are logged at info, failed ones at warn with the error
/// code.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLog;

impl Middleware for RequestLog {
    fn name(&self) -> &'static str {
        "request_log"
    }

    fn intercept<'a>(&'a self, ctx: Context, next: Next<'a>) -> BoxFuture<'a, HandlerResult> {
        let path = next.path();
        let kind = next.kind();
        let request_id = ctx.request_id();

        async move {
            let start = Instant::now();
            let result = next.run(ctx).await;
            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

            match &result {
                Ok(_) => info!(%request_id, path, ?kind, elapsed_ms, "Call succeeded"),
                Err(e) => warn!(
                    %request_id,
                    path,
                    ?kind,
                    elapsed_ms,
                    code = %e.code(),
                    "Call failed: {}",
                    e
                ),
            }
            result
        }
        .boxed()
    }
}
