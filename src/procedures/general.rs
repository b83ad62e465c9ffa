//! General-purpose procedures: greeting, liveness and echo.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::context::{AuthContext, Context};
use crate::error::Result;
use crate::procedure::{NoInput, Router, Validate};

/// Liveness report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    /// RFC 3339 time of the check.
    pub timestamp: String,
    pub message: String,
}

/// Input of `echo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoInput {
    pub message: String,
}

impl Validate for EchoInput {}

/// Output of `echo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Echo {
    pub echo: String,
    pub user: Option<String>,
    pub timestamp: String,
}

async fn hello(_: NoInput, auth: AuthContext) -> Result<String> {
    tracing::debug!(user = %auth.user().id, "Saying hello");
    let name = auth.user().name.as_deref().unwrap_or("User");
    Ok(format!("Hello from procwire, {}!", name))
}

async fn health(_: NoInput, _ctx: Context) -> Result<Health> {
    Ok(Health {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        message: "procwire server is running".to_string(),
    })
}

async fn echo(input: EchoInput, auth: AuthContext) -> Result<Echo> {
    Ok(Echo {
        echo: input.message,
        user: auth.user().name.clone(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// `hello`, `health` and `echo`.
pub fn router() -> Router {
    Router::new()
        .protected_query("hello", hello)
        .query("health", health)
        .protected_query("echo", echo)
}
