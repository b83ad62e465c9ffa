//! Runs the application procedures over HTTP.
//!
//! ```sh
//! cargo run --example server
//! curl -s localhost:3000/api/trpc -d '{"path":"general.health"}'
//! curl -s localhost:3000/api/trpc -H 'Authorization: Bearer demo-token' \
//!     -d '[{"path":"hello"},{"path":"user.getProfile"}]'
//! ```

use std::sync::Arc;

use procwire_router::context::{ContextProvider, Identity, Session, StaticSessions};
use procwire_router::middleware::RequestLog;
use procwire_router::procedures::app_router;
use procwire_router::{http, logging, Dispatcher, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let config = ServerConfig::from_env()?;
    let registry = app_router().build()?;
    let dispatcher = Dispatcher::builder().middleware(RequestLog).build(registry);

    let sessions = StaticSessions::new().with_session(
        "demo-token",
        Session::new(
            Identity::new("demo")
                .with_name("Demo User")
                .with_email("demo@example.com"),
        ),
    );

    http::serve(config, Arc::new(dispatcher), ContextProvider::new(sessions)).await?;
    Ok(())
}
