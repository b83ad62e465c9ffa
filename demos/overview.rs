//! Calls procedures from server code with `safe_call`, `batch_calls` and
//! `batch!`.

use std::sync::Arc;

use serde_json::json;

use procwire_router::context::{ContextProvider, Credentials, Identity, Session, StaticSessions};
use procwire_router::procedures::{app_router, server_overview};
use procwire_router::{batch_calls, logging, safe_call, Caller, Dispatcher};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let dispatcher = Arc::new(Dispatcher::new(app_router().build()?));
    let provider = ContextProvider::new(StaticSessions::new().with_session(
        "demo-token",
        Session::new(Identity::new("demo").with_name("Demo User")),
    ));

    for credentials in [Credentials::bearer("demo-token"), Credentials::none()] {
        let caller = Caller::from_credentials(dispatcher.clone(), &provider, &credentials).await?;

        let overview = server_overview(&caller).await;
        println!("{}", serde_json::to_string_pretty(&overview)?);

        let echo =
            safe_call(|| caller.call_value("general.echo", json!({ "message": "hi" }))).await;
        println!("echo: {}", serde_json::to_string(&echo)?);

        let paths = ["general.health", "user.getProfile"];
        let results = batch_calls(paths.map(|path| {
            let caller = caller.clone();
            move || async move { caller.call_value(path, json!(null)).await }
        }))
        .await;
        for (path, result) in paths.iter().zip(&results) {
            println!("{path}: success={}", result.is_success());
        }
    }

    Ok(())
}
