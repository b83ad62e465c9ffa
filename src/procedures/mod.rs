//! Application procedures.
//!
//! ```text
//! general.hello        protected query
//! general.health       public query
//! general.echo         protected query   {message}
//! user.getProfile      protected query
//! user.updateProfile   protected mutation {name?, email?}
//! hello                alias of general.hello
//! ```

pub mod general;
pub mod user;

use serde::Serialize;

use crate::caller::Caller;
use crate::envelope::ResultEnvelope;
use crate::procedure::Router;

pub use general::{Echo, EchoInput, Health};
pub use user::{Profile, ProfileUpdate, ProfileUpdated};

/// The application router.
pub fn app_router() -> Router {
    Router::new()
        .nest("general", general::router())
        .nest("user", user::router())
        .alias("hello", "general.hello")
}

/// Greeting, profile and health fetched in one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerOverview {
    pub hello: ResultEnvelope<String>,
    pub profile: ResultEnvelope<Profile>,
    pub health: ResultEnvelope<Health>,
}

/// Fetch greeting, profile and health concurrently.
///
/// Each part fails independently; an anonymous caller still gets `health`.
pub async fn server_overview(caller: &Caller) -> ServerOverview {
    let (hello, profile, health) = crate::batch!(
        caller.query::<String>("hello"),
        caller.query::<Profile>("user.getProfile"),
        caller.query::<Health>("general.health"),
    );

    ServerOverview {
        hello,
        profile,
        health,
    }
}
