//! Procedure module - descriptors, handlers and the registry.
//!
//! Provides:
//! - [`Procedure`] - a handler with its declared kind, access and input contract
//! - [`ProcedureRegistry`] - maps dot-paths to procedures
//! - [`Router`] - fluent builder composing procedures into a registry
//! - [`Validate`] / [`Input`] - input contracts checked before any middleware

mod descriptor;
mod handler;
mod registry;
mod router;

pub use descriptor::{Access, Procedure, ProcedureKind};
pub use handler::{
    Handler, HandlerResult, Input, NoInput, PreparedCall, ProtectedHandler, PublicHandler,
    Validate,
};
pub use registry::{validate_path, ProcedureRegistry};
pub use router::Router;
