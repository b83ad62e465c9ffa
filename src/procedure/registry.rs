//! Procedure registry: maps dot-paths to procedure descriptors.
//!
//! Paths are dot-separated segments of ASCII letters, digits and `_`
//! (`"user.getProfile"`). A path is registered at most once; aliases make one
//! descriptor reachable under several paths.
//!
//! The registry is only mutable while it is being composed. Handing it to a
//! [`Dispatcher`](crate::Dispatcher) moves it, so nothing can be registered
//! after the first dispatch.
//!
//! # Example
//!
//! ```
//! use procwire_router::context::Context;
//! use procwire_router::procedure::{NoInput, Procedure, ProcedureRegistry};
//!
//! let mut registry = ProcedureRegistry::new();
//! registry
//!     .register(
//!         "general.health",
//!         Procedure::query(|_: NoInput, _ctx: Context| async { Ok("ok") }),
//!     )
//!     .unwrap();
//! registry.alias("health", "general.health").unwrap();
//!
//! assert!(registry.register(
//!     "health",
//!     Procedure::query(|_: NoInput, _ctx: Context| async { Ok("again") }),
//! ).is_err());
//! assert_eq!(registry.len(), 2);
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use super::Procedure;
use crate::error::RegistryError;

/// Check that a path is a non-empty sequence of valid segments.
pub fn validate_path(path: &str) -> Result<(), RegistryError> {
    let valid = !path.is_empty()
        && path.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
        });

    if valid {
        Ok(())
    } else {
        Err(RegistryError::InvalidPath(path.to_string()))
    }
}

fn join_path(prefix: &str, path: &str) -> String {
    if prefix.is_empty() {
        path.to_string()
    } else {
        format!("{}.{}", prefix, path)
    }
}

/// Registry mapping procedure paths to descriptors.
#[derive(Debug, Default)]
pub struct ProcedureRegistry {
    /// Descriptors by path. Aliases share the same `Arc`.
    procedures: BTreeMap<String, Arc<Procedure>>,
}

impl ProcedureRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a procedure under `path`.
    ///
    /// # Errors
    ///
    /// `DuplicateProcedure` if the path is taken (the existing descriptor is
    /// kept), `InvalidPath` if the path is malformed.
    pub fn register(&mut self, path: &str, procedure: Procedure) -> Result<(), RegistryError> {
        self.register_shared(path, Arc::new(procedure))
    }

    /// Register an already shared descriptor under `path`.
    pub fn register_shared(
        &mut self,
        path: &str,
        procedure: Arc<Procedure>,
    ) -> Result<(), RegistryError> {
        validate_path(path)?;
        if self.procedures.contains_key(path) {
            return Err(RegistryError::DuplicateProcedure(path.to_string()));
        }

        debug!(
            path,
            kind = ?procedure.kind(),
            access = ?procedure.access(),
            "Registered procedure"
        );
        self.procedures.insert(path.to_string(), procedure);
        Ok(())
    }

    /// Make the procedure at `target` reachable under `alias` as well.
    ///
    /// # Errors
    ///
    /// `UnknownAliasTarget` if `target` is not registered,
    /// `DuplicateProcedure` if `alias` is taken.
    pub fn alias(&mut self, alias: &str, target: &str) -> Result<(), RegistryError> {
        let procedure = self
            .procedures
            .get(target)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownAliasTarget(target.to_string()))?;

        self.register_shared(alias, procedure)
    }

    /// Move every procedure of `other` into this registry under `prefix`.
    ///
    /// All paths are checked before anything is inserted, so on error this
    /// registry is unchanged.
    pub fn merge(&mut self, prefix: &str, other: ProcedureRegistry) -> Result<(), RegistryError> {
        if !prefix.is_empty() {
            validate_path(prefix)?;
        }

        for path in other.procedures.keys() {
            let full = join_path(prefix, path);
            if self.procedures.contains_key(&full) {
                return Err(RegistryError::DuplicateProcedure(full));
            }
        }

        for (path, procedure) in other.procedures {
            self.procedures.insert(join_path(prefix, &path), procedure);
        }
        Ok(())
    }

    /// Get a procedure by path.
    pub fn get(&self, path: &str) -> Option<&Arc<Procedure>> {
        self.procedures.get(path)
    }

    /// Check if a path is registered.
    pub fn contains(&self, path: &str) -> bool {
        self.procedures.contains_key(path)
    }

    /// All registered paths, sorted.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.procedures.keys().map(|s| s.as_str())
    }

    /// Iterate over `(path, procedure)` pairs, sorted by path.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Procedure>)> {
        self.procedures.iter().map(|(path, p)| (path.as_str(), p))
    }

    /// Number of registered paths (aliases included).
    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    /// Check if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AuthContext, Context};
    use crate::procedure::{NoInput, ProcedureKind};

    fn health() -> Procedure {
        Procedure::query(|_: NoInput, _ctx: Context| async { Ok("ok") })
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = ProcedureRegistry::new();
        registry.register("general.health", health()).unwrap();

        assert!(registry.contains("general.health"));
        assert!(registry.get("general.health").is_some());
        assert!(registry.get("general").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_keeps_original() {
        let mut registry = ProcedureRegistry::new();
        registry.register("user.update", health()).unwrap();

        let err = registry
            .register(
                "user.update",
                Procedure::protected_mutation(|_: NoInput, _auth: AuthContext| async { Ok(()) }),
            )
            .unwrap_err();

        assert_eq!(err, RegistryError::DuplicateProcedure("user.update".into()));
        let kept = registry.get("user.update").unwrap();
        assert_eq!(kept.kind(), ProcedureKind::Query);
        assert!(!kept.requires_auth());
    }

    #[test]
    fn test_invalid_paths() {
        for path in ["", ".", "a..b", "a.", ".a", "a b", "a/b", "a-b"] {
            assert_eq!(
                validate_path(path),
                Err(RegistryError::InvalidPath(path.to_string())),
                "{path:?} should be rejected"
            );
        }
        assert!(validate_path("user.getProfile").is_ok());
        assert!(validate_path("v2.user_admin.list").is_ok());
    }

    #[test]
    fn test_alias_shares_descriptor() {
        let mut registry = ProcedureRegistry::new();
        registry.register("general.hello", health()).unwrap();
        registry.alias("hello", "general.hello").unwrap();

        let a = registry.get("hello").unwrap();
        let b = registry.get("general.hello").unwrap();
        assert!(Arc::ptr_eq(a, b));
    }

    #[test]
    fn test_alias_errors() {
        let mut registry = ProcedureRegistry::new();
        registry.register("a", health()).unwrap();
        registry.register("b", health()).unwrap();

        assert_eq!(
            registry.alias("c", "missing"),
            Err(RegistryError::UnknownAliasTarget("missing".into()))
        );
        assert_eq!(
            registry.alias("b", "a"),
            Err(RegistryError::DuplicateProcedure("b".into()))
        );
    }

    #[test]
    fn test_merge_prefixes_paths() {
        let mut child = ProcedureRegistry::new();
        child.register("getProfile", health()).unwrap();
        child.register("admin.list", health()).unwrap();

        let mut root = ProcedureRegistry::new();
        root.merge("user", child).unwrap();

        let paths: Vec<_> = root.paths().collect();
        assert_eq!(paths, vec!["user.admin.list", "user.getProfile"]);
    }

    #[test]
    fn test_merge_conflict_is_atomic() {
        let mut root = ProcedureRegistry::new();
        root.register("user.b", health()).unwrap();

        let mut child = ProcedureRegistry::new();
        child.register("a", health()).unwrap();
        child.register("b", health()).unwrap();

        let err = root.merge("user", child).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateProcedure("user.b".into()));
        assert_eq!(root.len(), 1);
        assert!(!root.contains("user.a"));
    }
}
