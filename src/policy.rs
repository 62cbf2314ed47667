// Single-session policy resolution
// String settings name predicates registered by the host under a dotted path

use crate::error::{Error, Result};
use crate::models::User;
use crate::settings::SettingValue;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Decides per user whether the single-session policy applies
pub type SessionPredicate = Arc<dyn Fn(&User) -> bool + Send + Sync>;

/// Predicates the host makes addressable from configuration
#[derive(Clone, Default)]
pub struct PredicateRegistry {
    predicates: HashMap<String, SessionPredicate>,
}

impl PredicateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, path: &str, predicate: F) -> &mut Self
    where
        F: Fn(&User) -> bool + Send + Sync + 'static,
    {
        self.predicates.insert(path.to_string(), Arc::new(predicate));
        self
    }

    pub fn resolve(&self, path: &str) -> Option<SessionPredicate> {
        self.predicates.get(path).cloned()
    }

    /// Registered paths, sorted
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.predicates.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }
}

impl fmt::Debug for PredicateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateRegistry")
            .field("paths", &self.paths())
            .finish()
    }
}

#[derive(Clone)]
pub enum SingleSessionPolicy {
    Always,
    Never,
    Predicate {
        path: String,
        predicate: SessionPredicate,
    },
}

impl SingleSessionPolicy {
    /// Build the policy for a `SINGLE_USER_SESSION` value. Unset means enabled.
    pub fn from_setting(
        value: Option<&SettingValue>,
        registry: &PredicateRegistry,
    ) -> Result<Self> {
        match value {
            None | Some(SettingValue::Bool(true)) => Ok(SingleSessionPolicy::Always),
            Some(SettingValue::Bool(false)) => Ok(SingleSessionPolicy::Never),
            Some(SettingValue::Path(path)) => {
                let predicate = registry.resolve(path).ok_or_else(|| {
                    Error::ImproperlyConfigured(format!(
                        "SINGLE_USER_SESSION must be a boolean or the path of a registered \
                         predicate that takes a user. Cannot resolve '{}' (registered: [{}])",
                        path,
                        registry.paths().join(", ")
                    ))
                })?;

                Ok(SingleSessionPolicy::Predicate {
                    path: path.clone(),
                    predicate,
                })
            }
        }
    }

    pub fn applies_to(&self, user: &User) -> bool {
        match self {
            SingleSessionPolicy::Always => true,
            SingleSessionPolicy::Never => false,
            SingleSessionPolicy::Predicate { predicate, .. } => predicate(user),
        }
    }
}

impl fmt::Debug for SingleSessionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SingleSessionPolicy::Always => f.write_str("Always"),
            SingleSessionPolicy::Never => f.write_str("Never"),
            SingleSessionPolicy::Predicate { path, .. } => {
                f.debug_tuple("Predicate").field(path).finish()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> PredicateRegistry {
        let mut registry = PredicateRegistry::new();
        registry.register("policies.staff_only", |user: &User| user.is_staff);
        registry
    }

    #[test]
    fn test_unset_means_always() {
        let policy = SingleSessionPolicy::from_setting(None, &registry()).unwrap();
        assert!(policy.applies_to(&User::new("alice", "alice@example.com")));
    }

    #[test]
    fn test_false_means_never() {
        let value = SettingValue::Bool(false);
        let policy = SingleSessionPolicy::from_setting(Some(&value), &registry()).unwrap();
        assert!(!policy.applies_to(&User::new("alice", "alice@example.com")));
    }

    #[test]
    fn test_predicate_decides_per_user() {
        let value = SettingValue::from("policies.staff_only");
        let policy = SingleSessionPolicy::from_setting(Some(&value), &registry()).unwrap();

        let mut staff = User::new("staff", "staff@example.com");
        staff.is_staff = true;
        let regular = User::new("regular", "regular@example.com");

        assert!(policy.applies_to(&staff));
        assert!(!policy.applies_to(&regular));
    }

    #[test]
    fn test_unknown_path_is_improperly_configured() {
        let value = SettingValue::from("policies.missing");
        let err = SingleSessionPolicy::from_setting(Some(&value), &registry()).unwrap_err();

        assert!(matches!(err, Error::ImproperlyConfigured(_)));
        assert!(err.to_string().contains("policies.missing"));
        assert!(err.to_string().contains("registered: [policies.staff_only]"));
    }
}
