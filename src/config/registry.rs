//! App registry lookup.
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) app lookup via HashMap
//! - Explicit no-match rather than silent default; callers turn a miss
//!   into a 404 carrying the list of valid alternatives

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::schema::AppConfig;

/// Immutable mapping of app name → app definition.
///
/// Built once at startup from `GatewayConfig.apps`; the request
/// pipeline only reads it.
#[derive(Debug, Default)]
pub struct AppRegistry {
    apps: HashMap<String, Arc<AppConfig>>,
}

impl AppRegistry {
    /// Build the registry from the configured app list.
    pub fn from_config(apps: Vec<AppConfig>) -> Self {
        let apps = apps
            .into_iter()
            .map(|app| (app.name.clone(), Arc::new(app)))
            .collect();
        Self { apps }
    }

    /// Look up an app by name.
    pub fn app(&self, name: &str) -> Option<Arc<AppConfig>> {
        self.apps.get(name).cloned()
    }

    /// Sorted app names, for "valid alternatives" error payloads.
    pub fn app_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.apps.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered apps.
    pub fn len(&self) -> usize {
        self.apps.len()
    }

    /// True when no apps are registered.
    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}
