use questlog_core::{Config, ImportReconciler, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    reconciler: ImportReconciler,
}

impl AppState {
    pub fn new(config: Config, reconciler: ImportReconciler) -> Self {
        Self { config, reconciler }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn reconciler(&self) -> &ImportReconciler {
        &self.reconciler
    }
}
