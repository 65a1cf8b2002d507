//! Shared application state for axum handlers.

use std::sync::Arc;

use labsim_app::registry::DeviceRegistry;

/// Application state shared across all axum handlers.
///
/// `Clone` only clones the `Arc` wrapper; the registry itself is shared.
#[derive(Clone)]
pub struct AppState {
    /// The live device registry.
    pub registry: Arc<DeviceRegistry>,
}

impl AppState {
    /// Create state around an existing registry.
    #[must_use]
    pub fn new(registry: DeviceRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }
}
