use crate::config::{CalculatorConfig, ServerConfig};
use crate::engine::RendererStatus;
use crate::measure::MeasureOptions;
use crate::session::DocumentStore;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state accessible from all handlers.
#[derive(Debug)]
pub struct AppState {
    pub config: CalculatorConfig,
    pub store: DocumentStore,
    pub renderer: RendererStatus,
    pub cors_permissive: bool,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: CalculatorConfig, server: &ServerConfig, renderer: RendererStatus) -> Self {
        Self {
            config,
            store: DocumentStore::new(
                Duration::from_secs(server.session_ttl_secs),
                server.max_sessions,
            ),
            renderer,
            cors_permissive: server.cors_permissive,
        }
    }

    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }

    /// Measuring options used when a request leaves them out.
    pub fn measure_defaults(&self) -> MeasureOptions {
        MeasureOptions {
            coat_both_sides: self.config.coat_both_sides,
            default_post_diameter_mm: self.config.default_post_diameter_mm,
            ..MeasureOptions::default()
        }
    }
}
