//! Shared state handed to every HTTP handler.

use std::sync::Arc;
use std::time::Duration;

use prizedraw_core::config::DelayRange;
use prizedraw_core::engine::DrawEngine;
use prizedraw_core::error::DrawError;
use prizedraw_core::store::SqliteStateStore;
use rand::Rng;

use crate::error::ApiError;

/// The engine type the daemon serves.
pub type Engine = DrawEngine<SqliteStateStore>;

/// Handler state. Cloning shares the engine.
#[derive(Clone)]
pub struct AppState {
    engine: Arc<Engine>,
    suspense_delay: DelayRange,
}

impl AppState {
    #[must_use]
    pub fn new(engine: Engine, suspense_delay: DelayRange) -> Self {
        Self {
            engine: Arc::new(engine),
            suspense_delay,
        }
    }

    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Runs a blocking engine call off the async runtime.
    ///
    /// Every engine operation touches `SQLite`, so handlers go through here
    /// rather than calling the engine directly.
    pub async fn run<T, F>(&self, op: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Engine) -> Result<T, DrawError> + Send + 'static,
        T: Send + 'static,
    {
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || op(&engine))
            .await
            .map_err(|e| ApiError::Internal(format!("spawn_blocking failed: {e}")))?
            .map_err(ApiError::from)
    }

    /// A random pause within the configured suspense range.
    #[must_use]
    pub fn suspense_delay(&self) -> Duration {
        let DelayRange { min, max } = self.suspense_delay;
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}
