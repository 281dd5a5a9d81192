//! Capability detection.
//!
//! Runs once per controller. Some hosts construct their recogniser with
//! observable side effects, so the engine is instantiated at most once here
//! and then reused for every activation.

use std::sync::Arc;

use tracing::{info, warn};

use crate::engine::{EngineProvider, RecognitionEngine};

/// Outcome of probing a provider.
#[derive(Clone, Default)]
pub struct Capability {
    engine: Option<Arc<dyn RecognitionEngine>>,
}

impl Capability {
    /// Query `provider` and build its engine if it claims availability.
    ///
    /// A provider that advertises the capability but fails to build an
    /// engine counts as unsupported.
    pub fn detect(provider: &dyn EngineProvider) -> Self {
        if !provider.is_available() {
            info!("speech recognition unavailable on this host");
            return Self::default();
        }

        match provider.create() {
            Ok(engine) => Self {
                engine: Some(engine),
            },
            Err(e) => {
                warn!("recognition engine construction failed ({e}); treating as unsupported");
                Self::default()
            }
        }
    }

    pub fn is_supported(&self) -> bool {
        self.engine.is_some()
    }

    pub fn engine(&self) -> Option<&Arc<dyn RecognitionEngine>> {
        self.engine.as_ref()
    }
}

impl std::fmt::Debug for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capability")
            .field("supported", &self.is_supported())
            .finish()
    }
}
