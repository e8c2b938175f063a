//! Application state management

use std::sync::Arc;
use wordgap_core::{
    build_backend, AppConfig, AssemblerConfig, AudioEncoder, BackendKind, Pipeline, SpeechBackend,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    online: Arc<dyn SpeechBackend>,
    offline: Arc<dyn SpeechBackend>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let online = build_backend(BackendKind::Online, &config);
        let offline = build_backend(BackendKind::Offline, &config);
        Self::with_backends(config, online, offline)
    }

    /// State with explicit engines behind each backend kind
    pub fn with_backends(
        config: AppConfig,
        online: Arc<dyn SpeechBackend>,
        offline: Arc<dyn SpeechBackend>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            online,
            offline,
        }
    }

    pub fn backend(&self, kind: BackendKind) -> Arc<dyn SpeechBackend> {
        match kind {
            BackendKind::Online => Arc::clone(&self.online),
            BackendKind::Offline => Arc::clone(&self.offline),
        }
    }

    /// A pipeline for one request; validates `assembler`
    pub fn pipeline(&self, assembler: AssemblerConfig) -> wordgap_core::Result<Pipeline> {
        let backend = self.backend(assembler.backend);
        Pipeline::new(
            assembler,
            backend,
            AudioEncoder::new(self.config.codec.clone()),
        )
    }
}
