//! Pluggable text-to-speech backends
//!
//! A backend turns one unit of text into one clip file. Calls are blocking;
//! the pipeline runs them on the runtime's blocking pool and hands each one
//! a deadline it must not outlive.

mod offline;
mod online;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

pub use offline::EspeakBackend;
pub use online::{split_for_service, GoogleTtsBackend, MAX_SERVICE_CHARS};

use crate::config::{AppConfig, BackendKind};
use crate::error::Result;

/// Text-to-audio capability shared by the online and offline engines
pub trait SpeechBackend: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Extension of the clip files this backend writes
    fn clip_extension(&self) -> &'static str;

    /// Fails with `BackendUnavailable` when the engine cannot be reached at all
    fn check_available(&self) -> Result<()>;

    /// Synthesize `text` into a clip at `destination`. Work still running at
    /// `deadline` is stopped and reported as an error.
    fn synthesize(&self, text: &str, destination: &Path, deadline: Instant) -> Result<()>;
}

/// Build the backend selected by `kind`
pub fn build_backend(kind: BackendKind, config: &AppConfig) -> Arc<dyn SpeechBackend> {
    match kind {
        BackendKind::Online => Arc::new(GoogleTtsBackend::new(config.online.clone())),
        BackendKind::Offline => Arc::new(EspeakBackend::new(config.offline.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_backend_selects_engine() {
        let config = AppConfig::default();

        let online = build_backend(BackendKind::Online, &config);
        assert_eq!(online.name(), "google-tts");
        assert_eq!(online.clip_extension(), "mp3");

        let offline = build_backend(BackendKind::Offline, &config);
        assert_eq!(offline.name(), "espeak-ng");
        assert_eq!(offline.clip_extension(), "wav");
    }
}
