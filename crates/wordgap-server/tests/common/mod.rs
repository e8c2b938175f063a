//! Shared helpers for the HTTP tests

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, Response},
    Router,
};
use hound::{WavSpec, WavWriter};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceExt;
use wordgap_core::{AppConfig, AudioFormat, Error, SpeechBackend};
use wordgap_server::{create_router, AppState};

pub const CLIP_RATE: u32 = 8000;
pub const CLIP_SAMPLES: usize = 400;

/// Writes a short constant tone per unit without touching the network
pub struct FakeBackend {
    fail_on: Vec<&'static str>,
    unavailable: bool,
}

impl FakeBackend {
    pub fn working() -> Arc<Self> {
        Arc::new(Self {
            fail_on: Vec::new(),
            unavailable: false,
        })
    }

    pub fn failing_on(texts: &[&'static str]) -> Arc<Self> {
        Arc::new(Self {
            fail_on: texts.to_vec(),
            unavailable: false,
        })
    }

    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            fail_on: Vec::new(),
            unavailable: true,
        })
    }
}

impl SpeechBackend for FakeBackend {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn clip_extension(&self) -> &'static str {
        "wav"
    }

    fn check_available(&self) -> wordgap_core::Result<()> {
        if self.unavailable {
            return Err(Error::BackendUnavailable("fake engine offline".into()));
        }
        Ok(())
    }

    fn synthesize(
        &self,
        text: &str,
        destination: &Path,
        _deadline: Instant,
    ) -> wordgap_core::Result<()> {
        if self.fail_on.iter().any(|t| *t == text) {
            return Err(Error::ServiceError(format!("cannot say {:?}", text)));
        }

        let spec = WavSpec {
            channels: 1,
            sample_rate: CLIP_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = WavWriter::create(destination, spec)?;
        for _ in 0..CLIP_SAMPLES {
            writer.write_sample(4096i16)?;
        }
        writer.finalize()?;
        Ok(())
    }
}

/// WAV output at the clip rate with a short pause, so no ffmpeg is needed
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.assembler.output_format = AudioFormat::Wav;
    config.assembler.word_pause_seconds = 0.1;
    config.codec.sample_rate = CLIP_RATE;
    config.server.max_text_chars = 200;
    config
}

pub fn app_with(backend: Arc<FakeBackend>) -> Router {
    let config = test_config();
    let online: Arc<dyn SpeechBackend> = backend.clone();
    let offline: Arc<dyn SpeechBackend> = backend;
    create_router(AppState::with_backends(config, online, offline))
}

pub fn test_app() -> Router {
    app_with(FakeBackend::working())
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Mono 16-bit samples of a WAV file
pub fn wav_samples(bytes: &[u8]) -> (u32, Vec<i16>) {
    let reader = hound::WavReader::new(std::io::Cursor::new(bytes)).unwrap();
    let rate = reader.spec().sample_rate;
    let samples = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
    (rate, samples)
}
