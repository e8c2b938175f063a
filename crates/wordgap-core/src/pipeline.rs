//! End-to-end generation: segment, synthesize, assemble, encode
//!
//! Units are synthesized either one after another or all at once on the
//! blocking pool. Results are always reassembled in input order, never in
//! completion order.

use bytes::Bytes;
use futures::future::try_join_all;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{info, warn};
use uuid::Uuid;

use crate::assembler::{AssembledTrack, Assembler};
use crate::audio::{AudioEncoder, AudioFormat};
use crate::backend::{build_backend, SpeechBackend};
use crate::config::{AppConfig, AssemblerConfig, ExecutionStrategy, FaultTolerance};
use crate::error::{Error, Result};
use crate::segment::Segmenter;
use crate::unit::Unit;

/// Time a backend gets past its deadline to clean up before the unit is abandoned
const DEADLINE_GRACE: Duration = Duration::from_secs(2);

/// Encoded result of one request
#[derive(Debug, Clone)]
pub struct GeneratedAudio {
    pub bytes: Bytes,
    pub format: AudioFormat,
    pub sample_rate: u32,
    pub duration_ms: u64,
    /// Units the input was split into
    pub units: usize,
    pub synthesized: Vec<usize>,
    pub skipped: Vec<usize>,
}

impl GeneratedAudio {
    pub fn file_name(&self) -> String {
        self.format.file_name()
    }

    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

/// The chunked speech assembler
pub struct Pipeline {
    config: AssemblerConfig,
    backend: Arc<dyn SpeechBackend>,
    encoder: AudioEncoder,
}

impl Pipeline {
    pub fn new(
        config: AssemblerConfig,
        backend: Arc<dyn SpeechBackend>,
        encoder: AudioEncoder,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            backend,
            encoder,
        })
    }

    /// Build with the backend and codec named in `config`
    pub fn from_app_config(config: &AppConfig) -> Result<Self> {
        let backend = build_backend(config.assembler.backend, config);
        Self::new(
            config.assembler.clone(),
            backend,
            AudioEncoder::new(config.codec.clone()),
        )
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Turn `text` into one audio file with a pause after every unit
    pub async fn generate(&self, text: &str) -> Result<GeneratedAudio> {
        if text.trim().is_empty() {
            return Err(Error::EmptyInput);
        }

        let request_id = Uuid::new_v4();
        let segmenter = Segmenter::new(text, self.config.chunk_size)?;
        let units: Vec<Unit> = segmenter
            .chunks()
            .enumerate()
            .map(|(index, chunk)| Unit::new(index, chunk))
            .collect();

        info!(
            "Request {}: {} words in {} units via {} ({:?})",
            request_id,
            segmenter.word_count(),
            units.len(),
            self.backend.name(),
            self.config.execution_strategy
        );

        self.check_available().await?;

        // Clip files live until this directory is dropped at the end of the request
        let scratch = tempfile::Builder::new()
            .prefix(&format!("wordgap-{}-", request_id))
            .tempdir()?;

        let units = match self.config.execution_strategy {
            ExecutionStrategy::Sequential => self.run_sequential(units, scratch.path()).await?,
            ExecutionStrategy::Concurrent => self.run_concurrent(units, scratch.path()).await?,
        };

        let track = self.assemble(units).await?;
        let duration_ms = track.duration_ms();
        let AssembledTrack {
            samples,
            sample_rate,
            synthesized,
            skipped,
            ..
        } = track;
        let bytes = self.encode(samples).await?;

        info!(
            "Request {}: {} bytes of {} ({} ms, {} skipped)",
            request_id,
            bytes.len(),
            self.config.output_format.extension(),
            duration_ms,
            skipped.len()
        );

        Ok(GeneratedAudio {
            bytes: Bytes::from(bytes),
            format: self.config.output_format,
            sample_rate,
            duration_ms,
            units: synthesized.len() + skipped.len(),
            synthesized,
            skipped,
        })
    }

    async fn check_available(&self) -> Result<()> {
        let backend = Arc::clone(&self.backend);
        let encoder = self.encoder.clone();
        let format = self.config.output_format;
        tokio::task::spawn_blocking(move || {
            backend.check_available()?;
            encoder.check_available(format)
        })
        .await
        .map_err(|e| Error::BackendUnavailable(format!("availability check failed: {}", e)))?
    }

    async fn run_sequential(&self, units: Vec<Unit>, scratch: &Path) -> Result<Vec<Unit>> {
        let mut done = Vec::with_capacity(units.len());
        for unit in units {
            done.push(self.synthesize_unit(unit, scratch).await?);
        }
        Ok(done)
    }

    async fn run_concurrent(&self, units: Vec<Unit>, scratch: &Path) -> Result<Vec<Unit>> {
        let limiter = self.config.max_workers.map(|n| Arc::new(Semaphore::new(n)));

        let tasks = units.into_iter().map(|unit| {
            let limiter = limiter.clone();
            async move {
                let _permit = match limiter {
                    Some(semaphore) => Some(
                        semaphore
                            .acquire_owned()
                            .await
                            .map_err(|e| Error::Assembly(format!("worker pool closed: {}", e)))?,
                    ),
                    None => None,
                };
                self.synthesize_unit(unit, scratch).await
            }
        });

        // try_join_all keeps input order and stops at the first fatal error
        try_join_all(tasks).await
    }

    /// Drive one unit to a terminal state. Returns `Err` only for failures
    /// that abort the whole request.
    async fn synthesize_unit(&self, mut unit: Unit, scratch: &Path) -> Result<Unit> {
        let destination = scratch.join(unit.clip_file_name(self.backend.clip_extension()));
        let backend = Arc::clone(&self.backend);
        let text = unit.text().to_string();
        let timeout = self.config.synthesis_timeout();
        let deadline = Instant::now() + timeout;

        unit.start();
        let task = tokio::task::spawn_blocking(move || {
            backend
                .synthesize(&text, &destination, deadline)
                .map(|_| destination)
        });

        // Backends stop their own work at the deadline; this only catches
        // one that overruns it
        let reason = match tokio::time::timeout(timeout + DEADLINE_GRACE, task).await {
            Ok(Ok(Ok(clip))) => {
                unit.succeed(clip);
                return Ok(unit);
            }
            Ok(Ok(Err(e @ Error::BackendUnavailable(_)))) => return Err(e),
            Ok(Ok(Err(e))) => e.to_string(),
            Ok(Err(join_error)) => format!("synthesis task failed: {}", join_error),
            Err(_) => format!("timed out after {}s", timeout.as_secs()),
        };

        let error = Error::synthesis(unit.index(), unit.text(), &reason);
        match self.config.fault_tolerance {
            FaultTolerance::FailFast => Err(error),
            FaultTolerance::SkipAndContinue => {
                warn!("Skipping unit: {}", error);
                unit.fail(reason);
                Ok(unit)
            }
        }
    }

    async fn assemble(&self, units: Vec<Unit>) -> Result<AssembledTrack> {
        let assembler = Assembler::new(
            self.encoder.sample_rate(),
            self.config.word_pause_seconds,
            self.config.failed_unit_gap,
        );
        tokio::task::spawn_blocking(move || assembler.assemble(&units))
            .await
            .map_err(|e| Error::Assembly(format!("assembly task failed: {}", e)))?
    }

    async fn encode(&self, samples: Vec<f32>) -> Result<Vec<u8>> {
        let encoder = self.encoder.clone();
        let format = self.config.output_format;
        tokio::task::spawn_blocking(move || encoder.encode(&samples, format))
            .await
            .map_err(|e| Error::AudioError(format!("encoding task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CodecConfig, FailedUnitGap};
    use hound::{WavSpec, WavWriter};
    use std::io::Cursor;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const RATE: u32 = 8000;

    /// Writes a constant-level clip of 100 samples per character of text
    #[derive(Default)]
    struct ToneBackend {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
        fail_on: Vec<&'static str>,
        slow_on: Vec<&'static str>,
        /// Shorter texts sleep longer, so completion order is reversed
        reverse_completion: bool,
        unavailable: bool,
    }

    impl SpeechBackend for ToneBackend {
        fn name(&self) -> &'static str {
            "tone"
        }

        fn clip_extension(&self) -> &'static str {
            "wav"
        }

        fn check_available(&self) -> Result<()> {
            if self.unavailable {
                return Err(Error::BackendUnavailable("tone engine missing".to_string()));
            }
            Ok(())
        }

        fn synthesize(&self, text: &str, destination: &Path, deadline: Instant) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

            let result = self.write_clip(text, destination, deadline);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }

    impl ToneBackend {
        fn write_clip(&self, text: &str, destination: &Path, deadline: Instant) -> Result<()> {
            if self.fail_on.iter().any(|w| *w == text) {
                return Err(Error::ServiceError("simulated outage".to_string()));
            }
            if self.slow_on.iter().any(|w| *w == text) {
                let done = Instant::now() + Duration::from_millis(1500);
                if deadline < done {
                    std::thread::sleep(deadline.saturating_duration_since(Instant::now()));
                    return Err(Error::ServiceError("deadline passed".to_string()));
                }
                std::thread::sleep(Duration::from_millis(1500));
            }
            let len = text.chars().count();
            if self.reverse_completion {
                std::thread::sleep(Duration::from_millis(20 * (8 - len.min(7)) as u64));
            }

            let spec = WavSpec {
                channels: 1,
                sample_rate: RATE,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            };
            let mut writer = WavWriter::create(destination, spec)?;
            for _ in 0..len * 100 {
                writer.write_sample(8192i16)?;
            }
            writer.finalize()?;
            Ok(())
        }
    }

    fn assembler_config(strategy: ExecutionStrategy) -> AssemblerConfig {
        AssemblerConfig {
            chunk_size: 1,
            word_pause_seconds: 0.05,
            execution_strategy: strategy,
            output_format: AudioFormat::Wav,
            ..AssemblerConfig::default()
        }
    }

    fn build_pipeline(config: AssemblerConfig, backend: Arc<ToneBackend>) -> Pipeline {
        let encoder = AudioEncoder::new(CodecConfig {
            sample_rate: RATE,
            ..CodecConfig::default()
        });
        Pipeline::new(config, backend, encoder).unwrap()
    }

    /// (is_speech, run length) pairs of the decoded output
    fn runs(bytes: &[u8]) -> Vec<(bool, usize)> {
        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let mut runs: Vec<(bool, usize)> = Vec::new();
        for sample in reader.into_samples::<i16>() {
            let speech = sample.unwrap() != 0;
            match runs.last_mut() {
                Some((kind, len)) if *kind == speech => *len += 1,
                _ => runs.push((speech, 1)),
            }
        }
        runs
    }

    #[tokio::test]
    async fn test_blank_input_never_reaches_backend() {
        let backend = Arc::new(ToneBackend::default());
        let pipeline = build_pipeline(assembler_config(ExecutionStrategy::Sequential), backend.clone());

        for text in ["", "   ", "\n\t"] {
            assert!(matches!(pipeline.generate(text).await, Err(Error::EmptyInput)));
        }
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sequential_layout_and_pauses() {
        let backend = Arc::new(ToneBackend::default());
        let pipeline = build_pipeline(assembler_config(ExecutionStrategy::Sequential), backend.clone());

        let audio = pipeline.generate("a bb ccc").await.unwrap();
        assert_eq!(audio.format, AudioFormat::Wav);
        assert_eq!(audio.file_name(), "output_audio.wav");
        assert_eq!(audio.units, 3);
        assert_eq!(audio.synthesized, vec![0, 1, 2]);
        assert!(audio.skipped.is_empty());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);

        assert_eq!(
            runs(&audio.bytes),
            vec![(true, 100), (false, 400), (true, 200), (false, 400), (true, 300), (false, 400)]
        );
        assert_eq!(audio.duration_ms, (600 + 1200) * 1000 / RATE as u64);
    }

    #[tokio::test]
    async fn test_concurrent_keeps_input_order() {
        let backend = Arc::new(ToneBackend {
            reverse_completion: true,
            ..ToneBackend::default()
        });
        let pipeline = build_pipeline(assembler_config(ExecutionStrategy::Concurrent), backend.clone());
        let text = "a bb ccc dddd eeeee";

        let audio = pipeline.generate(text).await.unwrap();
        let speech: Vec<usize> = runs(&audio.bytes)
            .into_iter()
            .filter(|(speech, _)| *speech)
            .map(|(_, len)| len)
            .collect();
        assert_eq!(speech, vec![100, 200, 300, 400, 500]);
        assert_eq!(audio.synthesized, vec![0, 1, 2, 3, 4]);
        assert!(backend.peak_in_flight.load(Ordering::SeqCst) > 1);

        let sequential = build_pipeline(
            assembler_config(ExecutionStrategy::Sequential),
            Arc::new(ToneBackend::default()),
        );
        let expected = sequential.generate(text).await.unwrap();
        assert_eq!(runs(&audio.bytes), runs(&expected.bytes));
    }

    #[tokio::test]
    async fn test_worker_limit_is_respected() {
        let backend = Arc::new(ToneBackend {
            reverse_completion: true,
            ..ToneBackend::default()
        });
        let mut config = assembler_config(ExecutionStrategy::Concurrent);
        config.max_workers = Some(2);
        let pipeline = build_pipeline(config, backend.clone());

        pipeline.generate("a b c d e f").await.unwrap();
        assert_eq!(backend.calls.load(Ordering::SeqCst), 6);
        assert!(backend.peak_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_failed_unit_is_skipped() {
        let backend = Arc::new(ToneBackend {
            fail_on: vec!["bad"],
            ..ToneBackend::default()
        });
        let pipeline = build_pipeline(assembler_config(ExecutionStrategy::Concurrent), backend);

        let audio = pipeline.generate("a bad cc").await.unwrap();
        assert_eq!(audio.synthesized, vec![0, 2]);
        assert_eq!(audio.skipped, vec![1]);
        assert_eq!(
            runs(&audio.bytes),
            vec![(true, 100), (false, 400), (true, 200), (false, 400)]
        );
    }

    #[tokio::test]
    async fn test_failed_unit_gap_policy() {
        let backend = Arc::new(ToneBackend {
            fail_on: vec!["bad"],
            ..ToneBackend::default()
        });
        let mut config = assembler_config(ExecutionStrategy::Sequential);
        config.failed_unit_gap = FailedUnitGap::Silence;
        let pipeline = build_pipeline(config, backend);

        let audio = pipeline.generate("a bad cc").await.unwrap();
        assert_eq!(
            runs(&audio.bytes),
            vec![(true, 100), (false, 800), (true, 200), (false, 400)]
        );
    }

    #[tokio::test]
    async fn test_fail_fast_aborts_request() {
        let backend = Arc::new(ToneBackend {
            fail_on: vec!["bad"],
            ..ToneBackend::default()
        });
        let mut config = assembler_config(ExecutionStrategy::Sequential);
        config.fault_tolerance = FaultTolerance::FailFast;
        let pipeline = build_pipeline(config, backend.clone());

        let result = pipeline.generate("a bad cc").await;
        assert!(matches!(result, Err(Error::Synthesis { index: 1, .. })));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_all_units_failing_is_assembly_error() {
        let backend = Arc::new(ToneBackend {
            fail_on: vec!["x", "y"],
            ..ToneBackend::default()
        });
        let pipeline = build_pipeline(assembler_config(ExecutionStrategy::Concurrent), backend);

        assert!(matches!(pipeline.generate("x y x").await, Err(Error::Assembly(_))));
    }

    #[tokio::test]
    async fn test_slow_unit_times_out() {
        let backend = Arc::new(ToneBackend {
            slow_on: vec!["slow"],
            ..ToneBackend::default()
        });
        let mut config = assembler_config(ExecutionStrategy::Sequential);
        config.synthesis_timeout_secs = 1;
        let pipeline = build_pipeline(config, backend);

        let audio = pipeline.generate("slow ok").await.unwrap();
        assert_eq!(audio.skipped, vec![0]);
        assert_eq!(audio.synthesized, vec![1]);
    }

    #[tokio::test]
    async fn test_unavailable_backend_fails_before_synthesis() {
        let backend = Arc::new(ToneBackend {
            unavailable: true,
            ..ToneBackend::default()
        });
        let pipeline = build_pipeline(assembler_config(ExecutionStrategy::Sequential), backend.clone());

        assert!(matches!(
            pipeline.generate("hello").await,
            Err(Error::BackendUnavailable(_))
        ));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_encoder_fails_before_synthesis() {
        let backend = Arc::new(ToneBackend::default());
        let mut config = assembler_config(ExecutionStrategy::Sequential);
        config.output_format = AudioFormat::Mp3;
        let encoder = AudioEncoder::new(CodecConfig {
            ffmpeg_path: PathBuf::from("/nonexistent/wordgap/ffmpeg"),
            ..CodecConfig::default()
        });
        let pipeline = Pipeline::new(config, backend.clone(), encoder).unwrap();

        assert!(matches!(
            pipeline.generate("hello").await,
            Err(Error::BackendUnavailable(_))
        ));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = assembler_config(ExecutionStrategy::Sequential);
        config.chunk_size = 0;
        let encoder = AudioEncoder::new(CodecConfig::default());
        let result = Pipeline::new(config, Arc::new(ToneBackend::default()), encoder);
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_from_app_config_uses_selected_backend() {
        let mut config = AppConfig::default();
        config.assembler.chunk_size = 5;
        let pipeline = Pipeline::from_app_config(&config).unwrap();
        assert_eq!(pipeline.config().chunk_size, 5);
        assert_eq!(pipeline.backend.name(), "google-tts");
    }
}
