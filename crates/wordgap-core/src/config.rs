//! Configuration types for the Wordgap speech assembler

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::audio::AudioFormat;
use crate::error::{Error, Result};

/// Longest pause accepted after a unit, in seconds
pub const MAX_WORD_PAUSE_SECONDS: f64 = 60.0;

/// Longest per-unit synthesis budget, in seconds
pub const MAX_SYNTHESIS_TIMEOUT_SECS: u64 = 600;

/// Which synthesis backend produces unit clips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Network text-to-speech service
    #[default]
    Online,
    /// Local espeak-ng engine
    Offline,
}

/// How units are dispatched to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStrategy {
    /// One unit at a time, in input order
    #[default]
    Sequential,
    /// All units submitted to a worker pool at once
    Concurrent,
}

/// What a per-unit synthesis failure does to the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FaultTolerance {
    /// Log the failure, drop the unit, keep going
    #[default]
    SkipAndContinue,
    /// Abort the request on the first failed unit
    FailFast,
}

/// Whether a skipped unit still leaves a pause behind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailedUnitGap {
    /// Nothing is inserted for a failed unit
    #[default]
    Skip,
    /// A pause is inserted in place of the failed unit
    Silence,
}

/// Top-level configuration, one section per component
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub assembler: AssemblerConfig,

    #[serde(default)]
    pub online: OnlineConfig,

    #[serde(default)]
    pub offline: OfflineConfig,

    #[serde(default)]
    pub codec: CodecConfig,
}

impl AppConfig {
    /// Parse a TOML document; missing sections and keys take their defaults
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.assembler.validate()?;
        self.codec.validate()?;
        if self.server.max_text_chars == 0 {
            return Err(Error::ConfigError(
                "server.max_text_chars must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Segmentation, pacing and dispatch settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblerConfig {
    /// Words grouped into one synthesis unit
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Pause inserted after every unit, in seconds
    #[serde(default = "default_word_pause_seconds")]
    pub word_pause_seconds: f64,

    #[serde(default)]
    pub backend: BackendKind,

    #[serde(default)]
    pub execution_strategy: ExecutionStrategy,

    /// Worker limit for the concurrent strategy; unlimited when unset
    #[serde(default)]
    pub max_workers: Option<usize>,

    #[serde(default)]
    pub fault_tolerance: FaultTolerance,

    #[serde(default)]
    pub failed_unit_gap: FailedUnitGap,

    /// Upper bound for a single synthesis call
    #[serde(default = "default_synthesis_timeout_secs")]
    pub synthesis_timeout_secs: u64,

    #[serde(default)]
    pub output_format: AudioFormat,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            word_pause_seconds: default_word_pause_seconds(),
            backend: BackendKind::default(),
            execution_strategy: ExecutionStrategy::default(),
            max_workers: None,
            fault_tolerance: FaultTolerance::default(),
            failed_unit_gap: FailedUnitGap::default(),
            synthesis_timeout_secs: default_synthesis_timeout_secs(),
            output_format: AudioFormat::default(),
        }
    }
}

impl AssemblerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::ConfigError(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        if !(0.0..=MAX_WORD_PAUSE_SECONDS).contains(&self.word_pause_seconds) {
            return Err(Error::ConfigError(format!(
                "word_pause_seconds must be between 0 and {}, got {}",
                MAX_WORD_PAUSE_SECONDS, self.word_pause_seconds
            )));
        }
        if !(1..=MAX_SYNTHESIS_TIMEOUT_SECS).contains(&self.synthesis_timeout_secs) {
            return Err(Error::ConfigError(format!(
                "synthesis_timeout_secs must be between 1 and {}, got {}",
                MAX_SYNTHESIS_TIMEOUT_SECS, self.synthesis_timeout_secs
            )));
        }
        if self.max_workers == Some(0) {
            return Err(Error::ConfigError(
                "max_workers must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn synthesis_timeout(&self) -> Duration {
        Duration::from_secs(self.synthesis_timeout_secs)
    }
}

fn default_chunk_size() -> usize {
    2
}

fn default_word_pause_seconds() -> f64 {
    1.75
}

fn default_synthesis_timeout_secs() -> u64 {
    10
}

/// Settings for the network text-to-speech service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnlineConfig {
    /// Language code understood by the service
    #[serde(default = "default_lang")]
    pub lang: String,

    /// Top-level domain of the service host, selects the accent
    #[serde(default = "default_tld")]
    pub tld: String,

    /// Slower speaking rate
    #[serde(default)]
    pub slow: bool,

    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Service root replacing `https://translate.google.{tld}`, e.g. a
    /// mirror or a local stand-in. Reached without system proxies.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for OnlineConfig {
    fn default() -> Self {
        Self {
            lang: default_lang(),
            tld: default_tld(),
            slow: false,
            request_timeout_secs: default_request_timeout_secs(),
            base_url: None,
        }
    }
}

fn default_lang() -> String {
    "en".to_string()
}

fn default_tld() -> String {
    "com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

/// Settings for the local espeak-ng engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineConfig {
    #[serde(default = "default_espeak_path")]
    pub executable: PathBuf,

    #[serde(default = "default_voice")]
    pub voice: String,

    /// Speaking rate in words per minute
    #[serde(default = "default_words_per_minute")]
    pub words_per_minute: u32,

    /// Amplitude, 0-200
    #[serde(default = "default_amplitude")]
    pub amplitude: u32,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            executable: default_espeak_path(),
            voice: default_voice(),
            words_per_minute: default_words_per_minute(),
            amplitude: default_amplitude(),
        }
    }
}

fn default_espeak_path() -> PathBuf {
    PathBuf::from("espeak-ng")
}

fn default_voice() -> String {
    "en".to_string()
}

fn default_words_per_minute() -> u32 {
    175
}

fn default_amplitude() -> u32 {
    100
}

/// Output codec settings, handed to the encoder at construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodecConfig {
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Sample rate of the assembled track
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// MP3 bitrate in kbit/s
    #[serde(default = "default_bitrate_kbps")]
    pub bitrate_kbps: u32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            sample_rate: default_sample_rate(),
            bitrate_kbps: default_bitrate_kbps(),
        }
    }
}

impl CodecConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::ConfigError(
                "codec.sample_rate must be positive".to_string(),
            ));
        }
        if self.bitrate_kbps == 0 {
            return Err(Error::ConfigError(
                "codec.bitrate_kbps must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_sample_rate() -> u32 {
    24000
}

fn default_bitrate_kbps() -> u32 {
    128
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_enabled")]
    pub cors_enabled: bool,

    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Longest accepted input text, in characters
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: default_cors_enabled(),
            cors_origins: vec!["*".to_string()],
            max_text_chars: default_max_text_chars(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_enabled() -> bool {
    true
}

fn default_max_text_chars() -> usize {
    5000
}
