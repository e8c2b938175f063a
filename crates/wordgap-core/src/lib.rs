//! Wordgap Core - chunked speech assembly
//!
//! Splits text into fixed-size word groups, synthesizes every group through
//! a pluggable text-to-speech backend, puts a fixed pause after each one and
//! encodes the whole track as a single audio file.
//!
//! # Example
//!
//! ```ignore
//! use wordgap_core::{AppConfig, Pipeline};
//!
//! let pipeline = Pipeline::from_app_config(&AppConfig::default())?;
//! let audio = pipeline.generate("one two three four five six").await?;
//! std::fs::write(audio.file_name(), &audio.bytes)?;
//! ```

pub mod assembler;
pub mod audio;
pub mod backend;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod segment;
pub mod unit;

pub use assembler::{AssembledTrack, Assembler, SegmentKind, TrackSegment};
pub use audio::{AudioEncoder, AudioFormat};
pub use backend::{build_backend, EspeakBackend, GoogleTtsBackend, SpeechBackend};
pub use config::{
    AppConfig, AssemblerConfig, BackendKind, CodecConfig, ExecutionStrategy, FailedUnitGap,
    FaultTolerance, OfflineConfig, OnlineConfig, ServerConfig,
};
pub use error::{Error, Result};
pub use pipeline::{GeneratedAudio, Pipeline};
pub use segment::Segmenter;
pub use unit::{Unit, UnitState};
