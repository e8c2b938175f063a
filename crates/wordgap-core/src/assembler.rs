//! Ordered concatenation of unit clips and pauses into one track

use serde::Serialize;
use tracing::{debug, info};

use crate::audio::{decode_file, resample_mono, samples_for_duration};
use crate::config::FailedUnitGap;
use crate::error::{Error, Result};
use crate::unit::Unit;

/// What a span of the assembled track holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Speech,
    Pause,
}

/// A contiguous span of the track, attributed to one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackSegment {
    pub unit_index: usize,
    pub kind: SegmentKind,
    /// First sample of the span
    pub start: usize,
    pub len: usize,
}

/// Concatenated mono samples plus the layout that produced them
#[derive(Debug, Clone)]
pub struct AssembledTrack {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub segments: Vec<TrackSegment>,
    /// Units whose audio made it into the track, in track order
    pub synthesized: Vec<usize>,
    /// Units left out because synthesis failed
    pub skipped: Vec<usize>,
}

impl AssembledTrack {
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.samples.len() as u64 * 1000) / self.sample_rate as u64
    }

    /// Unit indices of the speech spans, in track order
    pub fn speech_order(&self) -> Vec<usize> {
        self.segments
            .iter()
            .filter(|s| s.kind == SegmentKind::Speech)
            .map(|s| s.unit_index)
            .collect()
    }

    pub fn pauses(&self) -> impl Iterator<Item = &TrackSegment> {
        self.segments.iter().filter(|s| s.kind == SegmentKind::Pause)
    }
}

/// Joins decoded clips, each followed by a fixed pause
#[derive(Debug, Clone)]
pub struct Assembler {
    sample_rate: u32,
    pause_samples: usize,
    failed_unit_gap: FailedUnitGap,
}

impl Assembler {
    pub fn new(sample_rate: u32, word_pause_seconds: f64, failed_unit_gap: FailedUnitGap) -> Self {
        Self {
            sample_rate,
            pause_samples: samples_for_duration(word_pause_seconds, sample_rate),
            failed_unit_gap,
        }
    }

    pub fn pause_samples(&self) -> usize {
        self.pause_samples
    }

    /// Assemble units in the order given. Every unit must be in a terminal
    /// state; succeeded units are decoded from their clip files.
    pub fn assemble(&self, units: &[Unit]) -> Result<AssembledTrack> {
        let mut track = AssembledTrack {
            samples: Vec::new(),
            sample_rate: self.sample_rate,
            segments: Vec::with_capacity(units.len() * 2),
            synthesized: Vec::new(),
            skipped: Vec::new(),
        };

        for unit in units {
            match unit.clip().filter(|_| unit.is_succeeded()) {
                Some(clip_path) => {
                    let clip = decode_file(clip_path)?;
                    let samples = resample_mono(&clip.samples, clip.sample_rate, self.sample_rate)?;
                    self.push(&mut track, unit.index(), SegmentKind::Speech, &samples)?;
                    self.push_pause(&mut track, unit.index())?;
                    track.synthesized.push(unit.index());
                }
                None => {
                    debug!(
                        "Leaving out unit {} ({:?}): {}",
                        unit.index(),
                        unit.text(),
                        unit.failure().unwrap_or("not synthesized")
                    );
                    if self.failed_unit_gap == FailedUnitGap::Silence {
                        self.push_pause(&mut track, unit.index())?;
                    }
                    track.skipped.push(unit.index());
                }
            }
        }

        if track.synthesized.is_empty() {
            return Err(Error::Assembly(format!(
                "none of {} units were synthesized",
                units.len()
            )));
        }

        info!(
            "Assembled {} of {} units into {} ms of audio",
            track.synthesized.len(),
            units.len(),
            track.duration_ms()
        );
        Ok(track)
    }

    fn push(
        &self,
        track: &mut AssembledTrack,
        unit_index: usize,
        kind: SegmentKind,
        samples: &[f32],
    ) -> Result<()> {
        reserve(track, samples.len())?;
        track.segments.push(TrackSegment {
            unit_index,
            kind,
            start: track.samples.len(),
            len: samples.len(),
        });
        track.samples.extend_from_slice(samples);
        Ok(())
    }

    fn push_pause(&self, track: &mut AssembledTrack, unit_index: usize) -> Result<()> {
        reserve(track, self.pause_samples)?;
        track.segments.push(TrackSegment {
            unit_index,
            kind: SegmentKind::Pause,
            start: track.samples.len(),
            len: self.pause_samples,
        });
        track.samples.resize(track.samples.len() + self.pause_samples, 0.0);
        Ok(())
    }
}

/// Grow the track buffer without aborting when memory runs out
fn reserve(track: &mut AssembledTrack, additional: usize) -> Result<()> {
    track.samples.try_reserve(additional).map_err(|e| {
        Error::Assembly(format!(
            "cannot grow track of {} samples by {}: {}",
            track.samples.len(),
            additional,
            e
        ))
    })
}
