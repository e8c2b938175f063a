//! Encoding of the assembled track to the output container

use hound::{WavSpec, WavWriter};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, ErrorKind, Write};
use std::process::{Command, Stdio};
use tracing::debug;

use crate::config::CodecConfig;
use crate::error::{Error, Result};

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// MPEG-1 Layer III, encoded by ffmpeg
    #[default]
    Mp3,
    /// 16-bit PCM WAV
    Wav,
}

impl AudioFormat {
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
        }
    }

    /// Get content type for format
    pub fn content_type(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Wav => "audio/wav",
        }
    }

    /// Fixed name offered for download
    pub fn file_name(self) -> String {
        format!("output_audio.{}", self.extension())
    }
}

/// Mono encoder configured once from [`CodecConfig`]
#[derive(Debug, Clone)]
pub struct AudioEncoder {
    config: CodecConfig,
}

impl AudioEncoder {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// Verify the external tools `format` needs are installed
    pub fn check_available(&self, format: AudioFormat) -> Result<()> {
        match format {
            AudioFormat::Wav => Ok(()),
            AudioFormat::Mp3 => {
                let output = Command::new(&self.config.ffmpeg_path)
                    .arg("-version")
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status()
                    .map_err(|e| self.spawn_error(e))?;
                if output.success() {
                    Ok(())
                } else {
                    Err(Error::BackendUnavailable(format!(
                        "{} -version exited with {}",
                        self.config.ffmpeg_path.display(),
                        output
                    )))
                }
            }
        }
    }

    /// Encode mono samples in [-1.0, 1.0] at the configured sample rate
    pub fn encode(&self, samples: &[f32], format: AudioFormat) -> Result<Vec<u8>> {
        match format {
            AudioFormat::Wav => self.encode_wav(samples),
            AudioFormat::Mp3 => self.encode_mp3(samples),
        }
    }

    fn encode_wav(&self, samples: &[f32]) -> Result<Vec<u8>> {
        let spec = WavSpec {
            channels: 1,
            sample_rate: self.config.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut buffer, spec)?;
            for &sample in samples {
                writer.write_sample(to_i16(sample))?;
            }
            writer.finalize()?;
        }

        debug!(
            "Encoded {} samples to WAV ({} bytes)",
            samples.len(),
            buffer.get_ref().len()
        );
        Ok(buffer.into_inner())
    }

    /// WAV is piped through ffmpeg; stdin is fed from a separate thread so a
    /// full stdout pipe cannot stall the writer.
    fn encode_mp3(&self, samples: &[f32]) -> Result<Vec<u8>> {
        let wav = self.encode_wav(samples)?;
        let bitrate = format!("{}k", self.config.bitrate_kbps);

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(["-hide_banner", "-loglevel", "error", "-f", "wav", "-i", "pipe:0"])
            .args(["-codec:a", "libmp3lame", "-b:a", bitrate.as_str(), "-f", "mp3", "pipe:1"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::AudioError("ffmpeg stdin unavailable".to_string()))?;
        let feeder = std::thread::spawn(move || stdin.write_all(&wav));

        let output = child.wait_with_output()?;
        match feeder.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) if e.kind() == ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                return Err(Error::AudioError(
                    "ffmpeg stdin writer panicked".to_string(),
                ))
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::AudioError(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        if output.stdout.is_empty() {
            return Err(Error::AudioError("ffmpeg produced no output".to_string()));
        }

        debug!(
            "Encoded {} samples to MP3 at {} ({} bytes)",
            samples.len(),
            bitrate,
            output.stdout.len()
        );
        Ok(output.stdout)
    }

    fn spawn_error(&self, e: std::io::Error) -> Error {
        if e.kind() == ErrorKind::NotFound {
            Error::BackendUnavailable(format!(
                "ffmpeg not found at {}",
                self.config.ffmpeg_path.display()
            ))
        } else {
            Error::IoError(e)
        }
    }
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0) as i16
}
