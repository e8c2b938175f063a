//! Local synthesis through the espeak-ng command line engine

use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::SpeechBackend;
use crate::config::OfflineConfig;
use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Offline backend. Each call spawns its own espeak-ng process, so concurrent
/// units never share an engine instance.
#[derive(Debug, Clone)]
pub struct EspeakBackend {
    config: OfflineConfig,
}

impl EspeakBackend {
    pub fn new(config: OfflineConfig) -> Self {
        Self { config }
    }

    fn command(&self) -> Command {
        Command::new(&self.config.executable)
    }

    fn spawn_error(&self, e: std::io::Error) -> Error {
        if e.kind() == ErrorKind::NotFound {
            Error::BackendUnavailable(format!(
                "espeak-ng not found at {}",
                self.config.executable.display()
            ))
        } else {
            Error::IoError(e)
        }
    }
}

impl SpeechBackend for EspeakBackend {
    fn name(&self) -> &'static str {
        "espeak-ng"
    }

    fn clip_extension(&self) -> &'static str {
        "wav"
    }

    fn check_available(&self) -> Result<()> {
        let status = self
            .command()
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| self.spawn_error(e))?;
        if status.success() {
            Ok(())
        } else {
            Err(Error::BackendUnavailable(format!(
                "{} --version exited with {}",
                self.config.executable.display(),
                status
            )))
        }
    }

    fn synthesize(&self, text: &str, destination: &Path, deadline: Instant) -> Result<()> {
        let mut child = self
            .command()
            .arg("-v")
            .arg(&self.config.voice)
            .arg("-s")
            .arg(self.config.words_per_minute.to_string())
            .arg("-a")
            .arg(self.config.amplitude.to_string())
            .arg("-w")
            .arg(destination)
            .arg("--stdin")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        // Dropping stdin after the write closes it, so the engine sees EOF
        if let Some(mut stdin) = child.stdin.take() {
            // A broken pipe means the engine already exited; its status says why
            if let Err(e) = stdin.write_all(text.as_bytes()) {
                if e.kind() != ErrorKind::BrokenPipe {
                    stop(&mut child);
                    return Err(e.into());
                }
            }
        }

        let status = match wait_until(&mut child, deadline)? {
            Some(status) => status,
            None => {
                stop(&mut child);
                return Err(Error::ServiceError(format!(
                    "espeak-ng did not finish {:?} before the deadline and was killed",
                    text
                )));
            }
        };

        if !status.success() {
            let mut stderr = String::new();
            if let Some(mut pipe) = child.stderr.take() {
                pipe.read_to_string(&mut stderr)?;
            }
            return Err(Error::ServiceError(format!(
                "espeak-ng exited with {}: {}",
                status,
                stderr.trim()
            )));
        }

        let written = std::fs::metadata(destination).map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            return Err(Error::ServiceError(format!(
                "espeak-ng wrote no audio for {:?}",
                text
            )));
        }

        debug!("espeak-ng wrote {} bytes for {:?}", written, text);
        Ok(())
    }
}

/// Poll `child` until it exits; `None` once `deadline` passes first
fn wait_until(child: &mut Child, deadline: Instant) -> Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

/// Kill and reap `child` so no engine process outlives its unit
fn stop(child: &mut Child) {
    if let Err(e) = child.kill() {
        debug!("espeak-ng (pid {}) already gone: {}", child.id(), e);
    }
    if let Err(e) = child.wait() {
        warn!("Failed to reap espeak-ng (pid {}): {}", child.id(), e);
    }
}
