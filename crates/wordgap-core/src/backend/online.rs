//! Google Translate text-to-speech over HTTP

use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::debug;

use super::SpeechBackend;
use crate::config::OnlineConfig;
use crate::error::{Error, Result};

/// Longest text the service accepts in one request
pub const MAX_SERVICE_CHARS: usize = 100;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Online backend. Every call builds its own client, so no connection or
/// session state outlives a single synthesis.
#[derive(Debug, Clone)]
pub struct GoogleTtsBackend {
    config: OnlineConfig,
}

impl GoogleTtsBackend {
    pub fn new(config: OnlineConfig) -> Self {
        Self { config }
    }

    /// Service root without a trailing slash
    fn base_url(&self) -> String {
        match &self.config.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://translate.google.{}", self.config.tld),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/translate_tts", self.base_url())
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs)
    }

    fn client(&self) -> Result<Client> {
        let mut builder = Client::builder()
            .timeout(self.request_timeout())
            .user_agent(USER_AGENT);
        if self.config.base_url.is_some() {
            builder = builder.no_proxy();
        }
        Ok(builder.build()?)
    }

    fn fetch_part(
        &self,
        client: &Client,
        part: &str,
        idx: usize,
        total: usize,
        remaining: Duration,
    ) -> Result<Vec<u8>> {
        let speed = if self.config.slow { "0.3" } else { "1" };
        let idx = idx.to_string();
        let total = total.to_string();
        let textlen = part.chars().count().to_string();

        let response = client
            .get(self.endpoint())
            .timeout(remaining.min(self.request_timeout()))
            .header(reqwest::header::REFERER, format!("{}/", self.base_url()))
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("q", part),
                ("tl", self.config.lang.as_str()),
                ("ttsspeed", speed),
                ("total", total.as_str()),
                ("idx", idx.as_str()),
                ("textlen", textlen.as_str()),
            ])
            .send()?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::ServiceError("rate limited by service".to_string()));
        }
        if !status.is_success() {
            return Err(Error::ServiceError(format!(
                "service returned {} for {:?}",
                status, part
            )));
        }

        let body = response.bytes()?;
        if body.is_empty() {
            return Err(Error::ServiceError(format!(
                "service returned no audio for {:?}",
                part
            )));
        }
        Ok(body.to_vec())
    }
}

impl SpeechBackend for GoogleTtsBackend {
    fn name(&self) -> &'static str {
        "google-tts"
    }

    fn clip_extension(&self) -> &'static str {
        "mp3"
    }

    fn check_available(&self) -> Result<()> {
        // Reachability is only known per request; failures surface per unit
        Ok(())
    }

    fn synthesize(&self, text: &str, destination: &Path, deadline: Instant) -> Result<()> {
        let parts = split_for_service(text, MAX_SERVICE_CHARS);
        if parts.is_empty() {
            return Err(Error::ServiceError("nothing to synthesize".to_string()));
        }

        let client = self.client()?;
        let mut file = File::create(destination)?;
        for (idx, part) in parts.iter().enumerate() {
            // Every part shares what is left of the unit's budget
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::ServiceError(format!(
                    "deadline passed after {} of {} parts",
                    idx,
                    parts.len()
                )));
            }

            let audio = self.fetch_part(&client, part, idx, parts.len(), remaining)?;
            // MP3 frames concatenate without re-encoding
            file.write_all(&audio)?;
            debug!(
                "Fetched part {}/{} ({} bytes) for {:?}",
                idx + 1,
                parts.len(),
                audio.len(),
                part
            );
        }
        file.flush()?;
        Ok(())
    }
}

/// Split `text` into pieces of at most `limit` characters, breaking on
/// whitespace and hard-splitting words that are longer than the limit.
pub fn split_for_service(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > limit {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(limit) {
                parts.push(piece.iter().collect());
            }
            continue;
        }

        let needed = if current.is_empty() { word_len } else { current_len + 1 + word_len };
        if needed > limit {
            parts.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        parts.push(current);
    }
    parts
}
