//! Synthesis units and their lifecycle

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Per-unit state: `Pending -> Synthesizing -> {Succeeded, Failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitState {
    Pending,
    Synthesizing,
    Succeeded,
    Failed,
}

impl UnitState {
    pub fn is_terminal(self) -> bool {
        matches!(self, UnitState::Succeeded | UnitState::Failed)
    }

    fn can_advance_to(self, next: UnitState) -> bool {
        matches!(
            (self, next),
            (UnitState::Pending, UnitState::Synthesizing)
                | (UnitState::Synthesizing, UnitState::Succeeded)
                | (UnitState::Synthesizing, UnitState::Failed)
        )
    }
}

/// One chunk of input text and, once synthesized, the clip holding its audio
#[derive(Debug, Clone)]
pub struct Unit {
    index: usize,
    text: String,
    state: UnitState,
    clip: Option<PathBuf>,
    failure: Option<String>,
}

impl Unit {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            state: UnitState::Pending,
            clip: None,
            failure: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn state(&self) -> UnitState {
        self.state
    }

    /// Clip file, present once the unit succeeded
    pub fn clip(&self) -> Option<&Path> {
        self.clip.as_deref()
    }

    /// Failure reason, present once the unit failed
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn is_succeeded(&self) -> bool {
        self.state == UnitState::Succeeded
    }

    /// Clip file name inside the request's scratch directory.
    /// Keyed by index so repeated or punctuated words never collide.
    pub fn clip_file_name(&self, extension: &str) -> String {
        format!("unit_{:05}.{}", self.index, extension)
    }

    pub fn start(&mut self) {
        self.advance(UnitState::Synthesizing);
    }

    pub fn succeed(&mut self, clip: PathBuf) {
        self.advance(UnitState::Succeeded);
        self.clip = Some(clip);
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        self.advance(UnitState::Failed);
        self.failure = Some(reason.into());
    }

    fn advance(&mut self, next: UnitState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "unit {} cannot move from {:?} to {:?}",
            self.index,
            self.state,
            next
        );
        debug!("Unit {} {:?} -> {:?}", self.index, self.state, next);
        self.state = next;
    }
}
