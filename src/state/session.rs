/// Comparison overlay lifecycle and navigation
///
/// A session pairs one ghost image with one generated image. The two
/// cursors move independently and wrap around their lists. Arrow keys only
/// drive the candidate cursor; sources are stepped with the on-pane arrows.

use thiserror::Error;

use super::data::{CandidateImage, ImageRef};
use super::transform::{Pane, TransformEngine};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("cannot compare without source images")]
    NoSources,
    #[error("cannot compare without generated images")]
    NoCandidates,
    #[error("{pane} index {index} out of range for {len} images")]
    IndexOutOfRange {
        pane: &'static str,
        index: usize,
        len: usize,
    },
}

/// Direction for a cursor step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Next,
    Prev,
}

/// Keyboard shortcuts bound while a session is open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    /// Escape
    Close,
    /// Right arrow
    NextCandidate,
    /// Left arrow
    PrevCandidate,
}

fn wrap(index: usize, len: usize, step: Step) -> usize {
    match step {
        Step::Next => (index + 1) % len,
        Step::Prev => (index + len - 1) % len,
    }
}

/// State of an open comparison
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonSession {
    sources: Vec<ImageRef>,
    source_index: usize,
    candidates: Vec<CandidateImage>,
    candidate_index: usize,
    transforms: TransformEngine,
}

impl ComparisonSession {
    /// Start a comparison; both lists must be non-empty and both indices in range
    pub fn open(
        sources: Vec<ImageRef>,
        source_index: usize,
        candidates: Vec<CandidateImage>,
        candidate_index: usize,
    ) -> Result<Self, SessionError> {
        if sources.is_empty() {
            return Err(SessionError::NoSources);
        }
        if candidates.is_empty() {
            return Err(SessionError::NoCandidates);
        }
        if source_index >= sources.len() {
            return Err(SessionError::IndexOutOfRange {
                pane: Pane::Reference.label(),
                index: source_index,
                len: sources.len(),
            });
        }
        if candidate_index >= candidates.len() {
            return Err(SessionError::IndexOutOfRange {
                pane: Pane::Candidate.label(),
                index: candidate_index,
                len: candidates.len(),
            });
        }

        Ok(Self {
            sources,
            source_index,
            candidates,
            candidate_index,
            transforms: TransformEngine::new(),
        })
    }

    pub fn step_source(&mut self, step: Step) {
        self.source_index = wrap(self.source_index, self.sources.len(), step);
    }

    pub fn step_candidate(&mut self, step: Step) {
        self.candidate_index = wrap(self.candidate_index, self.candidates.len(), step);
    }

    pub fn next_source(&mut self) {
        self.step_source(Step::Next);
    }

    pub fn prev_source(&mut self) {
        self.step_source(Step::Prev);
    }

    pub fn next_candidate(&mut self) {
        self.step_candidate(Step::Next);
    }

    pub fn prev_candidate(&mut self) {
        self.step_candidate(Step::Prev);
    }

    /// Step the cursor belonging to `pane`
    pub fn step(&mut self, pane: Pane, step: Step) {
        match pane {
            Pane::Reference => self.step_source(step),
            Pane::Candidate => self.step_candidate(step),
        }
    }

    pub fn source_index(&self) -> usize {
        self.source_index
    }

    pub fn candidate_index(&self) -> usize {
        self.candidate_index
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    pub fn current_source(&self) -> &ImageRef {
        &self.sources[self.source_index]
    }

    pub fn current_candidate(&self) -> &CandidateImage {
        &self.candidates[self.candidate_index]
    }

    /// Position label such as "2 / 4"
    pub fn position_label(&self, pane: Pane) -> String {
        match pane {
            Pane::Reference => format!("{} / {}", self.source_index + 1, self.sources.len()),
            Pane::Candidate => format!("{} / {}", self.candidate_index + 1, self.candidates.len()),
        }
    }

    pub fn transforms(&self) -> &TransformEngine {
        &self.transforms
    }

    pub fn transforms_mut(&mut self) -> &mut TransformEngine {
        &mut self.transforms
    }
}

/// What a shortcut did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutOutcome {
    Closed,
    Navigated,
    Ignored,
}

/// Closed (no session) or open (exactly one session)
#[derive(Debug, Clone, Default)]
pub struct ComparisonOverlay {
    session: Option<ComparisonSession>,
}

impl ComparisonOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a fresh session, replacing any previous one.
    /// On error the overlay keeps its current state.
    pub fn open(
        &mut self,
        sources: Vec<ImageRef>,
        source_index: usize,
        candidates: Vec<CandidateImage>,
        candidate_index: usize,
    ) -> Result<&mut ComparisonSession, SessionError> {
        let session = ComparisonSession::open(sources, source_index, candidates, candidate_index)?;
        Ok(self.session.insert(session))
    }

    /// Discard the session and its transforms
    pub fn close(&mut self) {
        self.session = None;
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&ComparisonSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut ComparisonSession> {
        self.session.as_mut()
    }

    pub fn handle_shortcut(&mut self, shortcut: Shortcut) -> ShortcutOutcome {
        let Some(session) = self.session.as_mut() else {
            return ShortcutOutcome::Ignored;
        };
        match shortcut {
            Shortcut::Close => {
                self.close();
                ShortcutOutcome::Closed
            }
            Shortcut::NextCandidate => {
                session.next_candidate();
                ShortcutOutcome::Navigated
            }
            Shortcut::PrevCandidate => {
                session.prev_candidate();
                ShortcutOutcome::Navigated
            }
        }
    }
}
