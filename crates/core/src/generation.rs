use crate::transcript::Turn;

/// Fixed assistant reply recorded when a stream fails mid-turn.
///
/// The underlying error detail is surfaced separately; the transcript only
/// ever carries this message for a failed turn, never partial output.
pub const FALLBACK_REPLY: &str =
    "Sorry, something went wrong while generating a reply. Check your API key or network connection.";

/// Visible states of one assistant-turn generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// A non-empty prompt exists and the client is initialized
    Idle,
    /// Submitted; nothing received yet
    AwaitingFirstFragment,
    /// At least one non-empty fragment received
    Streaming,
    /// An error aborted the stream; the fallback reply will be recorded
    Failed,
    /// Cancelled by the user; nothing will be recorded
    Cancelled,
    /// Exactly one turn has been appended; the cycle is over
    Finalized,
}

/// Transient buffer for the streamed reply of a single turn
///
/// A left fold over fragments: the final text is independent of how the
/// stream happened to be chunked, and empty fragments are no-ops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamAccumulator {
    text: String,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one fragment; empty fragments leave the buffer untouched
    pub fn push(&mut self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        self.text.push_str(fragment);
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// How a finished generation resolves
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The stream completed; `text` is the full concatenated reply
    Completed { text: String },
    /// The stream aborted; `detail` is the diagnostic for the UI/log
    Failed { detail: String },
    /// The user cancelled; the pending prompt is taken back
    Cancelled,
}

impl Outcome {
    /// The turn to record in the transcript, if any
    pub fn turn(&self) -> Option<Turn> {
        match self {
            Outcome::Completed { text } => Some(Turn::assistant(text.clone())),
            Outcome::Failed { .. } => Some(Turn::assistant(FALLBACK_REPLY)),
            Outcome::Cancelled => None,
        }
    }
}

/// State machine for one assistant-turn generation
///
/// Drives `AwaitingFirstFragment → Streaming → Finalized` on the success
/// path and `→ Failed`/`→ Cancelled` otherwise. Fragments arriving after a
/// failure or cancellation are ignored; the first terminal event wins.
#[derive(Debug, Clone)]
pub struct Generation {
    accumulator: StreamAccumulator,
    phase: TurnPhase,
    error: Option<String>,
}

impl Generation {
    /// Begin a generation for a submitted prompt
    pub fn start() -> Self {
        Self { accumulator: StreamAccumulator::new(), phase: TurnPhase::AwaitingFirstFragment, error: None }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// The partial reply accumulated so far
    pub fn partial(&self) -> &str {
        self.accumulator.as_str()
    }

    fn is_settled(&self) -> bool {
        matches!(self.phase, TurnPhase::Failed | TurnPhase::Cancelled | TurnPhase::Finalized)
    }

    /// Feed one streamed fragment
    pub fn on_fragment(&mut self, text: &str) {
        if self.is_settled() {
            return;
        }
        self.accumulator.push(text);
        if !text.is_empty() {
            self.phase = TurnPhase::Streaming;
        }
    }

    /// Record a stream failure; partial text is discarded from the record
    pub fn on_error(&mut self, detail: impl Into<String>) {
        if self.is_settled() {
            return;
        }
        self.phase = TurnPhase::Failed;
        self.error = Some(detail.into());
    }

    /// Record a user cancellation
    pub fn on_cancelled(&mut self) {
        if self.is_settled() {
            return;
        }
        self.phase = TurnPhase::Cancelled;
    }

    /// Consume the generation and resolve its outcome
    pub fn finish(mut self) -> Outcome {
        match self.phase {
            TurnPhase::Failed => Outcome::Failed { detail: self.error.take().unwrap_or_else(|| "stream aborted".to_string()) },
            TurnPhase::Cancelled => Outcome::Cancelled,
            _ => Outcome::Completed { text: self.accumulator.into_text() },
        }
    }
}
