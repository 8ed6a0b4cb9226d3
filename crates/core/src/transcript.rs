use serde::{Deserialize, Serialize};

/// The role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in the conversation, immutable once appended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// The ordered conversation history for a session
///
/// Append-only: turns are never edited or removed individually. The one
/// exception is a cancelled generation, which takes back the pending user
/// turn via [`Transcript::pop_pending_prompt`] so the transcript returns to
/// its pre-submission state. `clear` resets the whole session.
///
/// Invariant: when the last turn is `Role::User` it is the pending prompt
/// being answered; everything before it is the history for the remote call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user turn
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::user(content));
    }

    /// Append an assistant turn
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::assistant(content));
    }

    /// All turns in conversation order
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// The pending prompt, if the last turn is a user turn awaiting a reply
    pub fn pending_prompt(&self) -> Option<&str> {
        match self.turns.last() {
            Some(turn) if turn.role == Role::User => Some(&turn.content),
            _ => None,
        }
    }

    /// Remove and return the pending user turn, if any.
    ///
    /// Used when a generation is cancelled so no partial cycle is recorded.
    pub fn pop_pending_prompt(&mut self) -> Option<Turn> {
        if self.pending_prompt().is_some() { self.turns.pop() } else { None }
    }

    /// Reset the transcript to empty
    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
