use cirrus_core::{Role, Transcript, Turn};
use serde::{Deserialize, Serialize};

/// One piece of a wire-format message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

/// A single message in the remote API's history format
///
/// The API accepts exactly two role strings, `"user"` and `"model"`, and
/// reconstructs conversational context positionally, so order matters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: "user".to_string(), parts: vec![Part { text: text.into() }] }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self { role: "model".to_string(), parts: vec![Part { text: text.into() }] }
    }

    /// Map a transcript turn onto the wire format.
    ///
    /// `Role::User` maps to `"user"`; any other role maps to `"model"`.
    /// The text passes through verbatim.
    pub fn from_turn(turn: &Turn) -> Self {
        match turn.role {
            Role::User => Self::user(turn.content.clone()),
            _ => Self::model(turn.content.clone()),
        }
    }

    /// Concatenated text of all parts
    pub fn text(&self) -> String {
        self.parts.iter().map(|p| p.text.as_str()).collect()
    }
}

/// Convert a transcript into the ordered wire history.
///
/// With `exclude_last` the final turn is left out: it is the pending prompt,
/// sent separately rather than as part of the history.
pub fn history_contents(transcript: &Transcript, exclude_last: bool) -> Vec<Content> {
    let turns = transcript.turns();
    let take = if exclude_last { turns.len().saturating_sub(1) } else { turns.len() };
    turns[..take].iter().map(Content::from_turn).collect()
}

/// A request to a chat provider
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Prior turns, in conversation order
    pub history: Vec<Content>,
    /// The prompt being answered
    pub prompt: String,
    /// Sampling temperature
    pub temperature: Option<f32>,
}

impl ChatRequest {
    pub fn builder() -> ChatRequestBuilder {
        ChatRequestBuilder::default()
    }
}

#[derive(Default)]
pub struct ChatRequestBuilder {
    history: Vec<Content>,
    prompt: String,
    temperature: Option<f32>,
}

impl ChatRequestBuilder {
    pub fn history(mut self, history: Vec<Content>) -> Self {
        self.history = history;
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn build(self) -> ChatRequest {
        ChatRequest { history: self.history, prompt: self.prompt, temperature: self.temperature }
    }
}

/// Events from streaming responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum StreamEvent {
    /// An incremental piece of generated text
    Fragment(String),
    /// End of stream
    Done,
    /// An error occurred during streaming
    Error(String),
}

/// Token for cancelling streaming operations
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self { cancelled: std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false)) }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(std::sync::atomic::Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, std::sync::atomic::Ordering::SeqCst)
    }
}
