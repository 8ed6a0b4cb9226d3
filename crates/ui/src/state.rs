use cirrus_core::ModelId;

/// State for the input composer
#[derive(Debug, Clone, Default)]
pub struct InputState {
    /// Current input buffer
    pub buffer: String,
    /// Cursor position (byte offset, always on a char boundary)
    pub cursor: usize,
    /// Message history for navigation
    pub message_history: Vec<String>,
    /// Current position in history (None = new message)
    pub history_index: Option<usize>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    fn prev_char_len(&self) -> usize {
        self.buffer[..self.cursor].chars().next_back().map(char::len_utf8).unwrap_or(0)
    }

    fn next_char_len(&self) -> usize {
        self.buffer[self.cursor..].chars().next().map(char::len_utf8).unwrap_or(0)
    }

    pub fn insert_char(&mut self, c: char) {
        self.buffer.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    pub fn backspace(&mut self) {
        let len = self.prev_char_len();
        if len > 0 {
            self.cursor -= len;
            self.buffer.remove(self.cursor);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.buffer.len() {
            self.buffer.remove(self.cursor);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor -= self.prev_char_len();
    }

    pub fn move_right(&mut self) {
        self.cursor += self.next_char_len();
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.buffer.len();
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
        self.history_index = None;
    }

    pub fn take(&mut self) -> String {
        let buffer = std::mem::take(&mut self.buffer);
        self.cursor = 0;
        self.history_index = None;
        buffer
    }

    /// Add a sent message to history
    pub fn add_to_history(&mut self, message: String) {
        if let Some(last) = self.message_history.last()
            && last == &message
        {
            return;
        }
        self.message_history.push(message);
        self.history_index = None;
    }

    /// Navigate up in history (older messages)
    pub fn navigate_up(&mut self) {
        if self.message_history.is_empty() {
            return;
        }

        let new_index = match self.history_index {
            None => self.message_history.len() - 1,
            Some(idx) => idx.saturating_sub(1),
        };

        if let Some(message) = self.message_history.get(new_index) {
            self.buffer = message.clone();
            self.cursor = self.buffer.len();
            self.history_index = Some(new_index);
        }
    }

    /// Navigate down in history (newer messages)
    pub fn navigate_down(&mut self) {
        if let Some(idx) = self.history_index {
            if idx + 1 >= self.message_history.len() {
                self.clear();
            } else if let Some(message) = self.message_history.get(idx + 1) {
                self.buffer = message.clone();
                self.cursor = self.buffer.len();
                self.history_index = Some(idx + 1);
            }
        }
    }
}

/// Which surface the keyboard currently feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Composing a chat prompt
    #[default]
    Prompt,
    /// Entering the API key (rendered masked)
    ApiKey,
}

/// A status line message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

impl Notice {
    pub fn text(&self) -> &str {
        match self {
            Notice::Info(text) => text,
            Notice::Error(text) => text,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notice::Error(_))
    }
}

/// Main application state
#[derive(Debug, Clone)]
pub struct AppState {
    /// Selected model
    pub model: ModelId,
    /// The applied API key, if any (displayed masked only)
    pub api_key: Option<String>,
    /// Input mode
    pub mode: InputMode,
    /// Prompt composer state
    pub input: InputState,
    /// Buffer for the masked key editor
    pub key_input: String,
    /// Whether a generation is in flight
    generating: bool,
    /// Status line content
    pub notice: Option<Notice>,
}

impl AppState {
    pub fn new(model: ModelId) -> Self {
        Self {
            model,
            api_key: None,
            mode: InputMode::Prompt,
            input: InputState::new(),
            key_input: String::new(),
            generating: false,
            notice: None,
        }
    }

    pub fn start_generation(&mut self) {
        self.generating = true;
    }

    pub fn stop_generation(&mut self) {
        self.generating = false;
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn set_info(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice::Info(text.into()));
    }

    pub fn set_error(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice::Error(text.into()));
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ModelId::default())
    }
}
