use std::io::Stdout;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
};
use tokio::sync::mpsc;

use cirrus_chat::{ChatEvent, ChatSession};
use cirrus_core::{Config, Error, ModelId, Result, StreamAccumulator};
use cirrus_providers::{CancelToken, GeminiProvider, Provider};

use crate::components::{Footer, Header, InputBox};
use crate::state::{AppState, InputMode};
use crate::transcript_view::TranscriptView;

/// Commands entered with a leading `/` in the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    /// Reset the transcript
    Clear,
    /// Switch model, or list the choices when no argument is given
    Model(Option<String>),
    /// Re-open the masked key editor
    Key,
    /// Exit the application
    Quit,
}

impl SlashCommand {
    /// Parse the text after the leading `/`
    pub fn parse(cmd: &str) -> Option<Self> {
        let parts: Vec<&str> = cmd.split_whitespace().collect();
        match parts.first().copied() {
            Some("clear") => Some(SlashCommand::Clear),
            Some("model") => Some(SlashCommand::Model(parts.get(1).map(|s| (*s).to_string()))),
            Some("key") => Some(SlashCommand::Key),
            Some("quit") | Some("exit") => Some(SlashCommand::Quit),
            _ => None,
        }
    }
}

/// Main TUI application
///
/// Owns the chat session and drives two event sources: terminal input and
/// the session's event channel. While a generation streams, the prompt is
/// disabled; only cancel and quit are accepted.
pub struct App {
    config: Config,
    state: AppState,
    session: Option<ChatSession>,
    event_rx: Option<mpsc::UnboundedReceiver<ChatEvent>>,
    live: StreamAccumulator,
    cancel_token: CancelToken,
    should_exit: bool,
}

impl App {
    /// Create the app; with no key it opens in the masked key editor
    pub fn new(config: Config, api_key: Option<String>) -> Self {
        let model = config.model;
        let mut app = Self {
            config,
            state: AppState::new(model),
            session: None,
            event_rx: None,
            live: StreamAccumulator::new(),
            cancel_token: CancelToken::new(),
            should_exit: false,
        };

        match api_key {
            Some(key) => app.apply_key_value(key),
            None => {
                app.state.mode = InputMode::ApiKey;
                app.state.set_info("enter your Gemini API key to start chatting");
            }
        }

        app
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn should_exit(&self) -> bool {
        self.should_exit
    }

    fn build_provider(&self, key: &str) -> Result<Arc<dyn Provider>> {
        let provider = GeminiProvider::new(key, self.state.model, Some(self.config.base_url.clone()))?;
        Ok(Arc::new(provider))
    }

    /// Try to install a key: build a provider, keep the session's transcript
    /// if one already exists. Failure keeps the key editor open.
    fn apply_key_value(&mut self, key: String) {
        let key = key.trim().to_string();
        match self.build_provider(&key) {
            Ok(provider) => {
                match &self.session {
                    Some(session) => session.set_provider(provider),
                    None => {
                        self.session =
                            Some(ChatSession::new(provider).with_temperature(self.config.temperature));
                    }
                }
                self.state.api_key = Some(key);
                self.state.mode = InputMode::Prompt;
                self.state.set_info("API key applied");
            }
            Err(e) => {
                self.state.mode = InputMode::ApiKey;
                self.state.set_error(e.to_string());
            }
        }
    }

    fn set_model(&mut self, name: &str) {
        match ModelId::from_str(name) {
            Ok(model) => {
                self.state.model = model;
                if let Some(key) = self.state.api_key.clone() {
                    match self.build_provider(&key) {
                        Ok(provider) => {
                            if let Some(session) = &self.session {
                                session.set_provider(provider);
                            }
                            self.state.set_info(format!("model set to {}", model));
                        }
                        Err(e) => self.state.set_error(e.to_string()),
                    }
                } else {
                    self.state.set_info(format!("model set to {}", model));
                }
            }
            Err(e) => self.state.set_error(e.to_string()),
        }
    }

    fn clear_transcript(&mut self) {
        let Some(session) = &self.session else { return };
        match session.clear() {
            Ok(()) => self.state.set_info("transcript cleared"),
            Err(e) => self.state.set_error(e.to_string()),
        }
    }

    fn submit_prompt(&mut self, text: String) {
        let Some(session) = &self.session else {
            self.state.set_error("no API key configured; use /key");
            return;
        };

        self.cancel_token = CancelToken::new();
        match session.submit(&text, self.cancel_token.clone()) {
            Ok(rx) => {
                self.event_rx = Some(rx);
                self.live = StreamAccumulator::new();
                self.state.start_generation();
                self.state.clear_notice();
                self.state.input.add_to_history(text);
            }
            Err(Error::EmptyPrompt) => {}
            Err(e) => self.state.set_error(e.to_string()),
        }
    }

    fn handle_submit(&mut self, text: String) {
        if let Some(cmd) = text.strip_prefix('/') {
            match SlashCommand::parse(cmd) {
                Some(SlashCommand::Clear) => self.clear_transcript(),
                Some(SlashCommand::Model(Some(name))) => self.set_model(&name),
                Some(SlashCommand::Model(None)) => {
                    let list = ModelId::VALUES.iter().map(|m| m.as_str()).collect::<Vec<_>>().join("  ");
                    self.state.set_info(format!("models: {}", list));
                }
                Some(SlashCommand::Key) => {
                    self.state.mode = InputMode::ApiKey;
                    self.state.key_input.clear();
                }
                Some(SlashCommand::Quit) => self.quit(),
                None => self.state.set_error(format!("unknown command: /{}", cmd.trim())),
            }
            return;
        }

        self.submit_prompt(text);
    }

    fn quit(&mut self) {
        self.cancel_token.cancel();
        self.should_exit = true;
    }

    /// Apply one event from the session's channel
    pub fn on_chat_event(&mut self, event: ChatEvent) {
        match event {
            ChatEvent::Fragment(text) => self.live.push(&text),
            ChatEvent::Done { .. } => {
                self.live = StreamAccumulator::new();
                self.state.stop_generation();
            }
            ChatEvent::Failed { detail } => {
                self.live = StreamAccumulator::new();
                self.state.stop_generation();
                self.state.set_error(detail);
            }
            ChatEvent::Cancelled => {
                self.live = StreamAccumulator::new();
                self.state.stop_generation();
                self.state.set_info("generation cancelled");
            }
        }
    }

    /// Handle one key press
    pub fn handle_key(&mut self, event: KeyEvent) {
        if event.kind != KeyEventKind::Press {
            return;
        }

        match self.state.mode {
            InputMode::ApiKey => self.handle_key_entry(event),
            InputMode::Prompt if self.state.is_generating() => self.handle_generating_key(event),
            InputMode::Prompt => self.handle_prompt_key(event),
        }
    }

    /// While streaming, the composer is disabled: only cancel and quit work
    fn handle_generating_key(&mut self, event: KeyEvent) {
        match event.code {
            KeyCode::Esc => self.cancel_token.cancel(),
            KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => self.quit(),
            _ => {}
        }
    }

    fn handle_prompt_key(&mut self, event: KeyEvent) {
        match event.code {
            KeyCode::Enter => {
                if !self.state.input.buffer.trim().is_empty() {
                    let message = self.state.input.take();
                    self.handle_submit(message);
                } else {
                    self.state.input.clear();
                }
            }
            KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => self.quit(),
            KeyCode::Char('l') if event.modifiers.contains(KeyModifiers::CONTROL) => self.clear_transcript(),
            KeyCode::Char(c) => self.state.input.insert_char(c),
            KeyCode::Backspace => self.state.input.backspace(),
            KeyCode::Delete => self.state.input.delete(),
            KeyCode::Left => self.state.input.move_left(),
            KeyCode::Right => self.state.input.move_right(),
            KeyCode::Home => self.state.input.move_home(),
            KeyCode::End => self.state.input.move_end(),
            KeyCode::Up => self.state.input.navigate_up(),
            KeyCode::Down => self.state.input.navigate_down(),
            KeyCode::Esc => self.state.input.clear(),
            _ => {}
        }
    }

    fn handle_key_entry(&mut self, event: KeyEvent) {
        match event.code {
            KeyCode::Enter => {
                let key = std::mem::take(&mut self.state.key_input);
                if key.trim().is_empty() {
                    self.state.set_error("API key is empty");
                } else {
                    self.apply_key_value(key);
                }
            }
            KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => self.quit(),
            KeyCode::Char(c) => self.state.key_input.push(c),
            KeyCode::Backspace => {
                self.state.key_input.pop();
            }
            KeyCode::Esc => {
                if self.session.is_some() {
                    self.state.mode = InputMode::Prompt;
                } else {
                    self.quit();
                }
            }
            _ => {}
        }
    }

    fn handle_terminal_event(&mut self, event: Event) {
        if let Event::Key(key) = event {
            self.handle_key(key);
        }
    }

    fn draw(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> std::io::Result<()> {
        let transcript = self.session.as_ref().map(|s| s.transcript()).unwrap_or_default();
        let partial = self.state.is_generating().then(|| self.live.as_str());

        terminal.draw(|frame| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(3),
                    Constraint::Min(3),
                    Constraint::Length(3),
                    Constraint::Length(2),
                ])
                .split(frame.area());

            Header::new(&self.state).render(frame, chunks[0]);
            TranscriptView::new(&transcript, partial).render(frame, chunks[1]);
            InputBox::new(&self.state).render(frame, chunks[2]);
            Footer::new(&self.state).render(frame, chunks[3]);
        })?;

        Ok(())
    }

    /// Run the TUI until quit
    pub async fn run(&mut self) -> std::io::Result<()> {
        crossterm::terminal::enable_raw_mode()?;
        crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(std::io::stdout());
        let mut terminal = Terminal::new(backend)?;

        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            let backend = CrosstermBackend::new(std::io::stdout());
            if let Ok(mut terminal) = Terminal::new(backend) {
                let _ = terminal.show_cursor();
            }
            let _ = crossterm::terminal::disable_raw_mode();
            let _ = crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen);
            original_hook(panic_info);
        }));

        terminal.clear()?;
        self.draw(&mut terminal)?;

        while !self.should_exit {
            let key_poll = async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                read_terminal_event()
            };

            tokio::select! {
                maybe_key = key_poll => {
                    if let Some(event) = maybe_key {
                        self.handle_terminal_event(event);
                        self.draw(&mut terminal)?;
                    }
                }
                maybe_chat = async {
                    match self.event_rx {
                        Some(ref mut rx) => rx.recv().await,
                        None => std::future::pending().await,
                    }
                } => {
                    match maybe_chat {
                        Some(event) => {
                            self.on_chat_event(event);
                            self.draw(&mut terminal)?;
                        }
                        None => {
                            self.event_rx = None;
                            self.state.stop_generation();
                        }
                    }
                }
            }
        }

        self.cancel_token.cancel();

        terminal.show_cursor()?;
        crossterm::terminal::disable_raw_mode()?;
        crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;

        Ok(())
    }
}

/// Non-blocking terminal event read
fn read_terminal_event() -> Option<Event> {
    match crossterm::event::poll(Duration::from_millis(0)) {
        Ok(true) => crossterm::event::read().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cirrus_providers::{MockEvent, MockProvider, MockResponse};

    fn mock_session(responses: Vec<MockResponse>) -> ChatSession {
        ChatSession::new(Arc::new(MockProvider::with_responses(responses)))
    }

    fn reply(fragments: &[&str]) -> MockResponse {
        let mut events: Vec<MockEvent> = fragments
            .iter()
            .map(|text| MockEvent::Fragment { text: (*text).to_string() })
            .collect();
        events.push(MockEvent::Done);
        MockResponse::Sequence { events }
    }

    fn test_app(responses: Vec<MockResponse>) -> App {
        App {
            config: Config::default(),
            state: AppState::new(ModelId::default()),
            session: Some(mock_session(responses)),
            event_rx: None,
            live: StreamAccumulator::new(),
            cancel_token: CancelToken::new(),
            should_exit: false,
        }
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(press(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_parse_slash_commands() {
        assert_eq!(SlashCommand::parse("clear"), Some(SlashCommand::Clear));
        assert_eq!(SlashCommand::parse("model"), Some(SlashCommand::Model(None)));
        assert_eq!(
            SlashCommand::parse("model gemini-3-pro-preview"),
            Some(SlashCommand::Model(Some("gemini-3-pro-preview".to_string())))
        );
        assert_eq!(SlashCommand::parse("key"), Some(SlashCommand::Key));
        assert_eq!(SlashCommand::parse("quit"), Some(SlashCommand::Quit));
        assert_eq!(SlashCommand::parse("exit"), Some(SlashCommand::Quit));
        assert_eq!(SlashCommand::parse("unknown"), None);
        assert_eq!(SlashCommand::parse(""), None);
    }

    #[test]
    fn test_app_without_key_opens_key_editor() {
        let app = App::new(Config::default(), None);
        assert_eq!(app.state().mode, InputMode::ApiKey);
        assert!(app.session.is_none());
    }

    #[test]
    fn test_app_with_key_is_ready() {
        let app = App::new(Config::default(), Some("test-key".to_string()));
        assert_eq!(app.state().mode, InputMode::Prompt);
        assert!(app.session.is_some());
        assert_eq!(app.state().api_key.as_deref(), Some("test-key"));
    }

    #[test]
    fn test_key_entry_flow() {
        let mut app = App::new(Config::default(), None);
        type_text(&mut app, "my-secret-key");
        assert_eq!(app.state().key_input, "my-secret-key");

        app.handle_key(press(KeyCode::Enter));
        assert_eq!(app.state().mode, InputMode::Prompt);
        assert!(app.session.is_some());
        assert!(app.state().key_input.is_empty());
    }

    #[test]
    fn test_blank_key_is_rejected() {
        let mut app = App::new(Config::default(), None);
        type_text(&mut app, "   ");
        app.handle_key(press(KeyCode::Enter));

        assert_eq!(app.state().mode, InputMode::ApiKey);
        assert!(app.session.is_none());
        assert!(app.state().notice.as_ref().unwrap().is_error());
    }

    #[test]
    fn test_esc_in_key_editor_without_session_quits() {
        let mut app = App::new(Config::default(), None);
        app.handle_key(press(KeyCode::Esc));
        assert!(app.should_exit());
    }

    #[tokio::test]
    async fn test_whitespace_prompt_is_not_submitted() {
        let mut app = test_app(vec![reply(&["never"])]);
        type_text(&mut app, "   ");
        app.handle_key(press(KeyCode::Enter));

        assert!(app.event_rx.is_none());
        assert!(!app.state().is_generating());
        assert!(app.session.as_ref().unwrap().transcript().is_empty());
    }

    #[tokio::test]
    async fn test_submit_starts_generation_and_streams() {
        let mut app = test_app(vec![reply(&["I'm ", "fine."])]);
        type_text(&mut app, "How are you?");
        app.handle_key(press(KeyCode::Enter));

        assert!(app.state().is_generating());
        assert!(app.event_rx.is_some());

        let mut rx = app.event_rx.take().unwrap();
        while let Some(event) = rx.recv().await {
            app.on_chat_event(event);
        }

        assert!(!app.state().is_generating());
        let transcript = app.session.as_ref().unwrap().transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.turns()[1].content, "I'm fine.");
    }

    #[tokio::test]
    async fn test_typing_is_ignored_while_generating() {
        let mut app = test_app(vec![reply(&["reply"])]);
        type_text(&mut app, "hi");
        app.handle_key(press(KeyCode::Enter));
        assert!(app.state().is_generating());

        type_text(&mut app, "should be dropped");
        assert!(app.state().input.buffer.is_empty());
    }

    #[test]
    fn test_fragments_accumulate_into_live_buffer() {
        let mut app = test_app(vec![]);
        app.state.start_generation();

        app.on_chat_event(ChatEvent::Fragment("Hel".to_string()));
        app.on_chat_event(ChatEvent::Fragment(String::new()));
        app.on_chat_event(ChatEvent::Fragment("lo".to_string()));
        assert_eq!(app.live.as_str(), "Hello");

        app.on_chat_event(ChatEvent::Done { text: "Hello".to_string() });
        assert!(app.live.as_str().is_empty());
        assert!(!app.state().is_generating());
    }

    #[test]
    fn test_failed_event_surfaces_detail() {
        let mut app = test_app(vec![]);
        app.state.start_generation();

        app.on_chat_event(ChatEvent::Failed { detail: "API error: 401".to_string() });
        assert!(!app.state().is_generating());
        let notice = app.state().notice.as_ref().unwrap();
        assert!(notice.is_error());
        assert!(notice.text().contains("401"));
    }

    #[test]
    fn test_cancelled_event_notice() {
        let mut app = test_app(vec![]);
        app.state.start_generation();

        app.on_chat_event(ChatEvent::Cancelled);
        assert!(!app.state().is_generating());
        assert!(!app.state().notice.as_ref().unwrap().is_error());
    }

    #[tokio::test]
    async fn test_slash_clear_resets_transcript() {
        let mut app = test_app(vec![reply(&["hi there"])]);
        type_text(&mut app, "hello");
        app.handle_key(press(KeyCode::Enter));

        let mut rx = app.event_rx.take().unwrap();
        while let Some(event) = rx.recv().await {
            app.on_chat_event(event);
        }
        assert_eq!(app.session.as_ref().unwrap().transcript().len(), 2);

        type_text(&mut app, "/clear");
        app.handle_key(press(KeyCode::Enter));
        assert!(app.session.as_ref().unwrap().transcript().is_empty());
    }

    #[test]
    fn test_slash_model_switches_model() {
        let mut app = App::new(Config::default(), Some("test-key".to_string()));
        type_text(&mut app, "/model gemini-3-pro-preview");
        app.handle_key(press(KeyCode::Enter));

        assert_eq!(app.state().model, ModelId::ProPreview);
        assert!(!app.state().notice.as_ref().unwrap().is_error());
    }

    #[test]
    fn test_slash_model_unknown_is_an_error() {
        let mut app = App::new(Config::default(), Some("test-key".to_string()));
        type_text(&mut app, "/model gpt-4");
        app.handle_key(press(KeyCode::Enter));

        assert_eq!(app.state().model, ModelId::default());
        assert!(app.state().notice.as_ref().unwrap().is_error());
    }

    #[test]
    fn test_slash_unknown_command() {
        let mut app = test_app(vec![]);
        type_text(&mut app, "/frobnicate");
        app.handle_key(press(KeyCode::Enter));
        assert!(app.state().notice.as_ref().unwrap().is_error());
    }

    #[test]
    fn test_slash_quit_exits() {
        let mut app = test_app(vec![]);
        type_text(&mut app, "/quit");
        app.handle_key(press(KeyCode::Enter));
        assert!(app.should_exit());
    }

    #[test]
    fn test_esc_clears_prompt_input() {
        let mut app = test_app(vec![]);
        type_text(&mut app, "draft");
        app.handle_key(press(KeyCode::Esc));
        assert!(app.state().input.buffer.is_empty());
    }
}
