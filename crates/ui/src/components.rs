use crate::state::{AppState, InputMode};
use crate::theme::Theme;
use cirrus_core::mask_api_key;
use ratatui::{
    Frame,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

/// Title bar: app name, model, masked key, activity indicator
pub struct Header<'a> {
    state: &'a AppState,
}

impl<'a> Header<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    pub fn render(&self, frame: &mut Frame<'_>, area: Rect) {
        let key_label = match &self.state.api_key {
            Some(key) => mask_api_key(key),
            None => "<no key>".to_string(),
        };

        let activity = if self.state.is_generating() {
            Span::styled("streaming", Style::default().fg(Theme::YELLOW))
        } else {
            Span::styled("ready", Theme::muted())
        };

        let line = Line::from(vec![
            Span::styled("cirrus", Theme::primary()),
            Span::styled("  model: ", Theme::muted()),
            Span::styled(self.state.model.as_str(), Style::default().fg(Theme::CYAN)),
            Span::styled("  key: ", Theme::muted()),
            Span::styled(key_label, Style::default().fg(Theme::CYAN)),
            Span::styled("  ", Theme::muted()),
            activity,
        ]);

        let block = Block::default().borders(Borders::ALL).border_style(Theme::border());
        frame.render_widget(Paragraph::new(line).block(block), area);
    }
}

/// Prompt composer, or the masked key editor in `InputMode::ApiKey`
pub struct InputBox<'a> {
    state: &'a AppState,
}

impl<'a> InputBox<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    fn prompt_line(&self) -> Line<'static> {
        let input = &self.state.input;
        let before = input.buffer[..input.cursor].to_string();
        let after = input.buffer[input.cursor..].to_string();

        Line::from(vec![
            Span::styled("> ", Theme::muted()),
            Span::styled(before, Theme::base()),
            Span::styled("▏", Style::default().fg(Theme::CYAN)),
            Span::styled(after, Theme::base()),
        ])
    }

    fn key_line(&self) -> Line<'static> {
        // Never echo the key itself.
        let masked = "•".repeat(self.state.key_input.chars().count());
        Line::from(vec![
            Span::styled("API key: ", Theme::muted()),
            Span::styled(masked, Theme::base()),
            Span::styled("▏", Style::default().fg(Theme::CYAN)),
        ])
    }

    pub fn render(&self, frame: &mut Frame<'_>, area: Rect) {
        let (title, line) = match self.state.mode {
            InputMode::Prompt => ("Prompt", self.prompt_line()),
            InputMode::ApiKey => ("API key (Enter to apply)", self.key_line()),
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Theme::border())
            .title(Span::styled(title, Theme::primary()));
        frame.render_widget(Paragraph::new(line).block(block), area);
    }
}

/// Status line plus key hints
pub struct Footer<'a> {
    state: &'a AppState,
}

impl<'a> Footer<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    fn notice_line(&self) -> Line<'static> {
        match &self.state.notice {
            Some(notice) if notice.is_error() => Line::from(Span::styled(notice.text().to_string(), Theme::error())),
            Some(notice) => Line::from(Span::styled(notice.text().to_string(), Theme::muted())),
            None => Line::default(),
        }
    }

    fn hints_line(&self) -> Line<'static> {
        let hints = match self.state.mode {
            InputMode::Prompt if self.state.is_generating() => "Esc cancel · Ctrl+C quit",
            InputMode::Prompt => "Enter send · Ctrl+L clear · /model /key /quit · Ctrl+C quit",
            InputMode::ApiKey => "Enter apply · Esc back",
        };
        Line::from(Span::styled(hints.to_string(), Theme::muted()))
    }

    pub fn render(&self, frame: &mut Frame<'_>, area: Rect) {
        let paragraph = Paragraph::new(vec![self.notice_line(), self.hints_line()]);
        frame.render_widget(paragraph, area);
    }
}
