use crate::theme::Theme;
use cirrus_core::{Role, Transcript};
use ratatui::{
    Frame,
    layout::Rect,
    style::Style,
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Marker appended to the partial reply while the stream is still running
pub const STREAMING_MARKER: &str = "▌";

/// Renders the transcript plus the in-flight partial reply
pub struct TranscriptView<'a> {
    transcript: &'a Transcript,
    /// `Some` while a generation is in flight; the accumulated partial text
    partial: Option<&'a str>,
}

impl<'a> TranscriptView<'a> {
    pub fn new(transcript: &'a Transcript, partial: Option<&'a str>) -> Self {
        Self { transcript, partial }
    }

    /// Render to the given area, keeping the newest lines visible
    pub fn render(&self, frame: &mut Frame<'_>, area: Rect) {
        let content_width = area.width.saturating_sub(4) as usize;
        let lines = self.build_lines(content_width);

        let visible_height = area.height.saturating_sub(2) as usize;
        let scroll = lines.len().saturating_sub(visible_height) as u16;

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Theme::border())
            .title(Span::styled("Transcript", Theme::primary()));

        let paragraph = Paragraph::new(Text::from(lines)).block(block).scroll((scroll, 0));
        frame.render_widget(paragraph, area);
    }

    /// Produce the wrapped line list for the current conversation state
    fn build_lines(&self, width: usize) -> Vec<Line<'static>> {
        let mut lines = Vec::new();

        for turn in self.transcript.turns() {
            match turn.role {
                Role::User => self.push_turn("You", Theme::GREEN, &turn.content, width, &mut lines),
                Role::Assistant => self.push_turn("Gemini", Theme::BLUE, &turn.content, width, &mut lines),
            }
        }

        if let Some(partial) = self.partial {
            let text = format!("{}{}", partial, STREAMING_MARKER);
            self.push_turn("Gemini", Theme::YELLOW, &text, width, &mut lines);
        }

        lines
    }

    fn push_turn(
        &self, label: &str, label_color: ratatui::style::Color, content: &str, width: usize,
        lines: &mut Vec<Line<'static>>,
    ) {
        if !lines.is_empty() {
            lines.push(Line::default());
        }
        lines.push(Line::from(vec![
            Span::styled(label.to_string(), Style::default().fg(label_color)),
            Span::styled(": ", Theme::muted()),
        ]));
        wrap_text(content, Theme::FG, width, lines);
    }
}

/// Wrap text into lines, respecting newlines and word boundaries.
///
/// Words wider than the area are broken by display width so nothing is
/// silently dropped.
pub(crate) fn wrap_text(text: &str, color: ratatui::style::Color, max_width: usize, lines: &mut Vec<Line<'static>>) {
    if max_width == 0 {
        return;
    }

    let style = Style::default().fg(color);
    let mut push = |line: String, lines: &mut Vec<Line<'static>>| {
        lines.push(Line::from(vec![Span::styled(line, style)]));
    };

    for source_line in text.lines() {
        if source_line.trim().is_empty() {
            lines.push(Line::default());
            continue;
        }

        let mut current = String::new();
        let mut current_width = 0;

        for word in source_line.split_whitespace() {
            let word_width = word.width();
            let space = if current.is_empty() { 0 } else { 1 };

            if current_width + space + word_width > max_width && !current.is_empty() {
                push(std::mem::take(&mut current), lines);
                current_width = 0;
            }

            if word_width > max_width {
                // Break an oversized word by display width.
                let mut chunk = String::new();
                let mut chunk_width = 0;
                for ch in word.chars() {
                    let ch_width = ch.width().unwrap_or(0);
                    if chunk_width + ch_width > max_width && !chunk.is_empty() {
                        push(std::mem::take(&mut chunk), lines);
                        chunk_width = 0;
                    }
                    chunk.push(ch);
                    chunk_width += ch_width;
                }
                current = chunk;
                current_width = chunk_width;
                continue;
            }

            if !current.is_empty() {
                current.push(' ');
                current_width += 1;
            }
            current.push_str(word);
            current_width += word_width;
        }

        if !current.is_empty() {
            push(current, lines);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(lines: &[Line<'_>]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_wrap_text_basic() {
        let mut lines = Vec::new();
        wrap_text("Hello world", Theme::FG, 20, &mut lines);

        assert_eq!(rendered(&lines), vec!["Hello world"]);
    }

    #[test]
    fn test_wrap_text_wraps_at_words() {
        let mut lines = Vec::new();
        wrap_text("This is a long line that should wrap", Theme::FG, 20, &mut lines);

        assert!(lines.len() > 1);
        for line in rendered(&lines) {
            assert!(line.width() <= 20, "line too wide: {:?}", line);
        }
    }

    #[test]
    fn test_wrap_text_respects_newlines() {
        let mut lines = Vec::new();
        wrap_text("Line 1\nLine 2\nLine 3", Theme::FG, 20, &mut lines);
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_wrap_text_breaks_long_words() {
        let mut lines = Vec::new();
        wrap_text("supercalifragilisticexpialidocious", Theme::FG, 10, &mut lines);
        assert!(lines.len() > 1);
    }

    #[test]
    fn test_wrap_text_zero_width() {
        let mut lines = Vec::new();
        wrap_text("Hello", Theme::FG, 0, &mut lines);
        assert!(lines.is_empty());
    }

    #[test]
    fn test_build_lines_roles_and_order() {
        let mut transcript = Transcript::new();
        transcript.push_user("Hi");
        transcript.push_assistant("Hello!");

        let view = TranscriptView::new(&transcript, None);
        let lines = rendered(&view.build_lines(40));

        let text = lines.join("\n");
        let you = text.find("You: ").unwrap();
        let gemini = text.find("Gemini: ").unwrap();
        assert!(you < gemini);
        assert!(text.contains("Hi"));
        assert!(text.contains("Hello!"));
    }

    #[test]
    fn test_build_lines_streaming_marker() {
        let mut transcript = Transcript::new();
        transcript.push_user("Hi");

        let view = TranscriptView::new(&transcript, Some("I'm fin"));
        let text = rendered(&view.build_lines(40)).join("\n");
        assert!(text.contains(&format!("I'm fin{}", STREAMING_MARKER)));
    }

    #[test]
    fn test_build_lines_no_marker_when_idle() {
        let mut transcript = Transcript::new();
        transcript.push_user("Hi");
        transcript.push_assistant("Hello!");

        let view = TranscriptView::new(&transcript, None);
        let text = rendered(&view.build_lines(40)).join("\n");
        assert!(!text.contains(STREAMING_MARKER));
    }
}
