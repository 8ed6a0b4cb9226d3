use ratatui::style::{Color, Style};

/// Iceberg color theme for the Cirrus TUI
///
/// Based on iceberg.vim (https://github.com/cocopon/iceberg.vim), a bluish
/// dark theme with eye-friendly colors.
#[derive(Debug, Clone, Copy)]
pub struct Theme;

impl Theme {
    /// Primary background: deep blue-black
    pub const BG: Color = Color::Rgb(22, 24, 33);

    /// Foreground: light blue-gray (primary text)
    pub const FG: Color = Color::Rgb(198, 200, 209);

    /// Primary accent: blue (assistant text labels)
    pub const BLUE: Color = Color::Rgb(132, 160, 198);

    /// Secondary accent: cyan (model name, key indicator)
    pub const CYAN: Color = Color::Rgb(137, 184, 194);

    /// User turns: green
    pub const GREEN: Color = Color::Rgb(180, 190, 130);

    /// Transient states: yellow (streaming marker, cancel notice)
    pub const YELLOW: Color = Color::Rgb(226, 164, 120);

    /// Errors: red
    pub const RED: Color = Color::Rgb(226, 120, 120);

    /// Muted text: dimmed foreground
    pub const MUTED: Color = Color::Rgb(107, 112, 137);

    /// Border color
    pub const BORDER: Color = Color::Rgb(60, 65, 90);

    /// Base style for all text
    pub fn base() -> Style {
        Style::default().fg(Self::FG).bg(Self::BG)
    }

    /// Primary accent style
    pub fn primary() -> Style {
        Style::default().fg(Self::BLUE).bg(Self::BG)
    }

    /// Error style
    pub fn error() -> Style {
        Style::default().fg(Self::RED).bg(Self::BG)
    }

    /// Muted style (for secondary text)
    pub fn muted() -> Style {
        Style::default().fg(Self::MUTED).bg(Self::BG)
    }

    /// Border style
    pub fn border() -> Style {
        Style::default().fg(Self::BORDER)
    }
}
