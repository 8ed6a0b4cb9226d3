pub mod app;
pub mod components;
pub mod state;
pub mod theme;
pub mod transcript_view;

pub use app::App;
pub use state::{AppState, InputMode, InputState, Notice};
pub use theme::Theme;
