//! Theme configuration for the TUI.
//!
//! Supports light and dark themes with automatic terminal detection.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

use crate::data::SensorStatus;
use crate::source::ConnectionState;

/// Color and style theme for the TUI.
///
/// Use [`Theme::auto_detect()`] for automatic theme selection based on
/// terminal background, or [`Theme::dark()`]/[`Theme::light()`] explicitly.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Accent color for highlights and active elements.
    pub highlight: Color,
    /// Sensors reporting within the threshold.
    pub fresh: Color,
    /// Sensors that have gone silent.
    pub stale: Color,
    /// Transitional states such as a connecting source.
    pub pending: Color,
    pub border: Color,
    pub header: Style,
    pub selected: Style,
    pub tab_active: Style,
    pub tab_inactive: Style,
    pub border_type: BorderType,
}

impl Theme {
    /// Create a dark theme suitable for dark terminal backgrounds.
    pub fn dark() -> Self {
        Self {
            highlight: Color::Cyan,
            fresh: Color::Green,
            stale: Color::Red,
            pending: Color::Yellow,
            border: Color::Gray,
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD),
            tab_active: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::Gray),
            border_type: BorderType::Rounded,
        }
    }

    /// Create a light theme suitable for light terminal backgrounds.
    pub fn light() -> Self {
        Self {
            highlight: Color::Blue,
            fresh: Color::Green,
            stale: Color::Red,
            pending: Color::Magenta,
            border: Color::DarkGray,
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::LightBlue).add_modifier(Modifier::BOLD),
            tab_active: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::DarkGray),
            border_type: BorderType::Rounded,
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    pub fn status_style(&self, status: SensorStatus) -> Style {
        match status {
            SensorStatus::Fresh => Style::default().fg(self.fresh),
            SensorStatus::Stale => Style::default().fg(self.stale).add_modifier(Modifier::BOLD),
        }
    }

    /// Style for a render sink style class (`ok` / `alert`).
    pub fn class_style(&self, class: &str) -> Style {
        match class {
            "alert" => self.status_style(SensorStatus::Stale),
            "ok" => self.status_style(SensorStatus::Fresh),
            _ => Style::default(),
        }
    }

    pub fn connection_style(&self, state: ConnectionState) -> Style {
        match state {
            ConnectionState::Connected => Style::default().fg(self.fresh),
            ConnectionState::Connecting => Style::default().fg(self.pending),
            ConnectionState::Disconnected => {
                Style::default().fg(self.stale).add_modifier(Modifier::BOLD)
            }
        }
    }
}
