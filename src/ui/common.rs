//! Common UI components shared across views.
//!
//! This module contains the header bar, tab bar, status bar, and help overlay.

use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs},
    Frame,
};

use super::format_count;
use crate::app::{App, View};
use crate::data::duration::format_age;
use crate::data::SensorStatus;

/// Render the header bar.
///
/// Displays: overall indicator, fresh/stale counts, sensor count,
/// connection state and rejected message count.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let store = app.monitor.store();
    let fresh = store.count(SensorStatus::Fresh);
    let stale = store.count(SensorStatus::Stale);
    let rejected = app.monitor.stats().rejected();
    let connection = app.connection();

    let indicator_style = if stale > 0 {
        app.theme.status_style(SensorStatus::Stale)
    } else if store.is_empty() {
        app.theme.connection_style(connection)
    } else {
        app.theme.status_style(SensorStatus::Fresh)
    };

    let dim = Style::default().add_modifier(Modifier::DIM);
    let line = Line::from(vec![
        Span::styled(" ● ", indicator_style),
        Span::styled("SENSORWATCH ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("│ "),
        Span::styled(fresh.to_string(), Style::default().fg(app.theme.fresh)),
        Span::raw(" fresh "),
        if stale > 0 {
            Span::styled(stale.to_string(), app.theme.status_style(SensorStatus::Stale))
        } else {
            Span::styled("0", dim)
        },
        Span::raw(" stale │ "),
        Span::styled(
            store.len().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" sensors │ "),
        Span::styled(connection.to_string(), app.theme.connection_style(connection)),
        Span::raw(" │ "),
        if rejected > 0 {
            Span::styled(
                format!("{} rejected", format_count(rejected)),
                Style::default().fg(app.theme.pending),
            )
        } else {
            Span::styled("0 rejected", dim)
        },
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

/// Render the tab bar showing available views.
pub fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let stale = app.monitor.store().count(SensorStatus::Stale);
    let titles: Vec<Line> = vec![
        Line::from(" 1:Sensors "),
        Line::from(format!(" 2:Stale ({}) ", stale)),
    ];

    let selected = match app.current_view {
        View::Sensors => 0,
        View::Stale => 1,
    };

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(app.theme.tab_inactive)
        .highlight_style(app.theme.tab_active)
        .divider("|");

    frame.render_widget(tabs, area);
}

/// Render the status bar at the bottom.
///
/// Shows: source, time since last sweep, available controls.
/// Also displays temporary status messages and source errors.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    if let Some(err) = app.source_error() {
        let paragraph = Paragraph::new(format!(" {} | Error: {} | q:quit", app.source_description(), err))
            .style(app.theme.connection_style(app.connection()));
        frame.render_widget(paragraph, area);
        return;
    }

    let controls = if app.filter_active {
        "Type to search | Enter:apply Esc:cancel"
    } else {
        match app.current_view {
            View::Sensors => "/:search s:sort r:sweep Tab:switch Enter:detail ?:help q:quit",
            View::Stale => "/:search r:sweep Tab:switch Enter:detail ?:help q:quit",
        }
    };

    let swept = match app.monitor.since_last_sweep() {
        Some(elapsed) => format!("Swept {} ago", format_age(elapsed)),
        None => "Not swept yet".to_string(),
    };

    let status = format!(" {} | {} | {}", app.source_description(), swept, controls);
    let paragraph = Paragraph::new(status).style(Style::default().add_modifier(Modifier::DIM));

    frame.render_widget(paragraph, area);
}

/// Render the help overlay with keyboard shortcuts.
///
/// Displayed as a centered modal on top of the current view.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let section = |title: &'static str| {
        Line::from(vec![Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        )])
    };

    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        section(" Navigation"),
        Line::from("  Tab/1/2     Switch views"),
        Line::from("  ↑/↓ j/k     Navigate list"),
        Line::from("  PgUp/PgDn   Jump 10 items"),
        Line::from("  Home/End    Jump to first/last"),
        Line::from("  Enter       Sensor detail"),
        Line::from("  Esc         Go back"),
        Line::from(""),
        section(" Sensors"),
        Line::from("  /         Start filter/search"),
        Line::from("  c         Clear filter"),
        Line::from("  s         Cycle sort column"),
        Line::from("  S         Toggle sort direction"),
        Line::from(""),
        section(" General"),
        Line::from("  r         Sweep now"),
        Line::from("  e         Export to JSON"),
        Line::from("  q         Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let paragraph = Paragraph::new(help_text).block(block);

    let help_width = 42u16.min(area.width.saturating_sub(4));
    let help_height = 24u16.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(help_width)) / 2;
    let y = area.y + (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    frame.render_widget(Clear, help_area);
    frame.render_widget(paragraph, help_area);
}

/// Render the resize prompt shown when the terminal is below the minimum size.
pub fn render_too_small(frame: &mut Frame, area: Rect, min_width: u16, min_height: u16) {
    let msg = format!(
        "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
        area.width, area.height, min_width, min_height
    );
    let paragraph = Paragraph::new(msg)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Yellow));
    let centered = Rect::new(
        area.x,
        area.y + (area.height / 2).saturating_sub(2),
        area.width,
        5.min(area.height),
    );
    frame.render_widget(paragraph, centered);
}
