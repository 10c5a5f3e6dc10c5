//! Detail overlay rendering.
//!
//! Displays a modal overlay with everything known about the selected sensor.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::App;
use crate::data::duration::format_age;
use crate::data::SensorStatus;

/// Minimum width required for the detail overlay to render properly.
const MIN_OVERLAY_WIDTH: u16 = 50;
/// Minimum height required for the detail overlay to render properly.
const MIN_OVERLAY_HEIGHT: u16 = 14;

/// Render the sensor detail as a modal overlay.
pub fn render_overlay(frame: &mut Frame, app: &App, area: Rect) {
    if area.width < MIN_OVERLAY_WIDTH || area.height < MIN_OVERLAY_HEIGHT {
        return;
    }

    let Some(record) = app.selected_record() else {
        return;
    };

    let overlay_width = (area.width / 10 * 7).clamp(MIN_OVERLAY_WIDTH, 80);
    let overlay_height = MIN_OVERLAY_HEIGHT;
    let x = area.x + (area.width.saturating_sub(overlay_width)) / 2;
    let y = area.y + (area.height.saturating_sub(overlay_height)) / 2;
    let overlay_area = Rect::new(x, y, overlay_width, overlay_height);

    frame.render_widget(Clear, overlay_area);

    let chunks = Layout::vertical([Constraint::Min(10), Constraint::Length(1)]).split(overlay_area);

    let now = app.monitor.now();
    let threshold = app.policy().threshold;
    let status_style = app.theme.status_style(record.status);
    let status_label = match record.status {
        SensorStatus::Fresh => "Reporting",
        SensorStatus::Stale => "Silent",
    };
    let bold = Style::default().add_modifier(Modifier::BOLD);

    let field = |label: &'static str, value: String, style: Style| {
        Line::from(vec![
            Span::raw(format!(" {:<16}", label)),
            Span::styled(value, style),
        ])
    };

    let alert = record.alert.text();
    let lines = vec![
        Line::from(vec![Span::styled(format!(" {} ", record.sensor_id), bold)]),
        Line::from(""),
        field(
            "Status",
            format!("{} {}", record.status.symbol(), status_label),
            status_style.add_modifier(Modifier::BOLD),
        ),
        field("Value", record.last_value.clone(), bold),
        field(
            "Alert",
            if alert.is_empty() { "-".to_string() } else { alert },
            status_style,
        ),
        field(
            "Reading time",
            if record.last_timestamp.is_empty() {
                "-".to_string()
            } else {
                record.last_timestamp.clone()
            },
            Style::default(),
        ),
        field(
            "Last seen",
            format!("{} ago", format_age(record.age(now))),
            Style::default(),
        ),
        field(
            "First seen",
            format!("{} ago", format_age(now.saturating_duration_since(record.first_seen_at))),
            Style::default(),
        ),
        field("Readings", record.readings.to_string(), Style::default()),
        field(
            "Stale after",
            format_age(threshold),
            Style::default().add_modifier(Modifier::DIM),
        ),
    ];

    let block = Block::default()
        .title(" Sensor Detail ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    frame.render_widget(Paragraph::new(lines).block(block), chunks[0]);

    let footer = Paragraph::new(Line::from(vec![Span::styled(
        " ↑↓:other sensors  Esc:close ",
        Style::default().add_modifier(Modifier::DIM),
    )]));
    frame.render_widget(footer, chunks[1]);
}
