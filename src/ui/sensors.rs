//! Sensors view rendering.
//!
//! One row per sensor: latest value, alert indicator, reading time, how
//! long ago it was seen and its freshness status.

use ratatui::{
    layout::{Alignment, Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use super::format_count;
use crate::app::{App, SortColumn};
use crate::data::duration::format_age;

/// Render the Sensors view as a sortable, filterable table.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let rows = app.visible_rows();
    let now = app.monitor.now();

    let block = Block::default()
        .title(title(app, rows.len()))
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    if app.table.is_empty() {
        let waiting = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                format!("Waiting for readings from {}", app.source_description()),
                Style::default().add_modifier(Modifier::DIM),
            )),
        ])
        .alignment(Alignment::Center)
        .block(block);
        frame.render_widget(waiting, area);
        return;
    }

    let header = Row::new(vec![
        Cell::from(format_header("Sensor", SortColumn::Name, app)),
        Cell::from(format_header("Value", SortColumn::Value, app)),
        Cell::from("Alert"),
        Cell::from("Reading time"),
        Cell::from(format_header("Seen", SortColumn::Age, app)),
        Cell::from(format_header("Readings", SortColumn::Readings, app)),
        Cell::from(format_header("Status", SortColumn::Status, app)),
    ])
    .height(1)
    .style(app.theme.header);

    let table_rows: Vec<Row> = rows
        .iter()
        .map(|row| {
            let style = app.theme.class_style(row.view.style_class);
            Row::new(vec![
                Cell::from(row.view.sensor_id.clone()),
                Cell::from(row.view.value.clone()).style(style),
                Cell::from(row.view.alert_text.clone()).style(style),
                Cell::from(row.view.timestamp.clone()),
                Cell::from(format!("{} ago", format_age(row.record.age(now)))),
                Cell::from(format_count(row.record.readings)),
                Cell::from(row.view.status.symbol()).style(style),
            ])
        })
        .collect();

    let widths = [
        Constraint::Fill(3),    // Sensor
        Constraint::Fill(1),    // Value
        Constraint::Min(20),    // Alert
        Constraint::Min(24),    // Reading time
        Constraint::Length(10), // Seen
        Constraint::Length(9),  // Readings
        Constraint::Length(7),  // Status
    ];

    let table = Table::new(table_rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(app.theme.selected)
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    state.select(Some(app.selected_index.min(rows.len().saturating_sub(1))));

    frame.render_stateful_widget(table, area, &mut state);
}

fn title(app: &App, visible: usize) -> String {
    let sort_dir = if app.sort_ascending { "↑" } else { "↓" };

    let filter_info = if app.filter_active {
        format!(" /{}_", app.filter_text)
    } else if !app.filter_text.is_empty() {
        format!(" /{}/ [c:clear]", app.filter_text)
    } else {
        String::new()
    };

    let position_info = if visible > 0 {
        format!(" [{}/{}]", app.selected_index.min(visible - 1) + 1, visible)
    } else {
        String::new()
    };

    format!(
        " Sensors ({}/{}) [s:sort {}{}]{}{} ",
        visible,
        app.table.len(),
        app.sort_column.label(),
        sort_dir,
        filter_info,
        position_info
    )
}

fn format_header(name: &str, col: SortColumn, app: &App) -> Span<'static> {
    if app.sort_column == col {
        let arrow = if app.sort_ascending { "↑" } else { "↓" };
        Span::raw(format!("{}{}", name, arrow))
    } else {
        Span::raw(name.to_string())
    }
}
