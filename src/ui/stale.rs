//! Stale view rendering.
//!
//! Lists only the sensors the last sweep marked stale, longest silence
//! first, or a reassuring message when everything is reporting.

use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::app::App;
use crate::data::duration::format_age;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let rows = app.visible_rows();

    if rows.is_empty() {
        render_all_reporting(frame, app, area);
        return;
    }

    let now = app.monitor.now();
    let header = Row::new(vec![
        Cell::from("Sensor"),
        Cell::from("Silent for"),
        Cell::from("Last value"),
        Cell::from("Reading time"),
        Cell::from("Alert"),
    ])
    .height(1)
    .style(app.theme.header);

    let stale_style = app.theme.status_style(crate::data::SensorStatus::Stale);
    let table_rows: Vec<Row> = rows
        .iter()
        .map(|row| {
            Row::new(vec![
                Cell::from(row.view.sensor_id.clone()),
                Cell::from(format_age(row.record.age(now))).style(stale_style),
                Cell::from(row.view.value.clone()),
                Cell::from(row.view.timestamp.clone()),
                Cell::from(row.view.alert_text.clone()).style(stale_style),
            ])
        })
        .collect();

    let widths = [
        Constraint::Fill(3),
        Constraint::Length(12),
        Constraint::Fill(1),
        Constraint::Min(24),
        Constraint::Min(20),
    ];

    let title = format!(
        " Stale ({}) [no data for more than {}] ",
        rows.len(),
        format_age(app.policy().threshold)
    );

    let table = Table::new(table_rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(Style::default().fg(app.theme.stale)),
        )
        .row_highlight_style(app.theme.selected)
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    state.select(Some(app.selected_index.min(rows.len() - 1)));

    frame.render_stateful_widget(table, area, &mut state);
}

fn render_all_reporting(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Stale ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.fresh));

    let detail = if app.table.is_empty() {
        "      No sensors seen yet.".to_string()
    } else {
        format!(
            "      Every sensor reported within the last {}.",
            format_age(app.policy().threshold)
        )
    };

    let lines = vec![
        Line::from(""),
        Line::from(""),
        Line::from(vec![
            Span::styled("    ✓ ", Style::default().fg(app.theme.fresh)),
            Span::styled(
                "All sensors reporting",
                Style::default().fg(app.theme.fresh).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
        Line::from(vec![Span::styled(
            detail,
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
