//! Application state and navigation logic.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::data::{SensorMonitor, SensorRecord, SensorStatus, StalenessPolicy, SweepSchedule};
use crate::sink::{RowView, SensorTable};
use crate::source::{ConnectionState, ReadingSource};
use crate::ui::Theme;

/// Upper bound on messages applied per tick, so a burst cannot starve input handling.
pub const MAX_MESSAGES_PER_TICK: usize = 1_000;

/// The current view/tab in the TUI.
///
/// Sensor detail is shown as an overlay (controlled by `App::show_detail_overlay`)
/// rather than as a separate view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Every known sensor.
    Sensors,
    /// Only sensors that have gone silent.
    Stale,
}

impl View {
    pub fn next(self) -> Self {
        match self {
            View::Sensors => View::Stale,
            View::Stale => View::Sensors,
        }
    }

    pub fn prev(self) -> Self {
        // Two views: previous and next coincide.
        self.next()
    }

    /// Returns the display label for this view.
    pub fn label(&self) -> &'static str {
        match self {
            View::Sensors => "Sensors",
            View::Stale => "Stale",
        }
    }
}

/// Column to sort by in the Sensors view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    #[default]
    Name,
    Value,
    /// Time since the last reading.
    Age,
    Status,
    Readings,
}

impl SortColumn {
    pub fn next(self) -> Self {
        match self {
            SortColumn::Name => SortColumn::Value,
            SortColumn::Value => SortColumn::Age,
            SortColumn::Age => SortColumn::Status,
            SortColumn::Status => SortColumn::Readings,
            SortColumn::Readings => SortColumn::Name,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortColumn::Name => "name",
            SortColumn::Value => "value",
            SortColumn::Age => "age",
            SortColumn::Status => "status",
            SortColumn::Readings => "readings",
        }
    }
}

/// A displayed row: what the sink rendered plus the record's bookkeeping.
#[derive(Debug, Clone, Copy)]
pub struct SensorRow<'a> {
    pub view: &'a RowView,
    pub record: &'a SensorRecord,
}

/// Main application state.
pub struct App {
    pub running: bool,
    pub current_view: View,
    pub show_help: bool,
    pub show_detail_overlay: bool,

    source: Box<dyn ReadingSource>,
    pub monitor: SensorMonitor,
    pub table: SensorTable,
    schedule: SweepSchedule,

    pub selected_index: usize,

    // Sorting (Sensors view)
    pub sort_column: SortColumn,
    pub sort_ascending: bool,

    // Search/filter
    pub filter_text: String,
    pub filter_active: bool,

    pub theme: Theme,
    pub export_path: PathBuf,

    // Status message (temporary feedback)
    pub status_message: Option<(String, Instant)>,
}

impl App {
    /// Create a new App reading from `source`, with the theme picked from the terminal.
    pub fn new(source: Box<dyn ReadingSource>, monitor: SensorMonitor) -> Self {
        Self::with_theme(source, monitor, Theme::auto_detect())
    }

    pub fn with_theme(source: Box<dyn ReadingSource>, monitor: SensorMonitor, theme: Theme) -> Self {
        let schedule = SweepSchedule::start(monitor.policy().sweep_interval, monitor.now());
        Self {
            running: true,
            current_view: View::Sensors,
            show_help: false,
            show_detail_overlay: false,
            source,
            monitor,
            table: SensorTable::new(),
            schedule,
            selected_index: 0,
            sort_column: SortColumn::default(),
            sort_ascending: true,
            filter_text: String::new(),
            filter_active: false,
            theme,
            export_path: PathBuf::from("sensorwatch_export.json"),
            status_message: None,
        }
    }

    /// Returns a description of the current source.
    pub fn source_description(&self) -> &str {
        self.source.description()
    }

    pub fn source_error(&self) -> Option<&str> {
        self.source.error()
    }

    pub fn connection(&self) -> ConnectionState {
        self.source.connection()
    }

    pub fn policy(&self) -> &StalenessPolicy {
        self.monitor.policy()
    }

    /// Apply pending messages and run the sweep if it is due.
    ///
    /// Returns the number of messages taken from the source.
    pub fn tick(&mut self) -> usize {
        let mut taken = 0;
        while taken < MAX_MESSAGES_PER_TICK {
            let Some(message) = self.source.poll() else {
                break;
            };
            self.monitor.ingest(&message, &mut self.table);
            taken += 1;
        }

        if self.schedule.poll(self.monitor.now()) {
            self.monitor.sweep(&mut self.table);
        }
        self.clamp_selection();

        taken
    }

    /// Sweep immediately, outside the schedule.
    pub fn run_sweep(&mut self) -> usize {
        let changed = self.monitor.sweep(&mut self.table);
        self.clamp_selection();
        changed
    }

    /// Time until the next scheduled sweep; `None` once shut down.
    pub fn next_sweep_in(&self) -> Option<Duration> {
        self.schedule.time_until_due(self.monitor.now())
    }

    /// Stop the sweep schedule.
    pub fn shutdown(&mut self) {
        self.schedule.cancel();
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired (3 seconds).
    pub fn get_status_message(&self) -> Option<&str> {
        if let Some((msg, time)) = &self.status_message {
            if time.elapsed() < Duration::from_secs(3) {
                return Some(msg);
            }
        }
        None
    }

    /// Rows of the current view, filtered and in display order.
    pub fn visible_rows(&self) -> Vec<SensorRow<'_>> {
        let store = self.monitor.store();
        let mut rows: Vec<SensorRow<'_>> = self
            .table
            .rows()
            .filter(|view| self.matches_filter(&view.sensor_id))
            .filter_map(|view| {
                store
                    .get(&view.sensor_id)
                    .map(|record| SensorRow { view, record })
            })
            .collect();

        match self.current_view {
            View::Sensors => sort_rows_by(&mut rows, self.sort_column, self.sort_ascending),
            View::Stale => {
                rows.retain(|r| r.view.status == SensorStatus::Stale);
                // Longest silence first
                sort_rows_by(&mut rows, SortColumn::Age, false);
            }
        }
        rows
    }

    /// The sensor under the cursor, if any.
    pub fn selected_record(&self) -> Option<&SensorRecord> {
        self.visible_rows()
            .get(self.selected_index)
            .map(|row| row.record)
    }

    fn clamp_selection(&mut self) {
        let count = self.visible_rows().len();
        self.selected_index = self.selected_index.min(count.saturating_sub(1));
    }

    pub fn next_view(&mut self) {
        self.set_view(self.current_view.next());
    }

    pub fn prev_view(&mut self) {
        self.set_view(self.current_view.prev());
    }

    pub fn set_view(&mut self, view: View) {
        self.current_view = view;
        self.selected_index = 0;
    }

    pub fn select_next(&mut self) {
        self.select_next_n(1);
    }

    pub fn select_prev(&mut self) {
        self.select_prev_n(1);
    }

    pub fn select_next_n(&mut self, n: usize) {
        let max = self.visible_rows().len().saturating_sub(1);
        self.selected_index = (self.selected_index + n).min(max);
    }

    pub fn select_prev_n(&mut self, n: usize) {
        self.selected_index = self.selected_index.saturating_sub(n);
    }

    pub fn select_first(&mut self) {
        self.selected_index = 0;
    }

    pub fn select_last(&mut self) {
        self.selected_index = self.visible_rows().len().saturating_sub(1);
    }

    /// Select the `row`-th visible row, if it exists.
    pub fn select_row(&mut self, row: usize) {
        if row < self.visible_rows().len() {
            self.selected_index = row;
        }
    }

    /// Open the detail overlay for the selected sensor.
    pub fn enter_detail(&mut self) {
        if self.selected_record().is_some() {
            self.show_detail_overlay = true;
        }
    }

    /// Navigate back: close overlay first, then return to the Sensors view.
    pub fn go_back(&mut self) {
        if self.show_detail_overlay {
            self.show_detail_overlay = false;
        } else if self.current_view != View::Sensors {
            self.set_view(View::Sensors);
        }
    }

    pub fn close_overlay(&mut self) {
        self.show_detail_overlay = false;
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Cycle the sort column (Sensors view only; Stale has a fixed order).
    pub fn cycle_sort(&mut self) {
        if self.current_view == View::Sensors {
            self.sort_column = self.sort_column.next();
        }
    }

    pub fn toggle_sort_direction(&mut self) {
        if self.current_view == View::Sensors {
            self.sort_ascending = !self.sort_ascending;
        }
    }

    /// Enter filter input mode (starts capturing keystrokes for search).
    pub fn start_filter(&mut self) {
        self.filter_active = true;
    }

    /// Exit filter input mode without clearing the filter text.
    pub fn cancel_filter(&mut self) {
        self.filter_active = false;
    }

    /// Clear the filter text and exit filter mode.
    pub fn clear_filter(&mut self) {
        self.filter_text.clear();
        self.filter_active = false;
    }

    pub fn filter_push(&mut self, c: char) {
        self.filter_text.push(c);
        self.clamp_selection();
    }

    pub fn filter_pop(&mut self) {
        self.filter_text.pop();
    }

    /// Case-insensitive substring match against the current filter.
    pub fn matches_filter(&self, sensor_id: &str) -> bool {
        if self.filter_text.is_empty() {
            return true;
        }
        sensor_id
            .to_lowercase()
            .contains(&self.filter_text.to_lowercase())
    }

    /// Signal the application to quit.
    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Write the monitor's current state to `path` as pretty JSON.
    pub fn export_state(&self, path: &Path) -> Result<()> {
        if self.monitor.store().is_empty() {
            anyhow::bail!("No sensors to export");
        }
        let json = serde_json::to_string_pretty(&self.monitor.export())?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Sort rows by the given column and direction, ties broken by sensor id.
pub fn sort_rows_by(rows: &mut [SensorRow<'_>], column: SortColumn, ascending: bool) {
    rows.sort_by(|a, b| {
        let primary = match column {
            SortColumn::Name => Ordering::Equal,
            SortColumn::Value => compare_values(&a.view.value, &b.view.value),
            // Older last_seen_at means a larger age
            SortColumn::Age => b.record.last_seen_at.cmp(&a.record.last_seen_at),
            SortColumn::Status => a.view.status.cmp(&b.view.status),
            SortColumn::Readings => a.record.readings.cmp(&b.record.readings),
        };
        let primary = if primary == Ordering::Equal {
            a.view.sensor_id.cmp(&b.view.sensor_id)
        } else {
            primary
        };

        if ascending {
            primary
        } else {
            primary.reverse()
        }
    });
}

/// Numeric values compare numerically and sort before non-numeric ones.
fn compare_values(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}
