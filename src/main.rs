// Binary includes library modules - some public API items are only for library consumers
#![allow(unused)]

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, ensure, Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    Terminal,
};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

mod app;
mod data;
mod events;
mod logging;
mod settings;
mod sink;
mod source;
mod ui;

#[cfg(feature = "subscribe")]
mod subscribe;

use app::{App, View, MAX_MESSAGES_PER_TICK};
use data::duration::parse_duration;
use data::{ReadingParser, SensorMonitor};
use logging::LogTarget;
use settings::Settings;
use sink::LogSink;
use source::{FileSource, ReadingSource, Simulator, StreamSource};

/// Cadence of simulated readings.
const SIMULATE_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(name = "sensorwatch")]
#[command(about = "Live freshness monitor for sensors publishing over MQTT")]
struct Args {
    /// TOML settings file (see `[monitor]`, `[amqp]` and `[log]` sections)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Subscribe through RabbitMQ's MQTT plugin (default when no other source is given)
    #[cfg(feature = "subscribe")]
    #[arg(short, long, conflicts_with_all = ["connect", "file", "simulate"])]
    subscribe: bool,

    /// Read `<topic> <payload>` lines from a TCP endpoint (host:port)
    #[arg(short, long, conflicts_with_all = ["file", "simulate"])]
    connect: Option<String>,

    /// Follow a capture file of `<topic> <payload>` lines
    #[arg(short, long, conflicts_with = "simulate")]
    file: Option<PathBuf>,

    /// Run against N simulated sensors instead of a broker
    #[arg(long, value_name = "SENSORS")]
    simulate: Option<usize>,

    /// Log updates instead of drawing the terminal UI
    #[arg(long)]
    headless: bool,

    /// Replay --file, sweep once, write the state as JSON and exit
    #[arg(short, long, requires = "file", conflicts_with = "headless")]
    export: Option<PathBuf>,

    /// Silence after which a sensor is stale (e.g. "2m", "90s")
    #[arg(long, value_parser = parse_duration)]
    stale_after: Option<Duration>,

    /// How often the staleness sweep runs (e.g. "10s")
    #[arg(long, value_parser = parse_duration)]
    sweep_every: Option<Duration>,

    /// AMQP URL of the broker
    #[cfg(feature = "subscribe")]
    #[arg(long)]
    amqp_url: Option<String>,

    /// MQTT topic filter to subscribe to (e.g. "temperature/#")
    #[cfg(feature = "subscribe")]
    #[arg(long)]
    topic: Option<String>,
}

impl Args {
    /// Fold command-line overrides into the loaded settings.
    fn apply(&self, settings: &mut Settings) {
        if let Some(stale_after) = self.stale_after {
            settings.monitor.stale_after = stale_after;
        }
        if let Some(sweep_every) = self.sweep_every {
            settings.monitor.sweep_interval = sweep_every;
        }
        #[cfg(feature = "subscribe")]
        {
            if let Some(url) = &self.amqp_url {
                settings.amqp.url = url.clone();
            }
            if let Some(topic) = &self.topic {
                settings.amqp.topic = topic.clone();
            }
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    args.apply(&mut settings);
    ensure!(
        !settings.monitor.sweep_interval.is_zero(),
        "Sweep interval must be greater than zero"
    );

    let target = if args.headless || args.export.is_some() {
        LogTarget::Stderr
    } else {
        LogTarget::File
    };
    let _log_guard = logging::init(&settings.log, target)?;

    let policy = settings.monitor.policy();
    info!(
        "Stale after {:?}, sweeping every {:?}",
        policy.threshold, policy.sweep_interval
    );
    let monitor =
        SensorMonitor::new(policy).with_parser(ReadingParser::new(&settings.monitor.time_format));

    // Handle export mode (non-interactive)
    if let Some(export_path) = &args.export {
        // `requires = "file"` guarantees the path
        let path = args.file.as_deref().context("--export requires --file")?;
        return export_to_file(path, export_path, monitor);
    }

    let rt = tokio::runtime::Runtime::new()?;
    let (source, task) = open_source(&args, &settings, &rt)?;

    let result = if args.headless {
        rt.block_on(run_headless(source, monitor))
    } else {
        run_tui(source, monitor)
    };

    // Signal shutdown
    if let Some(task) = task {
        task.abort();
    }

    result
}

/// Pick the reading source from the command line.
fn open_source(
    args: &Args,
    settings: &Settings,
    rt: &tokio::runtime::Runtime,
) -> Result<(Box<dyn ReadingSource>, Option<JoinHandle<()>>)> {
    if let Some(addr) = &args.connect {
        let source = rt.block_on(connect_tcp(addr))?;
        return Ok((Box::new(source) as Box<dyn ReadingSource>, None));
    }

    if let Some(path) = &args.file {
        return Ok((Box::new(FileSource::new(path)) as Box<dyn ReadingSource>, None));
    }

    if let Some(count) = args.simulate {
        ensure!(count > 0, "--simulate needs at least one sensor");
        let namespace = settings
            .amqp
            .topic
            .split('/')
            .next()
            .filter(|ns| !ns.is_empty() && *ns != "#" && *ns != "+")
            .unwrap_or("temperature");
        let source = Simulator::new(namespace, count).spawn(SIMULATE_INTERVAL);
        return Ok((Box::new(source) as Box<dyn ReadingSource>, None));
    }

    #[cfg(feature = "subscribe")]
    {
        // The subscriber spawns onto the runtime; the TUI keeps the main thread.
        let _enter = rt.enter();
        let (source, task) = subscribe::create_subscriber(&settings.amqp);
        Ok((Box::new(source) as Box<dyn ReadingSource>, Some(task)))
    }

    #[cfg(not(feature = "subscribe"))]
    {
        bail!("No source given: use --connect, --file or --simulate")
    }
}

async fn connect_tcp(addr: &str) -> Result<StreamSource> {
    use tokio::net::TcpStream;

    println!("Connecting to {}...", addr);
    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("Failed to connect to {}", addr))?;
    println!("Connected!");
    info!("Connected to {}", addr);
    Ok(StreamSource::spawn(stream, addr))
}

/// Run the TUI with the given source
fn run_tui(source: Box<dyn ReadingSource>, monitor: SensorMonitor) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic);
    }));

    let mut app = App::new(source, monitor);

    let result = run_app(&mut terminal, &mut app);
    app.shutdown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    // Minimum terminal size for usable display
    const MIN_WIDTH: u16 = 60;
    const MIN_HEIGHT: u16 = 12;

    while app.running {
        terminal.draw(|frame| {
            let area = frame.area();

            if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
                ui::common::render_too_small(frame, area, MIN_WIDTH, MIN_HEIGHT);
                return;
            }

            let chunks = Layout::vertical([
                Constraint::Length(1), // Header bar
                Constraint::Length(1), // Tabs
                Constraint::Min(8),    // Content
                Constraint::Length(1), // Status bar
            ])
            .split(area);

            ui::common::render_header(frame, app, chunks[0]);
            ui::common::render_tabs(frame, app, chunks[1]);

            match app.current_view {
                View::Sensors => ui::sensors::render(frame, app, chunks[2]),
                View::Stale => ui::stale::render(frame, app, chunks[2]),
            }

            ui::common::render_status_bar(frame, app, chunks[3]);

            if app.show_detail_overlay {
                ui::detail::render_overlay(frame, app, area);
            }
            if app.show_help {
                ui::common::render_help(frame, app, area);
            }
        })?;

        if let Some(event) = events::poll_event(Duration::from_millis(100))? {
            match event {
                Event::Key(key) => events::handle_key_event(app, key),
                Event::Mouse(mouse) => {
                    // Content starts after header (1) + tabs (1) + table border (1)
                    events::handle_mouse_event(app, mouse, 3);
                }
                _ => {}
            }
        }

        app.tick();
    }

    Ok(())
}

/// Log every update until interrupted.
async fn run_headless(mut source: Box<dyn ReadingSource>, mut monitor: SensorMonitor) -> Result<()> {
    let mut sink = LogSink;

    let mut sweep = tokio::time::interval(monitor.policy().sweep_interval);
    sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately
    sweep.tick().await;

    let mut drain = tokio::time::interval(Duration::from_millis(50));
    drain.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    info!("Monitoring {}", source.description());
    let mut connection = source.connection();

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted, shutting down");
                break;
            }
            _ = sweep.tick() => {
                let changed = monitor.sweep(&mut sink);
                debug!("Sweep changed {} of {} sensor(s)", changed, monitor.store().len());
            }
            _ = drain.tick() => {
                for _ in 0..MAX_MESSAGES_PER_TICK {
                    let Some(message) = source.poll() else {
                        break;
                    };
                    monitor.ingest(&message, &mut sink);
                }

                let state = source.connection();
                if state != connection {
                    match source.error() {
                        Some(err) => warn!("Source {}: {}", state, err),
                        None => info!("Source {}", state),
                    }
                    connection = state;
                }
            }
        }
    }

    let stats = monitor.stats();
    info!(
        "Accepted {} reading(s), rejected {}",
        stats.accepted,
        stats.rejected()
    );
    Ok(())
}

/// Replay a capture file and write the resulting state to a JSON file
fn export_to_file(capture: &Path, export_path: &Path, mut monitor: SensorMonitor) -> Result<()> {
    let mut source = FileSource::new(capture);
    let mut updates: Vec<data::SensorUpdate> = Vec::new();

    while let Some(message) = source.poll() {
        monitor.ingest(&message, &mut updates);
    }
    if let Some(err) = source.error() {
        bail!("Failed to read {}: {}", capture.display(), err);
    }
    monitor.sweep(&mut updates);

    let json = serde_json::to_string_pretty(&monitor.export())?;
    std::fs::write(export_path, json)
        .with_context(|| format!("Failed to write {}", export_path.display()))?;

    println!("Exported sensor state to: {}", export_path.display());
    Ok(())
}
