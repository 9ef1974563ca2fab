use std::{
    io::{self, Stdout},
    path::Path,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event as CrosstermEvent, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
};
use tracing::{info, warn};

use crate::{
    config,
    input::{self, Payload, ViewKind},
    render::{self, FrameBuffer},
    session::{CloudSession, CloudStatus},
    table,
    types::{ParticleSnapshot, Rgb},
};

// Below this speed (px per tick) every particle counts as landed.
const RESTING_SPEED: f32 = 0.05;
// Longest wall-clock gap the fixed-step loop catches up on.
const MAX_CATCH_UP: f32 = 0.25;

/// Runs the interactive view until the user quits. `source` is re-read on
/// reload; stdin (`-`) cannot be reloaded.
pub fn run(
    source: &Path,
    payload: &Payload,
    view: ViewKind,
    mut session: CloudSession,
) -> Result<()> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut terminal = setup_or_restore(setup_terminal, restore_terminal)?;

    let result = event_loop(&mut terminal, source, payload, view, &mut session);
    session.stop();
    shutdown_terminal(&mut terminal)?;
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    source: &Path,
    payload: &Payload,
    view: ViewKind,
    session: &mut CloudSession,
) -> Result<()> {
    let mut ui_state = UiState::new(payload, payload.resolve_view(view));
    let mut snapshot: Vec<ParticleSnapshot> = Vec::with_capacity(config::MAX_TERMS);
    info!(view = ?ui_state.view, "starting interactive view");

    let mut accumulator = 0.0_f32;
    let mut last_tick = Instant::now();
    let mut last_render = Instant::now();
    let render_interval = Duration::from_secs_f32(1.0 / config::RENDER_HZ);
    let mut sim_counter = 0_u32;
    let mut render_counter = 0_u32;
    let mut last_fps_sample = Instant::now();
    let mut rates = FrameRates::default();

    loop {
        let now = Instant::now();
        accumulator = (accumulator + (now - last_tick).as_secs_f32()).min(MAX_CATCH_UP);
        last_tick = now;

        while accumulator >= config::DT {
            if ui_state.view == ViewKind::Cloud && !ui_state.paused && session.tick() {
                sim_counter += 1;
            }
            accumulator -= config::DT;
        }

        while event::poll(Duration::from_millis(0))? {
            let CrosstermEvent::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Tab => ui_state.cycle_view(),
                KeyCode::Char('r') => {
                    session.restart();
                    ui_state.focus = None;
                }
                KeyCode::Char('l') => reload(source, &mut ui_state, session),
                KeyCode::Char('p') | KeyCode::Char(' ') => ui_state.paused = !ui_state.paused,
                KeyCode::Left => ui_state.move_focus(-1, snapshot.len()),
                KeyCode::Right => ui_state.move_focus(1, snapshot.len()),
                KeyCode::Up => ui_state.scroll = ui_state.scroll.saturating_sub(1),
                KeyCode::Down => ui_state.scroll = ui_state.scroll.saturating_add(1),
                _ => {}
            }
        }

        if last_render.elapsed() >= render_interval {
            if last_fps_sample.elapsed() >= Duration::from_secs(1) {
                let secs = last_fps_sample.elapsed().as_secs_f32();
                rates.sim = sim_counter as f32 / secs;
                rates.render = render_counter as f32 / secs;
                sim_counter = 0;
                render_counter = 0;
                last_fps_sample = Instant::now();
            }
            terminal.draw(|frame| draw_frame(frame, &mut ui_state, session, &mut snapshot, rates))?;
            last_render = Instant::now();
            render_counter += 1;
        }

        std::thread::sleep(Duration::from_millis(1));
    }
}

fn reload(source: &Path, ui_state: &mut UiState, session: &mut CloudSession) {
    if source == Path::new("-") {
        warn!("payload came from stdin, nothing to reload");
        return;
    }
    match input::load(source) {
        Ok(payload) => {
            ui_state.set_payload(&payload);
            session.set_records(payload.records());
        }
        Err(err) => {
            let reason = format!("{err:#}");
            warn!(%reason, "payload reload failed");
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    Terminal::new(CrosstermBackend::new(stdout)).context("failed to create terminal")
}

/// Runs `setup`; when it fails, `restore` undoes whatever part of the
/// terminal state was already changed.
fn setup_or_restore<T>(
    setup: impl FnOnce() -> Result<T>,
    restore: impl FnOnce(),
) -> Result<T> {
    setup().inspect_err(|_| restore())
}

fn restore_terminal() {
    if let Err(err) = disable_raw_mode() {
        warn!(%err, "failed to disable raw mode");
    }
    if let Err(err) = execute!(io::stdout(), LeaveAlternateScreen) {
        warn!(%err, "failed to leave alternate screen");
    }
}

fn shutdown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

#[derive(Clone, Copy, Debug, Default)]
struct FrameRates {
    sim: f32,
    render: f32,
}

struct UiState {
    view: ViewKind,
    framebuf: FrameBuffer,
    grid: table::Grid,
    rows: Vec<table::Row>,
    text: String,
    focus: Option<usize>,
    scroll: usize,
    paused: bool,
}

impl UiState {
    fn new(payload: &Payload, view: ViewKind) -> Self {
        let mut ui_state = Self {
            view,
            framebuf: FrameBuffer::new(0, 0),
            grid: table::Grid::default(),
            rows: Vec::new(),
            text: String::new(),
            focus: None,
            scroll: 0,
            paused: false,
        };
        ui_state.set_payload(payload);
        ui_state
    }

    fn set_payload(&mut self, payload: &Payload) {
        self.grid = table::grid(&payload.records());
        self.rows = match payload {
            Payload::Json(value) => table::flatten(value),
            Payload::Text(_) => Vec::new(),
        };
        self.text = payload.display_text();
        self.focus = None;
        self.scroll = 0;
    }

    fn cycle_view(&mut self) {
        self.view = match self.view {
            ViewKind::Cloud => ViewKind::Grid,
            ViewKind::Grid => ViewKind::Table,
            ViewKind::Table => ViewKind::Text,
            ViewKind::Text | ViewKind::Auto => ViewKind::Cloud,
        };
        self.scroll = 0;
    }

    fn move_focus(&mut self, step: isize, len: usize) {
        if len == 0 {
            self.focus = None;
            return;
        }
        let len = len as isize;
        let next = match self.focus {
            None if step < 0 => len - 1,
            None => 0,
            Some(idx) => (idx as isize + step).rem_euclid(len),
        };
        self.focus = Some(next as usize);
    }

    fn clamp_focus(&mut self, len: usize) {
        if self.focus.is_some_and(|idx| idx >= len) {
            self.focus = None;
        }
    }
}

fn draw_frame(
    frame: &mut Frame,
    ui_state: &mut UiState,
    session: &mut CloudSession,
    snapshot: &mut Vec<ParticleSnapshot>,
    rates: FrameRates,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(3),
        ])
        .split(frame.size());

    match ui_state.view {
        ViewKind::Grid => draw_grid(frame, chunks[1], ui_state),
        ViewKind::Table => draw_table(frame, chunks[1], ui_state),
        ViewKind::Text => draw_text(frame, chunks[1], ui_state),
        ViewKind::Cloud | ViewKind::Auto => draw_cloud(frame, chunks[1], ui_state, session, snapshot),
    }

    let header = Paragraph::new(header_text(ui_state, session, snapshot.len(), rates))
        .block(Block::default().borders(Borders::ALL).title("wordfall"));
    frame.render_widget(header, chunks[0]);

    let footer = Paragraph::new(footer_text(ui_state, snapshot))
        .block(Block::default().borders(Borders::ALL).title("Controls"));
    frame.render_widget(footer, chunks[2]);
}

fn draw_cloud(
    frame: &mut Frame,
    area: Rect,
    ui_state: &mut UiState,
    session: &mut CloudSession,
    snapshot: &mut Vec<ParticleSnapshot>,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Semantic Insight Art");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let viewport = render::Viewport {
        width: inner.width,
        height: inner.height,
    };
    session.measure(render::viewport_extent(viewport));
    session.snapshot(snapshot);
    ui_state.clamp_focus(snapshot.len());
    render::draw(snapshot, ui_state.focus, viewport, &mut ui_state.framebuf);

    frame.render_widget(Paragraph::new(framebuffer_lines(&ui_state.framebuf)), inner);
}

fn draw_grid(frame: &mut Frame, area: Rect, ui_state: &mut UiState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Records ({})", ui_state.grid.rows.len()));
    if ui_state.grid.rows.is_empty() {
        let empty = Paragraph::new("no records").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty.block(block), area);
        return;
    }

    let visible = area.height.saturating_sub(3) as usize;
    ui_state.scroll = ui_state
        .scroll
        .min(ui_state.grid.rows.len().saturating_sub(visible.max(1)));

    let columns = ui_state.grid.headers.len().max(1);
    let widths = vec![Constraint::Ratio(1, columns as u32); columns];
    let rows: Vec<Row> = ui_state
        .grid
        .rows
        .iter()
        .skip(ui_state.scroll)
        .map(|cells| Row::new(cells.iter().map(|c| Cell::from(c.clone()))))
        .collect();
    let header = Row::new(
        ui_state
            .grid
            .headers
            .iter()
            .map(|h| Cell::from(h.to_uppercase())),
    )
    .style(Style::default().add_modifier(Modifier::BOLD));

    frame.render_widget(Table::new(rows, widths).header(header).block(block), area);
}

fn draw_table(frame: &mut Frame, area: Rect, ui_state: &mut UiState) {
    let visible = area.height.saturating_sub(3) as usize;
    ui_state.scroll = ui_state
        .scroll
        .min(ui_state.rows.len().saturating_sub(visible.max(1)));

    let rows: Vec<Row> = ui_state
        .rows
        .iter()
        .skip(ui_state.scroll)
        .map(|row| {
            let indent = "  ".repeat(row.level);
            let branch = if row.level > 0 { "└─ " } else { "" };
            let value = if row.value.is_empty() {
                Cell::from("expand").style(Style::default().fg(Color::DarkGray))
            } else {
                Cell::from(row.value.clone())
            };
            Row::new(vec![Cell::from(format!("{indent}{branch}{}", row.key)), value])
        })
        .collect();

    let header = Row::new(vec!["Dimension", "Content"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let table = Table::new(
        rows,
        [Constraint::Percentage(35), Constraint::Percentage(65)],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Structured Data ({} rows)", ui_state.rows.len())),
    );
    frame.render_widget(table, area);
}

fn draw_text(frame: &mut Frame, area: Rect, ui_state: &mut UiState) {
    let max_scroll = ui_state.text.lines().count().saturating_sub(1);
    ui_state.scroll = ui_state.scroll.min(max_scroll);
    let scroll = u16::try_from(ui_state.scroll).unwrap_or(u16::MAX);
    let paragraph = Paragraph::new(ui_state.text.as_str())
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0))
        .block(Block::default().borders(Borders::ALL).title("Response"));
    frame.render_widget(paragraph, area);
}

fn header_text(
    ui_state: &UiState,
    session: &CloudSession,
    particles: usize,
    rates: FrameRates,
) -> String {
    let status = match session.status() {
        CloudStatus::Empty => "empty",
        CloudStatus::AwaitingLayout => "awaiting layout",
        CloudStatus::Stopped => "stopped",
        CloudStatus::Running if ui_state.paused => "paused",
        CloudStatus::Running => match session.simulation() {
            Some(sim) if sim.is_resting(RESTING_SPEED) => "settled",
            _ => "falling",
        },
    };
    let layout = session
        .simulation()
        .map(|sim| {
            let extent = sim.extent();
            format!(" | {}x{} px | tick {}", extent.width, extent.height, sim.ticks())
        })
        .unwrap_or_default();
    format!(
        "view: {:?} | terms: {} | particles: {} | cloud: {}{} | sim fps: {:.1} | render fps: {:.1}",
        ui_state.view,
        session.data().terms.len(),
        particles,
        status,
        layout,
        rates.sim,
        rates.render
    )
}

fn footer_text(ui_state: &UiState, snapshot: &[ParticleSnapshot]) -> String {
    let tooltip = ui_state
        .focus
        .and_then(|idx| snapshot.get(idx))
        .filter(|_| ui_state.view == ViewKind::Cloud)
        .map(|p| format!("{} · {} Mentions | ", p.category, p.count))
        .unwrap_or_default();
    format!(
        "{tooltip}Tab: view | ←→: focus | ↑↓: scroll | r: respawn | l: reload | p: pause | q: quit"
    )
}

fn framebuffer_lines(framebuf: &FrameBuffer) -> Vec<Line<'static>> {
    (0..framebuf.height())
        .map(|y| {
            let mut spans: Vec<Span> = Vec::new();
            let mut run = String::new();
            let mut run_color: Option<Rgb> = None;
            for x in 0..framebuf.width() {
                let cell = framebuf.get(x, y);
                if run_color != Some(cell.color) {
                    if let Some(color) = run_color {
                        spans.push(styled(std::mem::take(&mut run), color));
                    }
                    run_color = Some(cell.color);
                }
                run.push(cell.ch);
            }
            if let Some(color) = run_color {
                spans.push(styled(run, color));
            }
            Line::from(spans)
        })
        .collect()
}

fn styled(text: String, color: Rgb) -> Span<'static> {
    let Rgb(r, g, b) = color;
    Span::styled(text, Style::default().fg(Color::Rgb(r, g, b)))
}
