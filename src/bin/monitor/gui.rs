use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, MouseEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    style::{Color, Style},
    symbols,
    text::Span,
    widgets::{Axis, Block, Chart, Dataset, GraphType},
    Frame, Terminal,
};
use std::{
    collections::VecDeque,
    error::Error,
    io,
    sync::Arc,
    time::{Duration, Instant},
};

use tracker_validation::{position::Position, position_store::PositionStore};

/// How many past samples of each eye stay on the chart.
const TRAIL: usize = 40;

struct App {
    gaze: Arc<PositionStore>,
    pointer: Arc<PositionStore>,
    resolution: (u32, u32),
    right: VecDeque<(f64, f64)>,
    left: VecDeque<(f64, f64)>,
    last_sequence: f64,
    status: String,
}

impl App {
    fn new(gaze: Arc<PositionStore>, pointer: Arc<PositionStore>, resolution: (u32, u32)) -> App {
        App {
            gaze,
            pointer,
            resolution,
            right: VecDeque::with_capacity(TRAIL),
            left: VecDeque::with_capacity(TRAIL),
            last_sequence: 0.0,
            status: String::new(),
        }
    }

    fn on_tick(&mut self) {
        let (right, left, sequence, status) = {
            let guard = self.gaze.lock();
            let (right, left) = guard.right_left();
            (right, left, guard.sequence(), guard.to_string())
        };
        self.status = format!("#{sequence} {status}");
        if sequence == self.last_sequence {
            return;
        }
        self.last_sequence = sequence;

        let height = f64::from(self.resolution.1);
        for (pos, trail) in [(right, &mut self.right), (left, &mut self.left)] {
            if !pos.is_valid() {
                continue;
            }
            if trail.len() == TRAIL {
                trail.pop_front();
            }
            trail.push_back((f64::from(pos.x), height - f64::from(pos.y)));
        }
    }
}

pub fn engage_gui(
    gaze: Arc<PositionStore>,
    pointer: Arc<PositionStore>,
    resolution: (u32, u32),
) -> Result<(), Box<dyn Error>> {
    // setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // create app and run it
    let tick_rate = Duration::from_millis(50);
    let app = App::new(gaze, pointer, resolution);
    let res = run_app(&mut terminal, app, tick_rate);

    // restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
    tick_rate: Duration,
) -> io::Result<()> {
    let mut last_tick = Instant::now();
    loop {
        terminal.draw(|f| ui(f, &app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));
        if crossterm::event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) => {
                    if let KeyCode::Char('q') | KeyCode::Esc = key.code {
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) if mouse.kind == MouseEventKind::Moved => {
                    let pos = Position::new(u32::from(mouse.column), u32::from(mouse.row));
                    app.pointer.set_single(pos, 0.0);
                }
                _ => {}
            }
        }
        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = Instant::now();
        }
    }
}

fn axis_labels(max: u32) -> Vec<Span<'static>> {
    [0, max / 2, max]
        .iter()
        .map(|v| Span::from(v.to_string()))
        .collect()
}

fn ui(f: &mut Frame, app: &App) {
    let right: Vec<(f64, f64)> = app.right.iter().copied().collect();
    let left: Vec<(f64, f64)> = app.left.iter().copied().collect();
    let (w, h) = app.resolution;

    let chart = Chart::new(vec![
        Dataset::default()
            .name("Right")
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Green))
            .data(&right),
        Dataset::default()
            .name("Left")
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Blue))
            .data(&left),
    ])
    .block(Block::default().title(format!("Gaze {}  (q to quit)", app.status)))
    .x_axis(
        Axis::default()
            .title(Span::styled("X", Style::default().fg(Color::Red)))
            .style(Style::default().fg(Color::White))
            .bounds([0.0, f64::from(w)])
            .labels(axis_labels(w)),
    )
    .y_axis(
        Axis::default()
            .title(Span::styled("Y", Style::default().fg(Color::Red)))
            .style(Style::default().fg(Color::White))
            .bounds([0.0, f64::from(h)])
            .labels(axis_labels(h)),
    );

    f.render_widget(chart, f.size());
}
