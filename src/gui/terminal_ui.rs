//! A [`ValidatorUi`] drawn in the terminal.
//!
//! One terminal cell is one unit of screen position, so the "screen
//! resolution" is the terminal size in columns and rows, and target sizes are
//! in cells too. Targets are drawn on a braille canvas, which gives a few dots
//! per cell and reasonably round circles.

use crate::config::TargetStyle;
use crate::gui::error::UiError;
use crate::position::Position;
use crate::ui::{UiEvent, ValidatorUi};

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind,
        MouseButton, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::error;
use ratatui::{
    prelude::*,
    symbols::Marker,
    widgets::{
        block::{Position as TitlePosition, Title},
        canvas::{Canvas, Circle, Context, Line as CanvasLine, Points},
        Block, Borders, Paragraph,
    },
};
use std::{
    io::{self, Stdout},
    time::Duration,
};

/// Smallest terminal that leaves room for a grid of targets.
const MIN_COLS: u16 = 20;
const MIN_ROWS: u16 = 10;

/// Size of the terminal, in cells.
pub fn screen_resolution() -> Result<(u32, u32), UiError> {
    let (cols, rows) = crossterm::terminal::size()?;
    if cols < MIN_COLS || rows < MIN_ROWS {
        return Err(UiError::TerminalTooSmall { cols, rows });
    }
    Ok((u32::from(cols), u32::from(rows)))
}

#[derive(Debug, Clone, PartialEq)]
enum Scene {
    Splash,
    Blank,
    Target {
        pos: Position,
        diameter: u32,
        style: TargetStyle,
    },
    Preview {
        targets: Vec<Position>,
        diameter: u32,
        style: TargetStyle,
    },
}

pub struct TerminalUi {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    resolution: (u32, u32),
    scene: Scene,
    gaze: Option<(Position, Position)>,
    in_test: bool,
    active: bool,
}

impl TerminalUi {
    /// Take over the terminal: raw mode, alternate screen, mouse capture.
    pub fn new() -> Result<Self, UiError> {
        let resolution = screen_resolution()?;

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        terminal.clear()?;

        Ok(Self {
            terminal,
            resolution,
            scene: Scene::Blank,
            gaze: None,
            in_test: false,
            active: true,
        })
    }

    fn draw(&mut self) -> Result<(), UiError> {
        if !self.active {
            return Ok(());
        }
        let scene = &self.scene;
        let gaze = self.gaze;
        let (w, h) = self.resolution;
        self.terminal.draw(|frame| match scene {
            Scene::Splash => draw_splash(frame),
            _ => {
                let canvas = Canvas::default()
                    .marker(Marker::Braille)
                    .x_bounds([0.0, f64::from(w)])
                    .y_bounds([0.0, f64::from(h)])
                    .paint(|ctx| {
                        paint_scene(ctx, scene, h);
                        if let Some((right, left)) = gaze {
                            paint_gaze(ctx, right, left, h);
                        }
                    });
                frame.render_widget(canvas, frame.size());
            }
        })?;
        Ok(())
    }

    fn translate(&self, event: Event) -> Option<UiEvent> {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Esc => Some(UiEvent::Quit),
                KeyCode::Char(' ') if !self.in_test => Some(UiEvent::Begin),
                _ => None,
            },
            Event::Mouse(mouse) => {
                let pos = Position::new(u32::from(mouse.column), u32::from(mouse.row));
                match mouse.kind {
                    MouseEventKind::Down(MouseButton::Left) if self.in_test => {
                        Some(UiEvent::Click(pos))
                    }
                    MouseEventKind::Moved | MouseEventKind::Drag(_) => {
                        Some(UiEvent::PointerMoved(pos))
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

impl ValidatorUi for TerminalUi {
    fn screen_resolution(&self) -> (u32, u32) {
        self.resolution
    }

    fn show_splash(&mut self) -> Result<(), UiError> {
        self.scene = Scene::Splash;
        self.in_test = false;
        self.draw()
    }

    fn show_target(
        &mut self,
        pos: Position,
        diameter: u32,
        style: TargetStyle,
    ) -> Result<(), UiError> {
        self.scene = Scene::Target {
            pos,
            diameter,
            style,
        };
        self.draw()
    }

    fn show_preview(
        &mut self,
        targets: &[Position],
        diameter: u32,
        style: TargetStyle,
    ) -> Result<(), UiError> {
        self.scene = Scene::Preview {
            targets: targets.to_vec(),
            diameter,
            style,
        };
        self.draw()
    }

    fn show_gaze(&mut self, right: Position, left: Position) -> Result<(), UiError> {
        self.gaze = Some((right, left));
        Ok(())
    }

    fn in_test_routine(&self) -> bool {
        self.in_test
    }

    fn poll_event(&mut self, timeout: Duration) -> Result<Option<UiEvent>, UiError> {
        self.draw()?;
        if !self.active || !event::poll(timeout)? {
            return Ok(None);
        }

        let event = self.translate(event::read()?);
        if event == Some(UiEvent::Begin) {
            self.in_test = true;
            self.scene = Scene::Blank;
        }
        Ok(event)
    }

    fn stop(&mut self) -> Result<(), UiError> {
        if !self.active {
            return Ok(());
        }
        self.active = false;

        disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for TerminalUi {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("Could not restore the terminal: {e}");
        }
    }
}

fn draw_splash(frame: &mut Frame) {
    let title = Title::from(" Tracker Validation ".magenta().bold());
    let instructions = Title::from(Line::from(vec![
        " Begin ".into(),
        "<Space>".magenta().bold(),
        " Quit ".into(),
        "<Esc> ".magenta().bold(),
    ]));
    let block = Block::default()
        .title(title.alignment(Alignment::Center))
        .title(
            instructions
                .alignment(Alignment::Center)
                .position(TitlePosition::Bottom),
        )
        .borders(Borders::ALL);

    let area = frame.size();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Length(2),
            Constraint::Min(0),
        ])
        .split(block.inner(area));

    let text = Paragraph::new(vec![
        Line::from("Press the space bar to begin."),
        Line::from("To exit, press ESC at any time."),
    ])
    .alignment(Alignment::Center);

    frame.render_widget(block, area);
    frame.render_widget(text, rows[1]);
}

/// Screen position (top-left origin, whole cells) to canvas coordinates
/// (bottom-left origin), at the middle of the cell.
fn to_canvas(pos: Position, height: u32) -> (f64, f64) {
    (
        f64::from(pos.x) + 0.5,
        f64::from(height) - f64::from(pos.y) - 0.5,
    )
}

fn paint_scene(ctx: &mut Context, scene: &Scene, height: u32) {
    match scene {
        Scene::Splash | Scene::Blank => {}
        Scene::Target {
            pos,
            diameter,
            style,
        } => paint_target(ctx, *pos, *diameter, *style, height),
        Scene::Preview {
            targets,
            diameter,
            style,
        } => {
            for pos in targets {
                paint_target(ctx, *pos, *diameter, *style, height);
            }
        }
    }
}

fn paint_target(ctx: &mut Context, pos: Position, diameter: u32, style: TargetStyle, height: u32) {
    let (x, y) = to_canvas(pos, height);
    let radius = f64::from(diameter) / 2.0;
    match style {
        TargetStyle::Circle => paint_disc(ctx, x, y, radius, Color::White),
        TargetStyle::CrosshairBullseye => {
            let outer = radius * 2.0;
            paint_disc(ctx, x, y, outer, Color::White);
            // the canvas paints in order, so the bars cut through the disc
            ctx.layer();
            for offset in [-radius / 2.0, 0.0, radius / 2.0] {
                ctx.draw(&CanvasLine {
                    x1: x - outer,
                    y1: y + offset,
                    x2: x + outer,
                    y2: y + offset,
                    color: Color::DarkGray,
                });
                ctx.draw(&CanvasLine {
                    x1: x + offset,
                    y1: y - outer,
                    x2: x + offset,
                    y2: y + outer,
                    color: Color::DarkGray,
                });
            }
            ctx.layer();
            paint_disc(ctx, x, y, radius, Color::White);
        }
    }
}

/// A filled circle, as concentric rings.
fn paint_disc(ctx: &mut Context, x: f64, y: f64, radius: f64, color: Color) {
    let mut r = radius;
    while r > 0.0 {
        ctx.draw(&Circle {
            x,
            y,
            radius: r,
            color,
        });
        r -= 0.25;
    }
    ctx.draw(&Points {
        coords: &[(x, y)],
        color,
    });
}

fn paint_gaze(ctx: &mut Context, right: Position, left: Position, height: u32) {
    ctx.layer();
    for (pos, color) in [(right, Color::Green), (left, Color::Blue)] {
        if pos.is_valid() {
            let (x, y) = to_canvas(pos, height);
            ctx.draw(&Circle {
                x,
                y,
                radius: 0.5,
                color,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canvas_is_flipped() {
        assert_eq!(to_canvas(Position::new(0, 0), 10), (0.5, 9.5));
        assert_eq!(to_canvas(Position::new(3, 9), 10), (3.5, 0.5));
    }
}
