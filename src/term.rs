use std::{
    io::{self, Stdout},
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use tui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::Span,
    widgets::{Axis, Block, BorderType, Borders, Chart, Dataset, GraphType, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};

use crate::config::Args;
use crate::data::reader::Reader;
use crate::statistics::SeriesProvider;
use crate::ui::axis_label;

const POLL_RATE: Duration = Duration::from_millis(200);

const SERIES_COLORS: [Color; 6] = [
    Color::Cyan,
    Color::Yellow,
    Color::Magenta,
    Color::Green,
    Color::Red,
    Color::Blue,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Select,
    Chart,
}

/// Terminal front end: pick a quantity, then plot it.
pub struct TermApp {
    reader: Reader,
    list: ListState,
    screen: Screen,
    follow: Option<Duration>,
    last_refresh: Instant,
    message: Option<String>,
}

impl TermApp {
    pub fn new(reader: Reader, follow: Option<Duration>) -> Self {
        let mut list = ListState::default();
        if !reader.quantities().is_empty() {
            list.select(Some(0));
        }
        TermApp {
            reader,
            list,
            screen: Screen::Select,
            follow,
            last_refresh: Instant::now(),
            message: None,
        }
    }

    /// Jump straight to the chart of `quantity`.
    pub fn open_chart(&mut self, quantity: &str) {
        match self.reader.quantities().iter().position(|q| q == quantity) {
            Some(index) => {
                self.list.select(Some(index));
                self.screen = Screen::Chart;
            }
            None => self.message = Some(format!("Unknown quantity '{quantity}'")),
        }
    }

    fn selected(&self) -> Option<&str> {
        self.list
            .selected()
            .and_then(|i| self.reader.quantities().get(i))
            .map(String::as_str)
    }

    fn move_selection(&mut self, forward: bool) {
        let len = self.reader.quantities().len();
        if len == 0 {
            return;
        }
        let current = self.list.selected().unwrap_or(0);
        let next = if forward {
            (current + 1) % len
        } else {
            (current + len - 1) % len
        };
        self.list.select(Some(next));
    }

    /// Returns `true` when the application should exit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match self.screen {
            Screen::Select => match code {
                KeyCode::Char('q') | KeyCode::Esc => return true,
                KeyCode::Down | KeyCode::Char('j') => self.move_selection(true),
                KeyCode::Up | KeyCode::Char('k') => self.move_selection(false),
                KeyCode::Enter if self.selected().is_some() => self.screen = Screen::Chart,
                _ => {}
            },
            Screen::Chart => {
                if matches!(code, KeyCode::Char('q') | KeyCode::Esc) {
                    self.screen = Screen::Select;
                }
            }
        }
        false
    }

    /// Follow mode: re-read the last file once the interval has passed.
    fn tick(&mut self, now: Instant) {
        let Some(interval) = self.follow else {
            return;
        };
        if self.screen != Screen::Chart || now.saturating_duration_since(self.last_refresh) < interval {
            return;
        }
        self.last_refresh = now;
        match self.reader.read_last() {
            Ok(()) => self.message = None,
            Err(e) => {
                log::warn!("Re-reading the last file failed: {e:#}");
                self.message = Some(format!("Re-read failed: {e:#}"));
            }
        }
    }

    fn draw<B: Backend>(&mut self, frame: &mut Frame<B>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([Constraint::Min(3), Constraint::Length(3)])
            .split(frame.size());

        match self.screen {
            Screen::Select => self.render_list(frame, chunks[0]),
            Screen::Chart => self.render_chart(frame, chunks[0]),
        }

        let hint = match self.screen {
            Screen::Select => "↑/↓ select, Enter plot, q quit",
            Screen::Chart => "q back",
        };
        render_message_box(frame, chunks[1], self.message.as_deref().unwrap_or(hint));
    }

    fn render_list<B: Backend>(&mut self, frame: &mut Frame<B>, rect: Rect) {
        let items: Vec<ListItem> = self
            .reader
            .quantities()
            .iter()
            .map(|q| ListItem::new(q.as_str()))
            .collect();
        let list = List::new(items)
            .block(block("Quantities"))
            .highlight_style(Style::default().add_modifier(Modifier::BOLD).fg(Color::Yellow))
            .highlight_symbol(">> ");
        frame.render_stateful_widget(list, rect, &mut self.list);
    }

    fn render_chart<B: Backend>(&self, frame: &mut Frame<B>, rect: Rect) {
        let Some(quantity) = self.selected() else {
            return;
        };

        let points: Vec<(String, Vec<(f64, f64)>)> = self
            .reader
            .series()
            .iter()
            .map(|series| {
                let values = series.values(quantity).unwrap_or_default();
                let data = series
                    .time
                    .iter()
                    .zip(values)
                    .filter(|(t, v)| t.is_finite() && v.is_finite())
                    .map(|(&t, &v)| (t, v))
                    .collect();
                (series.label(), data)
            })
            .collect();

        let x_bounds = bounds(points.iter().flat_map(|(_, p)| p.iter().map(|&(x, _)| x)));
        let y_bounds = bounds(points.iter().flat_map(|(_, p)| p.iter().map(|&(_, y)| y)));

        let datasets: Vec<Dataset> = points
            .iter()
            .zip(SERIES_COLORS.iter().cycle())
            .map(|((label, data), &color)| {
                Dataset::default()
                    .name(label.as_str())
                    .marker(Marker::Braille)
                    .graph_type(GraphType::Line)
                    .style(Style::default().fg(color))
                    .data(data)
            })
            .collect();

        let title = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);
        let chart = Chart::new(datasets)
            .block(block(quantity))
            .x_axis(
                Axis::default()
                    .title(Span::styled("Simulation Time", title))
                    .bounds(x_bounds)
                    .labels(axis_labels(x_bounds)),
            )
            .y_axis(
                Axis::default()
                    .title(Span::styled(axis_label(quantity, self.reader.unit(quantity)), title))
                    .bounds(y_bounds)
                    .labels(axis_labels(y_bounds)),
            );
        frame.render_widget(chart, rect);
    }
}

fn block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .style(Style::default().fg(Color::White))
        .title(title)
        .border_type(BorderType::Plain)
}

fn render_message_box<B: Backend>(frame: &mut Frame<B>, rect: Rect, message: &str) {
    let message = Paragraph::new(message)
        .style(Style::default().fg(Color::LightCyan))
        .alignment(Alignment::Center)
        .block(block("Message"));
    frame.render_widget(message, rect);
}

/// Axis range covering every finite value, padded when all values coincide.
fn bounds(values: impl Iterator<Item = f64>) -> [f64; 2] {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if min > max {
        return [0.0, 1.0];
    }
    if min == max {
        let pad = if min == 0.0 { 1.0 } else { min.abs() * 0.05 };
        return [min - pad, max + pad];
    }
    [min, max]
}

fn axis_labels(bounds: [f64; 2]) -> Vec<Span<'static>> {
    let [lo, hi] = bounds;
    [lo, (lo + hi) / 2.0, hi]
        .into_iter()
        .map(|v| Span::raw(format!("{v:.3e}")))
        .collect()
}

/// Run the terminal front end on the files given on the command line.
pub fn run(args: &Args) -> Result<()> {
    let reader = Reader::new(args.files.clone())?;
    let follow = if args.follow { Some(args.interval()?) } else { None };
    let mut app = TermApp::new(reader, follow);
    if let Some(quantity) = &args.quantity {
        app.open_chart(quantity);
    }

    terminal::enable_raw_mode().context("unable to go to raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("unable to enter alternate screen")?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = event_loop(&mut terminal, &mut app);

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

fn event_loop(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut TermApp) -> Result<()> {
    loop {
        terminal
            .draw(|frame| app.draw(frame))
            .context("unable to draw tui")?;

        if event::poll(POLL_RATE)? {
            if let Event::Key(key) = event::read()? {
                if app.handle_key(key.code) {
                    return Ok(());
                }
            }
        }
        app.tick(Instant::now());
    }
}
