use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{Event, KeyCode, KeyModifiers, MouseButton, MouseEventKind};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Layout};
use ratatui::widgets::{Block, Paragraph};
use ratatui::Terminal;

use tui_tree_diagram::{
    ChildRecord, Config, Diagram, DiagramState, FetchError, FetchRequest, FetchResolution, Hit,
    Locator, NodePath, Point, ViewportInput,
};

/// Pretend a symbol lookup takes a moment.
const LOOKUP_LATENCY: Duration = Duration::from_millis(300);
const DOUBLE_CLICK: Duration = Duration::from_millis(400);

/// Who calls whom, as a symbol lookup tool would report it.
struct Callers {
    callers: HashMap<&'static str, Vec<(&'static str, &'static str, u32)>>,
}

impl Callers {
    fn new() -> Self {
        let callers = HashMap::from([
            ("log_line", vec![
                ("read_config", "src/config.c", 88),
                ("parse_args", "src/main.c", 41),
                ("serve", "src/server.c", 203),
                ("handle_request", "src/server.c", 131),
            ]),
            ("read_config", vec![
                ("main", "src/main.c", 17),
                ("reload", "src/signal.c", 52),
            ]),
            ("reload", vec![("on_sighup", "src/signal.c", 12)]),
            ("parse_args", vec![("main", "src/main.c", 12)]),
            ("serve", vec![("main", "src/main.c", 25)]),
            ("handle_request", vec![
                ("serve", "src/server.c", 220),
                ("retry_request", "src/server.c", 301),
            ]),
            ("retry_request", vec![("handle_request", "src/server.c", 160)]),
            ("main", vec![]),
            ("on_sighup", vec![]),
        ]);
        Self { callers }
    }

    fn lookup(&self, symbol: &str) -> Result<Vec<ChildRecord>, FetchError> {
        self.callers
            .get(symbol)
            .map(|callers| {
                callers
                    .iter()
                    .map(|(name, file, line)| ChildRecord::new(*name, *file, *line))
                    .collect()
            })
            .ok_or_else(|| FetchError::Rejected(format!("unknown symbol {symbol}")))
    }
}

struct App {
    state: DiagramState,
    callers: Callers,
    pending: Vec<(FetchRequest, Instant)>,
    last_click: Option<(Instant, u16, u16)>,
    drag_from: Option<(u16, u16)>,
    status: String,
}

impl App {
    fn new() -> Self {
        let mut state = DiagramState::new(Config::default().auto_fit(true));
        state.set_root("log_line", Instant::now());
        Self {
            state,
            callers: Callers::new(),
            pending: Vec::new(),
            last_click: None,
            drag_from: None,
            status: "click circles to expand, double click a name to reveal, f fits, q quits".to_owned(),
        }
    }

    fn toggle(&mut self, path: &NodePath, modifier: bool) {
        match self.state.toggle_node(path, modifier, Instant::now()) {
            Ok(requests) => {
                let due = Instant::now() + LOOKUP_LATENCY;
                for request in requests {
                    self.status = format!("looking up callers of {}", request.key);
                    self.pending.push((request, due));
                }
            }
            Err(err) => self.status = err.to_string(),
        }
    }

    fn resolve_due(&mut self) {
        let now = Instant::now();
        let (due, later) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition::<Vec<_>, _>(|(_, due)| *due <= now);
        self.pending = later;
        for (request, _) in due {
            let key = request.key.clone();
            let result = self.callers.lookup(&key);
            self.status = match self.state.resolve_fetch(request, result, now) {
                FetchResolution::Spliced { children } => format!("{key} has {children} callers"),
                FetchResolution::Failed(err) => err.to_string(),
                FetchResolution::Discarded => format!("lookup of {key} no longer needed"),
            };
        }
    }

    fn click(&mut self, column: u16, row: u16, modifier: bool) {
        let now = Instant::now();
        let double = self.last_click.is_some_and(|(at, last_column, last_row)| {
            now.duration_since(at) < DOUBLE_CLICK && last_column == column && last_row == row
        });
        self.last_click = Some((now, column, row));

        let Some(point) = self.state.point_at(column, row) else {
            return;
        };
        match self.state.hit_test(point, now) {
            Some(Hit::Indicator(path)) => self.toggle(&path, modifier),
            Some(Hit::Content(path)) if double => {
                let mut revealed = None;
                let mut revealer = |locator: &Locator| revealed = Some(locator.clone());
                if let Err(err) = self.state.activate_content(&path, &mut revealer) {
                    self.status = err.to_string();
                }
                if let Some(locator) = revealed {
                    self.status = format!("{}:{}", locator.file, locator.line);
                }
            }
            _ => {}
        }
    }

    fn pan(&mut self, columns: f64, rows: f64) {
        let config = self.state.config();
        let input = ViewportInput::Drag {
            dx: columns * config.cell_width,
            dy: rows * config.cell_height,
            ctrl: false,
        };
        self.state.handle_input(input, Instant::now());
    }

    fn zoom(&mut self, dy: f64, at: Point) {
        let input = ViewportInput::Wheel {
            dx: 0.0,
            dy,
            ctrl: !self.state.config().scroll_for_pan,
            at,
        };
        self.state.handle_input(input, Instant::now());
    }
}

fn main() -> std::io::Result<()> {
    // Keep the terminal clean, log into a file
    let log = std::fs::File::create("callgraph.log")?;
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(log))
        .init();

    // Terminal initialization
    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    crossterm::execute!(
        stdout,
        crossterm::terminal::EnterAlternateScreen,
        crossterm::event::EnableMouseCapture
    )?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    // App
    let app = App::new();
    let res = run_app(&mut terminal, app);

    // restore terminal
    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::event::DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, mut app: App) -> std::io::Result<()> {
    loop {
        app.resolve_due();

        terminal.draw(|frame| {
            let [diagram, status] =
                Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(frame.size());
            let widget = Diagram::new().block(Block::bordered().title("Callers"));
            frame.render_stateful_widget(widget, diagram, &mut app.state);
            frame.render_widget(Paragraph::new(app.status.as_str()), status);
        })?;

        // Redraw often while something moves or a lookup is running
        let busy = app.state.is_animating(Instant::now()) || !app.pending.is_empty();
        let timeout = if busy {
            Duration::from_millis(16)
        } else {
            Duration::from_millis(500)
        };
        if !crossterm::event::poll(timeout)? {
            continue;
        }

        match crossterm::event::read()? {
            Event::Key(key) => match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Char('f') => {
                    app.state.fit(Instant::now());
                }
                KeyCode::Char('+') => app.zoom(-100.0, centre(&app)),
                KeyCode::Char('-') => app.zoom(100.0, centre(&app)),
                KeyCode::Left => app.pan(4.0, 0.0),
                KeyCode::Right => app.pan(-4.0, 0.0),
                KeyCode::Up => app.pan(0.0, 2.0),
                KeyCode::Down => app.pan(0.0, -2.0),
                _ => {}
            },
            Event::Mouse(mouse) => {
                let ctrl = mouse.modifiers.contains(KeyModifiers::CONTROL);
                match mouse.kind {
                    MouseEventKind::Down(MouseButton::Left) => {
                        app.drag_from = Some((mouse.column, mouse.row));
                        app.click(mouse.column, mouse.row, ctrl);
                    }
                    MouseEventKind::Drag(MouseButton::Left) => {
                        if let Some((column, row)) = app.drag_from {
                            app.pan(
                                f64::from(mouse.column) - f64::from(column),
                                f64::from(mouse.row) - f64::from(row),
                            );
                        }
                        app.drag_from = Some((mouse.column, mouse.row));
                    }
                    MouseEventKind::Up(_) => app.drag_from = None,
                    MouseEventKind::ScrollDown | MouseEventKind::ScrollUp => {
                        let dy = if mouse.kind == MouseEventKind::ScrollDown {
                            100.0
                        } else {
                            -100.0
                        };
                        let at = app
                            .state
                            .point_at(mouse.column, mouse.row)
                            .unwrap_or_else(|| centre(&app));
                        let input = ViewportInput::Wheel {
                            dx: 0.0,
                            dy,
                            ctrl,
                            at,
                        };
                        app.state.handle_input(input, Instant::now());
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }
}

fn centre(app: &App) -> Point {
    let canvas = app.state.viewport().canvas();
    Point::new(canvas.width / 2.0, canvas.height / 2.0)
}
