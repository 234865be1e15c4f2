use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
};
use std::{
    env,
    io::stdout,
    path::{Path, PathBuf},
    process,
    time::{Duration, Instant},
};

use amaranth_config::{Config, PreviewStrategy};
use amaranth_engine::editing::{
    Cmd, Document, LineRef, ResourceError, ResourceResolver, SelectionSet, images,
    lines_with_spans,
};
use amaranth_engine::overlay::widget::{InlineWidget, WidgetSpan};
use amaranth_engine::overlay::{
    DebounceScheduler, ExtractionStrategy, OverlayEffect, OverlayEngine, OverlaySet, StyleClass,
    widget,
};
use relative_path::RelativePath;

/// Resolves note-relative image targets against the note's own directory.
struct NoteDirResolver {
    root: PathBuf,
}

impl ResourceResolver for NoteDirResolver {
    fn resolve(&self, target: &RelativePath) -> Result<PathBuf, ResourceError> {
        let path = target.to_path(&self.root);
        match std::fs::metadata(&path) {
            Ok(_) => Ok(path),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(ResourceError::Unresolvable(target.to_relative_path_buf()))
            }
            Err(err) => Err(ResourceError::Io(err)),
        }
    }
}

struct App {
    path: PathBuf,
    doc: Document,
    engine: OverlayEngine,
    resolver: NoteDirResolver,
    cursor: usize,
    dirty: bool,
}

impl App {
    fn new(path: PathBuf, config: Option<&Config>) -> Result<Self> {
        let bytes = std::fs::read(&path)?;
        let doc = Document::from_bytes(&bytes)?;

        let (strategy, quiet_ms) = match config {
            Some(c) => (
                match c.editor.preview_strategy {
                    PreviewStrategy::LineScan => ExtractionStrategy::LineScan,
                    PreviewStrategy::Tree => ExtractionStrategy::Tree,
                },
                c.editor.debounce_ms,
            ),
            None => (ExtractionStrategy::LineScan, 100),
        };
        let engine = OverlayEngine::with_scheduler(
            strategy,
            DebounceScheduler::new(Duration::from_millis(quiet_ms)),
        );

        let resolver = NoteDirResolver {
            root: path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };

        Ok(Self {
            path,
            doc,
            engine,
            resolver,
            cursor: 0,
            dirty: false,
        })
    }

    fn sync_selection(&mut self) {
        self.cursor = self.cursor.min(self.doc.len());
        self.doc.set_selection(SelectionSet::single(self.cursor));
    }

    fn move_horizontal(&mut self, delta: isize) {
        let text = self.doc.text();
        if delta < 0 {
            let mut pos = self.cursor;
            while pos > 0 {
                pos -= 1;
                if text.is_char_boundary(pos) {
                    break;
                }
            }
            self.cursor = pos;
        } else {
            let mut pos = (self.cursor + 1).min(text.len());
            while pos < text.len() && !text.is_char_boundary(pos) {
                pos += 1;
            }
            self.cursor = pos;
        }
        self.sync_selection();
    }

    fn move_vertical(&mut self, down: bool) {
        let lines: Vec<LineRef> = lines_with_spans(self.doc.buffer()).collect();
        let Some(current) = lines
            .iter()
            .position(|l| l.span.start <= self.cursor && self.cursor <= l.span.end)
        else {
            return;
        };
        let target = if down {
            current + 1
        } else if current == 0 {
            return;
        } else {
            current - 1
        };
        let Some(line) = lines.get(target) else {
            return;
        };
        // A raw byte column from the previous line can land inside a
        // multibyte character on the target line; snap it down.
        let mut col = (self.cursor - lines[current].span.start).min(line.text.len());
        while col > 0 && !line.text.is_char_boundary(col) {
            col -= 1;
        }
        self.cursor = line.span.start + col;
        self.sync_selection();
    }

    fn insert(&mut self, text: &str) {
        self.doc.apply(Cmd::InsertText {
            at: self.cursor,
            text: text.to_string(),
        });
        self.cursor += text.len();
        self.engine.note_edit(Instant::now());
        self.dirty = true;
        self.sync_selection();
    }

    fn backspace(&mut self) {
        if images::delete_backward(&mut self.doc, self.cursor).is_some() {
            self.cursor = self.doc.selection().primary().head;
            self.engine.note_edit(Instant::now());
            self.dirty = true;
            self.sync_selection();
        }
    }

    fn save(&mut self) -> Result<()> {
        std::fs::write(&self.path, self.doc.text())?;
        self.dirty = false;
        Ok(())
    }

    fn tick(&mut self) {
        let text = self.doc.text();
        if self.engine.needs_reparse(Instant::now(), &text) {
            self.doc.reparse();
        }
    }
}

fn main() -> Result<()> {
    let Some(path) = env::args().nth(1).map(PathBuf::from) else {
        eprintln!("usage: amaranth-cli <note.md>");
        process::exit(1);
    };

    let config = Config::load().unwrap_or(None);
    let mut app = App::new(path, config.as_ref())?;

    enable_raw_mode()?;
    execute!(stdout(), EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(stdout(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    app.engine.shutdown();

    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        app.tick();
        app.sync_selection();
        app.engine.recompute(&app.doc);
        terminal.draw(|f| draw(f, app))?;

        if !event::poll(Duration::from_millis(25))? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Esc => {
                    if app.dirty {
                        app.save()?;
                    }
                    return Ok(());
                }
                KeyCode::Tab => {
                    let focus = app.doc.focus();
                    app.doc.set_focus(!focus);
                }
                KeyCode::Left => app.move_horizontal(-1),
                KeyCode::Right => app.move_horizontal(1),
                KeyCode::Up => app.move_vertical(false),
                KeyCode::Down => app.move_vertical(true),
                KeyCode::Enter => app.insert("\n"),
                KeyCode::Backspace => app.backspace(),
                KeyCode::Char(c) => app.insert(&c.to_string()),
                _ => {}
            }
        }
    }
}

fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(f.area());

    let lines: Vec<Line> = if app.doc.focus() {
        render_with_overlays(app)
    } else {
        render_unfocused(app)
    };

    let title = format!(
        " {} {}",
        app.path.display(),
        if app.dirty { "*" } else { "" }
    );
    let body = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(body, chunks[0]);

    let status = if app.doc.focus() {
        "editing  [Tab] preview all  [Esc] save+quit"
    } else {
        "preview  [Tab] back to editing  [Esc] save+quit"
    };
    f.render_widget(
        Paragraph::new(status).style(Style::default().fg(Color::DarkGray)),
        chunks[1],
    );
}

/// Focused rendering: apply the engine's overlay instructions byte by byte.
fn render_with_overlays(app: &App) -> Vec<Line<'static>> {
    let set = app.engine.current();
    lines_with_spans(app.doc.buffer())
        .map(|line| render_line_overlays(&line, set, app.cursor))
        .collect()
}

fn flush(run: &mut String, style: Style, spans: &mut Vec<Span<'static>>) {
    if !run.is_empty() {
        spans.push(Span::styled(std::mem::take(run), style));
    }
}

fn render_line_overlays(line: &LineRef, set: &OverlaySet, cursor: usize) -> Line<'static> {
    let mut spans: Vec<Span> = Vec::new();
    let mut run = String::new();
    let mut run_style = Style::default();

    let line_style = line_level_style(line, set);

    let mut idx = line.span.start;
    for ch in line.text.chars() {
        let ch_len = ch.len_utf8();

        // Widget replacements draw once, at the first byte they cover.
        for o in set.iter() {
            if o.span.start == idx
                && o.span.start >= line.span.start
                && let OverlayEffect::Replace(w) = &o.effect
                && let Some(marker) = w.marker_text()
            {
                flush(&mut run, run_style, &mut spans);
                spans.push(Span::styled(format!("{marker} "), line_style));
            }
        }

        let concealed = set.is_concealed(idx);
        let mut style = byte_style(idx, set).patch(line_style);
        if idx == cursor {
            style = style.add_modifier(Modifier::REVERSED);
        }

        if !concealed || idx == cursor {
            if style != run_style {
                flush(&mut run, run_style, &mut spans);
                run_style = style;
            }
            run.push(ch);
        }
        idx += ch_len;
    }
    flush(&mut run, run_style, &mut spans);

    if cursor == line.span.end && spans.iter().all(|s| !s.style.add_modifier.contains(Modifier::REVERSED)) && cursor >= line.span.start {
        spans.push(Span::styled(" ", Style::default().add_modifier(Modifier::REVERSED)));
    }

    Line::from(spans)
}

fn line_level_style(line: &LineRef, set: &OverlaySet) -> Style {
    use amaranth_engine::overlay::LineClass;
    for o in set.iter() {
        if o.span.start >= line.span.start && o.span.start <= line.span.end {
            if let OverlayEffect::LineStyle(class) = &o.effect {
                return match class {
                    LineClass::Heading(1) => Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                    LineClass::Heading(_) => Style::default().fg(Color::Yellow),
                    LineClass::ListItem => Style::default(),
                };
            }
        }
    }
    Style::default()
}

fn byte_style(idx: usize, set: &OverlaySet) -> Style {
    let mut style = Style::default();
    for o in set.iter() {
        if !o.span.contains(idx) {
            continue;
        }
        if let OverlayEffect::Style(class) = &o.effect {
            style = style.patch(class_style(*class));
        }
    }
    style
}

fn class_style(class: StyleClass) -> Style {
    match class {
        StyleClass::Bold => Style::default().add_modifier(Modifier::BOLD),
        StyleClass::Italic => Style::default().add_modifier(Modifier::ITALIC),
        StyleClass::Strikethrough => Style::default().add_modifier(Modifier::CROSSED_OUT),
        StyleClass::Code => Style::default().fg(Color::Green),
        StyleClass::Link => Style::default()
            .fg(Color::Blue)
            .add_modifier(Modifier::UNDERLINED),
    }
}

/// Unfocused rendering: the degraded whole-document preview built from
/// inline replacement widgets.
fn render_unfocused(app: &App) -> Vec<Line<'static>> {
    lines_with_spans(app.doc.buffer())
        .map(|line| {
            if line.is_blank() {
                return Line::from("");
            }
            if let Some(image) = widget::render_image_line(&line.text, &app.resolver) {
                if let InlineWidget::Spans { spans } = image {
                    return Line::from(
                        spans
                            .into_iter()
                            .map(widget_span_to_ratatui)
                            .collect::<Vec<_>>(),
                    );
                }
            }
            match widget::render_line(&line.text) {
                InlineWidget::Spans { spans } => Line::from(
                    spans
                        .into_iter()
                        .map(widget_span_to_ratatui)
                        .collect::<Vec<_>>(),
                ),
                other => Line::from(other.marker_text().unwrap_or_default()),
            }
        })
        .collect()
}

fn widget_span_to_ratatui(span: WidgetSpan) -> Span<'static> {
    let mut style = Style::default();
    for class in &span.styles {
        style = style.patch(class_style(*class));
    }
    Span::styled(span.text, style)
}
