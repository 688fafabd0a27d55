use crate::chat::{ChatController, Transcript};
use crate::cli::commands::{Command, HELP_TEXT, is_command_line, parse_command};
use crate::cli::theme::Theme;
use crate::cli::timeline::{NoticeKind, Timeline};
use crate::config::{ThemeConfig, ThemeToken};
use crate::data::{Datasets, Table};
use crate::intent;
use crate::llm::provider::LlmProvider;
use crate::trace::SessionTrace;
use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Frame;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout, Position, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Cell, Paragraph, Row, Table as TableWidget, Wrap};
use std::io::{self, Stdout};
use std::time::Duration;

pub(crate) const APP_TITLE: &str = "🤖 Chat - Escola Tecnologia para Todos";
pub(crate) const STUDENTS_TITLE: &str = "👩‍🎓 Alunos e histórias de sucesso";
pub(crate) const COURSES_TITLE: &str = "📚 Cursos disponíveis";
pub(crate) const CONVERSATION_TITLE: &str = "🗨️ Conversa";
pub(crate) const INPUT_TITLE: &str = "Digite sua pergunta aqui 👇";
pub(crate) const PROMPT: &str = "> ";
pub(crate) const STATUS_HINTS: &str =
    " Enter enviar | F2 alunos | F3 cursos | PgUp/PgDn rolar | Esc sair";

const PANEL_MAX_HEIGHT: u16 = 10;
const MOUSE_SCROLL_STEP: u16 = 3;
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct AppState<P> {
    pub session_id: String,
    pub controller: ChatController<P>,
    pub transcript: Transcript,
    pub theme_config: ThemeConfig,
    pub trace: SessionTrace,
}

impl<P: LlmProvider> AppState<P> {
    pub fn new(
        session_id: String,
        controller: ChatController<P>,
        theme_config: ThemeConfig,
        trace: SessionTrace,
    ) -> Self {
        Self {
            session_id,
            controller,
            transcript: Transcript::new(),
            theme_config,
            trace,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct UiState {
    pub(super) input: String,
    // chars, not bytes
    pub(super) cursor: usize,
    pub(super) timeline: Timeline,
    pub(super) show_students: bool,
    pub(super) show_courses: bool,
    pub(super) scroll_from_bottom: u16,
    max_scroll: u16,
    page_size: u16,
    timeline_area: Rect,
    pub(super) should_exit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum KeyOutcome {
    Continue,
    Submit(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiRegions {
    pub title: Rect,
    pub students: Option<Rect>,
    pub courses: Option<Rect>,
    pub timeline: Rect,
    pub input: Rect,
    pub status: Rect,
}

pub async fn run_app<P: LlmProvider>(state: &mut AppState<P>) -> Result<()> {
    let theme = Theme::from_env(&state.theme_config);
    let mut ui = UiState::default();
    let mut session = TerminalSession::enter()?;
    state
        .trace
        .log_info(&format!("session {} started", state.session_id));

    while !ui.should_exit {
        session
            .terminal
            .draw(|frame| render(frame, state, &mut ui, &theme))?;

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if let KeyOutcome::Submit(query) = handle_key(state, &mut ui, key) {
                    begin_turn(&mut ui, &query);
                    session
                        .terminal
                        .draw(|frame| render(frame, state, &mut ui, &theme))?;
                    complete_turn(state, &mut ui, &query).await;
                }
            }
            Event::Mouse(mouse) => handle_mouse(&mut ui, mouse),
            _ => {}
        }
    }

    state.trace.log_info("session finished");
    Ok(())
}

struct TerminalSession {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalSession {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(err) = execute!(stdout, EnterAlternateScreen, EnableMouseCapture) {
            restore_terminal(&mut io::stdout());
            return Err(err.into());
        }
        match Terminal::new(CrosstermBackend::new(stdout)) {
            Ok(terminal) => Ok(Self { terminal }),
            Err(err) => {
                restore_terminal(&mut io::stdout());
                Err(err.into())
            }
        }
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        restore_terminal(self.terminal.backend_mut());
        let _ = self.terminal.show_cursor();
    }
}

fn restore_terminal<W: io::Write>(out: &mut W) {
    let _ = disable_raw_mode();
    let _ = execute!(out, LeaveAlternateScreen, DisableMouseCapture);
}

pub(crate) fn handle_key<P: LlmProvider>(
    state: &AppState<P>,
    ui: &mut UiState,
    key: KeyEvent,
) -> KeyOutcome {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => ui.should_exit = true,
        KeyCode::Char('c' | 'd') if ctrl => ui.should_exit = true,
        KeyCode::Char('u') if ctrl => {
            ui.input.clear();
            ui.cursor = 0;
        }
        KeyCode::Char(ch) if !ctrl => {
            let at = byte_index(&ui.input, ui.cursor);
            ui.input.insert(at, ch);
            ui.cursor += 1;
        }
        KeyCode::Backspace if ui.cursor > 0 => {
            ui.cursor -= 1;
            let at = byte_index(&ui.input, ui.cursor);
            ui.input.remove(at);
        }
        KeyCode::Delete if ui.cursor < ui.input.chars().count() => {
            let at = byte_index(&ui.input, ui.cursor);
            ui.input.remove(at);
        }
        KeyCode::Left => ui.cursor = ui.cursor.saturating_sub(1),
        KeyCode::Right => ui.cursor = (ui.cursor + 1).min(ui.input.chars().count()),
        KeyCode::Home => ui.cursor = 0,
        KeyCode::End => ui.cursor = ui.input.chars().count(),
        KeyCode::F(2) => ui.show_students = !ui.show_students,
        KeyCode::F(3) => ui.show_courses = !ui.show_courses,
        KeyCode::PageUp => {
            ui.scroll_from_bottom = ui
                .scroll_from_bottom
                .saturating_add(ui.page_size.max(1))
                .min(ui.max_scroll);
        }
        KeyCode::PageDown => {
            ui.scroll_from_bottom = ui.scroll_from_bottom.saturating_sub(ui.page_size.max(1));
        }
        KeyCode::Enter => return submit_input(state, ui),
        _ => {}
    }
    KeyOutcome::Continue
}

fn submit_input<P: LlmProvider>(state: &AppState<P>, ui: &mut UiState) -> KeyOutcome {
    let line = std::mem::take(&mut ui.input);
    ui.cursor = 0;
    if line.trim().is_empty() {
        return KeyOutcome::Continue;
    }
    if is_command_line(&line) {
        run_command(state, ui, &line);
        return KeyOutcome::Continue;
    }
    KeyOutcome::Submit(line)
}

fn run_command<P: LlmProvider>(state: &AppState<P>, ui: &mut UiState, line: &str) {
    state.trace.log_info(&format!("command {}", line.trim()));
    match parse_command(line) {
        Ok(Command::Help) => {
            ui.timeline
                .push_notice(&state.transcript, NoticeKind::Info, HELP_TEXT);
        }
        Ok(Command::Trace) => {
            let text = format!("Arquivo de trace: {}", state.trace.file_path().display());
            ui.timeline
                .push_notice(&state.transcript, NoticeKind::Info, &text);
        }
        Ok(Command::Students) => ui.show_students = !ui.show_students,
        Ok(Command::Courses) => ui.show_courses = !ui.show_courses,
        Err(err) => {
            ui.timeline
                .push_notice(&state.transcript, NoticeKind::Error, err.message());
        }
    }
    ui.scroll_from_bottom = 0;
}

/// The waiting line only shows when the model will be asked; canned answers
/// come back immediately.
pub(crate) fn begin_turn(ui: &mut UiState, query: &str) {
    if intent::rule_for(query).is_none() {
        ui.timeline.set_pending(query);
    }
    ui.scroll_from_bottom = 0;
}

pub(crate) async fn complete_turn<P: LlmProvider>(
    state: &mut AppState<P>,
    ui: &mut UiState,
    query: &str,
) {
    let transcript = std::mem::take(&mut state.transcript);
    state.transcript = state.controller.handle_turn(transcript, query).await;
    ui.timeline.clear_pending();
    ui.scroll_from_bottom = 0;
}

pub(crate) fn handle_mouse(ui: &mut UiState, mouse: MouseEvent) {
    if !ui
        .timeline_area
        .contains(Position::new(mouse.column, mouse.row))
    {
        return;
    }
    match mouse.kind {
        MouseEventKind::ScrollUp => {
            ui.scroll_from_bottom = ui
                .scroll_from_bottom
                .saturating_add(MOUSE_SCROLL_STEP)
                .min(ui.max_scroll);
        }
        MouseEventKind::ScrollDown => {
            ui.scroll_from_bottom = ui.scroll_from_bottom.saturating_sub(MOUSE_SCROLL_STEP);
        }
        _ => {}
    }
}

pub(crate) fn compute_regions(area: Rect, ui: &UiState, datasets: &Datasets) -> UiRegions {
    let mut constraints = vec![Constraint::Length(1)];
    if ui.show_students {
        constraints.push(Constraint::Length(panel_height(datasets.students.table())));
    }
    if ui.show_courses {
        constraints.push(Constraint::Length(panel_height(datasets.courses.table())));
    }
    constraints.extend([
        Constraint::Min(3),
        Constraint::Length(3),
        Constraint::Length(1),
    ]);

    let chunks = Layout::vertical(constraints).split(area);
    let mut next = 1;
    let mut students = None;
    if ui.show_students {
        students = Some(chunks[next]);
        next += 1;
    }
    let mut courses = None;
    if ui.show_courses {
        courses = Some(chunks[next]);
        next += 1;
    }

    UiRegions {
        title: chunks[0],
        students,
        courses,
        timeline: chunks[next],
        input: chunks[next + 1],
        status: chunks[next + 2],
    }
}

// Header row plus borders, capped so the conversation keeps most of the screen.
fn panel_height(table: &Table) -> u16 {
    u16::try_from(table.len())
        .unwrap_or(u16::MAX)
        .saturating_add(3)
        .min(PANEL_MAX_HEIGHT)
}

pub(crate) fn render<P: LlmProvider>(
    frame: &mut Frame,
    state: &AppState<P>,
    ui: &mut UiState,
    theme: &Theme,
) {
    let regions = compute_regions(frame.area(), ui, state.controller.datasets());

    frame.render_widget(
        Paragraph::new(Span::styled(APP_TITLE, theme.style(ThemeToken::Title))),
        regions.title,
    );
    let datasets = state.controller.datasets();
    if let Some(area) = regions.students {
        render_table(frame, area, STUDENTS_TITLE, datasets.students.table(), theme);
    }
    if let Some(area) = regions.courses {
        render_table(frame, area, COURSES_TITLE, datasets.courses.table(), theme);
    }
    render_timeline(frame, regions.timeline, state, ui, theme);
    render_input(frame, regions.input, ui, theme);
    render_status(frame, regions.status, state, theme);
}

fn render_table(frame: &mut Frame, area: Rect, title: &str, table: &Table, theme: &Theme) {
    let header = Row::new(
        table
            .columns()
            .iter()
            .map(|column| Cell::from(column.clone())),
    )
    .style(theme.style(ThemeToken::TableHeader));
    let rows = table.rows().iter().map(|row| {
        Row::new(
            row.iter()
                .map(|cell| Cell::from(cell.clone().unwrap_or_default())),
        )
        .style(theme.style(ThemeToken::TableCell))
    });
    let widths = vec![Constraint::Fill(1); table.columns().len()];

    let widget = TableWidget::new(rows, widths).header(header).block(
        Block::bordered().title(Span::styled(
            title.to_string(),
            theme.style(ThemeToken::PanelTitle),
        )),
    );
    frame.render_widget(widget, area);
}

fn render_timeline<P: LlmProvider>(
    frame: &mut Frame,
    area: Rect,
    state: &AppState<P>,
    ui: &mut UiState,
    theme: &Theme,
) {
    let block = Block::bordered().title(Span::styled(
        CONVERSATION_TITLE,
        theme.style(ThemeToken::PanelTitle),
    ));
    let inner = block.inner(area);
    ui.timeline_area = area;
    let lines = ui.timeline.render_lines(&state.transcript, theme);

    let total: usize = lines
        .iter()
        .map(|line| wrapped_height(line, inner.width))
        .sum();
    let max_scroll = total.saturating_sub(usize::from(inner.height));
    ui.max_scroll = u16::try_from(max_scroll).unwrap_or(u16::MAX);
    ui.scroll_from_bottom = ui.scroll_from_bottom.min(ui.max_scroll);
    ui.page_size = (inner.height / 2).max(1);
    let offset = ui.max_scroll - ui.scroll_from_bottom;

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((offset, 0));
    frame.render_widget(paragraph, area);
}

fn wrapped_height(line: &Line<'_>, width: u16) -> usize {
    let width = usize::from(width.max(1));
    let text: String = line.spans.iter().map(|span| &*span.content).collect();

    let mut rows = 1;
    let mut used = 0;
    for word in text.split(' ') {
        let word_width = Span::raw(word).width();
        let needed = if used == 0 {
            word_width
        } else {
            used + 1 + word_width
        };
        if needed <= width {
            used = needed;
            continue;
        }
        if used > 0 {
            rows += 1;
        }
        used = word_width;
        while used > width {
            rows += 1;
            used -= width;
        }
    }
    rows
}

fn render_input(frame: &mut Frame, area: Rect, ui: &UiState, theme: &Theme) {
    let block = Block::bordered()
        .title(Span::styled(INPUT_TITLE, theme.style(ThemeToken::PanelTitle)))
        .border_style(theme.style(ThemeToken::InputBlock));
    let inner = block.inner(area);

    let before_cursor: String = ui.input.chars().take(ui.cursor).collect();
    let cursor_col = Span::raw(PROMPT).width() + Span::raw(before_cursor.as_str()).width();
    let h_scroll = (cursor_col + 1).saturating_sub(usize::from(inner.width));

    let line = Line::from(vec![
        Span::styled(PROMPT, theme.style(ThemeToken::Prompt)),
        Span::styled(ui.input.clone(), theme.style(ThemeToken::UserText)),
    ]);
    frame.render_widget(
        Paragraph::new(line)
            .block(block)
            .scroll((0, to_u16(h_scroll))),
        area,
    );

    if inner.width > 0 && inner.height > 0 {
        let x = inner.x.saturating_add(to_u16(cursor_col - h_scroll));
        frame.set_cursor_position(Position::new(x, inner.y));
    }
}

fn render_status<P: LlmProvider>(frame: &mut Frame, area: Rect, state: &AppState<P>, theme: &Theme) {
    let mut spans = vec![Span::styled(
        format!("{STATUS_HINTS} | sessão {}", state.session_id),
        theme.style(ThemeToken::Status),
    )];
    if let Some(failure) = state.trace.write_failure() {
        spans.push(Span::styled(
            format!(" | trace indisponível: {failure}"),
            theme.style(ThemeToken::SystemError),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn byte_index(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map_or(text.len(), |(index, _)| index)
}

fn to_u16(value: usize) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}
