use crate::chat::{ChatController, Transcript};
use crate::cli::app::{
    AppState, KeyOutcome, UiRegions, UiState, begin_turn, complete_turn, compute_regions,
    handle_key, handle_mouse, render,
};
use crate::cli::theme::Theme;
use crate::config::ThemeConfig;
use crate::data::Datasets;
use crate::llm::gateway::ModelGateway;
use crate::llm::stub::ScriptedProvider;
use crate::trace::SessionTrace;
use anyhow::Result;
use crossterm::event::{KeyEvent, MouseEvent};
use ratatui::Terminal;
use ratatui::backend::TestBackend;
use ratatui::layout::Rect;

pub const SAMPLE_STUDENTS_CSV: &str = "name,current_job,region,course\n\
    Ana Souza,Desenvolvedora Front-End,Nordeste,Front-End\n\
    Bruno Lima,,Sul,DevOps com AWS\n\
    Carla Dias,Analista de Dados,Sudeste,Banco de Dados\n";

pub const SAMPLE_COURSES_CSV: &str = "course_name,duration_weeks,level\n\
    Computação em Nuvem AWS,10,básico\n\
    DevOps com AWS,8,intermediário\n\
    Banco de Dados,6,básico\n\
    Metodologias Ágeis e Soft Skills,4,todos\n";

pub const DETERMINISTIC_REPLY: &str = "Resposta do assistente de testes.";

pub struct UiHarness {
    terminal: Terminal<TestBackend>,
    state: AppState<ScriptedProvider>,
    ui: UiState,
    theme: Theme,
    pending_frame: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiStateView {
    pub input: String,
    pub cursor: usize,
    pub show_students: bool,
    pub show_courses: bool,
    pub waiting: bool,
    pub scroll_from_bottom: u16,
    pub should_exit: bool,
}

impl UiHarness {
    pub fn new(width: u16, height: u16, state: AppState<ScriptedProvider>) -> Result<Self> {
        let terminal = Terminal::new(TestBackend::new(width, height))?;
        Ok(Self {
            terminal,
            state,
            ui: UiState::default(),
            theme: Theme::new(false),
            pending_frame: None,
        })
    }

    pub fn render(&mut self) -> Result<()> {
        self.terminal
            .draw(|frame| render(frame, &self.state, &mut self.ui, &self.theme))?;
        Ok(())
    }

    pub async fn send_key(&mut self, key: KeyEvent) -> Result<()> {
        if let KeyOutcome::Submit(query) = handle_key(&self.state, &mut self.ui, key) {
            begin_turn(&mut self.ui, &query);
            self.render()?;
            self.pending_frame = Some(self.buffer_lines());
            complete_turn(&mut self.state, &mut self.ui, &query).await;
        }
        self.render()
    }

    pub fn send_mouse(&mut self, mouse: MouseEvent) -> Result<()> {
        handle_mouse(&mut self.ui, mouse);
        self.render()
    }

    pub fn buffer_lines(&self) -> Vec<String> {
        let buffer = self.terminal.backend().buffer();
        let area = buffer.area;
        (area.top()..area.bottom())
            .map(|y| {
                (area.left()..area.right())
                    .map(|x| buffer[(x, y)].symbol())
                    .collect::<String>()
            })
            .collect()
    }

    /// Screen as it looked while the last submitted question was in flight.
    pub fn pending_frame(&self) -> Option<&[String]> {
        self.pending_frame.as_deref()
    }

    pub fn regions(&self) -> Result<UiRegions> {
        let size = self.terminal.size()?;
        Ok(compute_regions(
            Rect::new(0, 0, size.width, size.height),
            &self.ui,
            self.state.controller.datasets(),
        ))
    }

    pub fn ui_state_view(&self) -> UiStateView {
        UiStateView {
            input: self.ui.input.clone(),
            cursor: self.ui.cursor,
            show_students: self.ui.show_students,
            show_courses: self.ui.show_courses,
            waiting: self.ui.timeline.pending().is_some(),
            scroll_from_bottom: self.ui.scroll_from_bottom,
            should_exit: self.ui.should_exit,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.state.transcript
    }

    pub fn provider(&self) -> &ScriptedProvider {
        self.state.controller.gateway().provider()
    }

    pub fn trace(&self) -> &SessionTrace {
        &self.state.trace
    }
}

pub fn deterministic_app_state(session_id: &str) -> Result<AppState<ScriptedProvider>> {
    app_state_with_provider(
        session_id,
        ScriptedProvider::default().with_default_reply(DETERMINISTIC_REPLY),
    )
}

pub fn app_state_with_provider(
    session_id: &str,
    provider: ScriptedProvider,
) -> Result<AppState<ScriptedProvider>> {
    let trace_dir = std::env::temp_dir().join("escola-chat-ui-tests");
    let trace = SessionTrace::create_in_temp_dir(session_id, &trace_dir)?;
    let datasets = Datasets::from_csv_strs(SAMPLE_STUDENTS_CSV, SAMPLE_COURSES_CSV)?;
    let gateway = ModelGateway::new(provider).with_trace(trace.clone());
    let controller = ChatController::new(datasets, gateway).with_trace(trace.clone());

    Ok(AppState::new(
        session_id.to_string(),
        controller,
        ThemeConfig::default(),
        trace,
    ))
}
