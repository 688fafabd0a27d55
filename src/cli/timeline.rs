use crate::chat::Transcript;
use crate::cli::theme::Theme;
use crate::config::ThemeToken;
use crate::llm::provider::{ChatRole, ChatTurn};
use ratatui::text::{Line, Span};

pub(crate) const USER_LABEL: &str = "👤 Você: ";
pub(crate) const ASSISTANT_LABEL: &str = "🤖 Assistente: ";
pub(crate) const WAITING_TEXT: &str = "Consultando o assistente...";

pub(crate) const INTRO_TEXT: &str = "💬 Bem-vindo(a) à nossa escola!\nEsta é uma iniciativa social que oferece cursos 100% gratuitos e online para pessoas em situação de vulnerabilidade social, com foco em:\n\n- Computação em Nuvem AWS\n- Front-End, Back-End\n- Banco de Dados, DevOps\n- Metodologias Ágeis & Soft Skills\n- Empregabilidade com casos reais de sucesso!\n\nDigite sua pergunta abaixo e converse com nosso assistente virtual. 👇";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NoticeKind {
    Info,
    Error,
}

/// UI-only line (command output, warnings). Anchored to the transcript
/// length at the time it was added so it renders between the right turns.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Notice {
    anchor: usize,
    kind: NoticeKind,
    text: String,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Timeline {
    notices: Vec<Notice>,
    pending: Option<String>,
}

impl Timeline {
    pub(crate) fn push_notice(&mut self, transcript: &Transcript, kind: NoticeKind, text: &str) {
        self.notices.push(Notice {
            anchor: transcript.len(),
            kind,
            text: text.to_string(),
        });
    }

    pub(crate) fn set_pending(&mut self, query: &str) {
        self.pending = Some(query.to_string());
    }

    pub(crate) fn clear_pending(&mut self) {
        self.pending = None;
    }

    #[cfg(any(test, feature = "test-support"))]
    pub(crate) fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    pub(crate) fn render_lines(&self, transcript: &Transcript, theme: &Theme) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        for text_line in INTRO_TEXT.lines() {
            lines.push(Line::from(Span::styled(
                text_line.to_string(),
                theme.style(ThemeToken::Intro),
            )));
        }

        let mut notices = self.notices.iter().peekable();
        for (index, turn) in transcript.turns().iter().enumerate() {
            while let Some(notice) = notices.next_if(|notice| notice.anchor <= index) {
                render_notice(notice, theme, &mut lines);
            }
            render_turn(turn, theme, &mut lines);
        }
        for notice in notices {
            render_notice(notice, theme, &mut lines);
        }

        if let Some(query) = &self.pending {
            lines.push(Line::from(""));
            push_labeled(
                &mut lines,
                theme,
                (USER_LABEL, ThemeToken::UserLabel),
                (query.as_str(), ThemeToken::UserText),
            );
            lines.push(Line::from(Span::styled(
                WAITING_TEXT,
                theme.style(ThemeToken::AssistantWaiting),
            )));
        }

        lines
    }
}

fn render_turn(turn: &ChatTurn, theme: &Theme, lines: &mut Vec<Line<'static>>) {
    match turn.role {
        ChatRole::User => {
            lines.push(Line::from(""));
            push_labeled(
                lines,
                theme,
                (USER_LABEL, ThemeToken::UserLabel),
                (turn.content.as_str(), ThemeToken::UserText),
            );
        }
        ChatRole::Assistant => push_labeled(
            lines,
            theme,
            (ASSISTANT_LABEL, ThemeToken::AssistantLabel),
            (turn.content.as_str(), ThemeToken::AssistantText),
        ),
        ChatRole::System => {}
    }
}

// The label goes on the first line; continuation lines are left flush so
// bullet lists from the answers stay readable.
fn push_labeled(
    lines: &mut Vec<Line<'static>>,
    theme: &Theme,
    (label, label_token): (&'static str, ThemeToken),
    (text, text_token): (&str, ThemeToken),
) {
    let mut text_lines = split_output_lines(text).into_iter();
    lines.push(Line::from(vec![
        Span::styled(label, theme.style(label_token)),
        Span::styled(
            text_lines.next().unwrap_or_default().to_string(),
            theme.style(text_token),
        ),
    ]));
    for line in text_lines {
        lines.push(Line::from(Span::styled(
            line.to_string(),
            theme.style(text_token),
        )));
    }
}

fn render_notice(notice: &Notice, theme: &Theme, lines: &mut Vec<Line<'static>>) {
    let token = match notice.kind {
        NoticeKind::Info => ThemeToken::SystemInfo,
        NoticeKind::Error => ThemeToken::SystemError,
    };
    for line in split_output_lines(&notice.text) {
        lines.push(Line::from(Span::styled(line.to_string(), theme.style(token))));
    }
}

fn split_output_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }

    text.lines().collect()
}
