#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    Help,
    Trace,
    Students,
    Courses,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParseError {
    message: String,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub(crate) fn message(&self) -> &str {
        &self.message
    }
}

pub(crate) const HELP_TEXT: &str = "Comandos disponíveis:\n  /help     Mostra esta lista\n  /trace    Mostra o arquivo de trace desta sessão\n  /alunos   Mostra ou esconde a tabela de alunos (F2)\n  /cursos   Mostra ou esconde a tabela de cursos (F3)\nEnter envia a pergunta. PageUp/PageDown rolam a conversa. Esc sai.";

pub(crate) fn parse_command(line: &str) -> Result<Command, ParseError> {
    if !is_command_line(line) {
        return Err(ParseError::new("not a command"));
    }

    let trimmed = line.trim();
    let mut parts = trimmed[1..].splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or("").to_lowercase();
    if name.is_empty() {
        return Err(ParseError::new("comando vazio. Tente /help"));
    }
    let rest = parts.next().map(str::trim).unwrap_or("");

    let command = match name.as_str() {
        "help" | "ajuda" => Command::Help,
        "trace" => Command::Trace,
        "alunos" => Command::Students,
        "cursos" => Command::Courses,
        _ => {
            return Err(ParseError::new(format!(
                "comando desconhecido '/{name}'. Tente /help"
            )));
        }
    };

    if rest.is_empty() {
        Ok(command)
    } else {
        Err(ParseError::new(format!("uso: /{name}")))
    }
}

pub(crate) fn is_command_line(line: &str) -> bool {
    line.trim_start().starts_with('/')
}
