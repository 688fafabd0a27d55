use anyhow::Result;
use escola_chat::cli::test_support::{
    DETERMINISTIC_REPLY, UiHarness, app_state_with_provider,
};
use escola_chat::llm::stub::ScriptedProvider;
use escola_chat::llm::{ChatTurn, LlmError};

use crate::ui_rendering::common::{
    input_snapshot, lines_text, new_harness, status_snapshot, submit_line, timeline_snapshot,
};

const WAITING: &str = "Consultando o assistente...";

#[tokio::test]
async fn first_screen_shows_title_intro_and_input_box() -> Result<()> {
    let harness = new_harness("ui-first-screen", 100, 30)?;

    let screen = harness.buffer_lines().join("\n");
    assert!(screen.contains("Chat - Escola Tecnologia para Todos"));

    let timeline = timeline_snapshot(&harness)?;
    assert!(timeline.contains("Bem-vindo(a) à nossa escola!"));
    assert!(timeline.contains("- Computação em Nuvem AWS"));
    assert!(timeline.contains("converse com nosso assistente virtual."));

    let input = input_snapshot(&harness)?;
    assert!(input.contains("Digite sua pergunta aqui"));
    assert!(input.contains("> "));

    let status = status_snapshot(&harness)?;
    assert!(status.contains("F2 alunos"));
    assert!(status.contains("sessão ui-first-screen"));

    Ok(())
}

#[tokio::test]
async fn known_question_is_answered_from_the_datasets_without_waiting() -> Result<()> {
    let mut harness = new_harness("ui-rule-answer", 100, 30)?;

    submit_line(&mut harness, "Quais cursos vocês oferecem?").await?;

    let pending = harness.pending_frame().expect("frame drawn before the answer");
    assert!(!pending.iter().any(|line| line.contains(WAITING)));

    let timeline = timeline_snapshot(&harness)?;
    assert!(timeline.contains("Você: Quais cursos vocês oferecem?"));
    assert!(timeline.contains("Assistente: Nós oferecemos os seguintes cursos gratuitos e online:"));
    assert!(timeline.contains("- DevOps com AWS"));
    assert!(timeline.contains("- Metodologias Ágeis e Soft Skills"));
    assert!(harness.provider().calls().is_empty());
    assert_eq!(harness.transcript().len(), 2);

    Ok(())
}

#[tokio::test]
async fn model_question_shows_waiting_line_until_the_reply_arrives() -> Result<()> {
    let mut harness = new_harness("ui-model-answer", 100, 30)?;

    submit_line(&mut harness, "Qual o horário das aulas?").await?;

    let pending = harness.pending_frame().expect("frame drawn before the answer");
    let regions = harness.regions()?;
    let pending_timeline = lines_text(pending, regions.timeline);
    assert!(pending_timeline.contains("Você: Qual o horário das aulas?"));
    assert!(pending_timeline.contains(WAITING));

    let timeline = timeline_snapshot(&harness)?;
    assert!(timeline.contains(DETERMINISTIC_REPLY));
    assert!(!timeline.contains(WAITING));
    assert!(!harness.ui_state_view().waiting);
    assert_eq!(
        harness.provider().calls(),
        vec![vec![ChatTurn::user("Qual o horário das aulas?")]]
    );

    Ok(())
}

#[tokio::test]
async fn model_failure_is_shown_as_the_assistant_reply() -> Result<()> {
    let provider = ScriptedProvider::new(vec![
        Err(LlmError::Transport("connection refused".to_string())),
        Ok("Voltei!".to_string()),
    ]);
    let state = app_state_with_provider("ui-model-error", provider)?;
    let mut harness = UiHarness::new(100, 30, state)?;
    harness.render()?;

    submit_line(&mut harness, "bom dia").await?;
    submit_line(&mut harness, "tudo bem?").await?;

    let timeline = timeline_snapshot(&harness)?;
    assert!(timeline.contains(
        "Assistente: Erro ao chamar o modelo: provider transport error: connection refused"
    ));
    assert!(timeline.contains("Assistente: Voltei!"));
    assert_eq!(harness.transcript().len(), 4);

    Ok(())
}
