use anyhow::Result;
use crossterm::event::KeyCode;
use std::fs;

use crate::ui_rendering::common::{
    input_snapshot, new_harness, press, press_ctrl, submit_line, timeline_snapshot, type_text,
};

#[tokio::test]
async fn typing_and_editing_updates_the_input_box() -> Result<()> {
    let mut harness = new_harness("ui-editing", 100, 24)?;

    type_text(&mut harness, "olá").await?;
    press(&mut harness, KeyCode::Left).await?;
    press(&mut harness, KeyCode::Backspace).await?;

    let view = harness.ui_state_view();
    assert_eq!(view.input, "oá");
    assert_eq!(view.cursor, 1);
    assert!(input_snapshot(&harness)?.contains("> oá"));

    press_ctrl(&mut harness, 'u').await?;
    assert_eq!(harness.ui_state_view().input, "");

    Ok(())
}

#[tokio::test]
async fn blank_enter_does_not_start_a_turn() -> Result<()> {
    let mut harness = new_harness("ui-blank", 100, 24)?;

    submit_line(&mut harness, "   ").await?;

    assert!(harness.transcript().is_empty());
    assert!(harness.provider().calls().is_empty());
    assert_eq!(harness.ui_state_view().input, "");

    Ok(())
}

#[tokio::test]
async fn slash_commands_print_notices_without_touching_the_transcript() -> Result<()> {
    let mut harness = new_harness("ui-commands", 100, 40)?;

    submit_line(&mut harness, "/help").await?;
    submit_line(&mut harness, "/trace").await?;
    submit_line(&mut harness, "/sair").await?;

    let timeline = timeline_snapshot(&harness)?;
    assert!(timeline.contains("Comandos disponíveis:"));
    assert!(timeline.contains("/alunos"));
    assert!(timeline.contains("Arquivo de trace:"));
    assert!(timeline.contains("comando desconhecido '/sair'. Tente /help"));
    assert!(harness.transcript().is_empty());
    assert!(harness.provider().calls().is_empty());

    let trace = fs::read_to_string(harness.trace().file_path())?;
    assert!(trace.contains("command /help"));
    assert!(trace.contains("command /sair"));

    Ok(())
}

#[tokio::test]
async fn escape_and_ctrl_c_end_the_session() -> Result<()> {
    let mut harness = new_harness("ui-exit-esc", 100, 24)?;
    press(&mut harness, KeyCode::Esc).await?;
    assert!(harness.ui_state_view().should_exit);

    let mut harness = new_harness("ui-exit-ctrl-c", 100, 24)?;
    press_ctrl(&mut harness, 'c').await?;
    assert!(harness.ui_state_view().should_exit);

    Ok(())
}
