use anyhow::Result;
use crossterm::event::KeyCode;

use crate::ui_rendering::common::{
    new_harness, press, region_text, scroll_down, scroll_up, submit_line, timeline_snapshot,
};

#[tokio::test]
async fn function_keys_toggle_the_students_table() -> Result<()> {
    let mut harness = new_harness("ui-students", 100, 30)?;
    assert_eq!(harness.regions()?.students, None);

    press(&mut harness, KeyCode::F(2)).await?;
    let students = harness.regions()?.students.expect("students panel");
    let text = region_text(&harness, students);
    assert!(text.contains("Alunos"));
    assert!(text.contains("name"));
    assert!(text.contains("Ana Souza"));
    assert!(text.contains("Bruno Lima"));
    assert!(text.contains("Nordeste"));

    press(&mut harness, KeyCode::F(2)).await?;
    assert_eq!(harness.regions()?.students, None);
    assert!(!harness.ui_state_view().show_students);

    Ok(())
}

#[tokio::test]
async fn courses_command_shows_the_courses_table() -> Result<()> {
    let mut harness = new_harness("ui-courses", 100, 30)?;

    submit_line(&mut harness, "/cursos").await?;

    assert!(harness.ui_state_view().show_courses);
    let courses = harness.regions()?.courses.expect("courses panel");
    let text = region_text(&harness, courses);
    assert!(text.contains("Cursos"));
    assert!(text.contains("duration_weeks"));
    assert!(text.contains("DevOps com AWS"));
    assert!(text.contains("intermediário"));
    assert!(harness.transcript().is_empty());

    Ok(())
}

#[tokio::test]
async fn page_keys_scroll_the_conversation() -> Result<()> {
    let mut harness = new_harness("ui-page-scroll", 80, 20)?;
    for i in 0..8 {
        submit_line(&mut harness, &format!("pergunta {i}")).await?;
    }

    let bottom = timeline_snapshot(&harness)?;
    assert!(bottom.contains("pergunta 7"));
    assert!(!bottom.contains("Bem-vindo(a)"));

    for _ in 0..30 {
        press(&mut harness, KeyCode::PageUp).await?;
    }
    assert!(harness.ui_state_view().scroll_from_bottom > 0);
    let top = timeline_snapshot(&harness)?;
    assert!(top.contains("Bem-vindo(a)"));
    assert!(!top.contains("pergunta 7"));

    for _ in 0..30 {
        press(&mut harness, KeyCode::PageDown).await?;
    }
    assert_eq!(harness.ui_state_view().scroll_from_bottom, 0);
    assert!(timeline_snapshot(&harness)?.contains("pergunta 7"));

    Ok(())
}

#[tokio::test]
async fn mouse_wheel_only_scrolls_inside_the_conversation() -> Result<()> {
    let mut harness = new_harness("ui-mouse-scroll", 80, 20)?;
    for i in 0..8 {
        submit_line(&mut harness, &format!("pergunta {i}")).await?;
    }
    let regions = harness.regions()?;

    scroll_up(&mut harness, regions.input.x + 1, regions.input.y + 1)?;
    assert_eq!(harness.ui_state_view().scroll_from_bottom, 0);

    scroll_up(&mut harness, regions.timeline.x + 1, regions.timeline.y + 1)?;
    assert_eq!(harness.ui_state_view().scroll_from_bottom, 3);

    scroll_down(&mut harness, regions.status.x + 1, regions.status.y)?;
    assert_eq!(harness.ui_state_view().scroll_from_bottom, 3);

    scroll_down(&mut harness, regions.timeline.x + 1, regions.timeline.y + 1)?;
    assert_eq!(harness.ui_state_view().scroll_from_bottom, 0);

    Ok(())
}

#[tokio::test]
async fn new_questions_jump_back_to_the_latest_turn() -> Result<()> {
    let mut harness = new_harness("ui-scroll-reset", 80, 20)?;
    for i in 0..6 {
        submit_line(&mut harness, &format!("pergunta {i}")).await?;
    }
    press(&mut harness, KeyCode::PageUp).await?;
    assert!(harness.ui_state_view().scroll_from_bottom > 0);

    submit_line(&mut harness, "última pergunta").await?;

    assert_eq!(harness.ui_state_view().scroll_from_bottom, 0);
    assert!(timeline_snapshot(&harness)?.contains("última pergunta"));

    Ok(())
}
