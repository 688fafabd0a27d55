use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use escola_chat::cli::test_support::{UiHarness, deterministic_app_state};
use ratatui::layout::Rect;

pub fn new_harness(session_id: &str, width: u16, height: u16) -> Result<UiHarness> {
    let state = deterministic_app_state(session_id)?;
    let mut harness = UiHarness::new(width, height, state)?;
    harness.render()?;
    Ok(harness)
}

pub async fn type_text(harness: &mut UiHarness, text: &str) -> Result<()> {
    for ch in text.chars() {
        harness
            .send_key(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::NONE))
            .await?;
    }
    Ok(())
}

pub async fn submit_line(harness: &mut UiHarness, line: &str) -> Result<()> {
    type_text(harness, line).await?;
    press(harness, KeyCode::Enter).await
}

pub async fn press(harness: &mut UiHarness, code: KeyCode) -> Result<()> {
    harness
        .send_key(KeyEvent::new(code, KeyModifiers::NONE))
        .await
}

pub async fn press_ctrl(harness: &mut UiHarness, ch: char) -> Result<()> {
    harness
        .send_key(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL))
        .await
}

pub fn scroll_up(harness: &mut UiHarness, column: u16, row: u16) -> Result<()> {
    harness.send_mouse(MouseEvent {
        kind: MouseEventKind::ScrollUp,
        column,
        row,
        modifiers: KeyModifiers::NONE,
    })
}

pub fn scroll_down(harness: &mut UiHarness, column: u16, row: u16) -> Result<()> {
    harness.send_mouse(MouseEvent {
        kind: MouseEventKind::ScrollDown,
        column,
        row,
        modifiers: KeyModifiers::NONE,
    })
}

pub fn normalized_text(text: &str) -> String {
    text.replace("\r\n", "\n")
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn lines_text(lines: &[String], area: Rect) -> String {
    let start_row = usize::from(area.y);
    let end_row = start_row.saturating_add(usize::from(area.height));

    let mut rendered = Vec::new();
    for line in lines.iter().take(end_row.min(lines.len())).skip(start_row) {
        let clipped = line
            .chars()
            .skip(usize::from(area.x))
            .take(usize::from(area.width))
            .collect::<String>();
        rendered.push(clipped);
    }

    normalized_text(&rendered.join("\n"))
}

pub fn region_text(harness: &UiHarness, area: Rect) -> String {
    lines_text(&harness.buffer_lines(), area)
}

pub fn timeline_snapshot(harness: &UiHarness) -> Result<String> {
    let regions = harness.regions()?;
    Ok(region_text(harness, regions.timeline))
}

pub fn input_snapshot(harness: &UiHarness) -> Result<String> {
    let regions = harness.regions()?;
    Ok(region_text(harness, regions.input))
}

pub fn status_snapshot(harness: &UiHarness) -> Result<String> {
    let regions = harness.regions()?;
    Ok(region_text(harness, regions.status))
}
