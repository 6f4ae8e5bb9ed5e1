pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use ratatui::prelude::*;
use ratatui::widgets::{ListState, Paragraph};

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  let title = app.title().to_string();
  let host = app.host().to_string();
  let breadcrumb = app.breadcrumb();
  renderfns::draw_header(frame, chunks[0], &title, &host, &breadcrumb);

  if let Some(view) = app.current_view_mut() {
    view.render(frame, chunks[1]);
  }

  draw_footer(frame, chunks[2], app);

  // Command palette overlays the content area
  app.command_mut().render_overlay(frame, chunks[1]);
}

fn draw_footer(frame: &mut Frame, area: Rect, app: &App) {
  let mut spans = Vec::new();
  for shortcut in app.current_shortcuts() {
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(
      format!(" {}   ", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
  }
  spans.push(Span::styled("<Ctrl-C>", Style::default().fg(Color::Cyan)));
  spans.push(Span::styled(" quit", Style::default().fg(Color::DarkGray)));

  frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Clamp a list selection to the current row count, selecting the first
/// row once data arrives.
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  if len == 0 {
    state.select(None);
    return;
  }
  match state.selected() {
    Some(selected) if selected >= len => state.select(Some(len - 1)),
    None => state.select(Some(0)),
    _ => {}
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_ensure_valid_selection_empty_list() {
    let mut state = ListState::default();
    state.select(Some(3));
    ensure_valid_selection(&mut state, 0);
    assert_eq!(state.selected(), None);
  }

  #[test]
  fn test_ensure_valid_selection_clamps() {
    let mut state = ListState::default();
    state.select(Some(9));
    ensure_valid_selection(&mut state, 4);
    assert_eq!(state.selected(), Some(3));
  }

  #[test]
  fn test_ensure_valid_selection_defaults_to_first() {
    let mut state = ListState::default();
    ensure_valid_selection(&mut state, 4);
    assert_eq!(state.selected(), Some(0));
  }
}
