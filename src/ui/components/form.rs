use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Events emitted by a form overlay that the parent view handles
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
  /// Enter pressed: field values in declaration order. The form stays
  /// open; the parent closes it once the mutation succeeds.
  Submitted(Vec<String>),
  /// Escape pressed, form dismissed
  Cancelled,
}

struct FormField {
  label: &'static str,
  required: bool,
  input: TextInput,
}

/// Modal multi-field form (new meeting, new contact).
///
/// Tab/Down move focus forward, Shift-Tab/Up backward, Enter submits from
/// any field. Validation errors set by the parent keep the form open with
/// the message inline, so a failed mutation can be corrected and retried.
pub struct FormOverlay {
  title: &'static str,
  fields: Vec<FormField>,
  focused: usize,
  active: bool,
  error: Option<String>,
}

impl FormOverlay {
  /// Fields are (label, required) pairs.
  pub fn new(title: &'static str, fields: &[(&'static str, bool)]) -> Self {
    Self {
      title,
      fields: fields
        .iter()
        .map(|(label, required)| FormField {
          label,
          required: *required,
          input: TextInput::new(),
        })
        .collect(),
      focused: 0,
      active: false,
      error: None,
    }
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Open with cleared fields.
  pub fn open(&mut self) {
    for field in &mut self.fields {
      field.input.clear();
    }
    self.focused = 0;
    self.error = None;
    self.active = true;
  }

  pub fn close(&mut self) {
    self.active = false;
    self.error = None;
  }

  /// Show a validation failure inline, keeping the input intact.
  pub fn set_error(&mut self, message: String) {
    self.error = Some(message);
  }

  pub fn values(&self) -> Vec<String> {
    self
      .fields
      .iter()
      .map(|f| f.input.value().trim().to_string())
      .collect()
  }

  /// Handle a key event while active. Inactive forms never consume keys.
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FormEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Esc => {
        self.close();
        return KeyResult::Event(FormEvent::Cancelled);
      }
      KeyCode::Enter => {
        // Local required-field check before the parent runs the mutation.
        for field in &self.fields {
          if field.required && field.input.value().trim().is_empty() {
            self.error = Some(format!("{} is required", field.label));
            return KeyResult::Handled;
          }
        }
        self.error = None;
        return KeyResult::Event(FormEvent::Submitted(self.values()));
      }
      KeyCode::Tab | KeyCode::Down => {
        self.focused = (self.focused + 1) % self.fields.len();
        return KeyResult::Handled;
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.focused = if self.focused == 0 {
          self.fields.len() - 1
        } else {
          self.focused - 1
        };
        return KeyResult::Handled;
      }
      _ => {}
    }

    match self.fields[self.focused].input.handle_key(key) {
      InputResult::Consumed => {
        self.error = None;
        KeyResult::Handled
      }
      // Enter/Esc are intercepted above; nothing else reaches here.
      InputResult::Submitted(_) | InputResult::Cancelled => KeyResult::Handled,
      InputResult::NotHandled => KeyResult::Handled,
    }
  }

  /// Render the form as a centered overlay if active.
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let width = (area.width * 70 / 100).clamp(40, 70);
    let height = (self.fields.len() as u16 + 4).min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let overlay_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title));

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    let mut lines: Vec<Line> = Vec::new();
    for (i, field) in self.fields.iter().enumerate() {
      let marker = if field.required { "*" } else { " " };
      let label_style = if i == self.focused {
        Style::default().fg(Color::Yellow).bold()
      } else {
        Style::default().fg(Color::DarkGray)
      };
      let mut spans = vec![
        Span::styled(format!("{:>14}{} ", field.label, marker), label_style),
        Span::raw(field.input.value().to_string()),
      ];
      if i == self.focused {
        spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
      }
      lines.push(Line::from(spans));
    }

    lines.push(Line::default());
    match &self.error {
      Some(error) => lines.push(Line::styled(
        error.clone(),
        Style::default().fg(Color::Red),
      )),
      None => lines.push(Line::styled(
        "Enter: submit  Tab: next field  Esc: cancel",
        Style::default().fg(Color::DarkGray),
      )),
    }

    frame.render_widget(Paragraph::new(lines), inner);
  }
}
