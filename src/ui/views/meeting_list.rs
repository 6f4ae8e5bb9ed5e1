use crate::api::keys;
use crate::api::types::{BriefOptions, Meeting, MeetingDraft};
use crate::api::{ApiClient, BriefReceipt};
use crate::store::{
  CacheStore, InvalidationRule, Mutation, MutationRunner, MutationState, QueryBinder, QueryStatus,
};
use crate::ui::components::{FormEvent, FormOverlay, KeyResult};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{fmt_datetime, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::MeetingDetailView;
use chrono::{DateTime, NaiveDateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use tracing::info;

/// View for browsing meetings and triggering brief generation
pub struct MeetingListView {
  api: ApiClient,
  store: CacheStore,
  runner: MutationRunner,
  brief_options: BriefOptions,
  query: QueryBinder<Vec<Meeting>>,
  list_state: ListState,

  // One mutation per control; each is disabled while pending
  generate: Mutation<BriefReceipt>,
  generating_id: Option<String>,
  create: Mutation<Meeting>,
  delete: Mutation<()>,
  armed_delete: Option<String>,

  form: FormOverlay,
  status_line: Option<(String, Color)>,
}

impl MeetingListView {
  pub fn new(api: ApiClient, store: CacheStore, brief_options: BriefOptions) -> Self {
    let api_for_query = api.clone();
    let query = QueryBinder::bind(store.clone(), keys::meetings(), move || {
      let api = api_for_query.clone();
      async move { api.list_meetings(None).await }
    });

    Self {
      runner: MutationRunner::new(store.clone()),
      api,
      store,
      brief_options,
      query,
      list_state: ListState::default(),
      generate: Mutation::new(),
      generating_id: None,
      create: Mutation::new(),
      delete: Mutation::new(),
      armed_delete: None,
      form: FormOverlay::new(
        "New meeting",
        &[
          ("Title", true),
          ("Start (YYYY-MM-DD HH:MM)", true),
          ("End (YYYY-MM-DD HH:MM)", true),
          ("Participants", false),
          ("Description", false),
        ],
      ),
      status_line: None,
    }
  }

  fn selected(&self) -> Option<Meeting> {
    let meetings = self.query.data()?;
    meetings.get(self.list_state.selected()?).cloned()
  }

  fn generate_selected(&mut self) {
    let Some(meeting) = self.selected() else {
      return;
    };
    if meeting.has_brief {
      self.status_line = Some((
        format!("\"{}\" already has a brief", truncate(&meeting.title, 40)),
        Color::DarkGray,
      ));
      return;
    }
    if self.generate.is_pending() {
      return;
    }

    let api = self.api.clone();
    let id = meeting.id.clone();
    let options = self.brief_options;
    self.generating_id = Some(meeting.id);
    self.status_line = None;
    self.runner.run(
      &mut self.generate,
      async move { api.generate_brief(&id, &options).await },
      vec![
        InvalidationRule::Resource("meetings"),
        InvalidationRule::Resource("briefs"),
      ],
    );
  }

  fn delete_selected(&mut self) {
    let Some(meeting) = self.selected() else {
      return;
    };
    if self.delete.is_pending() {
      return;
    }

    if self.armed_delete.as_deref() == Some(meeting.id.as_str()) {
      let api = self.api.clone();
      let id = meeting.id.clone();
      self.armed_delete = None;
      self.status_line = None;
      self.runner.run(
        &mut self.delete,
        async move { api.delete_meeting(&id).await },
        vec![InvalidationRule::Resource("meetings")],
      );
    } else {
      self.status_line = Some((
        format!("press x again to delete \"{}\"", truncate(&meeting.title, 40)),
        Color::Red,
      ));
      self.armed_delete = Some(meeting.id);
    }
  }

  fn submit_create(&mut self, values: Vec<String>) {
    if self.create.is_pending() {
      return;
    }
    let draft = match parse_draft(&values) {
      Ok(draft) => draft,
      Err(message) => {
        self.form.set_error(message);
        return;
      }
    };

    let api = self.api.clone();
    self.runner.run(
      &mut self.create,
      async move { api.create_meeting(&draft).await },
      vec![InvalidationRule::Resource("meetings")],
    );
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let meetings = self.query.data();
    let rows: &[Meeting] = meetings.as_deref().map(Vec::as_slice).unwrap_or(&[]);
    ensure_valid_selection(&mut self.list_state, rows.len());

    let title = match self.query.status() {
      QueryStatus::Loading => " Meetings (loading...) ".to_string(),
      QueryStatus::Error => format!(
        " Meetings (error: {}) ",
        self.query.error().map(|e| e.to_string()).unwrap_or_default()
      ),
      _ => format!(" Meetings ({}) ", rows.len()),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if rows.is_empty() && !self.query.is_loading() {
      let content = if self.query.status() == QueryStatus::Error {
        "Failed to load meetings. Press 'r' to retry."
      } else {
        "No meetings found. Press 'n' to create one."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = rows
      .iter()
      .map(|meeting| {
        let brief_span =
          if self.generate.is_pending() && self.generating_id.as_deref() == Some(&meeting.id) {
            Span::styled("~ generating...", Style::default().fg(Color::Yellow))
          } else if meeting.has_brief {
            Span::styled("* brief", Style::default().fg(Color::Green))
          } else {
            Span::styled("-", Style::default().fg(Color::DarkGray))
          };

        let line = Line::from(vec![
          Span::styled(
            format!("{:<13}", fmt_datetime(meeting.start_time)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(" "),
          Span::raw(format!("{:<42}", truncate(&meeting.title, 40))),
          Span::styled(
            format!("{:>3}p  ", meeting.participants.len()),
            Style::default().fg(Color::DarkGray),
          ),
          brief_span,
        ]);
        ListItem::new(line)
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  fn render_status(&self, frame: &mut Frame, area: Rect) {
    let (text, color) = match &self.status_line {
      Some((message, color)) => (message.clone(), *color),
      None => (
        "g:generate brief  n:new  x:delete  r:refresh  Enter:detail".to_string(),
        Color::DarkGray,
      ),
    };
    frame.render_widget(
      Paragraph::new(text).style(Style::default().fg(color)),
      area,
    );
  }
}

impl View for MeetingListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.form.handle_key(key) {
      KeyResult::Handled => return ViewAction::None,
      KeyResult::Event(FormEvent::Submitted(values)) => {
        self.submit_create(values);
        return ViewAction::None;
      }
      KeyResult::Event(FormEvent::Cancelled) => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
        self.armed_delete = None;
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
        self.armed_delete = None;
      }
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('g') => self.generate_selected(),
      KeyCode::Char('n') => self.form.open(),
      KeyCode::Char('x') => self.delete_selected(),
      KeyCode::Enter => {
        if let Some(meeting) = self.selected() {
          return ViewAction::Push(Box::new(MeetingDetailView::new(
            meeting.id,
            meeting.title,
            self.api.clone(),
            self.store.clone(),
            self.brief_options,
          )));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(1), Constraint::Length(1)])
      .split(area);

    self.render_list(frame, chunks[0]);
    self.render_status(frame, chunks[1]);
    self.form.render_overlay(frame, chunks[0]);
  }

  fn breadcrumb_label(&self) -> String {
    "Meetings".to_string()
  }

  fn wants_text_input(&self) -> bool {
    self.form.is_active()
  }

  fn tick(&mut self) {
    self.query.poll();

    if self.generate.poll() {
      match self.generate.state() {
        MutationState::Success(receipt) => {
          info!(brief = %receipt.brief_id, at = %receipt.generated_at, "brief generated");
          self.status_line = Some((
            format!("brief generated: {}", receipt.title),
            Color::Green,
          ));
          self.generating_id = None;
        }
        MutationState::Error(error) => {
          self.status_line = Some((format!("generation failed: {}", error), Color::Red));
          self.generating_id = None;
        }
        _ => {}
      }
    }

    if self.create.poll() {
      match self.create.state() {
        MutationState::Success(meeting) => {
          self.status_line = Some((format!("created \"{}\"", meeting.title), Color::Green));
          self.form.close();
        }
        MutationState::Error(error) => {
          // Form stays open with the message; the control is live again.
          self.form.set_error(error.to_string());
        }
        _ => {}
      }
    }

    if self.delete.poll() {
      match self.delete.state() {
        MutationState::Success(()) => {
          self.status_line = Some(("meeting deleted".to_string(), Color::Green));
        }
        MutationState::Error(error) => {
          self.status_line = Some((format!("delete failed: {}", error), Color::Red));
        }
        _ => {}
      }
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("g", "generate"),
      ShortcutInfo::new("n", "new"),
      ShortcutInfo::new("x", "delete"),
      ShortcutInfo::new("r", "refresh"),
      ShortcutInfo::new("q", "back"),
    ]
  }
}

fn parse_local_time(s: &str) -> Option<DateTime<Utc>> {
  NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M")
    .ok()
    .map(|naive| naive.and_utc())
}

/// Build a draft from form values (title, start, end, participants,
/// description). Time parsing happens here; range and title checks are the
/// transport client's.
fn parse_draft(values: &[String]) -> Result<MeetingDraft, String> {
  let start_time = parse_local_time(&values[1])
    .ok_or_else(|| "start time must be YYYY-MM-DD HH:MM".to_string())?;
  let end_time = parse_local_time(&values[2])
    .ok_or_else(|| "end time must be YYYY-MM-DD HH:MM".to_string())?;

  let participants: Vec<String> = values[3]
    .split(',')
    .map(|email| email.trim().to_string())
    .filter(|email| !email.is_empty())
    .collect();

  let description = if values[4].is_empty() {
    None
  } else {
    Some(values[4].clone())
  };

  Ok(MeetingDraft {
    title: values[0].clone(),
    description,
    start_time,
    end_time,
    location: None,
    participants,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn values(strings: &[&str]) -> Vec<String> {
    strings.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn test_parse_draft_full() {
    let draft = parse_draft(&values(&[
      "Kickoff",
      "2026-08-06 09:00",
      "2026-08-06 10:00",
      "ada@example.com, grace@example.com",
      "Agenda TBD",
    ]))
    .unwrap();

    assert_eq!(draft.title, "Kickoff");
    assert_eq!(draft.participants.len(), 2);
    assert_eq!(draft.participants[1], "grace@example.com");
    assert_eq!(draft.description.as_deref(), Some("Agenda TBD"));
    assert!(draft.end_time > draft.start_time);
  }

  #[test]
  fn test_parse_draft_rejects_bad_time() {
    let err = parse_draft(&values(&["Kickoff", "tomorrow", "2026-08-06 10:00", "", ""]))
      .unwrap_err();
    assert!(err.contains("start time"));
  }

  #[test]
  fn test_parse_draft_empty_participants() {
    let draft = parse_draft(&values(&[
      "Kickoff",
      "2026-08-06 09:00",
      "2026-08-06 10:00",
      "",
      "",
    ]))
    .unwrap();
    assert!(draft.participants.is_empty());
    assert!(draft.description.is_none());
  }
}
