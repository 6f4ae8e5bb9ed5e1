use crate::api::keys;
use crate::api::types::{BriefOptions, Meeting};
use crate::api::{ApiClient, BriefReceipt};
use crate::store::{
  CacheStore, InvalidationRule, Mutation, MutationRunner, MutationState, QueryBinder, QueryStatus,
};
use crate::ui::renderfns::{fmt_datetime, fmt_time_range};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::BriefDetailView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// View for a single meeting: schedule, participants, brief state
pub struct MeetingDetailView {
  id: String,
  title: String,
  api: ApiClient,
  store: CacheStore,
  runner: MutationRunner,
  brief_options: BriefOptions,
  query: QueryBinder<Meeting>,
  generate: Mutation<BriefReceipt>,
  status_line: Option<(String, Color)>,
}

impl MeetingDetailView {
  pub fn new(
    id: String,
    title: String,
    api: ApiClient,
    store: CacheStore,
    brief_options: BriefOptions,
  ) -> Self {
    let api_for_query = api.clone();
    let query_id = id.clone();
    let query = QueryBinder::bind(store.clone(), keys::meeting(&id), move || {
      let api = api_for_query.clone();
      let id = query_id.clone();
      async move { api.get_meeting(&id).await }
    });

    Self {
      runner: MutationRunner::new(store.clone()),
      id,
      title,
      api,
      store,
      brief_options,
      query,
      generate: Mutation::new(),
      status_line: None,
    }
  }

  fn generate_brief(&mut self) {
    let Some(meeting) = self.query.data() else {
      return;
    };
    if meeting.has_brief {
      self.status_line = Some(("this meeting already has a brief".to_string(), Color::DarkGray));
      return;
    }
    if self.generate.is_pending() {
      return;
    }

    let api = self.api.clone();
    let id = self.id.clone();
    let options = self.brief_options;
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

  fn render_detail(&mut self, frame: &mut Frame, area: Rect) {
    let title = match self.query.status() {
      QueryStatus::Loading => format!(" {} (loading...) ", self.title),
      QueryStatus::Error => format!(
        " {} (error: {}) ",
        self.title,
        self.query.error().map(|e| e.to_string()).unwrap_or_default()
      ),
      _ => format!(" {} ", self.title),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if self.query.is_loading() && self.query.data().is_none() {
      let paragraph =
        Paragraph::new("Loading meeting...").style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, inner);
      return;
    }

    if let Some(error) = self.query.error() {
      if self.query.data().is_none() {
        let paragraph = Paragraph::new(format!("Error: {}\n\nPress 'r' to retry.", error))
          .style(Style::default().fg(Color::Red));
        frame.render_widget(paragraph, inner);
        return;
      }
    }

    let Some(meeting) = self.query.data() else {
      return;
    };

    let label = Style::default().fg(Color::DarkGray);
    let mut lines = vec![Line::from(vec![
      Span::styled("When: ", label),
      Span::styled(
        format!(
          "{}  {}",
          fmt_datetime(meeting.start_time),
          fmt_time_range(meeting.start_time, meeting.end_time)
        ),
        Style::default().fg(Color::Cyan),
      ),
    ])];

    if let Some(location) = &meeting.location {
      lines.push(Line::from(vec![
        Span::styled("Where: ", label),
        Span::raw(location.clone()),
      ]));
    }
    if let Some(link) = &meeting.meeting_link {
      lines.push(Line::from(vec![
        Span::styled("Link: ", label),
        Span::styled(link.clone(), Style::default().fg(Color::Blue)),
      ]));
    }
    if meeting.is_recurring {
      lines.push(Line::from(vec![
        Span::styled("Recurring: ", label),
        Span::raw(meeting.recurrence_rule.clone().unwrap_or_else(|| "yes".to_string())),
      ]));
    }

    let brief_line = if self.generate.is_pending() {
      Line::styled("Brief: generating...", Style::default().fg(Color::Yellow))
    } else if meeting.has_brief {
      Line::from(vec![
        Span::styled("Brief: ", label),
        Span::styled("ready", Style::default().fg(Color::Green)),
        Span::styled("  (press 'b' to open)", label),
      ])
    } else {
      Line::from(vec![
        Span::styled("Brief: ", label),
        Span::raw("none"),
        Span::styled("  (press 'g' to generate)", label),
      ])
    };
    lines.push(brief_line);

    lines.push(Line::default());
    lines.push(Line::styled(
      format!("Participants ({})", meeting.participants.len()),
      Style::default().fg(Color::Cyan).bold(),
    ));
    for participant in &meeting.participants {
      let mut spans = vec![
        Span::raw("  - "),
        Span::raw(participant.display().to_string()),
        Span::styled(format!("  <{}>", participant.email), label),
      ];
      if let Some(role) = &participant.role {
        spans.push(Span::styled(format!("  {}", role), label));
      }
      if participant.is_organizer {
        spans.push(Span::styled("  organizer", Style::default().fg(Color::Yellow)));
      }
      lines.push(Line::from(spans));
    }

    lines.push(Line::default());
    lines.push(Line::styled(
      "Description",
      Style::default().fg(Color::Cyan).bold(),
    ));
    lines.push(Line::raw(
      meeting
        .description
        .clone()
        .unwrap_or_else(|| "No description".to_string()),
    ));

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, inner);
  }

  fn render_status(&self, frame: &mut Frame, area: Rect) {
    let (text, color) = match &self.status_line {
      Some((message, color)) => (message.clone(), *color),
      None => (
        "g:generate brief  b:open brief  r:refresh".to_string(),
        Color::DarkGray,
      ),
    };
    frame.render_widget(
      Paragraph::new(text).style(Style::default().fg(color)),
      area,
    );
  }
}

impl View for MeetingDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('g') => self.generate_brief(),
      KeyCode::Char('b') => {
        if let Some(meeting) = self.query.data() {
          if let Some(brief_id) = meeting.brief_id.clone() {
            return ViewAction::Push(Box::new(BriefDetailView::new(
              brief_id,
              meeting.title.clone(),
              self.api.clone(),
              self.store.clone(),
            )));
          }
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

    self.render_detail(frame, chunks[0]);
    self.render_status(frame, chunks[1]);
  }

  fn breadcrumb_label(&self) -> String {
    self.title.clone()
  }

  fn tick(&mut self) {
    self.query.poll();

    if self.generate.poll() {
      match self.generate.state() {
        MutationState::Success(receipt) => {
          self.status_line = Some((
            format!("brief generated: {}", receipt.title),
            Color::Green,
          ));
        }
        MutationState::Error(error) => {
          self.status_line = Some((format!("generation failed: {}", error), Color::Red));
        }
        _ => {}
      }
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("g", "generate"),
      ShortcutInfo::new("b", "brief"),
      ShortcutInfo::new("r", "refresh"),
      ShortcutInfo::new("q", "back"),
    ]
  }
}
