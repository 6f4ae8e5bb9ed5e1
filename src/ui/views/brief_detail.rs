use crate::api::error::ApiError;
use crate::api::keys;
use crate::api::types::{Brief, BriefPatch, ExportFormat, RiskKind};
use crate::api::ApiClient;
use crate::store::{
  CacheStore, InvalidationRule, Mutation, MutationRunner, MutationState, QueryBinder, QueryStatus,
};
use crate::ui::components::{FormEvent, FormOverlay, KeyResult};
use crate::ui::renderfns::{fmt_datetime, priority_color, sentiment_color};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use tracing::debug;

/// Scrollable view of one generated brief
pub struct BriefDetailView {
  id: String,
  title: String,
  api: ApiClient,
  runner: MutationRunner,
  query: QueryBinder<Brief>,
  export: Mutation<String>,
  rename: Mutation<()>,
  rename_form: FormOverlay,
  pending_title: Option<String>,
  scroll: u16,
  status_line: Option<(String, Color)>,
}

impl BriefDetailView {
  pub fn new(id: String, title: String, api: ApiClient, store: CacheStore) -> Self {
    let api_for_query = api.clone();
    let query_id = id.clone();
    let query = QueryBinder::bind(store.clone(), keys::brief(&id), move || {
      let api = api_for_query.clone();
      let id = query_id.clone();
      async move { api.get_brief(&id).await }
    });

    Self {
      runner: MutationRunner::new(store),
      id,
      title,
      api,
      query,
      export: Mutation::new(),
      rename: Mutation::new(),
      rename_form: FormOverlay::new("Rename brief", &[("Title", true)]),
      pending_title: None,
      scroll: 0,
      status_line: None,
    }
  }

  fn export(&mut self, format: ExportFormat) {
    if self.export.is_pending() {
      return;
    }
    let api = self.api.clone();
    let id = self.id.clone();
    self.status_line = Some((format!("exporting {}...", format.as_str()), Color::Yellow));
    // No invalidation rules: exporting changes nothing server-side.
    self.runner.run(
      &mut self.export,
      async move {
        let exported = api.export_brief(&id, format).await?;
        debug!(brief = %id, format = %exported.format, "exported");
        let path = format!("{}.{}", id, format.extension());
        tokio::fs::write(&path, exported.body())
          .await
          .map_err(|e| ApiError::Network(format!("failed to write {}: {}", path, e)))?;
        Ok(path)
      },
      Vec::new(),
    );
  }

  fn submit_rename(&mut self, values: Vec<String>) {
    if self.rename.is_pending() {
      return;
    }
    let api = self.api.clone();
    let id = self.id.clone();
    self.pending_title = Some(values[0].clone());
    let patch = BriefPatch {
      title: Some(values[0].clone()),
      ..Default::default()
    };
    self.runner.run(
      &mut self.rename,
      async move { api.update_brief(&id, &patch).await },
      vec![InvalidationRule::Resource("briefs")],
    );
  }

  fn brief_lines(brief: &Brief) -> Vec<Line<'static>> {
    let label = Style::default().fg(Color::DarkGray);
    let heading = Style::default().fg(Color::Cyan).bold();

    let mut lines = vec![
      Line::from(vec![
        Span::styled("Meeting: ", label),
        Span::raw(brief.meeting_id.clone()),
      ]),
      Line::from(vec![
        Span::styled("Generated: ", label),
        Span::raw(fmt_datetime(brief.generated_at)),
        Span::styled(
          format!(" (took {:.1}s)", brief.generation_time_seconds),
          label,
        ),
        Span::styled("   Sources: ", label),
        Span::raw(if brief.data_sources_used.is_empty() {
          "none".to_string()
        } else {
          brief.data_sources_used.join(", ")
        }),
      ]),
      Line::default(),
      Line::styled("Executive Summary", heading),
      Line::raw(brief.executive_summary.clone()),
    ];

    if let Some(objective) = &brief.meeting_objective {
      lines.push(Line::default());
      lines.push(Line::styled("Meeting Objective", heading));
      lines.push(Line::raw(objective.clone()));
    }

    if !brief.participant_profiles.is_empty() {
      lines.push(Line::default());
      lines.push(Line::styled("Participants", heading));
      for profile in &brief.participant_profiles {
        let mut spans = vec![
          Span::styled("o ", sentiment_color(profile.sentiment)),
          Span::raw(profile.display().to_string()),
        ];
        match (&profile.title, &profile.company) {
          (Some(title), Some(company)) => {
            spans.push(Span::styled(format!("  {} at {}", title, company), label))
          }
          (Some(title), None) => spans.push(Span::styled(format!("  {}", title), label)),
          (None, Some(company)) => spans.push(Span::styled(format!("  {}", company), label)),
          (None, None) => {}
        }
        lines.push(Line::from(spans));
        if !profile.key_topics.is_empty() {
          lines.push(Line::styled(
            format!("    topics: {}", profile.key_topics.join(", ")),
            label,
          ));
        }
      }
    }

    if !brief.talking_points.is_empty() {
      lines.push(Line::default());
      lines.push(Line::styled("Talking Points", heading));
      for point in &brief.talking_points {
        lines.push(Line::from(vec![
          Span::styled(
            format!("[{:^6}] ", point.priority.as_str().to_uppercase()),
            Style::default().fg(priority_color(point.priority)),
          ),
          Span::raw(point.topic.clone()),
        ]));
        if !point.context.is_empty() {
          lines.push(Line::styled(format!("         {}", point.context), label));
        }
      }
    }

    if !brief.open_action_items.is_empty() {
      lines.push(Line::default());
      lines.push(Line::styled("Open Action Items", heading));
      for item in &brief.open_action_items {
        let checkbox = if item.status == "completed" {
          "[x] "
        } else {
          "[ ] "
        };
        let mut spans = vec![Span::raw(checkbox), Span::raw(item.description.clone())];
        if let Some(assignee) = &item.assignee {
          spans.push(Span::styled(
            format!(" (@{})", assignee),
            Style::default().fg(Color::Yellow),
          ));
        }
        if let Some(due) = item.due_date {
          spans.push(Span::styled(format!("  due {}", fmt_datetime(due)), label));
        }
        lines.push(Line::from(spans));
      }
    }

    if !brief.risks_opportunities.is_empty() {
      lines.push(Line::default());
      lines.push(Line::styled("Risks & Opportunities", heading));
      for item in &brief.risks_opportunities {
        let (marker, color) = match item.kind {
          RiskKind::Risk => ("!", Color::Red),
          RiskKind::Opportunity => ("+", Color::Green),
        };
        lines.push(Line::from(vec![
          Span::styled(format!("{} {}", marker, item.title), Style::default().fg(color)),
          Span::styled(
            format!(" [{}]", item.severity.as_str()),
            Style::default().fg(priority_color(item.severity)),
          ),
          Span::raw(format!(": {}", item.description)),
        ]));
        if let Some(action) = &item.recommended_action {
          lines.push(Line::styled(format!("    -> {}", action), label));
        }
      }
    }

    if let Some(summary) = &brief.previous_meetings_summary {
      lines.push(Line::default());
      lines.push(Line::styled("Previous Meetings", heading));
      lines.push(Line::raw(summary.clone()));
    }

    let contexts = [
      ("Email context", &brief.email_context),
      ("CRM context", &brief.crm_context),
    ];
    for (name, context) in contexts {
      if let Some(context) = context {
        lines.push(Line::default());
        lines.push(Line::styled(name.to_string(), heading));
        lines.push(Line::styled(context.clone(), label));
      }
    }

    lines
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
      frame.render_widget(
        Paragraph::new("Loading brief...").style(Style::default().fg(Color::DarkGray)),
        inner,
      );
      return;
    }

    if let Some(error) = self.query.error() {
      if self.query.data().is_none() {
        frame.render_widget(
          Paragraph::new(format!("Error: {}\n\nPress 'r' to retry.", error))
            .style(Style::default().fg(Color::Red)),
          inner,
        );
        return;
      }
    }

    let Some(brief) = self.query.data() else {
      return;
    };

    let paragraph = Paragraph::new(Self::brief_lines(&brief))
      .wrap(Wrap { trim: false })
      .scroll((self.scroll, 0));
    frame.render_widget(paragraph, inner);
  }

  fn render_status(&self, frame: &mut Frame, area: Rect) {
    let (text, color) = match &self.status_line {
      Some((message, color)) => (message.clone(), *color),
      None => (
        "j/k:scroll  e:export markdown  E:export json  t:rename  r:refresh".to_string(),
        Color::DarkGray,
      ),
    };
    frame.render_widget(
      Paragraph::new(text).style(Style::default().fg(color)),
      area,
    );
  }
}

impl View for BriefDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.rename_form.handle_key(key) {
      KeyResult::Handled => return ViewAction::None,
      KeyResult::Event(FormEvent::Submitted(values)) => {
        self.submit_rename(values);
        return ViewAction::None;
      }
      KeyResult::Event(FormEvent::Cancelled) => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.scroll = self.scroll.saturating_add(1),
      KeyCode::Char('k') | KeyCode::Up => self.scroll = self.scroll.saturating_sub(1),
      KeyCode::Char('e') => self.export(ExportFormat::Markdown),
      KeyCode::Char('E') => self.export(ExportFormat::Json),
      KeyCode::Char('t') => self.rename_form.open(),
      KeyCode::Char('r') => self.query.refetch(),
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
    self.rename_form.render_overlay(frame, chunks[0]);
  }

  fn breadcrumb_label(&self) -> String {
    self.title.clone()
  }

  fn wants_text_input(&self) -> bool {
    self.rename_form.is_active()
  }

  fn tick(&mut self) {
    self.query.poll();

    if self.export.poll() {
      match self.export.state() {
        MutationState::Success(path) => {
          self.status_line = Some((format!("exported to {}", path), Color::Green));
        }
        MutationState::Error(error) => {
          self.status_line = Some((format!("export failed: {}", error), Color::Red));
        }
        _ => {}
      }
    }

    if self.rename.poll() {
      match self.rename.state() {
        MutationState::Success(()) => {
          self.rename_form.close();
          if let Some(title) = self.pending_title.take() {
            self.title = title;
          }
          self.status_line = Some(("brief renamed".to_string(), Color::Green));
        }
        MutationState::Error(error) => {
          self.pending_title = None;
          self.rename_form.set_error(error.to_string());
        }
        _ => {}
      }
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("e", "export"),
      ShortcutInfo::new("t", "rename"),
      ShortcutInfo::new("r", "refresh"),
      ShortcutInfo::new("q", "back"),
    ]
  }
}
