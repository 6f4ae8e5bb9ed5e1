use crate::api::keys;
use crate::api::types::{Contact, ContactHistory};
use crate::api::ApiClient;
use crate::store::{CacheStore, QueryBinder, QueryStatus};
use crate::ui::renderfns::{fmt_datetime, sentiment_color};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// One contact's profile and interaction history
pub struct ContactHistoryView {
  name: String,
  contact: QueryBinder<Contact>,
  history: QueryBinder<ContactHistory>,
  scroll: u16,
}

impl ContactHistoryView {
  pub fn new(id: String, name: String, api: ApiClient, store: CacheStore) -> Self {
    let api_for_contact = api.clone();
    let contact_id = id.clone();
    let contact = QueryBinder::bind(store.clone(), keys::contact(&id), move || {
      let api = api_for_contact.clone();
      let id = contact_id.clone();
      async move { api.get_contact(&id).await }
    });

    let history = QueryBinder::bind(store, keys::contact_history(&id), move || {
      let api = api.clone();
      let id = id.clone();
      async move { api.contact_history(&id).await }
    });

    Self {
      name,
      contact,
      history,
      scroll: 0,
    }
  }

  fn display_name(&self) -> String {
    self
      .history
      .data()
      .and_then(|h| h.contact_name.clone())
      .unwrap_or_else(|| self.name.clone())
  }

  fn profile_lines(&self) -> Vec<Line<'static>> {
    let label = Style::default().fg(Color::DarkGray);
    let Some(contact) = self.contact.data() else {
      return Vec::new();
    };

    let mut spans = vec![Span::styled(format!("<{}>", contact.email), label)];
    match (&contact.title, &contact.company) {
      (Some(title), Some(company)) => {
        spans.push(Span::raw(format!("  {} at {}", title, company)))
      }
      (Some(title), None) => spans.push(Span::raw(format!("  {}", title))),
      (None, Some(company)) => spans.push(Span::raw(format!("  {}", company))),
      (None, None) => {}
    }
    spans.push(Span::styled(
      format!("  {} interactions", contact.total_interactions),
      label,
    ));

    vec![Line::from(spans), Line::default()]
  }

  fn render_history(&mut self, frame: &mut Frame, area: Rect) {
    let name = self.display_name();
    let title = match self.history.status() {
      QueryStatus::Loading => format!(" {} (loading...) ", name),
      QueryStatus::Error => format!(
        " {} (error: {}) ",
        name,
        self.history.error().map(|e| e.to_string()).unwrap_or_default()
      ),
      _ => format!(" {} ", name),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if self.history.is_loading() && self.history.data().is_none() {
      frame.render_widget(
        Paragraph::new("Loading history...").style(Style::default().fg(Color::DarkGray)),
        inner,
      );
      return;
    }

    if let Some(error) = self.history.error() {
      if self.history.data().is_none() {
        frame.render_widget(
          Paragraph::new(format!("Error: {}\n\nPress 'r' to retry.", error))
            .style(Style::default().fg(Color::Red)),
          inner,
        );
        return;
      }
    }

    let Some(history) = self.history.data() else {
      return;
    };

    let label = Style::default().fg(Color::DarkGray);
    let mut lines = self.profile_lines();

    if history.interactions.is_empty() {
      lines.push(Line::styled("No recorded interactions.", label));
    }

    for interaction in &history.interactions {
      lines.push(Line::from(vec![
        Span::styled("o ", sentiment_color(interaction.sentiment)),
        Span::styled(
          format!("{:<13}", fmt_datetime(interaction.date)),
          Style::default().fg(Color::Cyan),
        ),
        Span::styled(
          format!("{:<9}", interaction.kind),
          Style::default().fg(Color::Yellow),
        ),
        Span::raw(interaction.summary.clone()),
      ]));
      if !interaction.key_topics.is_empty() {
        lines.push(Line::styled(
          format!("    topics: {}", interaction.key_topics.join(", ")),
          label,
        ));
      }
    }

    let paragraph = Paragraph::new(lines)
      .wrap(Wrap { trim: false })
      .scroll((self.scroll, 0));
    frame.render_widget(paragraph, inner);
  }
}

impl View for ContactHistoryView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.scroll = self.scroll.saturating_add(1),
      KeyCode::Char('k') | KeyCode::Up => self.scroll = self.scroll.saturating_sub(1),
      KeyCode::Char('r') => {
        self.contact.refetch();
        self.history.refetch();
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_history(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    format!("{} history", self.name)
  }

  fn tick(&mut self) {
    self.contact.poll();
    self.history.poll();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("j/k", "scroll"),
      ShortcutInfo::new("r", "refresh"),
      ShortcutInfo::new("q", "back"),
    ]
  }
}
