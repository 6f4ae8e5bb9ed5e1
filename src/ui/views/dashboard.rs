use crate::api::keys;
use crate::api::types::{Brief, IntegrationInfo, IntegrationOverview, Meeting};
use crate::api::ApiClient;
use crate::store::{CacheStore, QueryBinder, QueryStatus};
use crate::ui::renderfns::{fmt_datetime, integration_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};

/// Summary screen: the week ahead, recent briefs, integration health.
/// Three independent bindings compose the screen; each panel renders its
/// own loading/error state without blocking the others.
pub struct DashboardView {
  meetings: QueryBinder<Vec<Meeting>>,
  briefs: QueryBinder<Vec<Brief>>,
  integrations: QueryBinder<IntegrationOverview>,
}

impl DashboardView {
  pub fn new(api: ApiClient, store: CacheStore) -> Self {
    let range = keys::upcoming_week();
    let api_for_meetings = api.clone();
    let meetings = QueryBinder::bind(store.clone(), keys::meetings_range(&range), move || {
      let api = api_for_meetings.clone();
      async move { api.list_meetings(Some(range)).await }
    });

    let api_for_briefs = api.clone();
    let briefs = QueryBinder::bind(store.clone(), keys::briefs(), move || {
      let api = api_for_briefs.clone();
      async move { api.list_briefs().await }
    });

    let integrations = QueryBinder::bind(store, keys::integrations(), move || {
      let api = api.clone();
      async move { api.integration_status().await }
    });

    Self {
      meetings,
      briefs,
      integrations,
    }
  }

  fn panel_title<T: Send + Sync + 'static>(
    label: &str,
    query: &QueryBinder<T>,
    count: Option<usize>,
  ) -> String {
    match query.status() {
      QueryStatus::Loading => format!(" {} (loading...) ", label),
      QueryStatus::Error => format!(
        " {} (error: {}) ",
        label,
        query.error().map(|e| e.to_string()).unwrap_or_default()
      ),
      _ => match count {
        Some(count) => format!(" {} ({}) ", label, count),
        None => format!(" {} ", label),
      },
    }
  }

  fn render_meetings(&mut self, frame: &mut Frame, area: Rect) {
    let meetings = self.meetings.data();
    let rows: &[Meeting] = meetings.as_deref().map(Vec::as_slice).unwrap_or(&[]);

    let block = Block::default()
      .title(Self::panel_title("Next 7 days", &self.meetings, Some(rows.len())))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if rows.is_empty() && !self.meetings.is_loading() {
      let paragraph = Paragraph::new("No upcoming meetings.")
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = rows
      .iter()
      .map(|meeting| {
        let brief_span = if meeting.has_brief {
          Span::styled("* brief", Style::default().fg(Color::Green))
        } else {
          Span::styled("-", Style::default().fg(Color::DarkGray))
        };
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{:<13}", fmt_datetime(meeting.start_time)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(format!("{:<32}", truncate(&meeting.title, 30))),
          brief_span,
        ]))
      })
      .collect();

    frame.render_widget(List::new(items).block(block), area);
  }

  fn render_briefs(&mut self, frame: &mut Frame, area: Rect) {
    let briefs = self.briefs.data();
    let rows: &[Brief] = briefs.as_deref().map(Vec::as_slice).unwrap_or(&[]);

    let block = Block::default()
      .title(Self::panel_title("Recent briefs", &self.briefs, Some(rows.len())))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if rows.is_empty() && !self.briefs.is_loading() {
      let paragraph = Paragraph::new("No briefs generated yet.")
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = rows
      .iter()
      .take(8)
      .map(|brief| {
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{:<13}", fmt_datetime(brief.generated_at)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(truncate(&brief.title, 28)),
        ]))
      })
      .collect();

    frame.render_widget(List::new(items).block(block), area);
  }

  fn integration_line(name: &str, info: &IntegrationInfo) -> Line<'static> {
    let provider = info.provider.clone().unwrap_or_else(|| "-".to_string());
    let status = if info.status.is_configured() {
      "configured"
    } else {
      "not configured"
    };
    Line::from(vec![
      Span::styled(format!("{:<10}", name), Style::default().fg(Color::DarkGray)),
      Span::styled(
        format!("{:<15}", status),
        Style::default().fg(integration_color(info.status)),
      ),
      Span::raw(provider),
    ])
  }

  fn render_integrations(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(Self::panel_title("Integrations", &self.integrations, None))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let Some(overview) = self.integrations.data() else {
      let content = if self.integrations.is_loading() {
        "Loading..."
      } else {
        "Status unavailable."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    };

    let lines = vec![
      Self::integration_line("calendar", &overview.calendar),
      Self::integration_line("email", &overview.email),
      Self::integration_line("crm", &overview.crm),
      Line::from(vec![
        Span::styled("llm       ", Style::default().fg(Color::DarkGray)),
        Span::styled(
          format!("{:<15}", overview.llm.provider),
          Style::default().fg(integration_color(overview.llm.status)),
        ),
        Span::raw(overview.llm.model.clone()),
      ]),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), area);
  }
}

impl View for DashboardView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        self.meetings.refetch();
        self.briefs.refetch();
        self.integrations.refetch();
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let columns = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
      .split(area);

    self.render_meetings(frame, columns[0]);

    let right = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(1), Constraint::Length(6)])
      .split(columns[1]);

    self.render_briefs(frame, right[0]);
    self.render_integrations(frame, right[1]);
  }

  fn breadcrumb_label(&self) -> String {
    "Dashboard".to_string()
  }

  fn tick(&mut self) {
    self.meetings.poll();
    self.briefs.poll();
    self.integrations.poll();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command"),
      ShortcutInfo::new("r", "refresh"),
      ShortcutInfo::new("q", "quit"),
    ]
  }
}
