use crate::api::keys;
use crate::api::types::Brief;
use crate::api::ApiClient;
use crate::store::{
  CacheStore, InvalidationRule, Mutation, MutationRunner, QueryBinder, QueryStatus,
};
use crate::ui::components::{KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{fmt_datetime, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::BriefDetailView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// View for browsing generated briefs, most recent first
pub struct BriefListView {
  api: ApiClient,
  store: CacheStore,
  runner: MutationRunner,
  query: QueryBinder<Vec<Brief>>,
  list_state: ListState,
  search: SearchInput,
  filter: String,
  delete: Mutation<()>,
  armed_delete: Option<String>,
  status_line: Option<(String, Color)>,
}

impl BriefListView {
  pub fn new(api: ApiClient, store: CacheStore) -> Self {
    let api_for_query = api.clone();
    let query = QueryBinder::bind(store.clone(), keys::briefs(), move || {
      let api = api_for_query.clone();
      async move { api.list_briefs().await }
    });

    Self {
      runner: MutationRunner::new(store.clone()),
      api,
      store,
      query,
      list_state: ListState::default(),
      search: SearchInput::new(),
      filter: String::new(),
      delete: Mutation::new(),
      armed_delete: None,
      status_line: None,
    }
  }

  /// Briefs matching the client-side title filter, in server order.
  fn visible(&self) -> Vec<Brief> {
    let Some(briefs) = self.query.data() else {
      return Vec::new();
    };
    if self.filter.is_empty() {
      return briefs.as_ref().clone();
    }
    let needle = self.filter.to_lowercase();
    briefs
      .iter()
      .filter(|brief| brief.title.to_lowercase().contains(&needle))
      .cloned()
      .collect()
  }

  fn selected(&self) -> Option<Brief> {
    self.visible().into_iter().nth(self.list_state.selected()?)
  }

  fn delete_selected(&mut self) {
    let Some(brief) = self.selected() else {
      return;
    };
    if self.delete.is_pending() {
      return;
    }

    if self.armed_delete.as_deref() == Some(brief.id.as_str()) {
      let api = self.api.clone();
      let id = brief.id.clone();
      self.armed_delete = None;
      self.status_line = None;
      // Deleting a brief also flips the owning meeting's brief flag.
      self.runner.run(
        &mut self.delete,
        async move { api.delete_brief(&id).await },
        vec![
          InvalidationRule::Resource("briefs"),
          InvalidationRule::Resource("meetings"),
        ],
      );
    } else {
      self.status_line = Some((
        format!("press x again to delete \"{}\"", truncate(&brief.title, 40)),
        Color::Red,
      ));
      self.armed_delete = Some(brief.id);
    }
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let rows = self.visible();
    ensure_valid_selection(&mut self.list_state, rows.len());

    let filter_label = if self.filter.is_empty() {
      String::new()
    } else {
      format!(" /{}", self.filter)
    };
    let title = match self.query.status() {
      QueryStatus::Loading => format!(" Briefs{} (loading...) ", filter_label),
      QueryStatus::Error => format!(
        " Briefs{} (error: {}) ",
        filter_label,
        self.query.error().map(|e| e.to_string()).unwrap_or_default()
      ),
      _ => format!(" Briefs{} ({}) ", filter_label, rows.len()),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if rows.is_empty() && !self.query.is_loading() {
      let content = if self.query.status() == QueryStatus::Error {
        "Failed to load briefs. Press 'r' to retry."
      } else if self.filter.is_empty() {
        "No briefs yet. Generate one from the meetings view."
      } else {
        "No briefs match the filter."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = rows
      .iter()
      .map(|brief| {
        let line = Line::from(vec![
          Span::styled(
            format!("{:<13}", fmt_datetime(brief.generated_at)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(" "),
          Span::raw(format!("{:<42}", truncate(&brief.title, 40))),
          Span::styled(
            format!(
              "{:>2} pts {:>2} actions  ",
              brief.talking_points.len(),
              brief.open_action_items.len()
            ),
            Style::default().fg(Color::DarkGray),
          ),
          Span::styled(
            brief.data_sources_used.join(","),
            Style::default().fg(Color::DarkGray),
          ),
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
        "Enter:open  x:delete  /:filter  r:refresh".to_string(),
        Color::DarkGray,
      ),
    };
    frame.render_widget(
      Paragraph::new(text).style(Style::default().fg(color)),
      area,
    );
  }
}

impl View for BriefListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(filter)) => {
        self.filter = filter;
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Submitted) => return ViewAction::None,
      KeyResult::Handled => return ViewAction::None,
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
      KeyCode::Char('x') => self.delete_selected(),
      KeyCode::Enter => {
        if let Some(brief) = self.selected() {
          return ViewAction::Push(Box::new(BriefDetailView::new(
            brief.id,
            brief.title,
            self.api.clone(),
            self.store.clone(),
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
    self.search.render_overlay(frame, chunks[0]);
  }

  fn breadcrumb_label(&self) -> String {
    "Briefs".to_string()
  }

  fn wants_text_input(&self) -> bool {
    self.search.is_active()
  }

  fn tick(&mut self) {
    self.query.poll();

    if self.delete.poll() {
      if let Some(error) = self.delete.error() {
        self.status_line = Some((format!("delete failed: {}", error), Color::Red));
      } else {
        self.status_line = Some(("brief deleted".to_string(), Color::Green));
      }
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("Enter", "open"),
      ShortcutInfo::new("x", "delete"),
      ShortcutInfo::new("/", "filter"),
      ShortcutInfo::new("q", "back"),
    ]
  }
}
