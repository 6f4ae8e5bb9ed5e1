use crate::api::keys;
use crate::api::types::{Contact, ContactDraft};
use crate::api::ApiClient;
use crate::store::{
  CacheStore, InvalidationRule, Mutation, MutationRunner, MutationState, QueryBinder, QueryStatus,
};
use crate::ui::components::{FormEvent, FormOverlay, KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{fmt_date, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::ContactHistoryView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// View for browsing contacts with server-side search
pub struct ContactListView {
  api: ApiClient,
  store: CacheStore,
  runner: MutationRunner,
  query: QueryBinder<Vec<Contact>>,
  search: SearchInput,
  search_term: String,
  list_state: ListState,
  create: Mutation<Contact>,
  form: FormOverlay,
  status_line: Option<(String, Color)>,
}

impl ContactListView {
  pub fn new(api: ApiClient, store: CacheStore) -> Self {
    let api_for_query = api.clone();
    let query = QueryBinder::bind(store.clone(), keys::contacts(None), move || {
      let api = api_for_query.clone();
      async move { api.list_contacts(None).await }
    });

    Self {
      runner: MutationRunner::new(store.clone()),
      api,
      store,
      query,
      search: SearchInput::new(),
      search_term: String::new(),
      list_state: ListState::default(),
      create: Mutation::new(),
      form: FormOverlay::new(
        "New contact",
        &[
          ("Email", true),
          ("Name", false),
          ("Title", false),
          ("Company", false),
        ],
      ),
      status_line: None,
    }
  }

  /// Re-key the binder to the new search term. Each keystroke lands here;
  /// coalescing and the stale-response guard make the rapid re-keying safe.
  fn set_search(&mut self, term: String) {
    self.search_term = term;
    let trimmed = self.search_term.trim();
    let search = if trimmed.is_empty() {
      None
    } else {
      Some(trimmed.to_string())
    };

    let api = self.api.clone();
    let search_for_fetch = search.clone();
    self.query.rebind(keys::contacts(search.as_deref()), move || {
      let api = api.clone();
      let search = search_for_fetch.clone();
      async move { api.list_contacts(search.as_deref()).await }
    });
  }

  fn selected(&self) -> Option<Contact> {
    let contacts = self.query.data()?;
    contacts.get(self.list_state.selected()?).cloned()
  }

  fn submit_create(&mut self, values: Vec<String>) {
    if self.create.is_pending() {
      return;
    }

    let non_empty = |s: &String| {
      if s.is_empty() {
        None
      } else {
        Some(s.clone())
      }
    };
    let draft = ContactDraft {
      email: values[0].clone(),
      name: non_empty(&values[1]),
      title: non_empty(&values[2]),
      company: non_empty(&values[3]),
    };

    let api = self.api.clone();
    self.runner.run(
      &mut self.create,
      async move { api.create_contact(&draft).await },
      vec![InvalidationRule::Resource("contacts")],
    );
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let contacts = self.query.data();
    let rows: &[Contact] = contacts.as_deref().map(Vec::as_slice).unwrap_or(&[]);
    ensure_valid_selection(&mut self.list_state, rows.len());

    let search_label = if self.search_term.is_empty() {
      String::new()
    } else {
      format!(" /{}", self.search_term)
    };
    let title = match self.query.status() {
      QueryStatus::Loading => format!(" Contacts{} (loading...) ", search_label),
      QueryStatus::Error => format!(
        " Contacts{} (error: {}) ",
        search_label,
        self.query.error().map(|e| e.to_string()).unwrap_or_default()
      ),
      _ => format!(" Contacts{} ({}) ", search_label, rows.len()),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if rows.is_empty() && !self.query.is_loading() {
      let content = if self.query.status() == QueryStatus::Error {
        "Failed to load contacts. Press 'r' to retry."
      } else if self.search_term.is_empty() {
        "No contacts yet. Press 'n' to create one."
      } else {
        "No contacts match the search."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = rows
      .iter()
      .map(|contact| {
        let last_seen = contact
          .last_interaction
          .map(fmt_date)
          .unwrap_or_else(|| "-".to_string());
        let line = Line::from(vec![
          Span::styled(
            format!("{:<22}", truncate(contact.display_name(), 20)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(format!("{:<30}", truncate(&contact.email, 28))),
          Span::styled(
            format!(
              "{:<20}",
              truncate(contact.company.as_deref().unwrap_or("-"), 18)
            ),
            Style::default().fg(Color::DarkGray),
          ),
          Span::styled(
            format!("{:>4} interactions  last {}", contact.total_interactions, last_seen),
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
        "/:search  n:new  Enter:history  r:refresh".to_string(),
        Color::DarkGray,
      ),
    };
    frame.render_widget(
      Paragraph::new(text).style(Style::default().fg(color)),
      area,
    );
  }
}

impl View for ContactListView {
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

    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(term)) => {
        self.set_search(term);
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Submitted) => return ViewAction::None,
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('n') => self.form.open(),
      KeyCode::Enter => {
        if let Some(contact) = self.selected() {
          return ViewAction::Push(Box::new(ContactHistoryView::new(
            contact.id.clone(),
            contact.display_name().to_string(),
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
    self.form.render_overlay(frame, chunks[0]);
  }

  fn breadcrumb_label(&self) -> String {
    if self.search_term.is_empty() {
      "Contacts".to_string()
    } else {
      format!("Contacts [{}]", self.search_term)
    }
  }

  fn wants_text_input(&self) -> bool {
    self.form.is_active() || self.search.is_active()
  }

  fn tick(&mut self) {
    self.query.poll();

    if self.create.poll() {
      match self.create.state() {
        MutationState::Success(contact) => {
          self.status_line = Some((format!("created {}", contact.email), Color::Green));
          self.form.close();
        }
        MutationState::Error(error) => {
          // Duplicate/missing email lands here; form stays open for retry.
          self.form.set_error(error.to_string());
        }
        _ => {}
      }
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("/", "search"),
      ShortcutInfo::new("n", "new"),
      ShortcutInfo::new("Enter", "history"),
      ShortcutInfo::new("q", "back"),
    ]
  }
}
