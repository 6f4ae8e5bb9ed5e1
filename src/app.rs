use crate::api::ApiClient;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::store::CacheStore;
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::{
  BriefListView, ContactListView, DashboardView, MeetingListView, SettingsView,
};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tracing::info;

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// Command palette (`:` commands)
  command: CommandInput,

  /// Application configuration
  config: Config,

  /// Transport client
  api: ApiClient,

  /// Shared query cache; every view binds through this
  store: CacheStore,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let api = ApiClient::new(&config.api.base_url)?;
    let store = CacheStore::new();

    Ok(Self {
      view_stack: vec![Box::new(DashboardView::new(api.clone(), store.clone()))],
      command: CommandInput::new(),
      config,
      api,
      store,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(250));
    info!(backend = %self.api.host(), "starting");

    // Main loop
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      if let Some(event) = events.next().await {
        self.handle_event(event);
      }
    }

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => {
        // Every mounted view polls its bindings, so an invalidation from
        // the top view refreshes the stack beneath it too.
        for view in &mut self.view_stack {
          view.tick();
        }
      }
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    // Command palette first; it handles its own activation on ':'. When a
    // view is capturing free text, ':' belongs to the view's field.
    let view_captures_text = self
      .view_stack
      .last()
      .map(|view| view.wants_text_input())
      .unwrap_or(false);
    if self.command.is_active() || !view_captures_text {
      match self.command.handle_key(key) {
        KeyResult::Handled => return,
        KeyResult::Event(CommandEvent::Submitted(cmd)) => {
          self.execute_command(&cmd);
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) => return,
        KeyResult::NotHandled => {}
      }
    }

    let Some(view) = self.view_stack.last_mut() else {
      return;
    };
    match view.handle_key(key) {
      ViewAction::Push(next) => self.view_stack.push(next),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
      ViewAction::None => {}
    }
  }

  fn execute_command(&mut self, cmd: &str) {
    info!(command = cmd, "executing");
    match cmd {
      "dashboard" => self.set_root(Box::new(DashboardView::new(
        self.api.clone(),
        self.store.clone(),
      ))),
      "meetings" => self.set_root(Box::new(MeetingListView::new(
        self.api.clone(),
        self.store.clone(),
        self.config.briefs.options(),
      ))),
      "briefs" => self.set_root(Box::new(BriefListView::new(
        self.api.clone(),
        self.store.clone(),
      ))),
      "contacts" => self.set_root(Box::new(ContactListView::new(
        self.api.clone(),
        self.store.clone(),
      ))),
      "settings" => self.set_root(Box::new(SettingsView::new(
        self.api.clone(),
        self.store.clone(),
      ))),
      "quit" => self.should_quit = true,
      _ => {
        // Unknown command
      }
    }
  }

  fn set_root(&mut self, view: Box<dyn View>) {
    self.view_stack.clear();
    self.view_stack.push(view);
  }

  // Accessors for UI rendering

  pub fn title(&self) -> &str {
    self.config.title.as_deref().unwrap_or("Meeting Briefs")
  }

  pub fn host(&self) -> &str {
    self.api.host()
  }

  pub fn breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|view| view.breadcrumb_label())
      .collect()
  }

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn current_shortcuts(&self) -> Vec<ShortcutInfo> {
    self
      .view_stack
      .last()
      .map(|view| view.shortcuts())
      .unwrap_or_default()
  }

  pub fn command_mut(&mut self) -> &mut CommandInput {
    &mut self.command
  }
}
