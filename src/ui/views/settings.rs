use crate::api::keys;
use crate::api::types::{IntegrationInfo, IntegrationOverview, LlmConfig};
use crate::api::ApiClient;
use crate::store::{CacheStore, QueryBinder, QueryStatus};
use crate::ui::renderfns::integration_color;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

/// Read-only view of integration status and LLM configuration
pub struct SettingsView {
  integrations: QueryBinder<IntegrationOverview>,
  llm: QueryBinder<LlmConfig>,
}

impl SettingsView {
  pub fn new(api: ApiClient, store: CacheStore) -> Self {
    let api_for_integrations = api.clone();
    let integrations = QueryBinder::bind(store.clone(), keys::integrations(), move || {
      let api = api_for_integrations.clone();
      async move { api.integration_status().await }
    });

    let llm = QueryBinder::bind(store, keys::llm(), move || {
      let api = api.clone();
      async move { api.llm_config().await }
    });

    Self { integrations, llm }
  }

  fn integration_lines(name: &str, info: &IntegrationInfo) -> Line<'static> {
    let status = if info.status.is_configured() {
      "configured"
    } else {
      "not configured"
    };
    Line::from(vec![
      Span::styled(format!("  {:<10}", name), Style::default().fg(Color::DarkGray)),
      Span::styled(
        format!("{:<16}", status),
        Style::default().fg(integration_color(info.status)),
      ),
      Span::raw(info.provider.clone().unwrap_or_else(|| "-".to_string())),
    ])
  }
}

impl View for SettingsView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        self.integrations.refetch();
        self.llm.refetch();
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let loading = self.integrations.is_loading() || self.llm.is_loading();
    let title = if loading {
      " Settings (loading...) "
    } else {
      " Settings "
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let heading = Style::default().fg(Color::Cyan).bold();
    let label = Style::default().fg(Color::DarkGray);
    let mut lines = vec![Line::styled("Integrations", heading)];

    match self.integrations.data() {
      Some(overview) => {
        lines.push(Self::integration_lines("calendar", &overview.calendar));
        lines.push(Self::integration_lines("email", &overview.email));
        lines.push(Self::integration_lines("crm", &overview.crm));
      }
      None => {
        let message = match self.integrations.status() {
          QueryStatus::Error => format!(
            "  error: {}",
            self
              .integrations
              .error()
              .map(|e| e.to_string())
              .unwrap_or_default()
          ),
          _ => "  loading...".to_string(),
        };
        lines.push(Line::styled(message, label));
      }
    }

    lines.push(Line::default());
    lines.push(Line::styled("Brief generation", heading));

    match self.llm.data() {
      Some(llm) => {
        lines.push(Line::from(vec![
          Span::styled("  provider  ", label),
          Span::raw(llm.provider.clone()),
        ]));
        lines.push(Line::from(vec![
          Span::styled("  model     ", label),
          Span::raw(llm.model.clone()),
        ]));
        if !llm.available_providers.is_empty() {
          lines.push(Line::from(vec![
            Span::styled("  available ", label),
            Span::styled(
              llm.available_providers.join(", "),
              Style::default().fg(Color::DarkGray),
            ),
          ]));
        }
      }
      None => {
        let message = match self.llm.status() {
          QueryStatus::Error => format!(
            "  error: {}",
            self.llm.error().map(|e| e.to_string()).unwrap_or_default()
          ),
          _ => "  loading...".to_string(),
        };
        lines.push(Line::styled(message, label));
      }
    }

    frame.render_widget(Paragraph::new(lines), inner);
  }

  fn breadcrumb_label(&self) -> String {
    "Settings".to_string()
  }

  fn tick(&mut self) {
    self.integrations.poll();
    self.llm.poll();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("r", "refresh"),
      ShortcutInfo::new("q", "back"),
    ]
  }
}
