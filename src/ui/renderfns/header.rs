use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar with logo, backend host, and breadcrumb trail
pub fn draw_header(frame: &mut Frame, area: Rect, title: &str, host: &str, breadcrumb: &[String]) {
  let mut spans = vec![
    Span::styled(" b9s ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", title), Style::default().fg(Color::White)),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", host), Style::default().fg(Color::DarkGray)),
  ];

  for (i, crumb) in breadcrumb.iter().enumerate() {
    if i == 0 {
      spans.push(Span::styled("│ ", Style::default().fg(Color::DarkGray)));
    } else {
      spans.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
    }
    let style = if i == breadcrumb.len() - 1 {
      Style::default().fg(Color::Yellow).bold()
    } else {
      Style::default().fg(Color::DarkGray)
    };
    spans.push(Span::styled(crumb.clone(), style));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));

  frame.render_widget(paragraph, area);
}
