use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use super::theme;
use crate::app::App;
use crate::menu;

/// Preview panel for the highlighted row.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(Span::styled(" Details ", theme::brand()))
        .borders(Borders::ALL)
        .border_style(theme::border());

    let text = app
        .selected_instance()
        .map(|instance| menu::detail_text(&menu::line_label(instance), &app.instances))
        .unwrap_or_default();

    let lines: Vec<Line> = text
        .lines()
        .map(|line| match line.split_once(": ") {
            Some((label, value)) => Line::from(vec![
                Span::styled(format!(" {:<15}", label), theme::muted()),
                Span::styled(value.to_string(), theme::bold()),
            ]),
            None => Line::from(line.to_string()),
        })
        .collect();

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}
