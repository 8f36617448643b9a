use ratatui::Frame;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use super::theme;
use crate::app::App;

pub fn render(frame: &mut Frame, app: &App) {
    let width = frame.area().width.saturating_sub(8).min(80);
    let area = super::centered_rect_fixed(width, 6, frame.area());

    frame.render_widget(Clear, area);

    let target = app
        .selected_instance()
        .map(|i| i.id.as_str())
        .unwrap_or("-");
    let block = Block::default()
        .title(Span::styled(format!(" Send Command to {} ", target), theme::brand()))
        .borders(Borders::ALL)
        .border_style(theme::accent());

    let text = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled(" $ ", theme::accent_bold()),
            Span::raw(app.command_input.as_str()),
            Span::styled("_", theme::accent()),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled(" Enter", theme::primary_action()),
            Span::styled(" run  ", theme::muted()),
            Span::styled("Esc", theme::accent_bold()),
            Span::styled(" back", theme::muted()),
        ]),
    ];

    frame.render_widget(Paragraph::new(text).block(block), area);
}
