use ratatui::Frame;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem};

use super::theme;
use crate::app::App;
use crate::dispatch::Action;

pub fn render(frame: &mut Frame, app: &mut App) {
    let height = Action::ALL.len() as u16 + 2;
    let area = super::centered_rect_fixed(46, height, frame.area());

    frame.render_widget(Clear, area);

    let title = app
        .selected_instance()
        .map(|i| format!(" {} ", i.id))
        .unwrap_or_else(|| " Actions ".to_string());
    let block = Block::default()
        .title(Span::styled(title, theme::brand()))
        .borders(Borders::ALL)
        .border_style(theme::accent());

    let items: Vec<ListItem> = Action::ALL
        .iter()
        .enumerate()
        .map(|(i, action)| {
            ListItem::new(Line::from(vec![
                Span::styled(format!(" {} ", i + 1), theme::accent_bold()),
                Span::raw(action.label()),
                Span::styled(format!("  [{}]", action.shortcut()), theme::muted()),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(theme::selected());

    frame.render_stateful_widget(list, area, &mut app.action_state);
}
