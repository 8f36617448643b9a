use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};

use super::{instance_detail, theme};
use crate::app::App;
use crate::menu;

pub fn render(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::vertical([
        Constraint::Min(5),    // List and preview
        Constraint::Length(1), // Footer or status message
    ])
    .split(frame.area());

    let panes = Layout::horizontal([Constraint::Percentage(25), Constraint::Percentage(75)])
        .split(chunks[0]);

    render_list(frame, app, panes[0]);
    instance_detail::render(frame, app, panes[1]);

    if app.status.is_some() {
        super::render_status_bar(frame, chunks[1], app);
    } else {
        render_footer(frame, chunks[1]);
    }
}

fn render_list(frame: &mut Frame, app: &mut App, area: Rect) {
    let count = app.instances.len();
    let pos = app.list_state.selected().map(|i| i + 1).unwrap_or(0);
    let title = Line::from(vec![
        Span::styled(" assm ", theme::brand_badge()),
        Span::raw(format!(" {}/{} ", pos, count)),
    ]);
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(theme::border());

    if app.instances.is_empty() {
        let empty = Paragraph::new("  No online instances.")
            .style(theme::muted())
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = app
        .instances
        .iter()
        .map(|instance| ListItem::new(format!(" {}", menu::line_label(instance))))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(theme::selected())
        .highlight_symbol("  ");

    frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn render_footer(frame: &mut Frame, area: Rect) {
    let footer = Line::from(vec![
        Span::styled(" Enter", theme::primary_action()),
        Span::styled(" actions  ", theme::muted()),
        Span::styled("s", theme::accent_bold()),
        Span::styled(" ssh  ", theme::muted()),
        Span::styled("m", theme::accent_bold()),
        Span::styled(" session  ", theme::muted()),
        Span::styled("c", theme::accent_bold()),
        Span::styled(" command  ", theme::muted()),
        Span::styled("i", theme::accent_bold()),
        Span::styled(" id  ", theme::muted()),
        Span::styled("?", theme::accent_bold()),
        Span::styled(" help  ", theme::muted()),
        Span::styled("q", theme::accent_bold()),
        Span::styled(" quit", theme::muted()),
    ]);
    frame.render_widget(Paragraph::new(footer), area);
}
