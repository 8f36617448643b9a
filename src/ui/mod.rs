mod action_menu;
mod command_input;
mod help;
mod instance_detail;
mod instance_list;
pub mod theme;

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::app::{App, Screen};

const MIN_WIDTH: u16 = 60;
const MIN_HEIGHT: u16 = 12;

/// Top-level render dispatcher.
pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    // Terminal too small guard
    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = Paragraph::new(format!(
            "Terminal too small. Need at least {}x{}.",
            MIN_WIDTH, MIN_HEIGHT
        ))
        .style(theme::error());
        frame.render_widget(msg, area);
        return;
    }

    instance_list::render(frame, app);
    match app.screen {
        Screen::InstanceList => {}
        Screen::ActionMenu => action_menu::render(frame, app),
        Screen::CommandInput => command_input::render(frame, app),
        Screen::Help => help::render(frame),
    }
}

/// Render the status bar at the bottom.
pub fn render_status_bar(frame: &mut Frame, area: Rect, app: &App) {
    if let Some(ref status) = app.status {
        let line = if status.is_error {
            Line::from(vec![
                Span::styled("! ", theme::error()),
                Span::styled(status.text.as_str(), theme::error()),
            ])
        } else {
            Line::from(Span::styled(status.text.as_str(), theme::success()))
        };
        frame.render_widget(Paragraph::new(line), area);
    }
}

/// Create a centered rect with fixed dimensions.
pub fn centered_rect_fixed(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
