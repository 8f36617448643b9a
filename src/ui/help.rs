use ratatui::Frame;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use super::theme;

pub fn render(frame: &mut Frame) {
    let area = super::centered_rect_fixed(50, 23, frame.area());

    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(Span::styled(" Keys ", theme::brand()))
        .borders(Borders::ALL)
        .border_style(theme::accent());

    let help_text = vec![
        Line::from(""),
        Line::from(Span::styled("  Instances", theme::section_header())),
        Line::from(""),
        help_line("  j / Down  ", "Move down"),
        help_line("  k / Up    ", "Move up"),
        help_line("  g / G     ", "First / last"),
        help_line("  Enter     ", "Choose an action"),
        help_line("  s         ", "SSH through a session"),
        help_line("  m         ", "Interactive shell session"),
        help_line("  c         ", "Send a shell command"),
        help_line("  i         ", "Print the instance ID"),
        help_line("  ?         ", "Toggle this help"),
        help_line("  q / Esc   ", "Quit without choosing"),
        help_line("  Ctrl+C    ", "Quit (from anywhere)"),
        Line::from(""),
        Line::from(Span::styled("  Actions", theme::section_header())),
        Line::from(""),
        help_line("  1-4       ", "Pick by number"),
        help_line("  Enter     ", "Pick highlighted"),
        help_line("  Esc       ", "Back to instances"),
    ];

    let paragraph = Paragraph::new(help_text).block(block);
    frame.render_widget(paragraph, area);
}

fn help_line<'a>(key: &'a str, desc: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::styled(key, theme::accent_bold()),
        Span::raw(desc),
    ])
}

#[cfg(test)]
mod tests {
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn rendered_text() -> String {
        let mut terminal = Terminal::new(TestBackend::new(60, 26)).unwrap();
        terminal.draw(|frame| super::render(frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_help_lists_every_instance_key() {
        let text = rendered_text();
        for desc in [
            "Move down",
            "Choose an action",
            "SSH through a session",
            "Interactive shell session",
            "Send a shell command",
            "Print the instance ID",
            "Toggle this help",
            "Back to instances",
        ] {
            assert!(text.contains(desc), "missing {}", desc);
        }
    }
}
