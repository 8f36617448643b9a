use std::sync::atomic::{AtomicU8, Ordering};

use ratatui::style::{Color, Modifier, Style};

/// Color mode: 0 = NO_COLOR, 1 = ANSI 16, 2 = truecolor.
static COLOR_MODE: AtomicU8 = AtomicU8::new(1);

/// Read NO_COLOR and COLORTERM. Call once before the menu starts.
pub fn init() {
    if std::env::var_os("NO_COLOR").is_some() {
        COLOR_MODE.store(0, Ordering::Release);
    } else if std::env::var("COLORTERM")
        .map(|v| v == "truecolor" || v == "24bit")
        .unwrap_or(false)
    {
        COLOR_MODE.store(2, Ordering::Release);
    }
}

/// Title badge. AWS orange in truecolor, yellow on ANSI 16, reversed
/// without color.
pub fn brand_badge() -> Style {
    match COLOR_MODE.load(Ordering::Acquire) {
        0 => Style::default()
            .add_modifier(Modifier::BOLD | Modifier::REVERSED)
            .remove_modifier(Modifier::DIM),
        2 => Style::default()
            .fg(Color::Black)
            .bg(Color::Rgb(255, 153, 0))
            .add_modifier(Modifier::BOLD)
            .remove_modifier(Modifier::DIM),
        _ => Style::default()
            .fg(Color::Black)
            .bg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
            .remove_modifier(Modifier::DIM),
    }
}

/// Overlay titles.
pub fn brand() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

/// Overlay borders.
pub fn accent() -> Style {
    Style::default()
}

/// Keys in the footer and help.
pub fn accent_bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

/// Enter.
pub fn primary_action() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

pub fn muted() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

pub fn section_header() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

/// Highlighted list row.
pub fn selected() -> Style {
    Style::default().add_modifier(Modifier::REVERSED)
}

pub fn error() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

pub fn success() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

pub fn border() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

pub fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}
