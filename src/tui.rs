use std::io::{self, Stdout, stdout};
use std::sync::Once;

use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, prelude::CrosstermBackend};

use crate::app::App;
use crate::ui;

static PANIC_HOOK: Once = Once::new();

/// Full-screen terminal for the menu. The screen is restored on
/// [`Tui::exit`], on drop, and on panic.
pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    active: bool,
}

impl Tui {
    /// Switch to raw mode and the alternate screen.
    pub fn start() -> Result<Self> {
        // Hook goes in before raw mode so a panic never leaves the terminal raw
        PANIC_HOOK.call_once(|| {
            let original_hook = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |panic_info| {
                let _ = restore();
                original_hook(panic_info);
            }));
        });

        let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
        enable_raw_mode()?;
        if let Err(e) = io::stdout().execute(EnterAlternateScreen) {
            disable_raw_mode()?;
            return Err(e.into());
        }
        terminal.hide_cursor()?;
        terminal.clear()?;

        Ok(Self {
            terminal,
            active: true,
        })
    }

    /// Give the terminal back before anything else writes to it.
    pub fn exit(&mut self) -> Result<()> {
        if self.active {
            self.active = false;
            restore()?;
            self.terminal.show_cursor()?;
        }
        Ok(())
    }

    pub fn draw(&mut self, app: &mut App) -> Result<()> {
        self.terminal.draw(|frame| ui::render(frame, app))?;
        Ok(())
    }
}

fn restore() -> Result<()> {
    disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}

impl Drop for Tui {
    fn drop(&mut self) {
        let _ = self.exit();
    }
}
