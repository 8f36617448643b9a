use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, Screen};
use crate::dispatch::Action;

/// Handle a key event based on the current screen.
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    // Ctrl+C aborts from every screen
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.abort();
        return;
    }

    match app.screen {
        Screen::InstanceList => handle_instance_list(app, key),
        Screen::ActionMenu => handle_action_menu(app, key),
        Screen::CommandInput => handle_command_input(app, key),
        Screen::Help => handle_help(app, key),
    }
}

fn handle_instance_list(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.abort(),
        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.select_prev(),
        KeyCode::Char('g') | KeyCode::Home => app.select_first(),
        KeyCode::Char('G') | KeyCode::End => app.select_last(),
        KeyCode::Enter => app.open_action_menu(),
        KeyCode::Char('?') => app.screen = Screen::Help,
        KeyCode::Char(c) => {
            if let Some(action) = Action::from_shortcut(c) {
                app.choose(action);
            }
        }
        _ => {}
    }
}

fn handle_action_menu(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.screen = Screen::InstanceList,
        KeyCode::Char('j') | KeyCode::Down => app.select_next_action(),
        KeyCode::Char('k') | KeyCode::Up => app.select_prev_action(),
        KeyCode::Enter => {
            if let Some(action) = app.highlighted_action() {
                app.choose(action);
            }
        }
        KeyCode::Char(c @ '1'..='9') => {
            let index = (c as usize) - ('1' as usize);
            if let Some(&action) = Action::ALL.get(index) {
                app.choose(action);
            }
        }
        _ => {}
    }
}

fn handle_command_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.screen = Screen::InstanceList,
        KeyCode::Enter => app.submit_command(),
        KeyCode::Backspace => {
            app.command_input.pop();
        }
        KeyCode::Char(c) => app.command_input.push(c),
        _ => {}
    }
}

fn handle_help(app: &mut App, key: KeyEvent) {
    if let KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') = key.code {
        app.screen = Screen::InstanceList;
    }
}
