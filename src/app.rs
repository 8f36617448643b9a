use ratatui::widgets::ListState;

use crate::directory::InstanceSummary;
use crate::dispatch::{Action, Selection};

/// Which screen is currently displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    InstanceList,
    /// Confirm was pressed; pick what to do with the highlighted instance.
    ActionMenu,
    /// Typing the command for [`Action::SendCommand`].
    CommandInput,
    Help,
}

/// Status message displayed at the bottom.
#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
    pub tick_count: u32,
}

/// Menu state for one run of the picker.
pub struct App {
    pub screen: Screen,
    pub running: bool,
    pub instances: Vec<InstanceSummary>,

    pub list_state: ListState,
    pub action_state: ListState,

    pub command_input: String,

    pub status: Option<StatusMessage>,

    /// Set once the user has picked both an instance and an action.
    pub selection: Option<Selection>,
}

impl App {
    pub fn new(instances: Vec<InstanceSummary>) -> Self {
        let mut list_state = ListState::default();
        if !instances.is_empty() {
            list_state.select(Some(0));
        }

        Self {
            screen: Screen::InstanceList,
            running: true,
            instances,
            list_state,
            action_state: ListState::default(),
            command_input: String::new(),
            status: None,
            selection: None,
        }
    }

    /// The highlighted instance.
    pub fn selected_instance(&self) -> Option<&InstanceSummary> {
        self.list_state.selected().and_then(|i| self.instances.get(i))
    }

    /// Move selection down, wrapping to the top.
    pub fn select_next(&mut self) {
        if let Some(i) = cycle(self.list_state.selected(), self.instances.len(), true) {
            self.list_state.select(Some(i));
        }
    }

    /// Move selection up, wrapping to the bottom.
    pub fn select_prev(&mut self) {
        if let Some(i) = cycle(self.list_state.selected(), self.instances.len(), false) {
            self.list_state.select(Some(i));
        }
    }

    pub fn select_first(&mut self) {
        if !self.instances.is_empty() {
            self.list_state.select(Some(0));
        }
    }

    pub fn select_last(&mut self) {
        if !self.instances.is_empty() {
            self.list_state.select(Some(self.instances.len() - 1));
        }
    }

    pub fn select_next_action(&mut self) {
        let i = cycle(self.action_state.selected(), Action::ALL.len(), true);
        self.action_state.select(i);
    }

    pub fn select_prev_action(&mut self) {
        let i = cycle(self.action_state.selected(), Action::ALL.len(), false);
        self.action_state.select(i);
    }

    pub fn highlighted_action(&self) -> Option<Action> {
        self.action_state
            .selected()
            .and_then(|i| Action::ALL.get(i).copied())
    }

    /// Confirm key: open the action sub-menu for the highlighted instance.
    pub fn open_action_menu(&mut self) {
        if self.selected_instance().is_some() {
            self.action_state.select(Some(0));
            self.screen = Screen::ActionMenu;
        }
    }

    /// Bind `action` to the highlighted instance. Send-command asks for
    /// the command text first.
    pub fn choose(&mut self, action: Action) {
        let Some(instance_id) = self.selected_instance().map(|i| i.id.clone()) else {
            return;
        };
        if action == Action::SendCommand {
            self.command_input.clear();
            self.screen = Screen::CommandInput;
            return;
        }
        self.finish(Selection {
            instance_id,
            action,
            command: None,
        });
    }

    /// Submit the typed command.
    pub fn submit_command(&mut self) {
        let command = self.command_input.trim().to_string();
        if command.is_empty() {
            self.set_status("Type a command to run, or Esc to go back.", true);
            return;
        }
        let Some(instance_id) = self.selected_instance().map(|i| i.id.clone()) else {
            return;
        };
        self.finish(Selection {
            instance_id,
            action: Action::SendCommand,
            command: Some(command),
        });
    }

    /// Leave without choosing anything.
    pub fn abort(&mut self) {
        self.selection = None;
        self.running = false;
    }

    fn finish(&mut self, selection: Selection) {
        self.selection = Some(selection);
        self.running = false;
    }

    /// Set a status message.
    pub fn set_status(&mut self, text: impl Into<String>, is_error: bool) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error,
            tick_count: 0,
        });
    }

    /// Tick the status message timer. Errors show for 5s, others for 3s.
    pub fn tick_status(&mut self) {
        if let Some(ref mut status) = self.status {
            status.tick_count += 1;
            let timeout = if status.is_error { 20 } else { 12 };
            if status.tick_count > timeout {
                self.status = None;
            }
        }
    }
}

fn cycle(current: Option<usize>, len: usize, forward: bool) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match current {
        Some(i) if forward => (i + 1) % len,
        Some(i) => (i + len - 1) % len,
        None => 0,
    })
}
