use anyhow::Result;
use tracing::debug;

use crate::app::App;
use crate::directory::InstanceSummary;
use crate::dispatch::Selection;
use crate::event::{AppEvent, EventHandler};
use crate::handler;
use crate::tui::Tui;

const TICK_RATE_MS: u64 = 250;

/// Run the interactive picker until the user chooses or aborts.
///
/// Returns `None` on abort. The terminal is restored before returning, so
/// callers can write to stdout straight away.
pub fn run(instances: Vec<InstanceSummary>) -> Result<Option<Selection>> {
    let mut app = App::new(instances);
    let mut tui = Tui::start()?;
    let mut events = EventHandler::new(TICK_RATE_MS);

    while app.running {
        tui.draw(&mut app)?;
        match events.next()? {
            AppEvent::Key(key) => handler::handle_key_event(&mut app, key),
            AppEvent::Tick => app.tick_status(),
        }
    }

    tui.exit()?;
    debug!(selection = ?app.selection, "menu closed");
    Ok(app.selection)
}

/// Text of one menu row.
pub fn line_label(instance: &InstanceSummary) -> String {
    format!("{} ({})", instance.display_name(), instance.id)
}

/// The id inside the last parenthesised group of a menu row.
pub fn instance_id_from_line(line: &str) -> Option<&str> {
    let close = line.rfind(')')?;
    let open = line[..close].rfind('(')?;
    let id = line[open + 1..close].trim();
    if id.is_empty() { None } else { Some(id) }
}

/// Labelled fields for the preview panel.
pub fn detail_fields(instance: &InstanceSummary) -> Vec<(&'static str, String)> {
    fn or_dash(value: Option<&str>) -> String {
        match value {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => "-".to_string(),
        }
    }

    let tags = instance
        .tags
        .iter()
        .filter(|(key, _)| key != "Name")
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(", ");

    vec![
        ("Name", instance.display_name().to_string()),
        ("ID", instance.id.clone()),
        ("Uptime", or_dash(Some(&instance.uptime))),
        ("Image ID", or_dash(instance.image_id.as_deref())),
        ("Instance Type", or_dash(instance.instance_type.as_deref())),
        ("Private IP", or_dash(instance.private_ip.as_deref())),
        ("State", or_dash(instance.state.as_deref())),
        ("VPC ID", or_dash(instance.vpc_id.as_deref())),
        ("Subnet ID", or_dash(instance.subnet_id.as_deref())),
        ("Tags", or_dash(Some(&tags))),
    ]
}

/// Preview text for a menu row. Empty when the row names no known instance.
pub fn detail_text(line: &str, instances: &[InstanceSummary]) -> String {
    let Some(id) = instance_id_from_line(line) else {
        return String::new();
    };
    let Some(instance) = instances.iter().find(|i| i.id == id) else {
        return String::new();
    };
    detail_fields(instance)
        .into_iter()
        .map(|(label, value)| format!("{}: {}", label, value))
        .collect::<Vec<_>>()
        .join("\n")
}
