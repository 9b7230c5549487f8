use colored::Colorize;
use xml_config_core::{format_summary, format_text, DiffEntry};

use crate::alias::FirewallAlias;
use crate::store::SettingsDiff;

/// Render diff entries for terminal output.
pub fn render_text(entries: &[DiffEntry]) -> String {
    let raw = format_text(entries);
    let mut out = Vec::new();

    for line in raw.lines() {
        let colored = if line.starts_with('+') {
            line.green().to_string()
        } else if line.starts_with('-') {
            line.red().to_string()
        } else if line.starts_with('~') {
            line.yellow().to_string()
        } else if line.starts_with('!') {
            line.magenta().to_string()
        } else {
            line.to_string()
        };
        out.push(colored);
    }

    out.join("\n")
}

/// Render summary counts for terminal output.
pub fn render_summary(entries: &[DiffEntry]) -> String {
    format_summary(entries).cyan().to_string()
}

/// Render the settings whose text changed, one `path: before -> after` per line.
pub fn render_settings_diff(diff: &SettingsDiff) -> String {
    let mut out = Vec::new();
    for path in diff.changed_paths() {
        let before = diff.before.get(path).cloned().flatten();
        let after = diff.after.get(path).cloned().flatten();
        out.push(format!(
            "~ {path}: {} -> {}",
            show(before.as_deref()).red(),
            show(after.as_deref()).green()
        ));
    }
    out.join("\n")
}

/// One line per alias: name, type, enabled flag and content.
pub fn render_aliases(aliases: &[FirewallAlias]) -> String {
    let mut out = Vec::new();
    for alias in aliases {
        let state = if alias.enabled {
            "enabled".green()
        } else {
            "disabled".dimmed()
        };
        out.push(format!(
            "{} type={} {} content={}",
            alias.name.bold(),
            alias.alias_type,
            state,
            alias.content.join(",")
        ));
    }
    out.join("\n")
}

fn show(value: Option<&str>) -> &str {
    value.unwrap_or("<none>")
}
