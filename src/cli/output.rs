/// Standard output utilities for consistent command formatting
use crate::blast::job::RunStatus;
use colored::*;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color as TableColor, ContentArrangement, Table};
use serde::Serialize;

/// Display a section header
pub fn section_header(title: &str) {
    println!("\n{}", title.bold().cyan());
}

/// Display a success message
pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Display an info message
pub fn info(message: &str) {
    println!("{} {}", "●".blue(), message);
}

/// Display a warning message
pub fn warning(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// Display an error message
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Display an empty/none indicator
pub fn empty(message: &str) {
    println!("{} {}", "◌".dimmed(), message);
}

/// Tree structure item
pub fn tree_item(is_last: bool, label: &str, value: Option<&str>) {
    let prefix = if is_last { "└─" } else { "├─" };
    if let Some(val) = value {
        println!("{} {}: {}", prefix.dimmed(), label, val);
    } else {
        println!("{} {}", prefix.dimmed(), label);
    }
}

/// Create a standard table with our preferred styling
pub fn create_standard_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Create a standard header cell
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .add_attribute(Attribute::Bold)
        .fg(TableColor::Cyan)
}

/// Run status colored by outcome
pub fn status_cell(status: RunStatus) -> Cell {
    let color = match status {
        RunStatus::Complete => TableColor::Green,
        RunStatus::Error => TableColor::Red,
        RunStatus::InProgress | RunStatus::Ready => TableColor::Yellow,
        RunStatus::Uninitialized => TableColor::Grey,
    };
    Cell::new(status.to_string()).fg(color)
}

pub fn colored_status(status: RunStatus) -> ColoredString {
    let text = status.to_string();
    match status {
        RunStatus::Complete => text.green(),
        RunStatus::Error => text.red(),
        RunStatus::InProgress | RunStatus::Ready => text.yellow(),
        RunStatus::Uninitialized => text.dimmed(),
    }
}

/// Pretty JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Format an e-value compactly
pub fn format_evalue(evalue: f64) -> String {
    if evalue == 0.0 {
        "0".to_string()
    } else if evalue < 1e-3 {
        format!("{:.1e}", evalue)
    } else {
        format!("{:.3}", evalue)
    }
}
