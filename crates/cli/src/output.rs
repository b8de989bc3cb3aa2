//! Output formatting utilities

use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of rows
pub fn print_table<T: Tabled>(rows: Vec<T>) {
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print a value as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Format a probability as a percentage
pub fn format_probability(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "active" => status.green().to_string(),
        "risk" => status.red().bold().to_string(),
        _ => status.to_string(),
    }
}

/// Color a probability by the status the service assigned to it
pub fn color_probability(probability: f64, status: &str) -> String {
    probability_style(probability, status).to_string()
}

fn probability_style(probability: f64, status: &str) -> ColoredString {
    let formatted = format_probability(probability);
    match status.to_lowercase().as_str() {
        "risk" => formatted.red().bold(),
        "healthy" => formatted.green(),
        _ => formatted.normal(),
    }
}
