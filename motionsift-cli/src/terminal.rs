//! Terminal output styling for motionsift.
//!
//! Output goes through `log::info!` so it lands in the log file as well as on
//! the console. Styling uses `console` and is disabled when `NO_COLOR` is set.

use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::info;
use std::io::IsTerminal;
use std::time::Duration;

const STATUS_INDENT: &str = "      ";
const LABEL_WIDTH: usize = 15;

/// Check if color should be used (respects NO_COLOR environment variable)
fn should_use_color() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

/// Print a section header for major workflow phases
pub fn print_section(title: &str) {
    info!("");
    if should_use_color() {
        info!("===== {} =====", style(title.to_uppercase()).cyan());
    } else {
        info!("===== {} =====", title.to_uppercase());
    }
    info!("");
}

/// Print a subsection header
pub fn print_subsection(title: &str) {
    if should_use_color() {
        info!("  {}", style(title).bold());
    } else {
        info!("  {title}");
    }
}

/// Formats a key-value status line without styling.
pub fn format_status(label: &str, value: &str) -> String {
    let padding = LABEL_WIDTH.saturating_sub(label.chars().count()).max(1);
    format!("{STATUS_INDENT}{label}:{} {value}", " ".repeat(padding))
}

/// Print a status line (key-value pair)
pub fn print_status(label: &str, value: &str, highlight: bool) {
    if should_use_color() && highlight {
        info!("{}", format_status(label, &style(value).bold().to_string()));
    } else {
        info!("{}", format_status(label, value));
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    info!("");
    if should_use_color() {
        info!("  ✓ {}", style(message).green());
    } else {
        info!("  ✓ {message}");
    }
}

/// Print a warning message
pub fn print_warning(message: &str) {
    if should_use_color() {
        info!("  ⚠ {}", style(message).yellow());
    } else {
        info!("  ⚠ {message}");
    }
}

/// Print an error message
pub fn print_error(title: &str, message: &str, suggestion: Option<&str>) {
    if should_use_color() {
        info!("✗ {}", style(title).red().bold());
    } else {
        info!("✗ {title}");
    }

    info!("");
    info!("  Message:  {message}");

    if let Some(suggestion_text) = suggestion {
        info!("");
        info!("  Suggestion: {suggestion_text}");
    }

    info!("");
}

/// Creates the per-batch progress bar. Hidden when stderr is not a terminal.
pub fn batch_progress_bar(total_files: usize) -> ProgressBar {
    let pb = ProgressBar::new(total_files as u64);
    if let Ok(bar_style) = ProgressStyle::default_bar()
        .template("  ⧖ {pos}/{len} files [{bar:30}] {elapsed_precise} {msg}")
    {
        pb.set_style(bar_style.progress_chars("##."));
    }

    if !std::io::stderr().is_terminal() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        pb.enable_steady_tick(Duration::from_millis(200));
    }
    pb
}
