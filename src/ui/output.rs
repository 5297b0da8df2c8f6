use crate::ui::theme::{stderr_palette, stdout_palette};
use crate::ui::Icons;
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::ROCKET, text.style(stdout_palette().title));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(stdout_palette().done));
}

/// Failures go to stderr so `--json` output on stdout stays parseable
pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(stderr_palette().failure));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(stderr_palette().notice));
}

pub fn info(label: &str, value: &str) {
    println!("{} {}: {}", Icons::INFO, label.style(stdout_palette().label), value);
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(stdout_palette().title));
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(stdout_palette().label), value);
}
