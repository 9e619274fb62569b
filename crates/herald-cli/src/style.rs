use console::style;
use std::fmt::Display;

/// Green bold, for completed runs and confirmations.
pub fn success<D: Display>(text: D) -> String {
    style(text).green().bold().to_string()
}

/// White bold, for section headers.
pub fn header<D: Display>(text: D) -> String {
    style(text).white().bold().to_string()
}

pub fn dim<D: Display>(text: D) -> String {
    style(text).dim().to_string()
}

/// Yellow, for runs waiting on a reviewer.
pub fn pending<D: Display>(text: D) -> String {
    style(text).yellow().bold().to_string()
}

pub fn failure<D: Display>(text: D) -> String {
    style(text).red().bold().to_string()
}

/// Cyan, for field labels.
pub fn label<D: Display>(text: D) -> String {
    style(text).cyan().to_string()
}
