//! Pure formatting functions for UI output.
//!
//! Functions here only format and print; they never read input.

use crate::resolver::Resolution;
use crate::warning::ResolutionWarning;
use console::style;

const RULE: &str = "----------------------------------------------";

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Display a resolution warning to the user.
pub fn display_warning(warning: &ResolutionWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), warning);
}

/// Boxed one-line banner, e.g. `Project version: 1.2.0`
pub fn banner(label: &str, value: &str) -> String {
    format!("{}\n        {}: {}\n{}", RULE, label, value, RULE)
}

pub fn display_banner(label: &str, value: &str) {
    println!("{}", banner(label, &style(value).bold().to_string()));
}

/// Lines describing how a version was resolved, for `--verbose` output
pub fn resolution_details(resolution: &Resolution) -> Vec<String> {
    let resolved = &resolution.resolved;
    let mut lines = vec![
        format!(
            "Branch:      {} ({})",
            resolution.branch.name, resolution.branch.kind
        ),
        format!("Revision:    {}", resolution.revision_id),
        format!("Source:      {}", resolved.source_ref_name),
        format!("Base:        {}", resolved.version),
        format!("Pre-version: {}", resolution.pre_version),
    ];
    if resolved.changed {
        lines.push("Changed:     yes".to_string());
    }
    if resolved.is_default {
        lines.push("Default:     yes".to_string());
    }
    lines
}

pub fn display_resolution(resolution: &Resolution) {
    for line in resolution_details(resolution) {
        println!("  {}", style(line).dim());
    }
}
