//! Markdown rendering for release changelogs.

use crate::models::{ChangeEntry, ReleaseChangelog};

/// Render a release changelog as markdown.
///
/// Example output:
/// ```text
/// ## 1.2.0 - Spring cleanup
///
/// Faster sign-in and fewer settings.
///
/// ### Authentication
///
/// - **ADDED** Passkey login
/// - **CHANGED** Session lifetime is now 30 days
///   Applies to new sessions only.
///
/// ### Settings
///
/// - **REMOVED** Legacy theme picker
/// ```
pub fn render_changelog_markdown(changelog: &ReleaseChangelog) -> String {
    let release = &changelog.release;
    let mut output = String::new();

    output.push_str("## ");
    output.push_str(&release.version_label);
    if let Some(title) = release.title.as_deref().filter(|t| !t.is_empty()) {
        output.push_str(" - ");
        output.push_str(title);
    }
    output.push('\n');

    if let Some(summary) = release.summary.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        output.push('\n');
        output.push_str(summary);
        output.push('\n');
    }

    for section in &changelog.sections {
        output.push_str("\n### ");
        output.push_str(&section.feature.name);
        output.push_str("\n\n");
        for entry in &section.entries {
            render_entry(&mut output, entry);
        }
    }

    output
}

fn render_entry(output: &mut String, entry: &ChangeEntry) {
    output.push_str("- **");
    output.push_str(entry.change_type.as_str());
    output.push_str("** ");
    output.push_str(&entry.title);
    output.push('\n');

    // Details hang under the bullet so markdown keeps them in the list item
    if let Some(details) = entry.details_md.as_deref() {
        for line in details.trim_end().lines() {
            if line.is_empty() {
                output.push('\n');
            } else {
                output.push_str("  ");
                output.push_str(line);
                output.push('\n');
            }
        }
    }
}
