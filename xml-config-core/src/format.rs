//! Diff output formatters.
//!
//! The left tree is read as the persisted state and the right tree as the
//! pending one, so `OnlyLeft` renders as a removal and `OnlyRight` as an addition.

use crate::diff::DiffEntry;

/// Format diff entries as plain text, one change per line group.
pub fn format_text(entries: &[DiffEntry]) -> String {
    let mut lines = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry {
            DiffEntry::Identical { path } => lines.push(format!("= {path}")),
            DiffEntry::Modified { path, left, right } => {
                lines.push(format!("~ {path}"));
                lines.push(format!("  before: {left}"));
                lines.push(format!("  after:  {right}"));
            }
            DiffEntry::OnlyLeft { path, .. } => lines.push(format!("- {path}")),
            DiffEntry::OnlyRight { path, .. } => lines.push(format!("+ {path}")),
            DiffEntry::Structural { path, description } => {
                lines.push(format!("! {path}: {description}"));
            }
        }
    }
    lines.join("\n")
}

/// Format a one-line summary of diff counts.
pub fn format_summary(entries: &[DiffEntry]) -> String {
    let (mut modified, mut removed, mut added, mut structural) = (0, 0, 0, 0);
    for entry in entries {
        match entry {
            DiffEntry::Identical { .. } => {}
            DiffEntry::Modified { .. } => modified += 1,
            DiffEntry::OnlyLeft { .. } => removed += 1,
            DiffEntry::OnlyRight { .. } => added += 1,
            DiffEntry::Structural { .. } => structural += 1,
        }
    }
    format!("modified={modified} removed={removed} added={added} structural={structural}")
}

#[cfg(test)]
mod tests {
    use super::{format_summary, format_text};
    use crate::{diff, parse_str};

    #[test]
    fn text_marks_additions_and_modifications() {
        let left = parse_str("<c><name>a</name></c>").expect("left");
        let right = parse_str("<c><name>b</name><descr>x</descr></c>").expect("right");
        let entries = diff(&left, &right);

        let text = format_text(&entries);
        assert!(text.contains("~ c/name"));
        assert!(text.contains("+ c/descr"));
        assert_eq!(
            format_summary(&entries),
            "modified=1 removed=0 added=1 structural=0"
        );
    }
}
