//! Structural diffing of two XML trees.
//!
//! Paths are slash-separated from the compared root (`opnsense/system/hostname`).
//! Repeated siblings get a positional suffix (`rule[2]`), or the value of their
//! key field when one is configured for the tag (`alias[host_test]`).

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::XmlNode;

/// A single diff outcome for a node path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum DiffEntry {
    /// Node exists in both with identical content.
    Identical { path: String },
    /// Node exists in both but text/attributes differ.
    Modified {
        path: String,
        left: String,
        right: String,
    },
    /// Node only in the left input.
    OnlyLeft { path: String, node: XmlNode },
    /// Node only in the right input.
    OnlyRight { path: String, node: XmlNode },
    /// Structural mismatch (for example, node tag mismatch).
    Structural { path: String, description: String },
}

impl DiffEntry {
    /// Path of the node this entry describes.
    pub fn path(&self) -> &str {
        match self {
            DiffEntry::Identical { path }
            | DiffEntry::Modified { path, .. }
            | DiffEntry::OnlyLeft { path, .. }
            | DiffEntry::OnlyRight { path, .. }
            | DiffEntry::Structural { path, .. } => path,
        }
    }
}

/// Configures tree diff behavior.
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Include [`DiffEntry::Identical`] rows.
    pub include_identical: bool,
    /// Maximum recursion depth. `None` means unlimited.
    pub max_depth: Option<usize>,
    /// Map from tag -> child tag used as key for repeated-element matching.
    pub key_fields: HashMap<String, String>,
    /// Paths or tag names to ignore.
    pub ignore_paths: Vec<String>,
    /// Compare text exactly instead of trimmed.
    pub strict_text: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            include_identical: false,
            max_depth: None,
            key_fields: HashMap::new(),
            ignore_paths: Vec::new(),
            strict_text: false,
        }
    }
}

impl DiffOptions {
    /// Match repeated `tag` elements by the text of their `field` child.
    pub fn with_key_field(mut self, tag: &str, field: &str) -> Self {
        self.key_fields.insert(tag.to_string(), field.to_string());
        self
    }

    /// Treat surrounding whitespace in text as significant.
    pub fn with_strict_text(mut self) -> Self {
        self.strict_text = true;
        self
    }
}

/// Diff two XML trees with default options.
pub fn diff(left: &XmlNode, right: &XmlNode) -> Vec<DiffEntry> {
    diff_with_options(left, right, &DiffOptions::default())
}

/// Diff two XML trees with custom options.
pub fn diff_with_options(left: &XmlNode, right: &XmlNode, opts: &DiffOptions) -> Vec<DiffEntry> {
    let mut out = Vec::new();
    let mut walker = Walker { opts, out: &mut out };
    walker.node(left, right, &left.tag, 0);
    out
}

/// True when both trees have the same tags, attributes, children and exact text.
///
/// Empty and whitespace-only text count as no text.
pub fn trees_equal(left: &XmlNode, right: &XmlNode) -> bool {
    diff_with_options(left, right, &DiffOptions::default().with_strict_text()).is_empty()
}

struct Walker<'a> {
    opts: &'a DiffOptions,
    out: &'a mut Vec<DiffEntry>,
}

impl Walker<'_> {
    fn node(&mut self, left: &XmlNode, right: &XmlNode, path: &str, depth: usize) {
        if should_ignore(path, self.opts) {
            return;
        }
        if self.opts.max_depth.is_some_and(|max| depth > max) {
            return;
        }

        let start_len = self.out.len();

        if left.tag != right.tag {
            self.out.push(DiffEntry::Structural {
                path: path.to_string(),
                description: format!("tag mismatch: left='{}' right='{}'", left.tag, right.tag),
            });
            self.children(left, right, path, depth);
            return;
        }

        if left.attributes != right.attributes
            || compared_text(&left.text, self.opts) != compared_text(&right.text, self.opts)
        {
            self.out.push(DiffEntry::Modified {
                path: path.to_string(),
                left: local_signature(left),
                right: local_signature(right),
            });
        }

        self.children(left, right, path, depth);

        if self.opts.include_identical && self.out.len() == start_len {
            self.out.push(DiffEntry::Identical {
                path: path.to_string(),
            });
        }
    }

    fn children(&mut self, left: &XmlNode, right: &XmlNode, path: &str, depth: usize) {
        let opts = self.opts;
        let mut tags: Vec<&str> = Vec::new();
        for child in left.children.iter().chain(&right.children) {
            if !tags.contains(&child.tag.as_str()) {
                tags.push(&child.tag);
            }
        }

        for tag in tags {
            let left_nodes: Vec<&XmlNode> = left.children.iter().filter(|n| n.tag == tag).collect();
            let right_nodes: Vec<&XmlNode> =
                right.children.iter().filter(|n| n.tag == tag).collect();

            // Keyed matching only applies when every sibling carries the key.
            let key_field = opts.key_fields.get(tag).filter(|field| {
                left_nodes
                    .iter()
                    .chain(&right_nodes)
                    .all(|n| n.get_text(&[field.as_str()]).is_some())
            });
            match key_field {
                Some(key_field) => {
                    self.match_by_key(tag, key_field, &left_nodes, &right_nodes, path, depth)
                }
                None => self.match_by_index(tag, &left_nodes, &right_nodes, path, depth),
            }
        }
    }

    fn match_by_index(
        &mut self,
        tag: &str,
        left_nodes: &[&XmlNode],
        right_nodes: &[&XmlNode],
        parent: &str,
        depth: usize,
    ) {
        let max = left_nodes.len().max(right_nodes.len());
        for i in 0..max {
            let child_path = if max == 1 {
                format!("{parent}/{tag}")
            } else {
                format!("{parent}/{tag}[{}]", i + 1)
            };
            match (left_nodes.get(i), right_nodes.get(i)) {
                (Some(l), Some(r)) => self.node(l, r, &child_path, depth + 1),
                (Some(l), None) => self.only_left(child_path, l),
                (None, Some(r)) => self.only_right(child_path, r),
                (None, None) => {}
            }
        }
    }

    fn match_by_key(
        &mut self,
        tag: &str,
        key_field: &str,
        left_nodes: &[&XmlNode],
        right_nodes: &[&XmlNode],
        parent: &str,
        depth: usize,
    ) {
        let right_keys: Vec<Option<&str>> = right_nodes
            .iter()
            .map(|n| n.get_text(&[key_field]))
            .collect();
        let mut used_right = HashSet::new();

        for (left_idx, left_node) in left_nodes.iter().enumerate() {
            let left_key = left_node.get_text(&[key_field]);
            let child_path = keyed_path(parent, tag, left_key, left_idx);

            let matched = left_key.and_then(|key| {
                right_keys
                    .iter()
                    .enumerate()
                    .find(|(idx, right_key)| !used_right.contains(idx) && **right_key == Some(key))
                    .map(|(idx, _)| idx)
            });

            match matched {
                Some(right_idx) => {
                    used_right.insert(right_idx);
                    self.node(left_node, right_nodes[right_idx], &child_path, depth + 1);
                }
                None => self.only_left(child_path, left_node),
            }
        }

        for (right_idx, right_node) in right_nodes.iter().enumerate() {
            if used_right.contains(&right_idx) {
                continue;
            }
            let child_path = keyed_path(parent, tag, right_keys[right_idx], right_idx);
            self.only_right(child_path, right_node);
        }
    }

    fn only_left(&mut self, path: String, node: &XmlNode) {
        if !should_ignore(&path, self.opts) {
            self.out.push(DiffEntry::OnlyLeft {
                path,
                node: node.clone(),
            });
        }
    }

    fn only_right(&mut self, path: String, node: &XmlNode) {
        if !should_ignore(&path, self.opts) {
            self.out.push(DiffEntry::OnlyRight {
                path,
                node: node.clone(),
            });
        }
    }
}

fn keyed_path(parent: &str, tag: &str, key: Option<&str>, idx: usize) -> String {
    match key {
        Some(key) => format!("{parent}/{tag}[{key}]"),
        None => format!("{parent}/{tag}[{}]", idx + 1),
    }
}

fn should_ignore(path: &str, opts: &DiffOptions) -> bool {
    opts.ignore_paths.iter().any(|ignore| {
        path == ignore
            || path.ends_with(&format!("/{ignore}"))
            || path.contains(&format!("/{ignore}["))
    })
}

fn normalize_text(input: &Option<String>) -> Option<&str> {
    input.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn compared_text<'a>(input: &'a Option<String>, opts: &DiffOptions) -> Option<&'a str> {
    if opts.strict_text {
        input.as_deref().filter(|s| !s.trim().is_empty())
    } else {
        normalize_text(input)
    }
}

fn local_signature(node: &XmlNode) -> String {
    format!(
        "attributes={:?}, text={:?}",
        node.attributes,
        normalize_text(&node.text)
    )
}

#[cfg(test)]
mod tests {
    use super::{diff, diff_with_options, trees_equal, DiffEntry, DiffOptions};
    use crate::parse_str;

    #[test]
    fn single_children_get_plain_paths() {
        let left = parse_str("<opnsense><system><hostname>a</hostname></system></opnsense>")
            .expect("left");
        let right = parse_str("<opnsense><system><hostname>b</hostname></system></opnsense>")
            .expect("right");

        let entries = diff(&left, &right);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path(), "opnsense/system/hostname");
    }

    #[test]
    fn surrounding_whitespace_in_text_is_not_a_change() {
        let left = parse_str("<a><content>\n10.0.0.1\n</content></a>").expect("left");
        let right = parse_str("<a><content>10.0.0.1</content></a>").expect("right");
        assert!(diff(&left, &right).is_empty());
    }

    #[test]
    fn trees_equal_compares_text_exactly() {
        let left = parse_str("<a><hostname>fw01</hostname><empty/></a>").expect("left");
        let mut right = left.clone();
        assert!(trees_equal(&left, &right));

        right.children[0].set_text(Some(" fw01 "));
        assert!(!trees_equal(&left, &right));
        assert!(diff(&left, &right).is_empty());

        right.children[0].set_text(Some("fw01"));
        right.children[1].text = Some("  ".to_string());
        assert!(trees_equal(&left, &right));
    }

    #[test]
    fn siblings_without_key_fall_back_to_positions() {
        let left = parse_str("<f><rule><descr>a</descr></rule><rule/></f>").expect("left");
        let right = parse_str("<f><rule><descr>a</descr></rule><rule/></f>").expect("right");
        let opts = DiffOptions::default().with_key_field("rule", "uuid");
        assert!(diff_with_options(&left, &right, &opts).is_empty());
    }

    #[test]
    fn extra_repeated_child_is_reported_with_index() {
        let left = parse_str("<f><rule/><rule/></f>").expect("left");
        let right = parse_str("<f><rule/></f>").expect("right");

        let entries = diff(&left, &right);
        assert!(matches!(
            entries.as_slice(),
            [DiffEntry::OnlyLeft { path, .. }] if path == "f/rule[2]"
        ));
    }
}
