use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

/// A generic XML tree node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XmlNode {
    /// Element tag name.
    pub tag: String,
    /// XML attributes keyed by name.
    pub attributes: BTreeMap<String, String>,
    /// Child elements.
    pub children: Vec<XmlNode>,
    /// Optional text content.
    pub text: Option<String>,
}

impl XmlNode {
    /// Create a new XML node with no attributes, children, or text.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
            text: None,
        }
    }

    /// Create a leaf node. Empty text is stored as `None`, matching the parser.
    pub fn leaf(tag: impl Into<String>, text: Option<&str>) -> Self {
        let mut node = Self::new(tag);
        node.set_text(text);
        node
    }

    /// Replace the node text; `None` and `""` both clear it.
    pub fn set_text(&mut self, text: Option<&str>) {
        self.text = text.filter(|t| !t.is_empty()).map(ToString::to_string);
    }

    /// True when the node holds no child elements.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Return the first child with the provided tag.
    pub fn get_child(&self, tag: &str) -> Option<&XmlNode> {
        self.children.iter().find(|child| child.tag == tag)
    }

    /// Mutable variant of [`XmlNode::get_child`].
    pub fn get_child_mut(&mut self, tag: &str) -> Option<&mut XmlNode> {
        self.children.iter_mut().find(|child| child.tag == tag)
    }

    /// Return all children with the provided tag.
    pub fn get_children(&self, tag: &str) -> Vec<&XmlNode> {
        self.children
            .iter()
            .filter(|child| child.tag == tag)
            .collect()
    }

    /// Walk a nested child path and return terminal node text if found.
    pub fn get_text<'a>(&'a self, path: &[&str]) -> Option<&'a str> {
        if path.is_empty() {
            return self.text.as_deref();
        }

        let mut current = self;
        for segment in path {
            current = current.get_child(segment)?;
        }
        current.text.as_deref()
    }

    /// Resolve a slash-separated path (`system/hostname`) below this node.
    ///
    /// The empty path resolves to `self`.
    pub fn find_path(&self, path: &str) -> Option<&XmlNode> {
        let mut current = self;
        for segment in path_segments(path) {
            current = current.get_child(segment)?;
        }
        Some(current)
    }

    /// Mutable variant of [`XmlNode::find_path`].
    pub fn find_path_mut(&mut self, path: &str) -> Option<&mut XmlNode> {
        let mut current = self;
        for segment in path_segments(path) {
            current = current.get_child_mut(segment)?;
        }
        Some(current)
    }

    /// Set the text of the first child named `tag`, appending a leaf if missing.
    pub fn upsert_child_text(&mut self, tag: &str, text: Option<&str>) {
        match self.get_child_mut(tag) {
            Some(child) => child.set_text(text),
            None => self.children.push(XmlNode::leaf(tag, text)),
        }
    }

    /// Remove every child named `tag` and return how many were dropped.
    pub fn remove_children(&mut self, tag: &str) -> usize {
        let before = self.children.len();
        self.children.retain(|child| child.tag != tag);
        before - self.children.len()
    }
}

/// Split a slash-separated path, ignoring empty segments.
pub fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// Split a path into its parent path and final segment.
pub fn split_parent(path: &str) -> Option<(String, &str)> {
    let segments: Vec<&str> = path_segments(path).collect();
    let (last, parents) = segments.split_last()?;
    Some((parents.join("/"), last))
}

impl Display for XmlNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.tag)?;
        for (key, value) in &self.attributes {
            write!(f, " {}=\"{}\"", key, value)?;
        }

        if self.children.is_empty() && self.text.is_none() {
            return write!(f, "/>");
        }

        write!(f, ">")?;
        if let Some(text) = &self.text {
            write!(f, "{}", text)?;
        }
        for child in &self.children {
            write!(f, "{}", child)?;
        }
        write!(f, "</{}>", self.tag)
    }
}
