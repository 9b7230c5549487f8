//! XML configuration tree primitives: parsing, writing, path navigation and
//! structural diffing.
//!
//! The tree keeps element order and attributes so a document can be loaded,
//! edited in place and written back as a whole.

pub mod diff;
pub mod format;
pub mod parser;
pub mod tree;
pub mod writer;

pub use diff::{diff, diff_with_options, trees_equal, DiffEntry, DiffOptions};
pub use format::{format_summary, format_text};
pub use parser::{parse, parse_file, parse_str, ParseError};
pub use tree::{path_segments, split_parent, XmlNode};
pub use writer::{write, write_document, write_file, WriteError};
