//! XML helpers shared by the package and template layers.
pub mod escape;
pub mod tree;

pub use escape::{escape_attr, escape_text, unescape};
pub use tree::{XmlDocument, XmlElement, XmlError, XmlNode, split_prefix};
