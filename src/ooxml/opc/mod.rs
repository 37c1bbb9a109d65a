//! Open Packaging Conventions (OPC).
//!
//! The container layer beneath PresentationML: parts addressed by partname,
//! relationships between them, content types, and the ZIP physical format.
//! Packages are loaded by walking the relationship graph from the package
//! relationships and written back the same way, so only reachable parts
//! survive a round trip.

pub mod constants;
pub mod error;
pub mod package;
pub mod packuri;
pub mod part;
pub mod phys_pkg;
pub mod pkgreader;
pub mod pkgwriter;
pub mod rel;

pub use error::{OpcError, Result};
pub use package::OpcPackage;
pub use packuri::PackURI;
pub use part::{BlobPart, Part, XmlPart};
pub use rel::{Relationship, Relationships};
