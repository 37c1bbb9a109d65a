//! Office Open XML (OOXML) support for PresentationML packages.
//!
//! Two layers:
//!
//! 1. **OPC Layer** (`opc`): the package container (ZIP, parts, relationships)
//! 2. **PresentationML** (`pptx`): presentation, slides, layouts, masters and
//!    the DrawingML text model, all editable in place
//!
//! # Example
//!
//! ```rust,no_run
//! use deckstamp::ooxml::pptx::Package;
//!
//! let pkg = Package::open("template.pptx")?;
//! for master in pkg.slide_masters()? {
//!     println!("{}", master.name);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
pub mod error;
pub mod opc;
pub mod pptx;

pub use error::{OoxmlError, Result};
pub use opc::{OpcPackage, PackURI};
