//! Deckstamp - slide cloning and placeholder substitution for PowerPoint templates
//!
//! A template presentation holds the slides a deck can be built from. A
//! configuration lists slide jobs: each names a 1-based source slide and the
//! data its `{{ path }}` placeholders are filled from. The engine builds a new
//! presentation that keeps the template's masters, layouts and theme and
//! contains exactly the requested slides, in order.
//!
//! # Features
//!
//! - **Slide cloning**: shapes, groups, tables, pictures and backgrounds are
//!   deep-copied, with the slide's layout resolved by name in the destination
//! - **Resource remapping**: images are re-registered (deduplicated by content)
//!   and every relationship reference in the copied markup is rewritten
//! - **Placeholder substitution**: dotted and indexed paths into nested JSON
//!   data, robust against placeholders split across runs
//! - **Format restoration**: the substituted run keeps the paragraph's visible
//!   formatting instead of falling back to theme defaults
//!
//! # Example
//!
//! ```no_run
//! use deckstamp::template::{TemplateConfig, TemplateEngine};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = TemplateEngine::open("template.pptx")?;
//! let config = TemplateConfig::from_json_str(
//!     r#"{"slides": [{"src_page": 1, "replace_texts": {"title": "Quarterly Review"}}]}"#,
//! )?;
//! engine.render_to_path(&config, "output.pptx")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Inspecting a template
//!
//! ```no_run
//! use deckstamp::ooxml::pptx::Package;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pkg = Package::open("template.pptx")?;
//! for master in pkg.slide_masters()? {
//!     println!("{}", master.name);
//!     for layout in pkg.layouts_of(&master.partname)? {
//!         println!("  {}", layout.name);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod common;
pub mod ooxml;
pub mod template;

pub use template::{
    DataTree, EngineOptions, RenderReport, SlideJob, TemplateConfig, TemplateEngine, TemplateError,
};
