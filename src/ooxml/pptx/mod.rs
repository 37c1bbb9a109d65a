//! PowerPoint (.pptx) presentations.
//!
//! [`Package`] opens a presentation for editing. Presentation-level
//! operations (slide list, masters, adding and removing slides) live in
//! [`presentation`], slide/layout/master navigation in [`slide`], and the
//! DrawingML paragraph and run model in [`text`].
pub mod package;
pub mod presentation;
pub mod slide;
pub mod text;

pub use package::Package;
pub use slide::{LayoutRef, MasterRef, SlideRef};
pub use text::{Paragraph, Run};
