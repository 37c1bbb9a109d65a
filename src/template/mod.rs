//! Slide cloning and placeholder substitution.
//!
//! A render runs a [`TemplateConfig`] against a template presentation:
//!
//! - [`cloner`] copies the requested slide into the destination, resolving
//!   its layout by name ([`layout`]) and re-creating its relationships
//!   ([`remap`])
//! - [`placeholder`] replaces `{{ path }}` tokens using [`path`] lookups into
//!   the job's [`DataTree`]
//! - [`runs`] collapses rewritten paragraphs into one run and restores their
//!   formatting
//!
//! [`TemplateEngine`] ties these together.

pub mod cloner;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod layout;
pub mod path;
pub mod placeholder;
pub mod remap;
pub mod runs;

pub use cloner::{ClonedSlide, clone_slide};
pub use config::{ConfigSource, EngineOptions, SlideJob, TemplateConfig};
pub use data::DataTree;
pub use engine::{RenderReport, SlideReport, TemplateEngine, run, substitute_slide};
pub use error::{ResolveError, Result, TemplateError};
pub use path::{PathExpression, Segment, resolve};
pub use placeholder::{Substitution, Unresolved, sanitize_control_chars, substitute};
pub use remap::{ResourceIdMap, ResourceRemapper};
pub use runs::{FontContext, RunFormat};
