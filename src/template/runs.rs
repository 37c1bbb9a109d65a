//! Run collapse and format restoration.
//!
//! PowerPoint splits text into runs wherever formatting or editing history
//! changes, so a placeholder can span several runs. A paragraph that needs
//! substitution is rewritten as a single run. That run takes the formatting
//! of a reference run of the paragraph, or the slide's fallback font.

use crate::common::xml::XmlElement;
use crate::ooxml::pptx::text::{self, Paragraph, Run};
use smallvec::SmallVec;

/// Distinct font names used by non-blank runs of one slide, in document
/// order. Built before substitution and dropped with the slide.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FontContext {
    fonts: SmallVec<[String; 4]>,
}

impl FontContext {
    pub fn collect(root: &XmlElement) -> Self {
        let mut fonts: SmallVec<[String; 4]> = SmallVec::new();
        for paragraph in text::paragraphs(root) {
            for run in paragraph.runs() {
                if run.text().trim().is_empty() {
                    continue;
                }
                if let Some(font) = run.font_name() {
                    if !fonts.contains(&font) {
                        fonts.push(font);
                    }
                }
            }
        }
        Self { fonts }
    }

    /// Font for runs that have none: the first one seen.
    #[inline]
    pub fn fallback(&self) -> Option<&str> {
        self.fonts.first().map(String::as_str)
    }

    #[inline]
    pub fn fonts(&self) -> &[String] {
        &self.fonts
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

/// Formatting given to the run that replaces a paragraph's content.
#[derive(Debug, Clone, PartialEq)]
pub enum RunFormat {
    /// Run properties (`a:rPr`) of the first run with both a font and a color
    Reference(XmlElement),
    /// Only the typeface, from the slide's [`FontContext`]
    Font(String),
    /// Nothing explicit; the layout and theme decide
    Inherit,
}

impl RunFormat {
    /// Capture the format of `paragraph` before its runs are cleared.
    pub fn capture(paragraph: Paragraph<'_>, fonts: &FontContext) -> Self {
        let reference = paragraph
            .runs()
            .find(|run| run.font_name().is_some() && run.color().is_some())
            .and_then(|run| run.properties());
        match (reference, fonts.fallback()) {
            (Some(props), _) => RunFormat::Reference(props.clone()),
            (None, Some(font)) => RunFormat::Font(font.to_string()),
            (None, None) => RunFormat::Inherit,
        }
    }

    /// The `a:rPr` to give runs of paragraph `p`.
    fn properties(&self, p: &XmlElement) -> Option<XmlElement> {
        match self {
            RunFormat::Reference(props) => Some(props.clone()),
            RunFormat::Font(font) => {
                let mut run = XmlElement::new(text::qualified_like(p, "r"));
                text::set_run_font_name(&mut run, font);
                run.child("rPr").cloned()
            },
            RunFormat::Inherit => None,
        }
    }
}

/// Replace the content of paragraph `p` with `text` in a single run
/// formatted as `format`. Newlines become line breaks.
pub fn rewrite_paragraph(p: &mut XmlElement, text: &str, format: &RunFormat) {
    let props = format.properties(p);
    text::replace_paragraph_text(p, text, props.as_ref());
}

/// Give every run without a typeface the first typeface of its paragraph,
/// or else the slide fallback. Returns the number of runs changed.
pub fn normalize_fonts(root: &mut XmlElement, fonts: &FontContext) -> usize {
    let mut changed = 0;
    text::for_each_paragraph_mut(root, &mut |p: &mut XmlElement| {
        let font = Paragraph::new(p)
            .runs()
            .filter(|run| !run.text().trim().is_empty())
            .find_map(|run| run.font_name())
            .or_else(|| fonts.fallback().map(str::to_string));
        let Some(font) = font else {
            return;
        };
        for run in p.elements_mut().filter(|e| e.local_name() == "r") {
            if Run::new(run).font_name().is_none() {
                text::set_run_font_name(run, &font);
                changed += 1;
            }
        }
    });
    changed
}
