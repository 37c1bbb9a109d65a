//! DrawingML text model over the XML tree.
//!
//! A paragraph (`a:p`) lives in a text body: `p:txBody` for shapes, including
//! shapes inside group shapes, and `a:txBody` for table cells. Its content is
//! a sequence of runs (`a:r`), text fields (`a:fld`) and line breaks
//! (`a:br`), optionally preceded by `a:pPr` and followed by `a:endParaRPr`.
//!
//! Run formatting is in `a:rPr`. The font name is `a:latin/@typeface` and the
//! color is an `a:solidFill` child.
use crate::common::xml::{XmlElement, XmlNode, split_prefix};

/// Character a line break contributes to paragraph text. PowerPoint's own
/// object model reports soft breaks the same way.
pub const LINE_BREAK: char = '\u{0B}';

/// Fill elements allowed in `a:rPr`. At most one may be present.
const FILL_ELEMENTS: [&str; 6] = ["noFill", "solidFill", "gradFill", "blipFill", "pattFill", "grpFill"];

/// `a:rPr` children that must come after `a:latin`.
const AFTER_LATIN: [&str; 7] = ["ea", "cs", "sym", "hlinkClick", "hlinkMouseOver", "rtl", "extLst"];

/// Qualified name for `local` with the same prefix as `el`.
pub fn qualified_like(el: &XmlElement, local: &str) -> String {
    match split_prefix(el.name()).0 {
        Some(prefix) => format!("{}:{}", prefix, local),
        None => local.to_string(),
    }
}

/// All paragraphs under `root`, in document order.
pub fn paragraphs(root: &XmlElement) -> Vec<Paragraph<'_>> {
    let mut found = Vec::new();
    root.walk(&mut |el| {
        if el.local_name() == "txBody" {
            found.extend(el.children_named("p").map(Paragraph::new));
        }
    });
    found
}

/// Call `f` on every paragraph element under `root`, in document order.
pub fn for_each_paragraph_mut(root: &mut XmlElement, f: &mut impl FnMut(&mut XmlElement)) {
    root.walk_mut(&mut |el: &mut XmlElement| {
        if el.local_name() == "txBody" {
            for p in el.elements_mut().filter(|e| e.local_name() == "p") {
                f(p);
            }
        }
    });
}

/// Read-only view of an `a:p` element.
#[derive(Debug, Clone, Copy)]
pub struct Paragraph<'a> {
    el: &'a XmlElement,
}

impl<'a> Paragraph<'a> {
    #[inline]
    pub fn new(el: &'a XmlElement) -> Self {
        Self { el }
    }

    #[inline]
    pub fn element(&self) -> &'a XmlElement {
        self.el
    }

    /// Logical text: runs and fields in order, line breaks as [`LINE_BREAK`].
    pub fn text(&self) -> String {
        let mut text = String::new();
        for child in self.el.elements() {
            match child.local_name() {
                "r" | "fld" => {
                    if let Some(t) = child.child("t") {
                        text.push_str(&t.text());
                    }
                },
                "br" => text.push(LINE_BREAK),
                _ => {},
            }
        }
        text
    }

    pub fn runs(self) -> impl Iterator<Item = Run<'a>> {
        self.el.children_named("r").map(Run::new)
    }
}

/// Read-only view of an `a:r` element.
#[derive(Debug, Clone, Copy)]
pub struct Run<'a> {
    el: &'a XmlElement,
}

impl<'a> Run<'a> {
    #[inline]
    pub fn new(el: &'a XmlElement) -> Self {
        Self { el }
    }

    pub fn text(&self) -> String {
        self.el.child("t").map(XmlElement::text).unwrap_or_default()
    }

    /// The run property element (`a:rPr`), if any.
    #[inline]
    pub fn properties(&self) -> Option<&'a XmlElement> {
        self.el.child("rPr")
    }

    /// Latin typeface, ignoring empty values.
    pub fn font_name(&self) -> Option<String> {
        self.properties()?
            .child("latin")?
            .attr("typeface")
            .filter(|name| !name.is_empty())
    }

    /// The run's `a:solidFill`, if it sets one.
    pub fn color(&self) -> Option<&'a XmlElement> {
        self.properties()?.child("solidFill")
    }
}

/// The `a:rPr` of a run, created as its first child when missing.
fn ensure_properties(run: &mut XmlElement) -> &mut XmlElement {
    let name = qualified_like(run, "rPr");
    run.child_or_insert("rPr", &name, 0)
}

/// Set the latin typeface of a run.
pub fn set_run_font_name(run: &mut XmlElement, name: &str) {
    let rpr = ensure_properties(run);
    if let Some(latin) = rpr.child_mut("latin") {
        latin.set_attr("typeface", name);
        return;
    }
    let latin = XmlElement::new(qualified_like(rpr, "latin")).with_attr("typeface", name);
    let pos = rpr
        .children()
        .iter()
        .position(|n| n.as_element().is_some_and(|e| AFTER_LATIN.contains(&e.local_name())))
        .unwrap_or(rpr.children().len());
    rpr.children_mut().insert(pos, XmlNode::Element(latin));
}

/// Replace a run's fill with `fill` (an `a:solidFill` element).
pub fn set_run_color(run: &mut XmlElement, fill: &XmlElement) {
    let rpr = ensure_properties(run);
    rpr.retain_children(|n| !n.as_element().is_some_and(|e| FILL_ELEMENTS.contains(&e.local_name())));
    // only `a:ln` may precede the fill
    rpr.insert_after_any(&["ln"], fill.clone());
}

/// Replace the content of paragraph `p` with `text`.
///
/// Existing runs, fields and breaks are removed; `a:pPr` and `a:endParaRPr`
/// stay. The text becomes a single run carrying `properties` (an `a:rPr`),
/// except that each `\n` becomes an `a:br` between runs with the same
/// properties.
pub fn replace_paragraph_text(p: &mut XmlElement, text: &str, properties: Option<&XmlElement>) {
    p.retain_children(|n| !matches!(n.as_element().map(XmlElement::local_name), Some("r" | "br" | "fld")));

    let run_name = qualified_like(p, "r");
    let text_name = qualified_like(p, "t");
    let break_name = qualified_like(p, "br");

    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            let mut br = XmlElement::new(break_name.as_str());
            if let Some(props) = properties {
                br.push(props.clone());
            }
            p.insert_before("endParaRPr", br);
        }
        let mut run = XmlElement::new(run_name.as_str());
        if let Some(props) = properties {
            run.push(props.clone());
        }
        let mut t = XmlElement::new(text_name.as_str());
        t.set_text(line);
        run.push(t);
        p.insert_before("endParaRPr", run);
    }
}
