/// Slides, slide layouts and slide masters.
///
/// Each is identified by its partname. Names come from the `name` attribute
/// of `p:cSld`, which PowerPoint fills in for layouts and masters and usually
/// leaves empty on slides.
use crate::common::xml::{XmlElement, unescape};
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::PackURI;
use crate::ooxml::opc::constants::relationship_type as rt;
use crate::ooxml::pptx::package::Package;
use crate::ooxml::pptx::presentation::list_rel_ids;
use quick_xml::Reader;
use quick_xml::events::Event;

/// Local names of the elements that are shapes when they appear in a shape
/// tree (`p:spTree` or `p:grpSp`).
pub const SHAPE_ELEMENTS: [&str; 6] = ["sp", "pic", "grpSp", "graphicFrame", "cxnSp", "contentPart"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideRef {
    pub partname: PackURI,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutRef {
    pub partname: PackURI,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterRef {
    pub partname: PackURI,
    pub name: String,
}

/// Value of `p:cSld/@name`, or an empty string when unnamed.
pub fn read_csld_name(xml: &[u8]) -> Result<String> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"cSld" {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"name" {
                            let name = std::str::from_utf8(&attr.value)
                                .map_err(|e| OoxmlError::Xml(e.to_string()))?;
                            return Ok(unescape(name));
                        }
                    }
                    return Ok(String::new());
                }
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(OoxmlError::Xml(e.to_string())),
            _ => {},
        }
        buf.clear();
    }

    Ok(String::new())
}

/// The shape tree (`p:cSld/p:spTree`) of a slide, layout or master root.
pub fn shape_tree(root: &XmlElement) -> Option<&XmlElement> {
    root.path(&["cSld", "spTree"])
}

pub fn shape_tree_mut(root: &mut XmlElement) -> Option<&mut XmlElement> {
    root.path_mut(&["cSld", "spTree"])
}

/// Top-level shapes of a shape tree, in z-order.
pub fn shapes(tree: &XmlElement) -> impl Iterator<Item = &XmlElement> {
    tree.elements().filter(|e| SHAPE_ELEMENTS.contains(&e.local_name()))
}

impl Package {
    /// Layout a slide is bound to.
    pub fn layout_of(&self, slide: &PackURI) -> Result<LayoutRef> {
        let partname = self.part(slide)?.partname_with_reltype(rt::SLIDE_LAYOUT)?;
        let name = read_csld_name(self.part(&partname)?.blob())?;
        Ok(LayoutRef { partname, name })
    }

    /// Master a layout belongs to.
    pub fn master_of(&self, layout: &PackURI) -> Result<MasterRef> {
        let partname = self.part(layout)?.partname_with_reltype(rt::SLIDE_MASTER)?;
        self.master(partname)
    }

    /// Layouts of a master, in `p:sldLayoutIdLst` order.
    pub fn layouts_of(&self, master: &PackURI) -> Result<Vec<LayoutRef>> {
        let part = self.part(master)?;
        list_rel_ids(part.blob(), b"sldLayoutIdLst", b"sldLayoutId")?
            .iter()
            .map(|r_id| {
                let partname = part.related_partname(r_id)?;
                let name = read_csld_name(self.part(&partname)?.blob())?;
                Ok(LayoutRef { partname, name })
            })
            .collect()
    }

    /// The presentation's direct layout collection: the layouts of its first
    /// master. Empty when the presentation has no master.
    pub fn slide_layouts(&self) -> Result<Vec<LayoutRef>> {
        match self.slide_masters()?.first() {
            Some(master) => self.layouts_of(&master.partname),
            None => Ok(Vec::new()),
        }
    }
}
