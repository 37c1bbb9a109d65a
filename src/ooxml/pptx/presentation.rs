//! Presentation-level operations: the slide list, masters, and slide creation
//! and removal.
//!
//! Slide order is the order of `p:sldId` entries in `p:sldIdLst`, not partname
//! order; the two diverge as soon as a deck has been reordered in PowerPoint.
use crate::common::xml::XmlElement;
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::constants::{content_type as ct, namespace, relationship_type as rt};
use crate::ooxml::opc::{PackURI, Part, XmlPart};
use crate::ooxml::pptx::package::Package;
use crate::ooxml::pptx::slide::{MasterRef, SlideRef, read_csld_name};
use crate::ooxml::pptx::text::qualified_like;
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;

/// Slide ids below this value are reserved.
const MIN_SLIDE_ID: u32 = 256;

/// Elements that precede `p:sldIdLst` in `p:presentation`.
const BEFORE_SLD_ID_LST: [&str; 3] = ["sldMasterIdLst", "notesMasterIdLst", "handoutMasterIdLst"];

/// Rel-ids of the `item` entries inside the `list` element, in document order.
///
/// The rel-id attribute is the prefixed `id` (`r:id`); the unprefixed `id` on
/// the same element is the numeric slide/master id and is ignored.
pub(crate) fn list_rel_ids(xml: &[u8], list: &[u8], item: &[u8]) -> Result<Vec<String>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut rids = Vec::new();
    let mut in_list = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == list => in_list = true,
            Ok(Event::End(e)) if e.local_name().as_ref() == list => in_list = false,
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if in_list && e.local_name().as_ref() == item => {
                for attr in e.attributes().flatten() {
                    if attr.key.prefix().is_some() && attr.key.local_name().as_ref() == b"id" {
                        rids.push(std::str::from_utf8(&attr.value).map_err(|e| OoxmlError::Xml(e.to_string()))?.to_string());
                    }
                }
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(OoxmlError::Xml(e.to_string())),
            _ => {},
        }
        buf.clear();
    }

    Ok(rids)
}

/// Prefix bound to namespace `uri` by an `xmlns:*` declaration on `el`.
pub(crate) fn ns_prefix(el: &XmlElement, uri: &str) -> Option<String> {
    el.attributes().find_map(|(k, v)| {
        k.strip_prefix("xmlns:")
            .filter(|_| v == uri)
            .map(str::to_string)
    })
}

impl Package {
    fn rel_targets(&self, source: &PackURI, list: &[u8], item: &[u8]) -> Result<Vec<PackURI>> {
        let part = self.part(source)?;
        list_rel_ids(part.blob(), list, item)?
            .iter()
            .map(|r_id| Ok(part.related_partname(r_id)?))
            .collect()
    }

    /// Slide partnames in presentation order.
    pub fn slide_partnames(&self) -> Result<Vec<PackURI>> {
        let pres = self.presentation_partname()?;
        self.rel_targets(&pres, b"sldIdLst", b"sldId")
    }

    pub fn slide_count(&self) -> Result<usize> {
        Ok(self.slide_partnames()?.len())
    }

    /// Slides in presentation order with their names.
    pub fn slides(&self) -> Result<Vec<SlideRef>> {
        self.slide_partnames()?
            .into_iter()
            .map(|partname| {
                let name = read_csld_name(self.part(&partname)?.blob())?;
                Ok(SlideRef { partname, name })
            })
            .collect()
    }

    /// Slide at a 1-based position.
    pub fn slide(&self, index: usize) -> Result<SlideRef> {
        let partnames = self.slide_partnames()?;
        let partname = index
            .checked_sub(1)
            .and_then(|i| partnames.get(i))
            .cloned()
            .ok_or_else(|| OoxmlError::PartNotFound(format!("slide {}", index)))?;
        let name = read_csld_name(self.part(&partname)?.blob())?;
        Ok(SlideRef { partname, name })
    }

    /// Slide masters in `p:sldMasterIdLst` order.
    pub fn slide_masters(&self) -> Result<Vec<MasterRef>> {
        let pres = self.presentation_partname()?;
        self.rel_targets(&pres, b"sldMasterIdLst", b"sldMasterId")?
            .into_iter()
            .map(|partname| self.master(partname))
            .collect()
    }

    pub(crate) fn master(&self, partname: PackURI) -> Result<MasterRef> {
        let name = read_csld_name(self.part(&partname)?.blob())?;
        Ok(MasterRef { partname, name })
    }

    /// Slide size in EMU as `(cx, cy)`, when the presentation declares one.
    pub fn slide_size(&self) -> Result<Option<(i64, i64)>> {
        let doc = self.xml_document(&self.presentation_partname()?)?;
        let Some(sz) = doc.root().child("sldSz") else {
            return Ok(None);
        };
        let dim = |name: &str| -> Result<i64> {
            let raw = sz
                .attr_raw(name)
                .ok_or_else(|| OoxmlError::InvalidFormat(format!("sldSz without {}", name)))?;
            raw.parse::<i64>()
                .map_err(|e| OoxmlError::InvalidFormat(format!("sldSz {}: {}", name, e)))
        };
        Ok(Some((dim("cx")?, dim("cy")?)))
    }

    /// Append a new, empty slide bound to `layout`. Returns its partname.
    ///
    /// The slide carries no placeholders of its own; content is expected to be
    /// copied in by the caller.
    pub fn add_slide(&mut self, layout: &PackURI) -> Result<PackURI> {
        if self.part(layout)?.content_type() != ct::PML_SLIDE_LAYOUT {
            return Err(OoxmlError::InvalidContentType {
                expected: ct::PML_SLIDE_LAYOUT.to_string(),
                got: self.part(layout)?.content_type().to_string(),
            });
        }

        let partname = self.opc().next_partname("/ppt/slides/slide%d.xml")?;
        let mut slide = XmlPart::new(partname.clone(), ct::PML_SLIDE.to_string(), new_slide_xml().into_bytes());
        slide.relate_to(layout, rt::SLIDE_LAYOUT);
        self.opc_mut().add_part(Box::new(slide));

        let pres = self.presentation_partname()?;
        let r_id = self.part_mut(&pres)?.relate_to(&partname, rt::SLIDE);

        let mut doc = self.xml_document(&pres)?;
        let root = doc.root_mut();
        let r_prefix = match ns_prefix(root, namespace::OFC_RELATIONSHIPS) {
            Some(prefix) => prefix,
            None => {
                root.set_attr("xmlns:r", namespace::OFC_RELATIONSHIPS);
                "r".to_string()
            },
        };
        if root.child("sldIdLst").is_none() {
            let list = XmlElement::new(qualified_like(root, "sldIdLst"));
            root.insert_after_any(&BEFORE_SLD_ID_LST, list);
        }
        let item_name = qualified_like(root, "sldId");
        let list = root
            .child_mut("sldIdLst")
            .ok_or_else(|| OoxmlError::InvalidFormat("p:sldIdLst missing".to_string()))?;
        let next_id = list
            .children_named("sldId")
            .filter_map(|e| e.attr_raw("id").and_then(|v| atoi_simd::parse::<u32, false, false>(v.as_bytes()).ok()))
            .fold(MIN_SLIDE_ID - 1, u32::max)
            + 1;

        let mut id_buf = itoa::Buffer::new();
        list.push(
            XmlElement::new(item_name)
                .with_attr("id", id_buf.format(next_id))
                .with_attr(&format!("{}:id", r_prefix), &r_id),
        );
        self.store_xml(&pres, &doc)?;

        debug!(slide = %partname, layout = %layout, slide_id = next_id, "added slide");
        Ok(partname)
    }

    /// Remove every slide, leaving masters, layouts and themes in place.
    ///
    /// Slide parts are dropped from the package along with their
    /// relationship from the presentation.
    pub fn remove_all_slides(&mut self) -> Result<()> {
        let count = self.slide_count()?;
        for _ in 0..count {
            self.remove_slide(0)?;
        }
        Ok(())
    }

    /// Remove the slide at a 0-based position.
    pub fn remove_slide(&mut self, index: usize) -> Result<()> {
        let pres = self.presentation_partname()?;
        let mut doc = self.xml_document(&pres)?;
        let r_prefix = ns_prefix(doc.root(), namespace::OFC_RELATIONSHIPS).unwrap_or_else(|| "r".to_string());
        let rel_attr = format!("{}:id", r_prefix);

        let list = doc
            .root_mut()
            .child_mut("sldIdLst")
            .ok_or_else(|| OoxmlError::PartNotFound(format!("slide {}", index)))?;
        let pos = list
            .children()
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_element("sldId"))
            .map(|(i, _)| i)
            .nth(index)
            .ok_or_else(|| OoxmlError::PartNotFound(format!("slide {}", index)))?;
        let removed = list.children_mut().remove(pos);
        let r_id = removed
            .as_element()
            .and_then(|e| e.attr(&rel_attr))
            .ok_or_else(|| OoxmlError::InvalidRelationship(format!("p:sldId without {}", rel_attr)))?;
        self.store_xml(&pres, &doc)?;

        let pres_part = self.part_mut(&pres)?;
        let slide = pres_part.related_partname(&r_id)?;
        pres_part.rels_mut().remove(&r_id);
        self.opc_mut().remove_part(&slide);

        debug!(slide = %slide, r_id = %r_id, "removed slide");
        Ok(())
    }
}

fn new_slide_xml() -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            "\r\n",
            r#"<p:sld xmlns:a="{}" xmlns:r="{}" xmlns:p="{}">"#,
            r#"<p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
            r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#,
            r#"</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#
        ),
        namespace::DML_MAIN,
        namespace::OFC_RELATIONSHIPS,
        namespace::PML_MAIN
    )
}
