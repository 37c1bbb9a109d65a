//! Deep copy of a slide from the template into the destination package.

use crate::common::xml::{XmlElement, XmlNode, split_prefix, unescape};
use crate::ooxml::error::OoxmlError;
use crate::ooxml::opc::PackURI;
use crate::ooxml::opc::constants::namespace;
use crate::ooxml::pptx::presentation::ns_prefix;
use crate::ooxml::pptx::slide::{SHAPE_ELEMENTS, shape_tree, shape_tree_mut};
use crate::ooxml::pptx::{LayoutRef, Package};
use crate::template::error::{Result, TemplateError};
use crate::template::layout::resolve_layout;
use crate::template::remap::{ResourceIdMap, ResourceRemapper};
use tracing::debug;

/// Children of a shape tree that are copied: shapes and the markup
/// compatibility wrappers PowerPoint puts around newer shape kinds.
fn is_copied_shape(el: &XmlElement) -> bool {
    SHAPE_ELEMENTS.contains(&el.local_name()) || el.local_name() == "AlternateContent"
}

fn malformed(partname: &PackURI, missing: &str) -> TemplateError {
    OoxmlError::InvalidFormat(format!("{} has no {}", partname, missing)).into()
}

/// A slide created by [`clone_slide`].
#[derive(Debug, Clone)]
pub struct ClonedSlide {
    pub partname: PackURI,
    pub layout: LayoutRef,
    /// Relationships re-created for the copied markup
    pub resources: ResourceIdMap,
    pub shapes: usize,
}

/// Append to `dest` a copy of slide `index` (1-based) of `source`.
///
/// The new slide is bound to the destination layout with the source layout's
/// name. Its shapes and background are deep copies of the source slide's,
/// with every relationship reference re-created on the new slide.
pub fn clone_slide(source: &Package, index: usize, dest: &mut Package) -> Result<ClonedSlide> {
    let count = source.slide_count()?;
    if index == 0 || index > count {
        return Err(TemplateError::SlideIndexOutOfRange { index, count });
    }
    let slide = source.slide(index)?;
    let source_layout = source.layout_of(&slide.partname)?;
    let source_master = source.master_of(&source_layout.partname)?;
    let layout = resolve_layout(dest, &source_layout, &source_master)?;

    let src_doc = source.xml_document(&slide.partname)?;
    let src_root = src_doc.root();
    let partname = dest.add_slide(&layout.partname)?;
    let mut dst_doc = dest.xml_document(&partname)?;

    let prefixes: Vec<String> = ns_prefix(src_root, namespace::OFC_RELATIONSHIPS).into_iter().collect();
    let mut remapper = ResourceRemapper::new(source, &slide.partname, partname.clone());

    // namespace declarations and `mc:Ignorable` must travel with the markup
    let dst_root = dst_doc.root_mut();
    for (key, value) in src_root.attributes() {
        let declares = key == "xmlns" || key.starts_with("xmlns:") || split_prefix(key).1 == "Ignorable";
        if declares && dst_root.attr_raw(key).is_none() {
            dst_root.set_attr(key, &unescape(value));
        }
    }

    let src_csld = src_root
        .child("cSld")
        .ok_or_else(|| malformed(&slide.partname, "p:cSld"))?;
    let mut background = src_csld.child("bg").cloned();
    let mut shapes: Vec<XmlElement> = shape_tree(src_root)
        .map(|tree| tree.elements().filter(|e| is_copied_shape(e)).cloned().collect())
        .unwrap_or_default();

    if let Some(bg) = background.as_mut() {
        remapper.remap_element(dest, bg, &prefixes)?;
    }
    for shape in shapes.iter_mut() {
        remapper.remap_element(dest, shape, &prefixes)?;
    }
    let shape_count = shapes.len();

    let dst_csld = dst_doc
        .root_mut()
        .child_mut("cSld")
        .ok_or_else(|| malformed(&partname, "p:cSld"))?;
    if let Some(name) = src_csld.attr("name") {
        dst_csld.set_attr("name", &name);
    }
    if let Some(bg) = background {
        dst_csld.retain_children(|n| !n.is_element("bg"));
        dst_csld.children_mut().insert(0, XmlNode::Element(bg));
    }
    let tree = shape_tree_mut(dst_doc.root_mut()).ok_or_else(|| malformed(&partname, "p:spTree"))?;
    for shape in shapes {
        tree.insert_before("extLst", shape);
    }

    dest.store_xml(&partname, &dst_doc)?;

    let resources = remapper.into_ids();
    debug!(
        source = index,
        slide = %partname,
        layout = %layout.name,
        shapes = shape_count,
        resources = resources.len(),
        "cloned slide"
    );
    Ok(ClonedSlide {
        partname,
        layout,
        resources,
        shapes: shape_count,
    })
}
