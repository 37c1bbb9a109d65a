//! Relationship remapping for cloned slide content.
//!
//! Markup copied from a source slide refers to other parts through rel-ids
//! (`r:embed`, `r:link`, `r:id`, ...) that are only meaningful in the source
//! slide's relationship table. Each one is re-created on the destination slide
//! and the attribute rewritten to the new rel-id.
//!
//! A reference that cannot be carried over (another slide, or a rel-id the
//! source slide does not define) is removed from the copy. Left in place it
//! would resolve to whichever destination relationship takes that number.

use crate::common::xml::XmlElement;
use crate::ooxml::opc::PackURI;
use crate::ooxml::opc::constants::{namespace, relationship_type as rt};
use crate::ooxml::opc::part::PartFactory;
use crate::ooxml::pptx::Package;
use crate::ooxml::pptx::presentation::ns_prefix;
use crate::template::error::{Result, TemplateError};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Source rel-id to destination rel-id, for one cloned slide.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceIdMap {
    ids: HashMap<String, String>,
}

impl ResourceIdMap {
    #[inline]
    pub fn get(&self, source: &str) -> Option<&str> {
        self.ids.get(source).map(String::as_str)
    }

    #[inline]
    pub fn insert(&mut self, source: String, dest: String) {
        self.ids.insert(source, dest);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

}

/// Re-creates the relationships of one source slide on one destination slide.
#[derive(Debug)]
pub struct ResourceRemapper<'a> {
    source: &'a Package,
    source_slide: &'a PackURI,
    dest_slide: PackURI,
    ids: ResourceIdMap,
    /// rel-ids that cannot be carried over
    skipped: HashSet<String>,
}

impl<'a> ResourceRemapper<'a> {
    pub fn new(source: &'a Package, source_slide: &'a PackURI, dest_slide: PackURI) -> Self {
        Self {
            source,
            source_slide,
            dest_slide,
            ids: ResourceIdMap::default(),
            skipped: HashSet::new(),
        }
    }

    #[inline]
    pub fn ids(&self) -> &ResourceIdMap {
        &self.ids
    }

    pub fn into_ids(self) -> ResourceIdMap {
        self.ids
    }

    /// Register the image `image` of the source package in `dest` and relate
    /// the destination slide to it. Identical bytes already in `dest` are
    /// reused. Returns the destination part and rel-id.
    pub fn register_image(&mut self, dest: &mut Package, image: &PackURI) -> Result<(PackURI, String)> {
        let part = self.source.part(image)?;
        let partname = dest
            .add_media_part(part.blob(), image.ext(), part.content_type())
            .map_err(|e| TemplateError::ResourceRegistration(format!("{}: {}", image, e)))?;
        let r_id = dest.part_mut(&self.dest_slide)?.relate_to(&partname, rt::IMAGE);
        Ok((partname, r_id))
    }

    /// Destination rel-id for source rel-id `r_id`, creating the relationship
    /// on first use. `None` when the reference cannot be carried over.
    pub fn remap(&mut self, dest: &mut Package, r_id: &str) -> Result<Option<String>> {
        if let Some(mapped) = self.ids.get(r_id) {
            return Ok(Some(mapped.to_string()));
        }
        if self.skipped.contains(r_id) {
            return Ok(None);
        }

        let source = self.source;
        let Some(rel) = source.part(self.source_slide)?.rels().get(r_id) else {
            warn!(r_id, slide = %self.source_slide, "reference to unknown relationship dropped");
            self.skipped.insert(r_id.to_string());
            return Ok(None);
        };

        let new_id = if rel.is_external() {
            dest.part_mut(&self.dest_slide)?
                .relate_to_ext(rel.target_ref(), rel.reltype())
        } else if rel.reltype() == rt::SLIDE {
            warn!(r_id, target = rel.target_ref(), "reference to another slide dropped");
            self.skipped.insert(r_id.to_string());
            return Ok(None);
        } else if rel.reltype() == rt::IMAGE {
            self.register_image(dest, &rel.target_partname()?)?.1
        } else {
            let target = rel.target_partname()?;
            if !dest.opc().contains_part(&target) {
                let part = source.part(&target)?;
                let mut copy = PartFactory::load(target.clone(), part.content_type().to_string(), part.blob().to_vec())?;
                *copy.rels_mut() = part.rels().clone();
                dest.opc_mut().add_part(copy);
                debug!(partname = %target, "copied part into destination");
            }
            dest.part_mut(&self.dest_slide)?.relate_to(&target, rel.reltype())
        };

        debug!(from = r_id, to = %new_id, reltype = rel.reltype(), "remapped relationship");
        self.ids.insert(r_id.to_string(), new_id.clone());
        Ok(Some(new_id))
    }

    /// Rewrite every relationship attribute under `el`. An attribute is a
    /// relationship reference when its prefix is bound to the relationships
    /// namespace, either in `prefixes` or by a declaration inside `el`.
    ///
    /// References that cannot be carried over are removed: hyperlink elements
    /// (`a:hlinkClick`, `a:hlinkHover`) as a whole, other attributes alone.
    /// Returns the number of attributes rewritten.
    pub fn remap_element(&mut self, dest: &mut Package, el: &mut XmlElement, prefixes: &[String]) -> Result<usize> {
        let mut prefixes: Vec<String> = prefixes.iter().map(|p| format!("{}:", p)).collect();
        el.walk(&mut |e| {
            if let Some(prefix) = ns_prefix(e, namespace::OFC_RELATIONSHIPS) {
                let prefix = format!("{}:", prefix);
                if !prefixes.contains(&prefix) {
                    prefixes.push(prefix);
                }
            }
        });

        let mut refs: Vec<String> = Vec::new();
        el.walk(&mut |e| {
            for (key, value) in e.attributes() {
                if !value.is_empty() && is_rel_attr(key, &prefixes) && !refs.iter().any(|r| r == value) {
                    refs.push(value.to_string());
                }
            }
        });

        let mut mapping: HashMap<String, String> = HashMap::with_capacity(refs.len());
        let mut dropped: HashSet<String> = HashSet::new();
        for r_id in refs {
            match self.remap(dest, &r_id)? {
                Some(new_id) => {
                    mapping.insert(r_id, new_id);
                },
                None => {
                    dropped.insert(r_id);
                },
            }
        }

        let mut rewritten = 0;
        el.walk_mut(&mut |e: &mut XmlElement| {
            if !dropped.is_empty() {
                e.retain_children(|node| {
                    !node
                        .as_element()
                        .is_some_and(|c| is_hyperlink(c) && refers_to_any(c, &prefixes, &dropped))
                });
                let stale: Vec<String> = e
                    .attributes()
                    .filter(|(key, value)| is_rel_attr(key, &prefixes) && dropped.contains(*value))
                    .map(|(key, _)| key.to_string())
                    .collect();
                for key in stale {
                    e.remove_attr(&key);
                }
            }
            for (key, value) in e.attributes_mut() {
                if !is_rel_attr(key, &prefixes) {
                    continue;
                }
                if let Some(new_id) = mapping.get(value.as_str()) {
                    *value = new_id.clone();
                    rewritten += 1;
                }
            }
        });
        Ok(rewritten)
    }
}

#[inline]
fn is_hyperlink(el: &XmlElement) -> bool {
    matches!(el.local_name(), "hlinkClick" | "hlinkHover")
}

fn refers_to_any(el: &XmlElement, prefixes: &[String], ids: &HashSet<String>) -> bool {
    el.attributes()
        .any(|(key, value)| is_rel_attr(key, prefixes) && ids.contains(value))
}

#[inline]
fn is_rel_attr(key: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|p| key.starts_with(p.as_str()))
}
