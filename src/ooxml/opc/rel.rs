use crate::common::xml::escape_attr;
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::PackURI;
/// Relationship-related objects for OPC packages.
///
/// A relationship links a source (a part, or the package itself) to a target
/// part or to an external URL. Relationships are addressed by their rel-id
/// (`rId1`, `rId2`, ...), which is unique within one source.
use std::collections::HashMap;

/// A single relationship from a source part to a target.
#[derive(Debug, Clone)]
pub struct Relationship {
    r_id: String,
    reltype: String,
    /// Target as written in the .rels part: relative partname or external URL
    target_ref: String,
    /// Directory of the source part, for resolving `target_ref`
    base_uri: String,
    is_external: bool,
}

impl Relationship {
    pub fn new(
        r_id: String,
        reltype: String,
        target_ref: String,
        base_uri: String,
        is_external: bool,
    ) -> Self {
        Self {
            r_id,
            reltype,
            target_ref,
            base_uri,
            is_external,
        }
    }

    #[inline]
    pub fn r_id(&self) -> &str {
        &self.r_id
    }

    #[inline]
    pub fn reltype(&self) -> &str {
        &self.reltype
    }

    /// Target reference as stored: a relative partname for internal
    /// relationships, a URL for external ones.
    #[inline]
    pub fn target_ref(&self) -> &str {
        &self.target_ref
    }

    #[inline]
    pub fn is_external(&self) -> bool {
        self.is_external
    }

    /// Absolute partname of the target. Fails for external relationships.
    pub fn target_partname(&self) -> Result<PackURI> {
        if self.is_external {
            return Err(OpcError::InvalidRelationship(format!(
                "{} is external and has no target partname",
                self.r_id
            )));
        }
        PackURI::from_rel_ref(&self.base_uri, &self.target_ref).map_err(OpcError::InvalidPackUri)
    }
}

/// Numeric part of an `rIdN` identifier.
#[inline]
fn r_id_number(r_id: &str) -> Option<u32> {
    r_id.strip_prefix("rId")
        .and_then(|n| atoi_simd::parse::<u32, false, false>(n.as_bytes()).ok())
}

/// Collection of relationships from a single source, keyed by rel-id.
#[derive(Debug, Clone)]
pub struct Relationships {
    base_uri: String,
    rels: HashMap<String, Relationship>,
}

impl Relationships {
    /// Create an empty collection for a source whose directory is `base_uri`.
    pub fn new(base_uri: String) -> Self {
        Self {
            base_uri,
            rels: HashMap::new(),
        }
    }

    /// Add a relationship with an explicit rel-id, replacing any existing
    /// relationship with the same id.
    pub fn add_relationship(
        &mut self,
        reltype: String,
        target_ref: String,
        r_id: String,
        is_external: bool,
    ) -> &Relationship {
        let rel = Relationship::new(
            r_id.clone(),
            reltype,
            target_ref,
            self.base_uri.clone(),
            is_external,
        );
        match self.rels.entry(r_id) {
            std::collections::hash_map::Entry::Occupied(mut slot) => {
                slot.insert(rel);
                slot.into_mut()
            },
            std::collections::hash_map::Entry::Vacant(slot) => slot.insert(rel),
        }
    }

    #[inline]
    pub fn get(&self, r_id: &str) -> Option<&Relationship> {
        self.rels.get(r_id)
    }

    /// Rel-id of an internal relationship of `reltype` to `target_ref`,
    /// creating one with the next free rel-id if none exists.
    pub fn get_or_add(&mut self, reltype: &str, target_ref: &str) -> String {
        if let Some(rel) = self.find(reltype, target_ref, false) {
            return rel.r_id.clone();
        }
        let r_id = self.next_r_id();
        self.add_relationship(reltype.to_string(), target_ref.to_string(), r_id.clone(), false);
        r_id
    }

    /// Like [`get_or_add`](Self::get_or_add) for external targets.
    pub fn get_or_add_ext_rel(&mut self, reltype: &str, target_ref: &str) -> String {
        if let Some(rel) = self.find(reltype, target_ref, true) {
            return rel.r_id.clone();
        }
        let r_id = self.next_r_id();
        self.add_relationship(reltype.to_string(), target_ref.to_string(), r_id.clone(), true);
        r_id
    }

    fn find(&self, reltype: &str, target_ref: &str, is_external: bool) -> Option<&Relationship> {
        self.rels.values().find(|rel| {
            rel.reltype == reltype && rel.target_ref == target_ref && rel.is_external == is_external
        })
    }

    /// Next available rel-id, filling the first gap in `rId1..`.
    pub fn next_r_id(&self) -> String {
        let mut used: Vec<u32> = self.rels.keys().filter_map(|k| r_id_number(k)).collect();
        used.sort_unstable();

        let mut next = 1u32;
        for n in used {
            match n.cmp(&next) {
                std::cmp::Ordering::Equal => next += 1,
                std::cmp::Ordering::Greater => break,
                std::cmp::Ordering::Less => {},
            }
        }

        let mut buf = itoa::Buffer::new();
        format!("rId{}", buf.format(next))
    }

    /// The single relationship of `reltype`. Fails when there is none or
    /// more than one.
    pub fn part_with_reltype(&self, reltype: &str) -> Result<&Relationship> {
        let mut matching = self.rels.values().filter(|rel| rel.reltype == reltype);
        match (matching.next(), matching.next()) {
            (Some(rel), None) => Ok(rel),
            (None, _) => Err(OpcError::RelationshipNotFound(format!(
                "No relationship of type '{}'",
                reltype
            ))),
            (Some(_), Some(_)) => Err(OpcError::InvalidRelationship(format!(
                "Multiple relationships of type '{}'",
                reltype
            ))),
        }
    }

    /// Relationships in rel-id order (numeric for `rIdN`, then lexical).
    pub fn sorted(&self) -> Vec<&Relationship> {
        let mut rels: Vec<&Relationship> = self.rels.values().collect();
        rels.sort_by(|a, b| {
            (r_id_number(&a.r_id).is_none(), r_id_number(&a.r_id), &a.r_id)
                .cmp(&(r_id_number(&b.r_id).is_none(), r_id_number(&b.r_id), &b.r_id))
        });
        rels
    }

    /// Iterate relationships in no particular order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.rels.values()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }

    pub fn remove(&mut self, r_id: &str) -> Option<Relationship> {
        self.rels.remove(r_id)
    }

    /// Serialize to the XML of a .rels part.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(128 + self.rels.len() * 160);

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str("\r\n");
        xml.push_str(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );

        for rel in self.sorted() {
            xml.push_str(r#"<Relationship Id=""#);
            xml.push_str(&escape_attr(&rel.r_id));
            xml.push_str(r#"" Type=""#);
            xml.push_str(&escape_attr(&rel.reltype));
            xml.push_str(r#"" Target=""#);
            xml.push_str(&escape_attr(&rel.target_ref));
            if rel.is_external {
                xml.push_str(r#"" TargetMode="External"#);
            }
            xml.push_str(r#""/>"#);
        }

        xml.push_str("</Relationships>");
        xml
    }
}

impl Default for Relationships {
    fn default() -> Self {
        Self::new("/".to_string())
    }
}
