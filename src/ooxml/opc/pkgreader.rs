//! Low-level, read-only view of a serialized OPC package.
//!
//! Parses `[Content_Types].xml` and the `.rels` parts, then walks the
//! relationship graph from the package relationships to collect every
//! reachable part with its content type and relationships.

use crate::common::xml::unescape;
use crate::ooxml::opc::constants::target_mode;
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::{CONTENT_TYPES_URI, PACKAGE_URI, PackURI};
use crate::ooxml::opc::phys_pkg::PhysPkgReader;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet, VecDeque};
use std::io::{Read, Seek};
use tracing::warn;

/// A part as loaded from the physical package.
#[derive(Debug)]
pub struct SerializedPart {
    pub partname: PackURI,
    pub content_type: String,
    pub blob: Vec<u8>,
    pub srels: SmallVec<[SerializedRelationship; 8]>,
}

/// A relationship as read from a .rels part.
#[derive(Debug, Clone)]
pub struct SerializedRelationship {
    pub base_uri: String,
    pub r_id: String,
    pub reltype: String,
    pub target_ref: String,
    pub target_mode: String,
}

impl SerializedRelationship {
    #[inline]
    pub fn is_external(&self) -> bool {
        self.target_mode == target_mode::EXTERNAL
    }

    pub fn target_partname(&self) -> Result<PackURI> {
        if self.is_external() {
            return Err(OpcError::InvalidRelationship(format!(
                "{} is external and has no target partname",
                self.r_id
            )));
        }
        PackURI::from_rel_ref(&self.base_uri, &self.target_ref).map_err(OpcError::InvalidPackUri)
    }
}

/// Content type lookup built from `[Content_Types].xml`.
///
/// An `Override` for the exact partname wins; otherwise the `Default` for the
/// extension applies (extensions compare case-insensitively).
#[derive(Debug, Default)]
pub(crate) struct ContentTypeMap {
    defaults: HashMap<String, String>,
    overrides: HashMap<String, String>,
}

impl ContentTypeMap {
    pub(crate) fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut map = Self::default();
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                    b"Default" => {
                        if let (Some(ext), Some(ct)) =
                            (attr_value(e, b"Extension")?, attr_value(e, b"ContentType")?)
                        {
                            map.defaults.insert(ext.to_ascii_lowercase(), ct);
                        }
                    },
                    b"Override" => {
                        if let (Some(pn), Some(ct)) =
                            (attr_value(e, b"PartName")?, attr_value(e, b"ContentType")?)
                        {
                            map.overrides.insert(pn.to_ascii_lowercase(), ct);
                        }
                    },
                    _ => {},
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(OpcError::XmlError(format!("Content types parse error: {}", e)));
                },
                _ => {},
            }
            buf.clear();
        }

        Ok(map)
    }

    pub(crate) fn get(&self, pack_uri: &PackURI) -> Result<String> {
        if let Some(ct) = self.overrides.get(&pack_uri.as_str().to_ascii_lowercase()) {
            return Ok(ct.clone());
        }
        if let Some(ct) = self.defaults.get(&pack_uri.ext().to_ascii_lowercase()) {
            return Ok(ct.clone());
        }
        Err(OpcError::ContentTypeNotFound(pack_uri.to_string()))
    }
}

/// Unescaped value of attribute `key` on `e`.
fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(unescape(std::str::from_utf8(&attr.value)?)));
        }
    }
    Ok(None)
}

/// Parse the XML of a .rels part whose source lives in `base_uri`.
pub fn parse_rels_xml(rels_xml: &[u8], base_uri: &str) -> Result<SmallVec<[SerializedRelationship; 8]>> {
    let mut srels = SmallVec::new();
    let mut reader = Reader::from_reader(rels_xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let r_id = attr_value(e, b"Id")?;
                let reltype = attr_value(e, b"Type")?;
                let target_ref = attr_value(e, b"Target")?;
                let target_mode =
                    attr_value(e, b"TargetMode")?.unwrap_or_else(|| target_mode::INTERNAL.to_string());

                if let (Some(r_id), Some(reltype), Some(target_ref)) = (r_id, reltype, target_ref) {
                    srels.push(SerializedRelationship {
                        base_uri: base_uri.to_string(),
                        r_id,
                        reltype,
                        target_ref,
                        target_mode,
                    });
                }
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(OpcError::XmlError(format!("Rels parse error: {}", e))),
            _ => {},
        }
        buf.clear();
    }

    Ok(srels)
}

/// Parts and relationships of a package, as serialized.
pub struct PackageReader {
    pkg_srels: SmallVec<[SerializedRelationship; 8]>,
    sparts: Vec<SerializedPart>,
}

impl PackageReader {
    pub fn from_phys_reader<R: Read + Seek>(phys_reader: &mut PhysPkgReader<R>) -> Result<Self> {
        let mut members = phys_reader.read_all()?;

        let content_types_xml = members
            .get(CONTENT_TYPES_URI.trim_start_matches('/'))
            .ok_or_else(|| OpcError::PartNotFound(CONTENT_TYPES_URI.to_string()))?;
        let content_types = ContentTypeMap::from_xml(content_types_xml)?;

        let package_uri = PackURI::new(PACKAGE_URI).map_err(OpcError::InvalidPackUri)?;
        let pkg_srels = Self::load_rels(&members, &package_uri)?;
        let sparts = Self::load_parts(&mut members, &pkg_srels, &content_types)?;

        Ok(Self { pkg_srels, sparts })
    }

    fn load_rels(
        members: &HashMap<String, Vec<u8>>,
        source_uri: &PackURI,
    ) -> Result<SmallVec<[SerializedRelationship; 8]>> {
        let rels_uri = source_uri.rels_uri().map_err(OpcError::InvalidPackUri)?;
        match members.get(rels_uri.membername()) {
            Some(xml) => parse_rels_xml(xml, source_uri.base_uri()),
            None => Ok(SmallVec::new()),
        }
    }

    /// Breadth-first walk of the relationship graph. Targets that are not in
    /// the archive are skipped with a warning; Office tolerates such dangling
    /// relationships and so do we.
    fn load_parts(
        members: &mut HashMap<String, Vec<u8>>,
        pkg_srels: &[SerializedRelationship],
        content_types: &ContentTypeMap,
    ) -> Result<Vec<SerializedPart>> {
        let mut sparts = Vec::with_capacity(64);
        let mut visited: HashSet<PackURI> = HashSet::with_capacity(64);
        let mut queue: VecDeque<PackURI> = VecDeque::new();

        let mut enqueue = |srels: &[SerializedRelationship], queue: &mut VecDeque<PackURI>| {
            for srel in srels.iter().filter(|s| !s.is_external()) {
                match srel.target_partname() {
                    Ok(partname) => {
                        if visited.insert(partname.clone()) {
                            queue.push_back(partname);
                        }
                    },
                    Err(e) => warn!(r_id = %srel.r_id, target = %srel.target_ref, "skipping relationship: {}", e),
                }
            }
        };

        enqueue(pkg_srels, &mut queue);

        while let Some(partname) = queue.pop_front() {
            let Some(blob) = members.remove(partname.membername()) else {
                warn!(partname = %partname, "relationship target missing from package");
                continue;
            };
            let srels = Self::load_rels(members, &partname)?;
            enqueue(&srels, &mut queue);
            let content_type = content_types.get(&partname)?;
            sparts.push(SerializedPart {
                partname,
                content_type,
                blob,
                srels,
            });
        }

        Ok(sparts)
    }

    pub fn pkg_srels(&self) -> &[SerializedRelationship] {
        &self.pkg_srels
    }

    pub fn iter_sparts(&self) -> impl Iterator<Item = &SerializedPart> {
        self.sparts.iter()
    }

    /// Consume the reader, yielding package relationships and parts.
    pub fn into_parts(self) -> (SmallVec<[SerializedRelationship; 8]>, Vec<SerializedPart>) {
        (self.pkg_srels, self.sparts)
    }
}
