/// In-memory OPC package.
///
/// `OpcPackage` owns every part loaded from a package together with the
/// package-level relationships, and can serialize itself back to ZIP bytes.
use std::collections::{HashMap, HashSet, VecDeque};
use std::io::{Read, Seek};
use std::path::Path;

use crate::ooxml::opc::constants::relationship_type;
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::{PACKAGE_URI, PackURI};
use crate::ooxml::opc::part::{Part, PartFactory};
use crate::ooxml::opc::phys_pkg::PhysPkgReader;
use crate::ooxml::opc::pkgreader::PackageReader;
use crate::ooxml::opc::pkgwriter::PackageWriter;
use crate::ooxml::opc::rel::Relationships;

pub struct OpcPackage {
    rels: Relationships,
    parts: HashMap<String, Box<dyn Part>>,
}

impl OpcPackage {
    /// An empty package with no parts.
    pub fn new() -> Self {
        Self {
            rels: Relationships::new(PACKAGE_URI.to_string()),
            parts: HashMap::new(),
        }
    }

    /// Open a package file (.pptx, .potx, ...).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(OpcError::PackageNotFound(path.display().to_string()));
        }
        Self::from_bytes(std::fs::read(path)?)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let mut phys_reader = PhysPkgReader::from_bytes(data)?;
        Self::unmarshal(PackageReader::from_phys_reader(&mut phys_reader)?)
    }

    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut phys_reader = PhysPkgReader::new(reader)?;
        Self::unmarshal(PackageReader::from_phys_reader(&mut phys_reader)?)
    }

    fn unmarshal(pkg_reader: PackageReader) -> Result<Self> {
        let mut package = Self::new();
        let (pkg_srels, sparts) = pkg_reader.into_parts();

        for srel in pkg_srels {
            let is_external = srel.is_external();
            package
                .rels
                .add_relationship(srel.reltype, srel.target_ref, srel.r_id, is_external);
        }

        for spart in sparts {
            let mut part = PartFactory::load(spart.partname, spart.content_type, spart.blob)?;
            for srel in spart.srels {
                let is_external = srel.is_external();
                part.rels_mut()
                    .add_relationship(srel.reltype, srel.target_ref, srel.r_id, is_external);
            }
            package.add_part(part);
        }

        Ok(package)
    }

    /// Serialize the package to ZIP bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        PackageWriter::to_bytes(self)
    }

    /// Serialize the package and write it to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        PackageWriter::write(path, self)
    }

    /// Partname of the main document part (the presentation part for .pptx).
    pub fn main_document_partname(&self) -> Result<PackURI> {
        self.rels
            .part_with_reltype(relationship_type::OFFICE_DOCUMENT)?
            .target_partname()
    }

    pub fn main_document_part(&self) -> Result<&dyn Part> {
        let partname = self.main_document_partname()?;
        self.get_part(&partname)
    }

    pub fn get_part(&self, partname: &PackURI) -> Result<&dyn Part> {
        self.parts
            .get(partname.as_str())
            .map(|b| &**b as &dyn Part)
            .ok_or_else(|| OpcError::PartNotFound(partname.to_string()))
    }

    pub fn get_part_mut(&mut self, partname: &PackURI) -> Result<&mut dyn Part> {
        self.parts
            .get_mut(partname.as_str())
            .map(|b| &mut **b as &mut dyn Part)
            .ok_or_else(|| OpcError::PartNotFound(partname.to_string()))
    }

    /// Add a part, replacing any part with the same partname.
    pub fn add_part(&mut self, part: Box<dyn Part>) {
        let partname = part.partname().to_string();
        self.parts.insert(partname, part);
    }

    pub fn remove_part(&mut self, partname: &PackURI) -> Option<Box<dyn Part>> {
        self.parts.remove(partname.as_str())
    }

    #[inline]
    pub fn contains_part(&self, partname: &PackURI) -> bool {
        self.parts.contains_key(partname.as_str())
    }

    /// All loaded parts, in no particular order.
    pub fn iter_parts(&self) -> impl Iterator<Item = &dyn Part> {
        self.parts.values().map(|b| &**b as &dyn Part)
    }

    #[inline]
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Parts reachable from the package relationships, breadth first, in
    /// rel-id order at each source.
    ///
    /// A part whose last inbound relationship has been removed is no longer
    /// reachable, which is how slides dropped from a presentation disappear
    /// from the saved package.
    pub fn iter_reachable_parts(&self) -> Vec<&dyn Part> {
        let mut reachable = Vec::with_capacity(self.parts.len());
        let mut visited: HashSet<PackURI> = HashSet::new();
        let mut queue: VecDeque<PackURI> = VecDeque::new();

        let mut enqueue = |rels: &Relationships, queue: &mut VecDeque<PackURI>| {
            for rel in rels.sorted() {
                if rel.is_external() {
                    continue;
                }
                if let Ok(partname) = rel.target_partname() {
                    if visited.insert(partname.clone()) {
                        queue.push_back(partname);
                    }
                }
            }
        };

        enqueue(&self.rels, &mut queue);
        while let Some(partname) = queue.pop_front() {
            if let Some(part) = self.parts.get(partname.as_str()) {
                enqueue(part.rels(), &mut queue);
                reachable.push(&**part as &dyn Part);
            }
        }
        reachable
    }

    #[inline]
    pub fn rels(&self) -> &Relationships {
        &self.rels
    }

    #[inline]
    pub fn rels_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }

    /// Rel-id of a package-level relationship to `target`, adding one if needed.
    pub fn relate_to(&mut self, target: &PackURI, reltype: &str) -> String {
        let target_ref = target.relative_ref(PACKAGE_URI);
        self.rels.get_or_add(reltype, &target_ref)
    }

    /// First unused partname for a template with a `%d` placeholder, e.g.
    /// `/ppt/slides/slide%d.xml`. Numbering starts at 1.
    pub fn next_partname(&self, template: &str) -> Result<PackURI> {
        let mut buf = itoa::Buffer::new();
        // At most `part_count` numbers can be taken.
        for n in 1..=self.parts.len() as u32 + 1 {
            let candidate = template.replace("%d", buf.format(n));
            if !self.parts.contains_key(&candidate) {
                return PackURI::new(candidate).map_err(OpcError::InvalidPackUri);
            }
        }
        Err(OpcError::InvalidPackUri(format!(
            "template '{}' has no %d placeholder",
            template
        )))
    }
}

impl Default for OpcPackage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OpcPackage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpcPackage")
            .field("rels", &self.rels.len())
            .field("parts", &self.parts.len())
            .finish()
    }
}
