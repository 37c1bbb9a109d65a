use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::PackURI;
use crate::ooxml::opc::rel::Relationships;
/// Open Packaging Convention (OPC) objects related to package parts.
///
/// A part is a unit of content in a package: a partname, a content type, the
/// bytes, and the relationships from the part to other parts.
use std::sync::Arc;

/// A part in an OPC package.
pub trait Part: std::fmt::Debug {
    fn partname(&self) -> &PackURI;

    fn content_type(&self) -> &str;

    fn blob(&self) -> &[u8];

    /// Replace the part's content.
    fn set_blob(&mut self, blob: Vec<u8>);

    fn rels(&self) -> &Relationships;

    fn rels_mut(&mut self) -> &mut Relationships;

    /// Rel-id of a relationship from this part to `target`, adding one if
    /// needed. The target is stored relative to this part's directory.
    fn relate_to(&mut self, target: &PackURI, reltype: &str) -> String {
        let target_ref = target.relative_ref(self.partname().base_uri());
        self.rels_mut().get_or_add(reltype, &target_ref)
    }

    /// Rel-id of an external relationship to `target_url`, adding one if needed.
    fn relate_to_ext(&mut self, target_url: &str, reltype: &str) -> String {
        self.rels_mut().get_or_add_ext_rel(reltype, target_url)
    }

    /// Absolute partname targeted by the internal relationship `r_id`.
    fn related_partname(&self, r_id: &str) -> Result<PackURI> {
        self.rels()
            .get(r_id)
            .ok_or_else(|| {
                OpcError::RelationshipNotFound(format!("{} in {}", r_id, self.partname()))
            })?
            .target_partname()
    }

    /// Absolute partname of the single relationship of `reltype`.
    fn partname_with_reltype(&self, reltype: &str) -> Result<PackURI> {
        self.rels().part_with_reltype(reltype)?.target_partname()
    }
}

/// A part holding opaque binary content (images, media, embedded objects).
#[derive(Debug, Clone)]
pub struct BlobPart {
    partname: PackURI,
    content_type: String,
    /// Shared so that cloned packages do not copy large media
    blob: Arc<Vec<u8>>,
    rels: Relationships,
}

impl BlobPart {
    pub fn new(partname: PackURI, content_type: String, blob: Vec<u8>) -> Self {
        let rels = Relationships::new(partname.base_uri().to_string());
        Self {
            partname,
            content_type,
            blob: Arc::new(blob),
            rels,
        }
    }
}

impl Part for BlobPart {
    fn partname(&self) -> &PackURI {
        &self.partname
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn blob(&self) -> &[u8] {
        &self.blob
    }

    fn set_blob(&mut self, blob: Vec<u8>) {
        self.blob = Arc::new(blob);
    }

    fn rels(&self) -> &Relationships {
        &self.rels
    }

    fn rels_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }
}

/// A part whose content is XML.
///
/// Content is held as validated UTF-8 bytes. Callers that need to edit the
/// markup parse it into an [`XmlDocument`](crate::common::xml::XmlDocument)
/// and store the result back with [`Part::set_blob`].
#[derive(Debug, Clone)]
pub struct XmlPart {
    partname: PackURI,
    content_type: String,
    xml_bytes: Arc<Vec<u8>>,
    rels: Relationships,
}

impl XmlPart {
    pub fn new(partname: PackURI, content_type: String, xml_bytes: Vec<u8>) -> Self {
        let rels = Relationships::new(partname.base_uri().to_string());
        Self {
            partname,
            content_type,
            xml_bytes: Arc::new(xml_bytes),
            rels,
        }
    }

    /// Load an XML part, rejecting content that is not UTF-8.
    pub fn load(partname: PackURI, content_type: String, xml_bytes: Vec<u8>) -> Result<Self> {
        std::str::from_utf8(&xml_bytes)
            .map_err(|e| OpcError::XmlError(format!("Invalid UTF-8 in {}: {}", partname, e)))?;
        Ok(Self::new(partname, content_type, xml_bytes))
    }

    pub fn xml_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.xml_bytes).map_err(Into::into)
    }
}

impl Part for XmlPart {
    fn partname(&self) -> &PackURI {
        &self.partname
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn blob(&self) -> &[u8] {
        &self.xml_bytes
    }

    fn set_blob(&mut self, blob: Vec<u8>) {
        self.xml_bytes = Arc::new(blob);
    }

    fn rels(&self) -> &Relationships {
        &self.rels
    }

    fn rels_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }
}

/// Chooses the part type for a content type.
pub struct PartFactory;

impl PartFactory {
    pub fn load(partname: PackURI, content_type: String, blob: Vec<u8>) -> Result<Box<dyn Part>> {
        if Self::is_xml_content_type(&content_type) {
            Ok(Box::new(XmlPart::load(partname, content_type, blob)?))
        } else {
            Ok(Box::new(BlobPart::new(partname, content_type, blob)))
        }
    }

    /// `image/svg+xml` is XML too, and is loaded as such.
    #[inline]
    pub fn is_xml_content_type(content_type: &str) -> bool {
        content_type.ends_with("+xml") || content_type.ends_with("/xml")
    }
}
